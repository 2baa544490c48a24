//! Format detection from file contents.

use fwimage::image::{detect_file, sniff};
use fwimage::io::IOLimits;
use fwimage::{Image, ImageError, ImageType};

use crate::common::elf_builder::{ElfBuilder, PF_R};
use crate::common::{create_temp_file, encode_ihex, locator, srec_record};

#[test]
fn test_detect_each_format() {
    let limits = IOLimits::default();

    let elf = create_temp_file(&ElfBuilder::new().load(0, 0, PF_R, &[0; 4]).build());
    assert_eq!(detect_file(elf.path(), &limits).unwrap(), ImageType::Elf);

    let ihex = create_temp_file(encode_ihex(&[(0x100, vec![1; 4])], None).as_bytes());
    assert_eq!(detect_file(ihex.path(), &limits).unwrap(), ImageType::IHex);

    let srec = create_temp_file(
        (srec_record(0, 0, 2, b"HDR") + &srec_record(9, 0, 2, &[])).as_bytes(),
    );
    assert_eq!(detect_file(srec.path(), &limits).unwrap(), ImageType::SRecord);

    let bin = create_temp_file(&[0xEA, 0x00, 0x00, 0x0A, 0, 0, 0, 0, 0, 0]);
    assert_eq!(detect_file(bin.path(), &limits).unwrap(), ImageType::Binary);
}

#[test]
fn test_short_file_is_binary() {
    // IHEX-looking, but shorter than the sniffed prefix
    let file = create_temp_file(b":0000");
    let image = Image::open(locator(&file), None).unwrap();
    assert_eq!(image.image_type(), ImageType::Binary);
    assert_eq!(image.sections()[0].size(), 5);
}

#[test]
fn test_hint_overrides_detection() {
    let file = create_temp_file(encode_ihex(&[(0, vec![1, 2])], None).as_bytes());
    let image = Image::open(locator(&file), Some("bin")).unwrap();
    assert_eq!(image.image_type(), ImageType::Binary);
}

#[test]
fn test_unknown_type_hint() {
    let file = create_temp_file(&[0; 4]);
    let err = Image::open(locator(&file), Some("coff")).unwrap_err();
    assert!(matches!(err, ImageError::UnknownType(ref name) if name == "coff"));
}

#[test]
fn test_type_names_round_trip() {
    for name in ["bin", "ihex", "elf", "mem", "s19", "build"] {
        let image_type: ImageType = name.parse().unwrap();
        assert_eq!(image_type.as_str(), name);
        assert_eq!(image_type.to_string(), name);
    }
}

#[test]
fn test_sniff_partial_matches() {
    // 'S' followed by non-hex
    assert_eq!(sniff(b"Sections:"), ImageType::Binary);
    // ':' with hex but record type 06
    assert_eq!(sniff(b":00000006FA"), ImageType::Binary);
    // ELF magic alone is enough
    assert_eq!(sniff(b"\x7fELF\0\0\0\0\0"), ImageType::Elf);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.hex");
    let err = Image::open(path.to_str().unwrap(), None).unwrap_err();
    assert!(matches!(err, ImageError::Io(_)));
}
