//! Section checksums across formats.

use fwimage::{calculate_checksum, Crc32, Image, ImageError, SectionFlags, ShutdownToken};

use crate::common::{create_temp_file, encode_ihex, locator};

#[test]
fn test_known_value() {
    assert_eq!(calculate_checksum(b"123456789").unwrap(), 0x0376_e6e7);
    assert_eq!(calculate_checksum(&[]).unwrap(), 0xffff_ffff);
}

#[test]
fn test_incremental_matches_one_shot() {
    let data: Vec<u8> = (0..100_000u32).map(|i| (i * 7) as u8).collect();
    let mut crc = Crc32::new();
    for part in data.chunks(4099) {
        crc.update(part);
    }
    assert_eq!(crc.value(), calculate_checksum(&data).unwrap());
}

#[test]
fn test_single_bit_flip_changes_value() {
    let mut data = vec![0x5Au8; 1024];
    let before = calculate_checksum(&data).unwrap();
    data[512] ^= 0x01;
    assert_ne!(calculate_checksum(&data).unwrap(), before);
}

#[test]
fn test_same_contents_same_checksum_across_formats() {
    let contents: Vec<u8> = (0..64u8).collect();

    let bin = create_temp_file(&contents);
    let mut bin_image = Image::open(locator(&bin), Some("bin")).unwrap();

    let hex = create_temp_file(encode_ihex(&[(0x8000, contents.clone())], None).as_bytes());
    let mut hex_image = Image::open(locator(&hex), None).unwrap();

    let mut built = Image::builder();
    built.add_section(0x8000, SectionFlags::empty(), &contents).unwrap();

    let expected = calculate_checksum(&contents).unwrap();
    assert_eq!(bin_image.section_checksum(0).unwrap(), expected);
    assert_eq!(hex_image.section_checksum(0).unwrap(), expected);
    assert_eq!(built.section_checksum(0).unwrap(), expected);
}

#[test]
fn test_cancelled_checksum() {
    let mut image = Image::builder();
    image.add_section(0, SectionFlags::empty(), &[0; 100_000]).unwrap();

    let token = ShutdownToken::new();
    token.cancel();
    let err = image.section_checksum_with(0, &token).unwrap_err();
    assert!(matches!(err, ImageError::Interrupted));
}

#[test]
fn test_invalid_section_index() {
    let mut image = Image::builder();
    let err = image.section_checksum(0).unwrap_err();
    assert!(matches!(err, ImageError::InvalidSection { index: 0, count: 0 }));
}
