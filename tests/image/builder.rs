//! Builder images assembled in memory.

use fwimage::{Image, ImageError, ImageLoader, ImageType, SectionFlags};

use crate::common::{create_temp_file, locator};

#[test]
fn test_adjacent_blocks_merge() {
    let mut image = Image::builder();
    assert_eq!(image.image_type(), ImageType::Builder);
    assert!(image.sections().is_empty());

    image.add_section(0x1000, SectionFlags::empty(), &[1, 2, 3, 4]).unwrap();
    image.add_section(0x1004, SectionFlags::empty(), &[5, 6, 7, 8]).unwrap();
    assert_eq!(image.sections().len(), 1);
    assert_eq!(image.sections()[0].size(), 8);

    image.add_section(0x2000, SectionFlags::empty(), &[9]).unwrap();
    assert_eq!(image.sections().len(), 2);

    assert_eq!(
        image.read_section(0, 2, 6).unwrap(),
        vec![3, 4, 5, 6, 7, 8]
    );
    assert_eq!(image.read_section(1, 0, 1).unwrap(), vec![9]);
}

#[test]
fn test_flags_or_gap_start_new_section() {
    let mut image = Image::builder();
    image.add_section(0x0, SectionFlags::READ, &[0; 4]).unwrap();
    // same address run, different flags
    image.add_section(0x4, SectionFlags::READ | SectionFlags::WRITE, &[0; 4]).unwrap();
    // overlapping, not adjacent
    image.add_section(0x6, SectionFlags::READ | SectionFlags::WRITE, &[0; 4]).unwrap();
    assert_eq!(image.sections().len(), 3);
}

#[test]
fn test_only_last_section_is_extended() {
    let mut image = Image::builder();
    image.add_section(0x100, SectionFlags::empty(), &[1; 4]).unwrap();
    image.add_section(0x200, SectionFlags::empty(), &[2; 4]).unwrap();
    // continues the first block, which is no longer last
    image.add_section(0x104, SectionFlags::empty(), &[3; 4]).unwrap();

    let bases: Vec<u64> = image.sections().iter().map(|s| s.base_address()).collect();
    assert_eq!(bases, vec![0x100, 0x200, 0x104]);
}

#[test]
fn test_opened_through_loader() {
    let mut image = ImageLoader::default().open("unused", Some("build")).unwrap();
    assert_eq!(image.start_address(), None);
    image.add_section(0, SectionFlags::empty(), b"123456789").unwrap();
    assert_eq!(image.section_checksum(0).unwrap(), 0x0376_e6e7);
}

#[test]
fn test_file_images_reject_add_section() {
    let file = create_temp_file(&[0u8; 16]);
    let mut image = Image::open(locator(&file), Some("bin")).unwrap();
    let err = image.add_section(0, SectionFlags::empty(), &[1]).unwrap_err();
    assert!(matches!(err, ImageError::NotABuilder("bin")));
    assert!(err.is_usage_error());
}
