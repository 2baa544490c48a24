//! Live target memory images backed by a fake target.

use std::sync::{Arc, Mutex};

use fwimage::{Image, ImageError, ImageLoader, ImageType, LoaderConfig, TargetError, TargetMemory};

/// Target whose memory is `base + i` at every address; counts reads.
#[derive(Default)]
struct FakeTarget {
    reads: Vec<(u64, usize)>,
    halted: bool,
}

impl TargetMemory for FakeTarget {
    fn read_buffer(&mut self, address: u64, buf: &mut [u8]) -> Result<(), TargetError> {
        if !self.halted {
            return Err(TargetError::NotHalted);
        }
        self.reads.push((address, buf.len()));
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = address.wrapping_add(i as u64) as u8;
        }
        Ok(())
    }
}

fn halted_target() -> Arc<Mutex<FakeTarget>> {
    Arc::new(Mutex::new(FakeTarget {
        halted: true,
        ..FakeTarget::default()
    }))
}

fn open_memory(loader: ImageLoader, target: Arc<Mutex<FakeTarget>>) -> Image {
    loader
        .with_target("target0", target)
        .open("target0", Some("mem"))
        .unwrap()
}

#[test]
fn test_single_full_range_section() {
    let image = open_memory(ImageLoader::default(), halted_target());
    assert_eq!(image.image_type(), ImageType::Memory);
    assert_eq!(image.sections().len(), 1);
    assert_eq!(image.sections()[0].base_address(), 0);
    assert_eq!(image.sections()[0].size(), 0xffff_ffff);
    assert_eq!(image.start_address(), None);
}

#[test]
fn test_reads_use_block_cache() {
    let config = LoaderConfig {
        memory_cache_size: 256,
        ..LoaderConfig::default()
    };
    let target = halted_target();
    let mut image = open_memory(ImageLoader::new(config).unwrap(), target.clone());

    assert_eq!(
        image.read_section(0, 0x1010, 4).unwrap(),
        vec![0x10, 0x11, 0x12, 0x13]
    );
    image.read_section(0, 0x10f0, 16).unwrap();
    assert_eq!(target.lock().unwrap().reads, vec![(0x1000, 256)]);

    // crosses into the next block
    let data = image.read_section(0, 0x10fe, 4).unwrap();
    assert_eq!(data, vec![0xfe, 0xff, 0x00, 0x01]);
    assert_eq!(
        target.lock().unwrap().reads,
        vec![(0x1000, 256), (0x1100, 256)]
    );
}

#[test]
fn test_unhalted_target_is_retryable() {
    let target = Arc::new(Mutex::new(FakeTarget::default()));
    let mut image = open_memory(ImageLoader::default(), target.clone());

    let err = image.read_section(0, 0x2000_0004, 4).unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, ImageError::TemporarilyUnavailable { .. }));

    target.lock().unwrap().halted = true;
    assert_eq!(
        image.read_section(0, 0x2000_0004, 2).unwrap(),
        vec![0x04, 0x05]
    );
}

#[test]
fn test_relocated_memory_image() {
    let target = halted_target();
    let mut image = open_memory(ImageLoader::default().with_base_address(0x100), target);
    assert_eq!(image.sections()[0].base_address(), 0x100);
    // reads land at base + offset
    assert_eq!(image.read_section(0, 0x20, 1).unwrap(), vec![0x20]);
}

#[test]
fn test_unknown_target() {
    let err = ImageLoader::default()
        .with_target("target0", halted_target())
        .open("target1", Some("mem"))
        .unwrap_err();
    assert!(matches!(err, ImageError::TargetNotFound(ref name) if name == "target1"));
}
