#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(file) => file,
        Err(_) => return,
    };
    if file.write_all(data).is_err() {
        return;
    }
    let Some(path) = file.path().to_str() else {
        return;
    };
    if let Ok(mut image) = fwimage::Image::open(path, Some("s19")) {
        for index in 0..image.sections().len().min(8) {
            let size = image.sections()[index].size().min(4096) as usize;
            let _ = image.read_section(index, 0, size);
        }
    }
});
