//! Common test utilities and helpers.
//!
//! Builders for the on-disk inputs the integration tests feed to the loader:
//! IHEX and S-record lines with correct checksums, and small ELF32 files.

#![allow(dead_code)]

pub mod elf_builder;

use std::io::Write;
use tempfile::NamedTempFile;

/// Creates a temporary file with the given content.
///
/// The file is removed when the returned handle is dropped, so keep it alive
/// for as long as an image opened from it is in use.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Path of a temporary file as the `&str` locator `open` takes.
pub fn locator(file: &NamedTempFile) -> &str {
    file.path().to_str().unwrap()
}

/// One IHEX record line with its checksum.
pub fn ihex_record(record_type: u8, address: u16, data: &[u8]) -> String {
    let mut bytes = vec![data.len() as u8];
    bytes.extend_from_slice(&address.to_be_bytes());
    bytes.push(record_type);
    bytes.extend_from_slice(data);
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    bytes.push(sum.wrapping_neg());
    format!(":{}\n", hex::encode_upper(bytes))
}

/// Encode sections as IHEX: one extended linear address record per section,
/// then data records of at most 16 bytes. Sections must not cross a 64 KiB
/// boundary.
pub fn encode_ihex(sections: &[(u32, Vec<u8>)], start_address: Option<u32>) -> String {
    let mut text = String::new();
    for (base, data) in sections {
        text += &ihex_record(0x04, 0, &((base >> 16) as u16).to_be_bytes());
        for (i, chunk) in data.chunks(16).enumerate() {
            let address = (base & 0xffff) as u16 + (i * 16) as u16;
            text += &ihex_record(0x00, address, chunk);
        }
    }
    if let Some(start) = start_address {
        text += &ihex_record(0x05, 0, &start.to_be_bytes());
    }
    text += &ihex_record(0x01, 0, &[]);
    text
}

/// One S-record line; `width` is the address width in bytes.
pub fn srec_record(record_type: u8, address: u32, width: usize, data: &[u8]) -> String {
    let mut body: Vec<u8> = address.to_be_bytes()[4 - width..].to_vec();
    body.extend_from_slice(data);
    let count = (body.len() + 1) as u8;
    let sum = body.iter().fold(count, |acc, b| acc.wrapping_add(*b));
    body.push(0xff - sum);
    format!("S{}{:02X}{}\n", record_type, count, hex::encode_upper(body))
}

/// Flip the low bit of the hex digit at `column` of `line` (0-based, line
/// terminator excluded), leaving the checksum untouched.
pub fn corrupt_digit(text: &str, line: usize, column: usize) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let digit = lines[line].as_bytes()[column] as char;
    let flipped = char::from_digit(digit.to_digit(16).unwrap() ^ 1, 16)
        .unwrap()
        .to_ascii_uppercase();
    lines[line].replace_range(column..column + 1, &flipped.to_string());
    lines.join("\n") + "\n"
}
