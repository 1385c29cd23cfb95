//! Minimal deterministic zip writer.
//!
//! Entries are stored uncompressed with a fixed timestamp and comment, so the
//! same inputs always produce byte-identical archives. Only the zip32 format
//! is supported.

use crate::consts::{ENTRY_COMMENT, ENTRY_TIMESTAMP};
use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use std::collections::HashSet;

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;
const VERSION: u16 = 20;
const METHOD_STORED: u16 = 0;
/// General purpose flag: file name is UTF-8.
const FLAG_UTF8: u16 = 0x0800;

fn dos_time() -> u16 {
    let (_, _, _, hour, minute, second) = ENTRY_TIMESTAMP;
    (hour << 11) | (minute << 5) | (second / 2)
}

fn dos_date() -> u16 {
    let (year, month, day, _, _, _) = ENTRY_TIMESTAMP;
    ((year - 1980) << 9) | (month << 5) | day
}

/// In-memory archive. Entries appear in insertion order.
#[derive(Debug, Default)]
pub struct ZipWriter {
    body: Vec<u8>,
    central: Vec<u8>,
    names: HashSet<String>,
    entries: u16,
}
impl ZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append a stored entry. Names must be unique.
    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<()> {
        if self.contains(name) {
            exn::bail!(ErrorKind::Archive(format!("duplicate entry {name}")));
        }
        let too_large = || ErrorKind::Archive(format!("entry {name} exceeds zip32 limits"));
        let size = u32::try_from(data.len()).ok().ok_or_raise(too_large)?;
        let name_len = u16::try_from(name.len()).ok().ok_or_raise(too_large)?;
        let offset = u32::try_from(self.body.len()).ok().ok_or_raise(too_large)?;
        let entries = self.entries.checked_add(1).ok_or_raise(too_large)?;
        let crc = crc32fast::hash(data);
        let flags = if name.is_ascii() { 0 } else { FLAG_UTF8 };
        let comment = ENTRY_COMMENT.as_bytes();

        let local = &mut self.body;
        put_u32(local, LOCAL_HEADER_SIGNATURE);
        put_u16(local, VERSION);
        put_u16(local, flags);
        put_u16(local, METHOD_STORED);
        put_u16(local, dos_time());
        put_u16(local, dos_date());
        put_u32(local, crc);
        put_u32(local, size);
        put_u32(local, size);
        put_u16(local, name_len);
        put_u16(local, 0);
        local.extend_from_slice(name.as_bytes());
        local.extend_from_slice(data);

        let central = &mut self.central;
        put_u32(central, CENTRAL_HEADER_SIGNATURE);
        // Version made by: MS-DOS host.
        put_u16(central, VERSION);
        put_u16(central, VERSION);
        put_u16(central, flags);
        put_u16(central, METHOD_STORED);
        put_u16(central, dos_time());
        put_u16(central, dos_date());
        put_u32(central, crc);
        put_u32(central, size);
        put_u32(central, size);
        put_u16(central, name_len);
        put_u16(central, 0);
        put_u16(central, comment.len() as u16);
        put_u16(central, 0);
        put_u16(central, 0);
        put_u32(central, 0);
        put_u32(central, offset);
        central.extend_from_slice(name.as_bytes());
        central.extend_from_slice(comment);

        self.entries = entries;
        self.names.insert(name.to_string());
        Ok(())
    }

    /// Write the central directory and return the finished archive.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let too_large = || ErrorKind::Archive("archive exceeds zip32 limits".to_string());
        let central_offset = u32::try_from(self.body.len()).ok().ok_or_raise(too_large)?;
        let central_size = u32::try_from(self.central.len()).ok().ok_or_raise(too_large)?;
        let mut archive = std::mem::take(&mut self.body);
        archive.append(&mut self.central);
        put_u32(&mut archive, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        put_u16(&mut archive, 0);
        put_u16(&mut archive, 0);
        put_u16(&mut archive, self.entries);
        put_u16(&mut archive, self.entries);
        put_u32(&mut archive, central_size);
        put_u32(&mut archive, central_offset);
        put_u16(&mut archive, 0);
        Ok(archive)
    }
}

fn put_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_dos_timestamp() {
        assert_eq!(dos_time(), (1 << 11) | (59 << 5) | 13);
        assert_eq!(dos_date(), (33 << 9) | (3 << 5) | 14);
    }

    #[test]
    fn test_archive_is_readable() {
        let mut writer = ZipWriter::new();
        writer.add("exercise.json", b"{}").unwrap();
        writer.add("images/ab.png", b"\x89PNG").unwrap();
        let bytes = writer.finish().unwrap();

        let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut entry = archive.by_name("exercise.json").unwrap();
        assert_eq!(entry.compression(), ::zip::CompressionMethod::Stored);
        assert_eq!(entry.comment(), ENTRY_COMMENT);
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "{}");
        drop(entry);
        assert_eq!(archive.by_index(1).unwrap().name(), "images/ab.png");
    }

    #[test]
    fn test_output_is_deterministic() {
        let build = || {
            let mut writer = ZipWriter::new();
            writer.add("a.json", b"one").unwrap();
            writer.add("b.json", b"two").unwrap();
            writer.finish().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_duplicate_entries_are_rejected() {
        let mut writer = ZipWriter::new();
        writer.add("a.json", b"one").unwrap();
        assert!(writer.contains("a.json"));
        let err = writer.add("a.json", b"two").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Archive(_)));
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn test_empty_archive() {
        let bytes = ZipWriter::new().finish().unwrap();
        assert_eq!(bytes.len(), 22);
        assert_eq!(::zip::ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 0);
    }
}
