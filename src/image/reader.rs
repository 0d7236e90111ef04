//! Loader-side view of a finished image.
//!
//! Reads the table the same way the kernel does at boot: count right after
//! the kernel region, entries right after the count, names compared up to
//! the first NUL. Unlike the kernel, every range is bounds checked.

use super::{data_offset, FileEntry, ImageError, COUNT_FIELD_SIZE, ENTRY_SIZE};

/// Parsed table over borrowed image bytes.
#[derive(Debug)]
pub struct ImageReader<'a> {
    bytes: &'a [u8],
    entries: Vec<FileEntry>,
}

impl<'a> ImageReader<'a> {
    pub fn parse(bytes: &'a [u8], kernel_size: usize) -> Result<Self, ImageError> {
        let count_end = kernel_size + COUNT_FIELD_SIZE;
        let count_field = bytes
            .get(kernel_size..count_end)
            .ok_or_else(|| malformed(format!(
                "{} bytes is too short for a {kernel_size}-byte kernel region and file count",
                bytes.len()
            )))?;
        let mut word = [0u8; COUNT_FIELD_SIZE];
        word.copy_from_slice(count_field);
        let count = u32::from_le_bytes(word) as usize;

        let table_end = data_offset(kernel_size, count);
        if table_end > bytes.len() as u64 {
            return Err(malformed(format!(
                "table of {count} entries ends at {table_end}, image is {} bytes",
                bytes.len()
            )));
        }

        let entries = bytes[count_end..table_end as usize]
            .chunks_exact(ENTRY_SIZE)
            .map(|chunk| {
                let mut record = [0u8; ENTRY_SIZE];
                record.copy_from_slice(chunk);
                FileEntry::from_bytes(&record)
            })
            .collect();

        Ok(Self { bytes, entries })
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// First entry whose name matches exactly.
    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.name_str() == name)
    }

    /// Content bytes described by `entry`.
    pub fn load(&self, entry: &FileEntry) -> Result<&'a [u8], ImageError> {
        let range = entry.range();
        if range.end > self.bytes.len() as u64 {
            return Err(malformed(format!(
                "'{}' spans {}..{}, image is {} bytes",
                entry.name_str(),
                range.start,
                range.end,
                self.bytes.len()
            )));
        }
        Ok(&self.bytes[range.start as usize..range.end as usize])
    }
}

fn malformed(reason: String) -> ImageError {
    ImageError::MalformedImage { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::writer::to_bytes;
    use crate::image::{AppBinary, ImagePlan, KernelRegion, KERNEL_SIZE};

    fn image(apps: Vec<AppBinary>) -> Vec<u8> {
        let kernel = KernelRegion::new(vec![0x13; 100], KERNEL_SIZE);
        to_bytes(&ImagePlan::new(kernel, apps).unwrap()).unwrap()
    }

    #[test]
    fn test_find_and_load() {
        let bytes = image(vec![
            AppBinary::new("init", "bin/init.bin", b"first".to_vec()),
            AppBinary::new("shell", "bin/shell.bin", b"second".to_vec()),
        ]);
        let reader = ImageReader::parse(&bytes, KERNEL_SIZE).unwrap();

        assert_eq!(reader.entries().len(), 2);
        let shell = reader.find("shell").unwrap();
        assert_eq!(reader.load(shell).unwrap(), b"second");
        assert!(reader.find("she").is_none());
    }

    #[test]
    fn test_truncated_name_is_found_by_prefix() {
        let long = "a".repeat(40);
        let bytes = image(vec![AppBinary::new(long, "bin/long.bin", b"x".to_vec())]);
        let reader = ImageReader::parse(&bytes, KERNEL_SIZE).unwrap();

        assert!(reader.find(&"a".repeat(31)).is_some());
    }

    #[test]
    fn test_short_image_is_rejected() {
        let err = ImageReader::parse(&[0u8; 100], KERNEL_SIZE).unwrap_err();
        assert!(matches!(err, ImageError::MalformedImage { .. }));
    }

    #[test]
    fn test_table_past_end_is_rejected() {
        let mut bytes = vec![0u8; KERNEL_SIZE + 4 + 40];
        bytes[KERNEL_SIZE..KERNEL_SIZE + 4].copy_from_slice(&2u32.to_le_bytes());

        assert!(ImageReader::parse(&bytes, KERNEL_SIZE).is_err());
    }

    #[test]
    fn test_content_past_end_is_rejected() {
        let mut bytes = image(vec![AppBinary::new("shell", "bin/shell.bin", b"HI".to_vec())]);
        bytes.truncate(bytes.len() - 1);
        let reader = ImageReader::parse(&bytes, KERNEL_SIZE).unwrap();
        let entry = *reader.find("shell").unwrap();

        assert!(reader.load(&entry).is_err());
    }
}
