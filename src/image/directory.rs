//! File table construction.
//!
//! The table and the content blocks are both emitted from the single
//! `apps` vector held by [`Directory`], so their order cannot diverge.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{data_offset, ImageError, ENTRY_SIZE, NAME_FIELD_SIZE, NAME_MAX_LEN};

/// Suffix that marks an application binary in the apps directory.
pub const APP_SUFFIX: &str = ".bin";

/// Return the app name for a directory entry, or `None` if it is not a `.bin`.
pub fn strip_app_suffix(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(APP_SUFFIX)
}

/// Encode a name into the fixed table field: at most 31 bytes, NUL padded.
pub fn encode_name(name: &str) -> [u8; NAME_FIELD_SIZE] {
    let mut field = [0u8; NAME_FIELD_SIZE];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_MAX_LEN);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// One application to pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBinary {
    /// Name without the `.bin` suffix.
    pub name: String,
    /// Where the content was read from.
    pub source: PathBuf,
    pub content: Vec<u8>,
}

impl AppBinary {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            content,
        }
    }
}

/// One 40-byte record of the file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub name: [u8; NAME_FIELD_SIZE],
    pub offset: u32,
    pub size: u32,
}

impl FileEntry {
    pub fn to_bytes(&self) -> [u8; ENTRY_SIZE] {
        let mut record = [0u8; ENTRY_SIZE];
        record[..NAME_FIELD_SIZE].copy_from_slice(&self.name);
        record[NAME_FIELD_SIZE..NAME_FIELD_SIZE + 4].copy_from_slice(&self.offset.to_le_bytes());
        record[NAME_FIELD_SIZE + 4..].copy_from_slice(&self.size.to_le_bytes());
        record
    }

    pub fn from_bytes(record: &[u8; ENTRY_SIZE]) -> Self {
        let mut name = [0u8; NAME_FIELD_SIZE];
        name.copy_from_slice(&record[..NAME_FIELD_SIZE]);
        let mut word = [0u8; 4];
        word.copy_from_slice(&record[NAME_FIELD_SIZE..NAME_FIELD_SIZE + 4]);
        let offset = u32::from_le_bytes(word);
        word.copy_from_slice(&record[NAME_FIELD_SIZE + 4..]);
        let size = u32::from_le_bytes(word);
        Self { name, offset, size }
    }

    /// Name up to the first NUL, the way a C loader reads it.
    pub fn name_str(&self) -> Cow<'_, str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_FIELD_SIZE);
        String::from_utf8_lossy(&self.name[..end])
    }

    /// Byte range of this entry's content inside the image.
    pub fn range(&self) -> std::ops::Range<u64> {
        let start = u64::from(self.offset);
        start..start + u64::from(self.size)
    }
}

/// Two sources whose names share one table field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    pub first: PathBuf,
    pub second: PathBuf,
}

impl fmt::Display for NameCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name collision: '{}' and '{}' both encode to '{}'",
            self.first.display(),
            self.second.display(),
            self.name
        )
    }
}

/// File table plus the content blocks it describes, in one order.
#[derive(Debug, Clone)]
pub struct Directory {
    entries: Vec<FileEntry>,
    apps: Vec<AppBinary>,
    data_end: u64,
}

impl Directory {
    /// Assign offsets with a running accumulator seeded at the data offset.
    pub fn build(kernel_size: usize, apps: Vec<AppBinary>) -> Result<Self, ImageError> {
        let mut cursor = data_offset(kernel_size, apps.len());
        let mut entries = Vec::with_capacity(apps.len());

        for app in &apps {
            let size = app.content.len() as u64;
            let overflow = || ImageError::LayoutOverflow {
                name: app.name.clone(),
                offset: cursor,
                size,
            };
            let offset = u32::try_from(cursor).map_err(|_| overflow())?;
            let size32 = u32::try_from(size).map_err(|_| overflow())?;

            entries.push(FileEntry {
                name: encode_name(&app.name),
                offset,
                size: size32,
            });
            cursor += size;
        }

        Ok(Self {
            entries,
            apps,
            data_end: cursor,
        })
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn apps(&self) -> &[AppBinary] {
        &self.apps
    }

    pub fn file_count(&self) -> u32 {
        // Bounded by the offset check in `build`: every entry costs 40 bytes.
        self.entries.len() as u32
    }

    /// One past the last content byte, i.e. the image length.
    pub fn data_end(&self) -> u64 {
        self.data_end
    }

    /// Every pair of apps whose encoded names are identical.
    ///
    /// Each later duplicate is reported against the first app holding the name.
    pub fn collisions(&self) -> Vec<NameCollision> {
        let mut seen: HashMap<[u8; NAME_FIELD_SIZE], &Path> = HashMap::new();
        let mut collisions = Vec::new();

        for (entry, app) in self.entries.iter().zip(&self.apps) {
            match seen.get(&entry.name) {
                Some(first) => collisions.push(NameCollision {
                    name: entry.name_str().into_owned(),
                    first: first.to_path_buf(),
                    second: app.source.clone(),
                }),
                None => {
                    seen.insert(entry.name, &app.source);
                }
            }
        }

        collisions
    }
}
