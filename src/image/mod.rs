//! SFS disk image format.
//!
//! The image is a flat byte sequence a loader can walk with fixed offsets:
//!
//! ```text
//! offset 0                                : kernel region, `kernel_size` bytes
//! offset kernel_size                      : file_count, u32 little-endian
//! offset kernel_size + 4                  : FileEntry[file_count], 40 bytes each
//!                                             name[32], offset (u32 LE), size (u32 LE)
//! offset kernel_size + 4 + file_count * 40: file contents, in table order
//! ```
//!
//! Building is split in two phases. [`ImagePlan::new`] normalizes the kernel
//! and computes every offset up front; [`writer`] then streams the plan into
//! a sink without any further arithmetic.

pub mod directory;
pub mod kernel;
pub mod reader;
pub mod writer;

pub use directory::{AppBinary, Directory, FileEntry, NameCollision};
pub use kernel::{KernelRegion, Truncation};
pub use reader::ImageReader;

use std::fmt;
use std::path::PathBuf;

/// Default capacity of the kernel region in bytes.
pub const KERNEL_SIZE: usize = 65536;

/// Size of the `file_count` field that follows the kernel region.
pub const COUNT_FIELD_SIZE: usize = 4;

/// Size of one serialized [`FileEntry`].
pub const ENTRY_SIZE: usize = 40;

/// Size of the NUL-padded name field inside an entry.
pub const NAME_FIELD_SIZE: usize = 32;

/// Longest name stored in the name field; one byte always stays NUL.
pub const NAME_MAX_LEN: usize = NAME_FIELD_SIZE - 1;

/// Errors raised while planning, writing, or reading an image.
///
/// Oversized kernels are not an error; see [`KernelRegion::truncation`].
#[derive(Debug)]
pub enum ImageError {
    /// The kernel binary does not exist.
    MissingInput { path: PathBuf },
    /// Two sources encode to the same 32-byte name field.
    NameCollision(NameCollision),
    /// An offset or size does not fit the u32 on-disk fields.
    LayoutOverflow { name: String, offset: u64, size: u64 },
    /// A parsed image is shorter than its own table claims.
    MalformedImage { reason: String },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::MissingInput { path } => {
                write!(f, "{} not found. Build kernel first.", path.display())
            }
            ImageError::NameCollision(collision) => write!(f, "{}", collision),
            ImageError::LayoutOverflow { name, offset, size } => write!(
                f,
                "'{}' does not fit a 32-bit image layout (offset {}, size {})",
                name, offset, size
            ),
            ImageError::MalformedImage { reason } => write!(f, "malformed image: {}", reason),
        }
    }
}

impl std::error::Error for ImageError {}

/// Fully computed layout of one disk image.
///
/// Immutable once built: the writer only serializes what is here.
#[derive(Debug, Clone)]
pub struct ImagePlan {
    kernel: KernelRegion,
    directory: Directory,
}

impl ImagePlan {
    /// Plan an image from a normalized kernel and an ordered app snapshot.
    ///
    /// Name collisions are reported through [`Directory::collisions`]; the
    /// caller decides whether they are fatal.
    pub fn new(kernel: KernelRegion, apps: Vec<AppBinary>) -> Result<Self, ImageError> {
        let directory = Directory::build(kernel.len(), apps)?;
        Ok(Self { kernel, directory })
    }

    pub fn kernel(&self) -> &KernelRegion {
        &self.kernel
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn file_count(&self) -> u32 {
        self.directory.file_count()
    }

    /// Total image length in bytes.
    pub fn total_len(&self) -> u64 {
        self.directory.data_end()
    }
}

/// Offset of the first content byte for a table of `file_count` entries.
pub fn data_offset(kernel_size: usize, file_count: usize) -> u64 {
    kernel_size as u64 + COUNT_FIELD_SIZE as u64 + (file_count as u64) * ENTRY_SIZE as u64
}
