//! Flat disk image packer for a small RISC-V operating system.
//!
//! Takes the compiled kernel and a directory of compiled applications and
//! produces one image the kernel can read with fixed offsets:
//!
//! ```text
//! build/kernel.bin ──► kernel region (65536 bytes, padded or truncated)
//! bin/*.bin ─────────► file table (name[32], offset, size) + contents
//!                               │
//!                               ▼
//!                           disk.img
//! ```
//!
//! - [`image`] - The on-disk format: planning, writing, and reading images
//! - [`source`] - Reading the kernel and snapshotting the apps directory
//! - [`config`] - Optional `mkimage.toml` overrides
//! - [`manifest`] - JSON layout description written next to the image
//! - [`assemble`] - The end-to-end build used by the `sfs-mkimage` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use sfs_mkimage::image::{writer, AppBinary, ImagePlan, KernelRegion, KERNEL_SIZE};
//!
//! let kernel = KernelRegion::new(std::fs::read("build/kernel.bin")?, KERNEL_SIZE);
//! let shell = AppBinary::new("shell", "bin/shell.bin", std::fs::read("bin/shell.bin")?);
//! let plan = ImagePlan::new(kernel, vec![shell])?;
//! writer::write_image_file(&plan, std::path::Path::new("disk.img"))?;
//! ```

pub mod assemble;
pub mod config;
pub mod image;
pub mod manifest;
pub mod source;

pub use assemble::{assemble, AssembleReport};
pub use config::{resolve_config, AppOrder, CollisionPolicy, ImageConfig};
pub use image::{ImageError, ImagePlan, KERNEL_SIZE};
