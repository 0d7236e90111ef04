//! Input collection: the kernel binary and the apps directory.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::AppOrder;
use crate::image::directory::{strip_app_suffix, APP_SUFFIX};
use crate::image::{AppBinary, ImageError};

/// Read the kernel binary, failing with [`ImageError::MissingInput`] if absent.
pub fn read_kernel(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ImageError::MissingInput {
            path: path.to_path_buf(),
        }
        .into()),
        Err(e) => Err(e).with_context(|| format!("reading kernel '{}'", path.display())),
    }
}

/// Snapshot the `.bin` apps in `dir` into one ordered list.
///
/// The directory is listed exactly once; the returned order is what both the
/// table and the content blocks use. A missing directory means no apps;
/// any other failure to stat it (permissions, dangling symlink) is an error.
/// Subdirectories are skipped even if their name ends in `.bin`.
pub fn collect_apps(dir: &Path, order: AppOrder) -> Result<Vec<AppBinary>> {
    match fs::symlink_metadata(dir) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("inspecting apps directory '{}'", dir.display()));
        }
    }

    let mut listing: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("reading apps directory '{}'", dir.display()))?
    {
        let entry =
            entry.with_context(|| format!("iterating apps directory '{}'", dir.display()))?;
        let path = entry.path();
        let os_name = entry.file_name();
        if !os_name.as_encoded_bytes().ends_with(APP_SUFFIX.as_bytes()) {
            continue;
        }
        let Some(file_name) = os_name.to_str() else {
            bail!("app file name is not valid UTF-8: '{}'", path.display());
        };
        let Some(name) = strip_app_suffix(file_name) else {
            continue;
        };
        // Follows symlinks, so a linked binary is packed like a regular one.
        if !path.is_file() {
            continue;
        }
        listing.push((name.to_string(), path));
    }

    if order == AppOrder::Name {
        listing.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    }

    listing
        .into_iter()
        .map(|(name, path)| {
            let content =
                fs::read(&path).with_context(|| format!("reading app '{}'", path.display()))?;
            Ok(AppBinary::new(name, path, content))
        })
        .collect()
}
