//! Build configuration.
//!
//! Everything is optional. With no `mkimage.toml` the tool behaves exactly
//! like the fixed-path packer: `build/kernel.bin` + `bin/*.bin` -> `disk.img`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::image::KERNEL_SIZE;

/// Config file picked up from the working directory when present.
pub const CONFIG_FILENAME: &str = "mkimage.toml";

pub const DEFAULT_KERNEL: &str = "build/kernel.bin";
pub const DEFAULT_APPS_DIR: &str = "bin";
pub const DEFAULT_OUTPUT: &str = "disk.img";

/// Order in which apps are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppOrder {
    /// Directory iteration order, snapshotted once.
    Listing,
    /// Byte-wise by file name.
    Name,
}

/// What to do when two apps encode to the same table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    Error,
    Warn,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub kernel: PathBuf,
    pub apps_dir: PathBuf,
    pub output: PathBuf,
    pub kernel_size: usize,
    pub app_order: AppOrder,
    pub on_name_collision: CollisionPolicy,
    pub manifest: bool,
}

impl ImageConfig {
    /// Defaults with paths relative to `base_dir`.
    pub fn defaults(base_dir: &Path) -> Self {
        Self {
            kernel: base_dir.join(DEFAULT_KERNEL),
            apps_dir: base_dir.join(DEFAULT_APPS_DIR),
            output: base_dir.join(DEFAULT_OUTPUT),
            kernel_size: KERNEL_SIZE,
            app_order: AppOrder::Listing,
            on_name_collision: CollisionPolicy::Error,
            manifest: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MkimageToml {
    image: Option<ImageToml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImageToml {
    kernel: Option<String>,
    apps_dir: Option<String>,
    output: Option<String>,
    kernel_size: Option<u64>,
    app_order: Option<String>,
    on_name_collision: Option<String>,
    manifest: Option<bool>,
}

/// Pick the config for a run.
///
/// An explicit path must exist. Otherwise `mkimage.toml` in `cwd` is used
/// when present, and defaults when not.
pub fn resolve_config(cwd: &Path, explicit: Option<&Path>) -> Result<ImageConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let implicit = cwd.join(CONFIG_FILENAME);
    if implicit.is_file() {
        return load_config(&implicit);
    }
    Ok(ImageConfig::defaults(cwd))
}

/// Load a config file; relative paths resolve against its directory.
pub fn load_config(config_path: &Path) -> Result<ImageConfig> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("reading config '{}'", config_path.display()))?;
    let base_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parse_config(&text, &base_dir, config_path)
}

fn parse_config(text: &str, base_dir: &Path, config_path: &Path) -> Result<ImageConfig> {
    let parsed: MkimageToml = toml::from_str(text)
        .with_context(|| format!("parsing config '{}'", config_path.display()))?;
    let image = parsed.image.unwrap_or_default();
    let mut config = ImageConfig::defaults(base_dir);

    if let Some(kernel) = image.kernel {
        config.kernel = resolve_path(base_dir, &kernel);
    }
    if let Some(apps_dir) = image.apps_dir {
        config.apps_dir = resolve_path(base_dir, &apps_dir);
    }
    if let Some(output) = image.output {
        config.output = resolve_path(base_dir, &output);
    }
    if let Some(kernel_size) = image.kernel_size {
        if kernel_size == 0 || kernel_size > u64::from(u32::MAX) {
            bail!(
                "invalid config '{}': kernel_size must be between 1 and {}, got {}",
                config_path.display(),
                u32::MAX,
                kernel_size
            );
        }
        config.kernel_size = kernel_size as usize;
    }
    if let Some(order) = image.app_order {
        config.app_order = match order.trim().to_ascii_lowercase().as_str() {
            "listing" => AppOrder::Listing,
            "name" => AppOrder::Name,
            other => bail!(
                "invalid config '{}': unsupported app_order '{}' (expected 'listing' or 'name')",
                config_path.display(),
                other
            ),
        };
    }
    if let Some(policy) = image.on_name_collision {
        config.on_name_collision = match policy.trim().to_ascii_lowercase().as_str() {
            "error" => CollisionPolicy::Error,
            "warn" => CollisionPolicy::Warn,
            other => bail!(
                "invalid config '{}': unsupported on_name_collision '{}' (expected 'error' or 'warn')",
                config_path.display(),
                other
            ),
        };
    }
    if let Some(manifest) = image.manifest {
        config.manifest = manifest;
    }

    Ok(config)
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}
