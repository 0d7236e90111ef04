//! JSON description of a built image, written next to it on request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::image::ImagePlan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageManifest {
    pub schema: u32,
    pub image: PathBuf,
    pub image_size: u64,
    pub kernel_size: usize,
    pub kernel_input_size: usize,
    pub kernel_truncated: bool,
    pub file_count: u32,
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub source: PathBuf,
    pub offset: u32,
    pub size: u32,
}

impl ImageManifest {
    pub fn from_plan(plan: &ImagePlan, image: &Path) -> Self {
        let directory = plan.directory();
        let files = directory
            .entries()
            .iter()
            .zip(directory.apps())
            .map(|(entry, app)| ManifestFile {
                name: entry.name_str().into_owned(),
                source: app.source.clone(),
                offset: entry.offset,
                size: entry.size,
            })
            .collect();

        Self {
            schema: 1,
            image: image.to_path_buf(),
            image_size: plan.total_len(),
            kernel_size: plan.kernel().len(),
            kernel_input_size: plan.kernel().input_len(),
            kernel_truncated: plan.kernel().truncation().is_some(),
            file_count: plan.file_count(),
            files,
        }
    }
}

/// `disk.img` -> `disk.img.json`.
pub fn manifest_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

pub fn write_manifest(manifest: &ImageManifest, path: &Path) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(manifest).context("serializing image manifest")?;
    json.push(b'\n');
    fs::write(path, json)
        .with_context(|| format!("writing image manifest '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{AppBinary, KernelRegion, KERNEL_SIZE};
    use tempfile::TempDir;

    #[test]
    fn test_manifest_path() {
        assert_eq!(
            manifest_path(Path::new("out/disk.img")),
            PathBuf::from("out/disk.img.json")
        );
    }

    #[test]
    fn test_manifest_describes_layout() {
        let plan = ImagePlan::new(
            KernelRegion::new(vec![0xFF; 70000], KERNEL_SIZE),
            vec![
                AppBinary::new("init", "bin/init.bin", vec![0; 8]),
                AppBinary::new("shell", "bin/shell.bin", b"HI".to_vec()),
            ],
        )
        .unwrap();
        let manifest = ImageManifest::from_plan(&plan, Path::new("disk.img"));

        assert_eq!(manifest.kernel_input_size, 70000);
        assert!(manifest.kernel_truncated);
        assert_eq!(manifest.file_count, 2);
        assert_eq!(manifest.image_size, (KERNEL_SIZE + 4 + 80 + 10) as u64);
        assert_eq!(manifest.files[0].offset, 65620);
        assert_eq!(manifest.files[1].name, "shell");
        assert_eq!(manifest.files[1].offset, 65628);
        assert_eq!(manifest.files[1].size, 2);
    }

    #[test]
    fn test_write_manifest_is_valid_json() {
        let temp = TempDir::new().unwrap();
        let plan = ImagePlan::new(KernelRegion::new(Vec::new(), KERNEL_SIZE), Vec::new()).unwrap();
        let manifest = ImageManifest::from_plan(&plan, Path::new("disk.img"));
        let path = temp.path().join("disk.img.json");

        write_manifest(&manifest, &path).unwrap();
        let parsed: ImageManifest = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

        assert_eq!(parsed, manifest);
    }
}
