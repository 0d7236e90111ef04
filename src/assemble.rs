//! End-to-end image build: inputs -> plan -> image file.
//!
//! Every input is read and the whole layout is planned before the output
//! path is opened, so a missing kernel or unreadable app leaves any
//! existing image untouched.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::{CollisionPolicy, ImageConfig};
use crate::image::writer::write_image_file;
use crate::image::{ImageError, ImagePlan, KernelRegion, NameCollision, Truncation};
use crate::manifest::{manifest_path, write_manifest, ImageManifest};
use crate::source::{collect_apps, read_kernel};

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct AssembleReport {
    pub output: PathBuf,
    pub file_count: u32,
    pub image_size: u64,
    pub truncation: Option<Truncation>,
    pub collisions: Vec<NameCollision>,
    pub manifest: Option<PathBuf>,
}

/// Read all inputs and compute the layout without writing anything.
pub fn plan_image(config: &ImageConfig) -> Result<ImagePlan> {
    let kernel_bytes = read_kernel(&config.kernel)?;
    let kernel = KernelRegion::new(kernel_bytes, config.kernel_size);
    if let Some(t) = kernel.truncation() {
        eprintln!(
            "Warning: Kernel too big ({} > {}). Truncating.",
            t.original_len, t.capacity
        );
    }

    let apps = collect_apps(&config.apps_dir, config.app_order)?;
    let plan = ImagePlan::new(kernel, apps)
        .with_context(|| format!("planning layout for '{}'", config.output.display()))?;

    let mut collisions = plan.directory().collisions();
    if !collisions.is_empty() {
        match config.on_name_collision {
            CollisionPolicy::Error => {
                return Err(ImageError::NameCollision(collisions.swap_remove(0)).into());
            }
            CollisionPolicy::Warn => {
                for collision in &collisions {
                    eprintln!("Warning: {}", collision);
                }
            }
        }
    }

    Ok(plan)
}

/// Build the image described by `config` and report what was written.
pub fn assemble(config: &ImageConfig) -> Result<AssembleReport> {
    let plan = plan_image(config)?;

    let image_size = write_image_file(&plan, &config.output)?;

    let manifest = if config.manifest {
        let path = manifest_path(&config.output);
        write_manifest(&ImageManifest::from_plan(&plan, &config.output), &path)?;
        Some(path)
    } else {
        None
    };

    println!(
        "Success: Created {} with Kernel + {} apps.",
        config.output.display(),
        plan.file_count()
    );

    Ok(AssembleReport {
        output: config.output.clone(),
        file_count: plan.file_count(),
        image_size,
        truncation: plan.kernel().truncation(),
        collisions: plan.directory().collisions(),
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppOrder;
    use crate::image::{ImageReader, KERNEL_SIZE};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup(root: &Path, kernel: Option<&[u8]>, apps: &[(&str, &[u8])]) -> ImageConfig {
        if let Some(kernel) = kernel {
            fs::create_dir_all(root.join("build")).unwrap();
            fs::write(root.join("build/kernel.bin"), kernel).unwrap();
        }
        if !apps.is_empty() {
            fs::create_dir_all(root.join("bin")).unwrap();
            for (name, content) in apps {
                fs::write(root.join("bin").join(name), content).unwrap();
            }
        }
        ImageConfig::defaults(root)
    }

    #[test]
    fn test_kernel_only() {
        let temp = TempDir::new().unwrap();
        let config = setup(temp.path(), Some(&[0xAAu8; 10]), &[]);

        let report = assemble(&config).unwrap();
        let bytes = fs::read(&config.output).unwrap();

        assert_eq!(report.file_count, 0);
        assert_eq!(report.image_size, 65540);
        assert_eq!(bytes.len(), 65540);
        assert!(bytes[..10].iter().all(|&b| b == 0xAA));
        assert!(bytes[10..KERNEL_SIZE].iter().all(|&b| b == 0));
        assert_eq!(&bytes[KERNEL_SIZE..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_single_app() {
        let temp = TempDir::new().unwrap();
        let config = setup(
            temp.path(),
            Some(&[0u8; KERNEL_SIZE]),
            &[("shell.bin", b"HI"), ("readme.txt", b"ignored")],
        );

        let report = assemble(&config).unwrap();
        let bytes = fs::read(&config.output).unwrap();
        let reader = ImageReader::parse(&bytes, KERNEL_SIZE).unwrap();
        let entry = reader.find("shell").unwrap();

        assert_eq!(report.file_count, 1);
        assert_eq!(entry.offset, 65580);
        assert_eq!(entry.size, 2);
        assert_eq!(&entry.name[..5], b"shell");
        assert!(entry.name[5..].iter().all(|&b| b == 0));
        assert_eq!(&bytes[65580..65582], b"HI");
    }

    #[test]
    fn test_oversize_kernel_still_succeeds() {
        let temp = TempDir::new().unwrap();
        let config = setup(temp.path(), Some(vec![0xFFu8; 70000].as_slice()), &[]);

        let report = assemble(&config).unwrap();
        let bytes = fs::read(&config.output).unwrap();

        assert_eq!(
            report.truncation,
            Some(Truncation {
                original_len: 70000,
                capacity: KERNEL_SIZE,
            })
        );
        assert!(bytes[..KERNEL_SIZE].iter().all(|&b| b == 0xFF));
        assert_eq!(bytes.len(), KERNEL_SIZE + 4);
    }

    #[test]
    fn test_missing_kernel_leaves_output_untouched() {
        let temp = TempDir::new().unwrap();
        let config = setup(temp.path(), None, &[("shell.bin", b"HI")]);
        fs::write(&config.output, b"previous image").unwrap();

        let err = assemble(&config).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ImageError>(),
            Some(ImageError::MissingInput { .. })
        ));
        assert_eq!(fs::read(&config.output).unwrap(), b"previous image");
    }

    #[test]
    fn test_missing_kernel_creates_no_output() {
        let temp = TempDir::new().unwrap();
        let config = setup(temp.path(), None, &[]);

        assert!(assemble(&config).is_err());
        assert!(!config.output.exists());
    }

    #[test]
    fn test_extraction_law_and_length() {
        let temp = TempDir::new().unwrap();
        let apps: &[(&str, &[u8])] = &[
            ("init.bin", &[1u8; 33]),
            ("shell.bin", b"shell body"),
            ("empty.bin", b""),
            ("mandelbrot.bin", &[9u8; 4097]),
        ];
        let mut config = setup(temp.path(), Some(b"kernel"), apps);
        config.app_order = AppOrder::Name;

        let report = assemble(&config).unwrap();
        let bytes = fs::read(&config.output).unwrap();
        let reader = ImageReader::parse(&bytes, KERNEL_SIZE).unwrap();

        let total: usize = apps.iter().map(|(_, c)| c.len()).sum();
        assert_eq!(bytes.len(), KERNEL_SIZE + 4 + apps.len() * 40 + total);
        assert_eq!(report.file_count as usize, apps.len());
        for (file_name, content) in apps {
            let name = file_name.strip_suffix(".bin").unwrap();
            let entry = reader.find(name).unwrap();
            assert_eq!(reader.load(entry).unwrap(), *content);
        }
        let names: Vec<String> = reader
            .entries()
            .iter()
            .map(|e| e.name_str().into_owned())
            .collect();
        assert_eq!(names, vec!["empty", "init", "mandelbrot", "shell"]);
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let config = setup(
            temp.path(),
            Some(&[0x42u8; 1000]),
            &[("a.bin", b"aaa"), ("b.bin", b"bb"), ("c.bin", b"c")],
        );

        assemble(&config).unwrap();
        let first = fs::read(&config.output).unwrap();
        assemble(&config).unwrap();
        let second = fs::read(&config.output).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_name_collision_is_fatal_by_default() {
        let temp = TempDir::new().unwrap();
        let prefix = "n".repeat(31);
        let first = format!("{prefix}_one.bin");
        let second = format!("{prefix}_two.bin");
        let config = setup(
            temp.path(),
            Some(b"k"),
            &[(first.as_str(), b"1"), (second.as_str(), b"2")],
        );

        let err = assemble(&config).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ImageError>(),
            Some(ImageError::NameCollision(_))
        ));
        assert!(!config.output.exists());
    }

    #[test]
    fn test_name_collision_warn_policy_proceeds() {
        let temp = TempDir::new().unwrap();
        let prefix = "n".repeat(31);
        let first = format!("{prefix}_one.bin");
        let second = format!("{prefix}_two.bin");
        let mut config = setup(
            temp.path(),
            Some(b"k"),
            &[(first.as_str(), b"1"), (second.as_str(), b"2")],
        );
        config.on_name_collision = CollisionPolicy::Warn;

        let report = assemble(&config).unwrap();

        assert_eq!(report.file_count, 2);
        assert_eq!(report.collisions.len(), 1);
    }

    #[test]
    fn test_manifest_written_when_enabled() {
        let temp = TempDir::new().unwrap();
        let mut config = setup(temp.path(), Some(b"k"), &[("shell.bin", b"HI")]);
        config.manifest = true;

        let report = assemble(&config).unwrap();
        let path = report.manifest.unwrap();
        let manifest: ImageManifest = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

        assert_eq!(path, temp.path().join("disk.img.json"));
        assert_eq!(manifest.file_count, 1);
        assert_eq!(manifest.files[0].offset, 65580);
    }
}
