use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sfs_mkimage::image::{ImageReader, KERNEL_SIZE};
use sfs_mkimage::{assemble, resolve_config};

fn usage() -> &'static str {
    "Usage:\n  sfs-mkimage [build] [--config <path>]\n  sfs-mkimage ls <image> [--kernel-size <n>]\n  sfs-mkimage extract <image> <name> <dest> [--kernel-size <n>]"
}

fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config = take_flag(&mut args, "--config")?.map(PathBuf::from);
    let kernel_size = take_flag(&mut args, "--kernel-size")?;

    match args.as_slice() {
        [] => build(config.as_deref(), kernel_size.as_deref()),
        [build_cmd] if build_cmd == "build" => build(config.as_deref(), kernel_size.as_deref()),
        [ls, image] if ls == "ls" => {
            reject_flag(config.is_some(), "--config", "ls")?;
            list(Path::new(image), parse_kernel_size(kernel_size.as_deref())?)
        }
        [extract_cmd, image, name, dest] if extract_cmd == "extract" => {
            reject_flag(config.is_some(), "--config", "extract")?;
            extract(
                Path::new(image),
                name,
                Path::new(dest),
                parse_kernel_size(kernel_size.as_deref())?,
            )
        }
        _ => bail!(usage()),
    }
}

fn reject_flag(present: bool, flag: &str, command: &str) -> Result<()> {
    if present {
        bail!("{} is not accepted by '{}'\n{}", flag, command, usage());
    }
    Ok(())
}

fn build(config_path: Option<&Path>, kernel_size: Option<&str>) -> Result<()> {
    // The build takes its capacity from mkimage.toml.
    reject_flag(kernel_size.is_some(), "--kernel-size", "build")?;
    let cwd = std::env::current_dir().context("resolving current directory")?;
    let config = resolve_config(&cwd, config_path)?;
    assemble(&config)?;
    Ok(())
}

fn list(image: &Path, kernel_size: usize) -> Result<()> {
    let bytes =
        fs::read(image).with_context(|| format!("reading disk image '{}'", image.display()))?;
    let reader = ImageReader::parse(&bytes, kernel_size)
        .with_context(|| format!("parsing disk image '{}'", image.display()))?;

    println!("PERM   SIZE    NAME");
    println!("----   ----    ----");
    for entry in reader.entries() {
        println!("-r-x   {:<7} {}", entry.size, entry.name_str());
    }
    Ok(())
}

fn extract(image: &Path, name: &str, dest: &Path, kernel_size: usize) -> Result<()> {
    let bytes =
        fs::read(image).with_context(|| format!("reading disk image '{}'", image.display()))?;
    let reader = ImageReader::parse(&bytes, kernel_size)
        .with_context(|| format!("parsing disk image '{}'", image.display()))?;

    let Some(entry) = reader.find(name) else {
        bail!("'{}' not found in '{}'", name, image.display());
    };
    let content = reader.load(entry)?;
    fs::write(dest, content).with_context(|| format!("writing '{}'", dest.display()))?;

    println!(
        "Extracted {} ({} bytes at offset {}) to {}",
        name,
        entry.size,
        entry.offset,
        dest.display()
    );
    Ok(())
}

/// Remove `--flag <value>` from `args` and return the value.
fn take_flag(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(index) = args.iter().position(|arg| arg == flag) else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        bail!("{} requires a value\n{}", flag, usage());
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Ok(Some(value))
}

fn parse_kernel_size(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(KERNEL_SIZE);
    };
    let size: u32 = raw
        .parse()
        .with_context(|| format!("invalid --kernel-size '{}'", raw))?;
    if size == 0 {
        bail!("--kernel-size must be greater than zero");
    }
    Ok(size as usize)
}
