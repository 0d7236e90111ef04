//! Serialization of an [`ImagePlan`].

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::ImagePlan;

/// Stream `plan` into `sink` in on-disk field order.
///
/// Returns the number of bytes written.
pub fn write_image<W: Write>(plan: &ImagePlan, sink: &mut W) -> io::Result<u64> {
    let directory = plan.directory();

    sink.write_all(plan.kernel().as_bytes())?;
    sink.write_all(&plan.file_count().to_le_bytes())?;
    for entry in directory.entries() {
        sink.write_all(&entry.to_bytes())?;
    }
    for app in directory.apps() {
        sink.write_all(&app.content)?;
    }
    sink.flush()?;

    Ok(plan.total_len())
}

/// Serialize `plan` into memory.
pub fn to_bytes(plan: &ImagePlan) -> io::Result<Vec<u8>> {
    let capacity = usize::try_from(plan.total_len())
        .map_err(|_| io::Error::new(io::ErrorKind::OutOfMemory, "image exceeds address space"))?;
    let mut buf = Vec::with_capacity(capacity);
    write_image(plan, &mut buf)?;
    Ok(buf)
}

/// Write `plan` to `path`, replacing any existing file.
///
/// There is no temp-file swap: a failure part way through leaves whatever
/// bytes were already flushed.
pub fn write_image_file(plan: &ImagePlan, path: &Path) -> Result<u64> {
    let file = File::create(path)
        .with_context(|| format!("creating disk image '{}'", path.display()))?;
    let mut sink = BufWriter::new(file);
    let written = write_image(plan, &mut sink)
        .with_context(|| format!("writing disk image '{}'", path.display()))?;
    Ok(written)
}
