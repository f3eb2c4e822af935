//! Persisting epochs to disk.
//!
//! Files are written to a temporary file in the destination directory and
//! renamed over the target, so a crash never leaves a half-written
//! `*-epo.fif` behind and a re-run overwrites the previous output.
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::epoch::Epochs;
use crate::fiff::write_epochs;

/// Write `epochs` to `path`, replacing any existing file.
///
/// Parent directories are created as needed.
pub fn save_epochs(epochs: &Epochs, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temporary file in {}", dir.display()))?;
    let sink = write_epochs(BufWriter::new(tmp), epochs)?;
    let tmp = sink
        .into_inner()
        .map_err(|e| e.into_error())
        .context("flush epochs file")?;
    tmp.as_file().sync_all().context("sync epochs file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("rename into {}", path.display()))?;

    info!(
        "Saved {} epochs ({} channels, {} Hz) to {}",
        epochs.len(),
        epochs.channels.len(),
        epochs.sfreq,
        path.display()
    );
    Ok(())
}
