//! Write split files to a directory.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::error::MhtmlError;
use crate::model::file::SplitFile;

/// Name of the manifest written next to the extracted files.
pub const MANIFEST_FILE: &str = "manifest.json";

/// How files are written out.
///
/// Files are always written under the exact name the rewritten links use.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Replace existing files. When false, [`write_files`] fails before
    /// writing anything if one of its targets already exists.
    pub overwrite: bool,
    /// Also write [`MANIFEST_FILE`].
    pub write_manifest: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            write_manifest: false,
        }
    }
}

impl ExportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            overwrite: config.export.overwrite,
            write_manifest: config.export.write_manifest,
        }
    }
}

/// One line of the manifest.
#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    filename: &'a str,
    path: String,
    #[serde(rename = "type")]
    mime_type: &'a str,
    size: usize,
}

/// Write every file into `output_dir`, creating it if needed.
///
/// Returns the written paths in the same order as `files`. `progress` is
/// called with `(done, total)` before each file and once at the end.
pub fn write_files(
    files: &[SplitFile],
    output_dir: &Path,
    options: &ExportOptions,
    progress: &dyn Fn(usize, usize),
) -> anyhow::Result<Vec<PathBuf>> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(MhtmlError::ExportError(format!(
            "{} exists and is not a directory",
            output_dir.display()
        ))
        .into());
    }
    std::fs::create_dir_all(output_dir).map_err(|e| MhtmlError::io(output_dir, e))?;

    let total = files.len();
    let paths = files
        .iter()
        .enumerate()
        .map(|(i, file)| Ok(output_dir.join(output_name(&file.filename, i)?)))
        .collect::<Result<Vec<PathBuf>, MhtmlError>>()?;

    if !options.overwrite {
        if let Some(existing) = paths.iter().find(|p| p.exists()) {
            return Err(MhtmlError::ExportError(format!(
                "{} already exists",
                existing.display()
            ))
            .into());
        }
    }

    for (i, (file, path)) in files.iter().zip(&paths).enumerate() {
        progress(i, total);
        std::fs::write(path, file.content.as_bytes()).map_err(|e| MhtmlError::io(path, e))?;
        tracing::debug!(path = %path.display(), size = file.content.len(), "Wrote file");
    }
    progress(total, total);

    if options.write_manifest {
        write_manifest(files, &paths, output_dir)?;
    }

    Ok(paths)
}

/// Write `manifest.json` describing `files` and where they were written.
pub fn write_manifest(
    files: &[SplitFile],
    paths: &[PathBuf],
    output_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let entries: Vec<ManifestEntry<'_>> = files
        .iter()
        .zip(paths)
        .map(|(file, path)| ManifestEntry {
            filename: &file.filename,
            path: path.display().to_string(),
            mime_type: &file.mime_type,
            size: file.content.len(),
        })
        .collect();

    let path = output_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(&path, json).map_err(|e| MhtmlError::io(&path, e))?;
    Ok(path)
}

/// File name for the `index`-th file: empty names get a placeholder, names
/// that would leave the output directory are rejected.
fn output_name(filename: &str, index: usize) -> Result<String, MhtmlError> {
    if filename.is_empty() {
        return Ok(format!("part-{index}"));
    }
    if filename == "." || filename == ".." || filename.contains(['/', '\\']) {
        return Err(MhtmlError::InvalidPath(filename.to_string()));
    }
    Ok(filename.to_string())
}
