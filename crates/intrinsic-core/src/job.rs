//! Job enumeration
//!
//! An image list is a text file of whitespace-separated paths. Every entry
//! becomes one [`ImageJob`] in file order; output paths are derived from the
//! input path alone.

use crate::error::BatchError;
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Suffix appended to the extension-less input path for the reflectance map
pub const REFLECTANCE_SUFFIX: &str = "-r.png";

/// Suffix appended to the extension-less input path for the shading map
pub const SHADING_SUFFIX: &str = "-s.png";

/// One unit of work: an input image and where its two outputs go
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageJob {
    /// Position in the image list (submission order)
    pub index: usize,

    /// Input image path, as listed
    pub input: PathBuf,

    /// Derived reflectance output path
    pub reflectance: PathBuf,

    /// Derived shading output path
    pub shading: PathBuf,
}

impl ImageJob {
    pub fn new(index: usize, input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        Self {
            index,
            reflectance: derive_output_path(&input, REFLECTANCE_SUFFIX),
            shading: derive_output_path(&input, SHADING_SUFFIX),
            input,
        }
    }
}

/// Strip the final extension from `input` and append `suffix`
///
/// `photos/a.png` with `-r.png` becomes `photos/a-r.png`; `a.tar.gz` becomes
/// `a.tar-r.png`; a path without extension keeps its full name.
#[must_use]
pub fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(suffix);

    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Turn image-list contents into jobs, one per non-empty entry, in order
#[must_use]
pub fn parse_image_list(contents: &str) -> Vec<ImageJob> {
    contents
        .split_whitespace()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| ImageJob::new(index, entry))
        .collect()
}

/// Read an image list and enumerate its jobs
///
/// Fails before producing any job if the list cannot be read.
pub fn enumerate_jobs<P: AsRef<Path>>(list_path: P) -> Result<Vec<ImageJob>, BatchError> {
    let list_path = list_path.as_ref();
    let contents =
        std::fs::read_to_string(list_path).map_err(|source| BatchError::ImageList {
            path: list_path.to_path_buf(),
            source,
        })?;

    let jobs = parse_image_list(&contents);
    info!("{} files detected!", jobs.len());
    Ok(jobs)
}

/// A job that would touch a file an earlier job already reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCollision {
    /// Index of the rejected job
    pub index: usize,

    /// The contested path, as this job spells it
    pub path: PathBuf,

    /// Input of the earlier job that claimed the path
    pub owner: PathBuf,
}

/// Find jobs whose files clash with an earlier job
///
/// Jobs are claimed in list order. A job is rejected when one of its outputs,
/// or its input, matches a path an earlier accepted job reads or writes.
/// Rejected jobs claim nothing, so only the later job of each pair fails.
/// Paths are compared after lexical normalization (`./a.png` is `a.png`).
#[must_use]
pub fn find_output_collisions(jobs: &[ImageJob]) -> Vec<OutputCollision> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::with_capacity(jobs.len() * 3);
    let mut collisions = Vec::new();

    for job in jobs {
        let paths = [&job.reflectance, &job.shading, &job.input];
        let keys: Vec<PathBuf> = paths.iter().map(|p| normalize_path(&cwd, p)).collect();

        let clash = paths
            .iter()
            .zip(&keys)
            .find_map(|(path, key)| claimed.get(key).map(|owner| (*path, *owner)));

        match clash {
            Some((path, owner)) => collisions.push(OutputCollision {
                index: job.index,
                path: path.clone(),
                owner: owner.to_path_buf(),
            }),
            None => {
                for key in keys {
                    claimed.insert(key, job.input.as_path());
                }
            }
        }
    }

    collisions
}

/// Absolute form of `path` with `.` and `..` resolved without touching the
/// filesystem
fn normalize_path(cwd: &Path, path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in cwd.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
