//! Emotion-keyed asset libraries, scanned once at startup and read-only after.

pub mod memes;
pub mod resolve;
pub mod sounds;

pub use memes::MemeLibrary;
pub use resolve::{resolve_key, Resolution};
pub use sounds::SoundLibrary;

use std::path::{Path, PathBuf};
use tracing::warn;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to create asset root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Missing roots are created empty; that is a first run, not an error.
/// Returns `false` when the root had to be created.
pub(crate) fn ensure_root(root: &Path) -> Result<bool, AssetError> {
    if root.is_dir() {
        return Ok(true);
    }
    warn!(path = %root.display(), "asset root missing, creating it empty");
    std::fs::create_dir_all(root).map_err(|source| AssetError::CreateRoot {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(false)
}

pub(crate) fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, AssetError> {
    let scan_err = |source| AssetError::Scan { path: dir.to_path_buf(), source };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan_err)? {
        entries.push(entry.map_err(scan_err)?.path());
    }
    entries.sort();
    Ok(entries)
}
