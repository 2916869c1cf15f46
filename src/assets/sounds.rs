use super::resolve::{resolve_key, Resolution};
use super::{ensure_root, has_extension, read_dir_sorted, AssetError, AUDIO_EXTENSIONS};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// `<root>/<emotion>.{mp3,wav,ogg}`. Filename stem is the key.
#[derive(Debug, Clone, Default)]
pub struct SoundLibrary {
    root: PathBuf,
    sounds: BTreeMap<String, PathBuf>,
}

impl SoundLibrary {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, AssetError> {
        let root = root.as_ref().to_path_buf();
        let mut sounds = BTreeMap::new();

        if ensure_root(&root)? {
            for path in read_dir_sorted(&root)? {
                if !path.is_file() || !has_extension(&path, AUDIO_EXTENSIONS) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    // sorted scan: first file per stem wins (happy.mp3 over happy.wav)
                    sounds.entry(stem.to_lowercase()).or_insert(path);
                }
            }
        }

        info!(root = %root.display(), sounds = sounds.len(), "sound library loaded");
        Ok(Self { root, sounds })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, label: &str) -> Option<Resolution<'_>> {
        resolve_key(&self.sounds, label, |_| true)
    }

    pub fn sound_for(&self, label: &str) -> Option<&Path> {
        self.resolve(label)
            .and_then(|r| self.sounds.get(r.key()))
            .map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}
