use super::resolve::{resolve_key, Resolution};
use super::{ensure_root, has_extension, read_dir_sorted, AssetError, IMAGE_EXTENSIONS};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// `<root>/<emotion>/*.{jpg,jpeg,png,gif,webp}`, one bucket per subdirectory.
#[derive(Debug, Clone, Default)]
pub struct MemeLibrary {
    root: PathBuf,
    buckets: BTreeMap<String, Vec<PathBuf>>,
}

impl MemeLibrary {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, AssetError> {
        let root = root.as_ref().to_path_buf();
        let mut buckets = BTreeMap::new();

        if ensure_root(&root)? {
            for dir in read_dir_sorted(&root)? {
                if !dir.is_dir() {
                    continue;
                }
                let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let emotion = name.to_lowercase();
                let memes: Vec<PathBuf> = read_dir_sorted(&dir)?
                    .into_iter()
                    .filter(|p| p.is_file() && has_extension(p, IMAGE_EXTENSIONS))
                    .collect();

                if memes.is_empty() {
                    warn!(emotion = %emotion, "no memes found");
                }
                buckets.insert(emotion, memes);
            }
        }

        let library = Self { root, buckets };
        info!(
            root = %library.root.display(),
            memes = library.meme_count(),
            emotions = library.buckets.len(),
            "meme library loaded"
        );
        Ok(library)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, label: &str) -> Option<Resolution<'_>> {
        resolve_key(&self.buckets, label, |memes| !memes.is_empty())
    }

    pub fn bucket(&self, label: &str) -> Option<&[PathBuf]> {
        self.resolve(label)
            .and_then(|r| self.buckets.get(r.key()))
            .map(Vec::as_slice)
    }

    /// Random image from the resolved bucket.
    pub fn pick<R: Rng + ?Sized>(&self, label: &str, rng: &mut R) -> Option<&Path> {
        self.bucket(label)?.choose(rng).map(PathBuf::as_path)
    }

    pub fn meme_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Labels with at least one image.
    pub fn available_emotions(&self) -> Vec<&str> {
        self.buckets
            .iter()
            .filter(|(_, memes)| !memes.is_empty())
            .map(|(emotion, _)| emotion.as_str())
            .collect()
    }
}
