use memey::assets::{MemeLibrary, Resolution, SoundLibrary};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"x").unwrap();
}

#[test]
fn test_missing_roots_are_created_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let memes_root = dir.path().join("assets/memes");
    let sounds_root = dir.path().join("assets/sounds");

    let memes = MemeLibrary::load(&memes_root).unwrap();
    let sounds = SoundLibrary::load(&sounds_root).unwrap();

    assert!(memes_root.is_dir());
    assert!(sounds_root.is_dir());
    assert_eq!(memes.meme_count(), 0);
    assert!(sounds.is_empty());
    assert_eq!(memes.resolve("happy"), None);
    assert_eq!(sounds.sound_for("happy"), None);
}

#[test]
fn test_meme_scan_filters_extensions_and_lowercases_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    touch(&root.join("Happy/one.JPG"));
    touch(&root.join("Happy/two.webp"));
    touch(&root.join("Happy/notes.txt"));
    touch(&root.join("sad/cry.gif"));
    fs::create_dir_all(root.join("angry")).unwrap();
    touch(&root.join("stray.png"));

    let memes = MemeLibrary::load(root).unwrap();

    assert_eq!(memes.meme_count(), 3);
    assert_eq!(memes.bucket("happy").unwrap().len(), 2);
    // Empty buckets are kept but not advertised
    assert_eq!(memes.available_emotions(), vec!["happy", "sad"]);
}

#[test]
fn test_resolution_tiers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    touch(&root.join("happy/a.png"));
    touch(&root.join("fear/b.png"));
    touch(&root.join("surprised/c.png"));
    touch(&root.join("neutral/d.png"));
    fs::create_dir_all(root.join("sad")).unwrap();

    let memes = MemeLibrary::load(root).unwrap();

    assert_eq!(memes.resolve("HAPPY"), Some(Resolution::Exact("happy")));
    // label contains key
    assert_eq!(memes.resolve("fearful"), Some(Resolution::Partial("fear")));
    // key contains label
    assert_eq!(memes.resolve("surprise"), Some(Resolution::Partial("surprised")));
    // empty sad bucket falls through to neutral
    assert_eq!(memes.resolve("sad"), Some(Resolution::Fallback("neutral")));
    assert_eq!(memes.resolve("angry"), Some(Resolution::Fallback("neutral")));
}

#[test]
fn test_total_miss_is_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(&dir.path().join("happy/a.png"));

    let memes = MemeLibrary::load(dir.path()).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    assert_eq!(memes.resolve("angry"), None);
    assert_eq!(memes.pick("angry", &mut rng), None);
}

#[test]
fn test_pick_stays_inside_resolved_bucket() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    for name in ["a.png", "b.png", "c.png"] {
        touch(&root.join("happy").join(name));
    }
    touch(&root.join("sad/z.png"));

    let memes = MemeLibrary::load(root).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let bucket = memes.bucket("happy").unwrap().to_vec();

    for _ in 0..50 {
        let pick = memes.pick("happy", &mut rng).unwrap();
        assert!(bucket.iter().any(|p| p == pick));
    }
}

#[test]
fn test_sound_library_stems_and_partial_match() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    touch(&root.join("Happy.MP3"));
    touch(&root.join("surprise.ogg"));
    touch(&root.join("sad.wav"));
    touch(&root.join("readme.md"));

    let sounds = SoundLibrary::load(root).unwrap();

    assert_eq!(sounds.len(), 3);
    assert_eq!(sounds.sound_for("happy").unwrap().file_name().unwrap(), "Happy.MP3");
    assert_eq!(sounds.sound_for("surprised").unwrap().file_name().unwrap(), "surprise.ogg");
    assert_eq!(sounds.sound_for("angry"), None, "no neutral sound to fall back to");
}

#[test]
fn test_sound_library_neutral_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    touch(&dir.path().join("neutral.wav"));

    let sounds = SoundLibrary::load(dir.path()).unwrap();
    assert_eq!(sounds.resolve("disgusted"), Some(Resolution::Fallback("neutral")));
}
