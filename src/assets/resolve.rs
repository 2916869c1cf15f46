use std::collections::BTreeMap;

pub const FALLBACK_KEY: &str = "neutral";

/// Which tier of the lookup produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Exact(&'a str),
    /// `key` contains the label or the label contains `key`.
    Partial(&'a str),
    Fallback(&'a str),
}

impl<'a> Resolution<'a> {
    pub fn key(&self) -> &'a str {
        match self {
            Resolution::Exact(k) | Resolution::Partial(k) | Resolution::Fallback(k) => k,
        }
    }
}

/// Three-tier lookup shared by every library:
///
/// 1. exact, case-insensitive (keys are stored lowercased)
/// 2. bidirectional substring, keys visited in sorted order
/// 3. the `neutral` bucket
///
/// Only entries passing `usable` are eligible at any tier. `None` means the
/// caller should skip quietly.
pub fn resolve_key<'a, V>(
    entries: &'a BTreeMap<String, V>,
    label: &str,
    usable: impl Fn(&V) -> bool,
) -> Option<Resolution<'a>> {
    let label = label.trim().to_lowercase();

    if let Some((key, _)) = entries.get_key_value(&label).filter(|(_, v)| usable(v)) {
        return Some(Resolution::Exact(key.as_str()));
    }

    if !label.is_empty() {
        let partial = entries
            .iter()
            .filter(|(key, v)| !key.is_empty() && usable(v))
            .find(|(key, _)| key.contains(label.as_str()) || label.contains(key.as_str()));
        if let Some((key, _)) = partial {
            return Some(Resolution::Partial(key.as_str()));
        }
    }

    entries
        .get_key_value(FALLBACK_KEY)
        .filter(|(_, v)| usable(v))
        .map(|(key, _)| Resolution::Fallback(key.as_str()))
}
