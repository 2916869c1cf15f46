use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed label set the classifier reports into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgusted,
    Fearful,
    Happy,
    Sad,
    Surprised,
    Neutral,
}

impl Default for Emotion {
    fn default() -> Self {
        Self::Neutral
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion label: {0:?}")]
pub struct UnknownEmotion(pub String);

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgusted,
        Emotion::Fearful,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprised,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgusted => "disgusted",
            Self::Fearful => "fearful",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Surprised => "surprised",
            Self::Neutral => "neutral",
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Self::Neutral)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    /// Accepts both the adjective form and the noun form most face models
    /// emit (`fear`, `disgust`, `surprise`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "angry" | "anger" => Ok(Self::Angry),
            "disgusted" | "disgust" => Ok(Self::Disgusted),
            "fearful" | "fear" | "scared" => Ok(Self::Fearful),
            "happy" | "happiness" => Ok(Self::Happy),
            "sad" | "sadness" => Ok(Self::Sad),
            "surprised" | "surprise" => Ok(Self::Surprised),
            "neutral" => Ok(Self::Neutral),
            _ => Err(UnknownEmotion(s.to_string())),
        }
    }
}
