//! Domain types shared across polguard crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two classifiers served by polguard.
///
/// The wire keys are fixed: `"hate_speech"` and `"fake_news"`. Any other key
/// is rejected while parsing, so a `ModelKind` always names a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Polish hate-speech detection
    HateSpeech,
    /// Polish disinformation detection
    FakeNews,
}

impl ModelKind {
    /// All model kinds, in registry order
    pub const ALL: [ModelKind; 2] = [ModelKind::HateSpeech, ModelKind::FakeNews];

    /// Wire key for this model kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HateSpeech => "hate_speech",
            Self::FakeNews => "fake_news",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the recognized model keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown model type: {0}")]
pub struct ParseModelKindError(pub String);

impl FromStr for ModelKind {
    type Err = ParseModelKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hate_speech" => Ok(Self::HateSpeech),
            "fake_news" => Ok(Self::FakeNews),
            other => Err(ParseModelKindError(other.to_string())),
        }
    }
}

/// Outcome of running one text through a binary classifier and the
/// threshold rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Final label, always 0 or 1
    pub predicted_class: u8,

    /// Index of the most probable class. Informational only: the threshold
    /// rule decides `predicted_class`.
    pub argmax: usize,

    /// Probability assigned to class index 1
    pub positive_probability: f32,

    /// Full softmax distribution
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Whether the text was flagged as positive (class 1)
    pub fn is_positive(&self) -> bool {
        self.predicted_class == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_keys() {
        assert_eq!("hate_speech".parse::<ModelKind>(), Ok(ModelKind::HateSpeech));
        assert_eq!("fake_news".parse::<ModelKind>(), Ok(ModelKind::FakeNews));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Hate_Speech".parse::<ModelKind>().is_err());
        assert!(" fake_news".parse::<ModelKind>().is_err());
        assert_eq!(
            "unknown".parse::<ModelKind>(),
            Err(ParseModelKindError("unknown".to_string()))
        );
    }

    #[test]
    fn test_display_matches_wire_key() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.to_string().parse::<ModelKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_serde_uses_wire_keys() {
        let json = serde_json::to_string(&ModelKind::FakeNews).unwrap();
        assert_eq!(json, "\"fake_news\"");
        let kind: ModelKind = serde_json::from_str("\"hate_speech\"").unwrap();
        assert_eq!(kind, ModelKind::HateSpeech);
    }
}
