//! Expression scores and label selection

use serde::{Deserialize, Serialize};

/// Expression name -> confidence, in the provider's enumeration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expressions(Vec<(String, f32)>);

impl Expressions {
    pub fn new(scores: Vec<(String, f32)>) -> Self {
        Self(scores)
    }

    pub fn from_pairs<'a>(scores: impl IntoIterator<Item = (&'a str, f32)>) -> Self {
        Self(scores.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest-scoring expression; ties keep the earlier entry
    pub fn dominant(&self) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (name, score) in self.iter() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((name, score)),
            }
        }
        best
    }
}

/// Capitalize a provider key for display (`happy` -> `Happy`)
pub fn format_label(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Display severity of an emotion label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionSeverity {
    Danger,
    Success,
    Neutral,
}

impl EmotionSeverity {
    /// Classify a formatted label
    pub fn of(label: &str) -> Self {
        match label {
            "Sad" | "Angry" | "Fearful" => EmotionSeverity::Danger,
            "Happy" => EmotionSeverity::Success,
            _ => EmotionSeverity::Neutral,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionSeverity::Danger => "danger",
            EmotionSeverity::Success => "success",
            EmotionSeverity::Neutral => "neutral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_keeps_first_seen() {
        let expressions = Expressions::from_pairs([("happy", 0.3), ("sad", 0.3), ("angry", 0.2)]);
        assert_eq!(expressions.dominant(), Some(("happy", 0.3)));

        let reordered = Expressions::from_pairs([("sad", 0.3), ("happy", 0.3), ("angry", 0.2)]);
        assert_eq!(reordered.dominant(), Some(("sad", 0.3)));
    }

    #[test]
    fn test_strictly_greater_wins() {
        let expressions = Expressions::from_pairs([("neutral", 0.1), ("surprised", 0.7), ("happy", 0.2)]);
        assert_eq!(expressions.dominant().map(|(k, _)| k), Some("surprised"));
    }

    #[test]
    fn test_empty_has_no_dominant() {
        assert!(Expressions::default().dominant().is_none());
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label("happy"), "Happy");
        assert_eq!(format_label("Fearful"), "Fearful");
        assert_eq!(format_label(""), "");
    }

    #[test]
    fn test_severity() {
        for label in ["Sad", "Angry", "Fearful"] {
            assert_eq!(EmotionSeverity::of(label), EmotionSeverity::Danger);
        }
        assert_eq!(EmotionSeverity::of("Happy"), EmotionSeverity::Success);
        assert_eq!(EmotionSeverity::of("Surprised"), EmotionSeverity::Neutral);
        assert_eq!(EmotionSeverity::of("Neutral"), EmotionSeverity::Neutral);
    }
}
