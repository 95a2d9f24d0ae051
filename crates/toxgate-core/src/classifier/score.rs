//! Label/score output and toxicity verdict derivation.

use serde::{Deserialize, Serialize};

/// Label the model attaches to its toxicity head.
pub const TOXIC_LABEL: &str = "toxic";

/// Score above which a message is labeled toxic (strict inequality;
/// exactly 0.5 is non-toxic).
pub const TOXIC_THRESHOLD: f32 = 0.5;

/// A single label/score pair from classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// The label name (e.g. "toxic").
    pub label: String,
    /// Confidence score (0.0 to 1.0).
    pub score: f32,
}

impl LabelScore {
    /// Creates a new label/score pair, clamping the score to [0, 1].
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// Binary toxicity verdict attached to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Score exceeded the toxicity threshold.
    Toxic,
    /// Score at or below the toxicity threshold.
    NonToxic,
}

impl Verdict {
    /// Returns the wire name of this verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Toxic => "toxic",
            Verdict::NonToxic => "non-toxic",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Toxicity read-out extracted from a raw classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct ToxicityReading {
    /// Score of the "toxic" label (0.0 if the model emitted none).
    pub score: f32,
    /// Classification duration in microseconds.
    pub duration_us: u64,
}

impl ToxicityReading {
    /// Extracts the toxicity score from an ordered classifier output.
    ///
    /// Scans in order and takes the first entry labeled "toxic" (exact,
    /// case-sensitive match). Later "toxic" entries are ignored even if
    /// they carry a higher score; a well-formed model emits at most one.
    pub fn from_output(output: &[LabelScore], duration_us: u64) -> Self {
        let score = output
            .iter()
            .find(|entry| entry.label == TOXIC_LABEL)
            .map(|entry| entry.score)
            .unwrap_or(0.0);

        Self { score, duration_us }
    }

    /// Returns true if the score exceeds the toxicity threshold.
    pub fn is_toxic(&self) -> bool {
        self.score > TOXIC_THRESHOLD
    }

    /// Derives the binary verdict for this reading.
    pub fn verdict(&self) -> Verdict {
        if self.is_toxic() {
            Verdict::Toxic
        } else {
            Verdict::NonToxic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_score_clamps_score() {
        let entry = LabelScore::new("toxic", 1.5);
        assert_eq!(entry.score, 1.0);

        let entry = LabelScore::new("toxic", -0.5);
        assert_eq!(entry.score, 0.0);
    }

    #[test]
    fn reading_takes_toxic_entry_score() {
        let output = vec![
            LabelScore::new("obscene", 0.2),
            LabelScore::new("toxic", 0.87),
        ];
        let reading = ToxicityReading::from_output(&output, 100);
        assert!((reading.score - 0.87).abs() < 0.001);
        assert_eq!(reading.verdict(), Verdict::Toxic);
    }

    #[test]
    fn reading_defaults_to_zero_without_toxic_entry() {
        let output = vec![LabelScore::new("non-toxic", 0.95)];
        let reading = ToxicityReading::from_output(&output, 100);
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.verdict(), Verdict::NonToxic);
    }

    #[test]
    fn reading_uses_first_toxic_entry() {
        let output = vec![
            LabelScore::new("toxic", 0.25),
            LabelScore::new("toxic", 0.75),
        ];
        let reading = ToxicityReading::from_output(&output, 100);
        assert_eq!(reading.score, 0.25);
        assert_eq!(reading.verdict(), Verdict::NonToxic);
    }

    #[test]
    fn reading_matches_label_case_sensitively() {
        let output = vec![LabelScore::new("Toxic", 0.9)];
        let reading = ToxicityReading::from_output(&output, 100);
        assert_eq!(reading.score, 0.0);
    }

    #[test]
    fn threshold_is_strict() {
        let reading = ToxicityReading {
            score: 0.5,
            duration_us: 100,
        };
        assert!(!reading.is_toxic());
        assert_eq!(reading.verdict(), Verdict::NonToxic);

        let reading = ToxicityReading {
            score: 0.51,
            duration_us: 100,
        };
        assert!(reading.is_toxic());
        assert_eq!(reading.verdict(), Verdict::Toxic);
    }

    #[test]
    fn empty_output_is_non_toxic() {
        let reading = ToxicityReading::from_output(&[], 100);
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.verdict(), Verdict::NonToxic);
    }

    #[test]
    fn verdict_serializes_to_wire_names() {
        assert_eq!(serde_json::to_string(&Verdict::Toxic).unwrap(), "\"toxic\"");
        assert_eq!(
            serde_json::to_string(&Verdict::NonToxic).unwrap(),
            "\"non-toxic\""
        );
    }

    #[test]
    fn verdict_display_matches_wire_names() {
        assert_eq!(Verdict::Toxic.to_string(), "toxic");
        assert_eq!(Verdict::NonToxic.to_string(), "non-toxic");
    }
}
