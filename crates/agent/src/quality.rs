use serde::{Deserialize, Serialize};

const NEAR_EMPTY_PENALTY: f32 = 0.4;
const SINGLE_TOKEN_PENALTY: f32 = 0.25;
const NOISE_PENALTY: f32 = 0.2;
const REPETITION_PENALTY: f32 = 0.15;

const NOISE_RATIO_LIMIT: f32 = 0.2;
const REPEAT_RUN_LIMIT: usize = 5;
const MAX_HINTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityLabel {
    Low,
    Medium,
    High,
}

/// Advisory legibility verdict for one input. Derived on demand, never
/// stored, and never blocks processing.
#[derive(Clone, Debug, PartialEq)]
pub struct QualityAssessment {
    pub score: f32,
    pub label: QualityLabel,
    pub needs_clarification: bool,
    pub hints: Vec<&'static str>,
}

/// Heuristic score for how legible a (usually voice-transcribed) input is.
/// Starts at 1.0 and subtracts a fixed penalty per triggered check.
#[derive(Clone, Debug, Default)]
pub struct QualityAssessor;

impl QualityAssessor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, text: &str) -> QualityAssessment {
        let raw = text.trim();
        let mut score = 1.0_f32;
        let mut hints = Vec::new();

        if raw.chars().count() < 6 {
            score -= NEAR_EMPTY_PENALTY;
            hints.push("The message is very short - add more context");
        }

        let word_count = raw.split(|ch: char| !ch.is_alphanumeric()).filter(|w| !w.is_empty()).count();
        if word_count < 2 {
            score -= SINGLE_TOKEN_PENALTY;
            hints.push("Phrase the command as a full sentence");
        }

        if noise_ratio(raw) > NOISE_RATIO_LIMIT {
            score -= NOISE_PENALTY;
            hints.push("The text is noisy - check your microphone");
        }

        if has_repeat_run(raw) {
            score -= REPETITION_PENALTY;
            hints.push("The transcription looks garbled - repeat the command");
        }

        let score = score.clamp(0.0, 1.0);
        let label = if score >= 0.75 {
            QualityLabel::High
        } else if score >= 0.5 {
            QualityLabel::Medium
        } else {
            QualityLabel::Low
        };

        hints.truncate(MAX_HINTS);
        QualityAssessment { score, label, needs_clarification: score < 0.5, hints }
    }
}

fn noise_ratio(raw: &str) -> f32 {
    if raw.is_empty() {
        return 0.0;
    }
    let total = raw.chars().count();
    let noisy = raw.chars().filter(|ch| !is_allowed_char(*ch)).count();
    noisy as f32 / total as f32
}

fn is_allowed_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch.is_whitespace() || "#+-.@,:;!?'".contains(ch)
}

fn has_repeat_run(raw: &str) -> bool {
    let mut run = 0usize;
    let mut previous: Option<char> = None;
    for ch in raw.chars() {
        if Some(ch) == previous {
            run += 1;
            if run >= REPEAT_RUN_LIMIT {
                return true;
            }
        } else {
            previous = Some(ch);
            run = 1;
        }
    }
    false
}
