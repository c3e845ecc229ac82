use crate::config::triage::SpamConfig;
use crate::utils::text::{is_repetitive_noise, normalize};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpamReason {
    RateLimited,
    EmptyDescription,
    DescriptionTooShort,
    RepetitiveContent,
}

impl SpamReason {
    pub fn message(self) -> &'static str {
        match self {
            SpamReason::RateLimited => "Too many reports from this submitter, please wait",
            SpamReason::EmptyDescription => "Description has no readable content",
            SpamReason::DescriptionTooShort => "Description is too short to act on",
            SpamReason::RepetitiveContent => "Report looks like repeated-character noise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    Clean,
    Spam(SpamReason),
}

impl SpamVerdict {
    pub fn is_spam(self) -> bool {
        matches!(self, SpamVerdict::Spam(_))
    }
}

/// Advisory heuristics. Flagged reports are still stored for moderator review.
#[derive(Debug, Clone, Copy)]
pub struct SpamClassifier {
    config: SpamConfig,
}

impl SpamClassifier {
    pub fn new(config: SpamConfig) -> Self {
        Self { config }
    }

    /// Start of the rolling window that `recent_submissions` is counted over.
    /// Saturates at the earliest representable instant.
    pub fn window_start(&self, now: NaiveDateTime) -> NaiveDateTime {
        Duration::try_seconds(self.config.window_seconds)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(NaiveDateTime::MIN)
    }

    /// First matching rule wins. `recent_submissions` excludes the candidate itself.
    pub fn classify(&self, title: &str, description: &str, recent_submissions: u64) -> SpamVerdict {
        if recent_submissions >= self.config.max_submissions {
            return SpamVerdict::Spam(SpamReason::RateLimited);
        }

        let normalized = normalize(description);
        if normalized.is_empty() {
            return SpamVerdict::Spam(SpamReason::EmptyDescription);
        }
        if description.trim().chars().count() < self.config.min_description_chars {
            return SpamVerdict::Spam(SpamReason::DescriptionTooShort);
        }
        if is_repetitive_noise(title) || is_repetitive_noise(description) {
            return SpamVerdict::Spam(SpamReason::RepetitiveContent);
        }

        SpamVerdict::Clean
    }
}
