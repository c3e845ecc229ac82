use crate::config::triage::PriorityWeights;
use crate::models::{Category, IssueModel};
use chrono::NaiveDateTime;

/// Recomputes the ranking score from scratch; nothing is patched incrementally.
#[derive(Debug, Clone, Copy)]
pub struct PriorityScorer {
    weights: PriorityWeights,
}

impl PriorityScorer {
    pub fn new(weights: PriorityWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, issue: &IssueModel, duplicates: u64, now: NaiveDateTime) -> f64 {
        self.score_parts(
            issue.upvotes_count,
            issue.category(),
            issue.created_at,
            duplicates,
            now,
        )
    }

    pub fn score_parts(
        &self,
        upvotes: i32,
        category: Category,
        created_at: NaiveDateTime,
        duplicates: u64,
        now: NaiveDateTime,
    ) -> f64 {
        let w = &self.weights;
        let upvotes = f64::from(upvotes.max(0));

        let score = w.upvote * upvotes.ln_1p()
            + w.category * category.severity()
            + w.age * self.age_factor(created_at, now)
            + w.duplicate * duplicates as f64;

        if score.is_finite() {
            score.max(0.0)
        } else {
            0.0
        }
    }

    /// Linear ramp from 0 at creation to 1 at the age cap, flat afterwards.
    fn age_factor(&self, created_at: NaiveDateTime, now: NaiveDateTime) -> f64 {
        let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
        age_days.min(self.weights.age_cap_days) / self.weights.age_cap_days
    }
}
