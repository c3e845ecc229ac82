use crate::models::{Category, IssueModel};
use crate::utils::text::TextProfile;
use serde::Serialize;
use std::cmp::Ordering;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SimilarMatch {
    pub issue_id: i32,
    pub similarity_score: f64,
    pub title: String,
}

/// Text similarity between a candidate report and existing issues.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    category_bonus: f64,
}

impl SimilarityMatcher {
    pub fn new(category_bonus: f64) -> Self {
        Self { category_bonus }
    }

    /// Score in `[0, 1]`. An empty profile on either side scores 0 and earns no bonus.
    pub fn score(&self, candidate: &TextProfile, category: Category, other: &IssueModel) -> f64 {
        let other_profile = TextProfile::new(&other.title, &other.description);
        if candidate.is_empty() || other_profile.is_empty() {
            return 0.0;
        }

        let mut score = candidate.similarity(&other_profile);
        if other.category() == category {
            score += self.category_bonus;
        }
        score.min(1.0)
    }

    /// Lazily scores the pool in its given order.
    pub fn scored<'a, I>(
        &'a self,
        candidate: &'a TextProfile,
        category: Category,
        pool: I,
    ) -> impl Iterator<Item = SimilarMatch> + 'a
    where
        I: IntoIterator<Item = &'a IssueModel>,
        I::IntoIter: 'a,
    {
        pool.into_iter().map(move |issue| SimilarMatch {
            issue_id: issue.id,
            similarity_score: self.score(candidate, category, issue),
            title: issue.title.clone(),
        })
    }

    /// Every match at or above `threshold`, best first, ties by lower id.
    pub fn rank<'a, I>(
        &self,
        candidate: &TextProfile,
        category: Category,
        pool: I,
        threshold: f64,
    ) -> Vec<SimilarMatch>
    where
        I: IntoIterator<Item = &'a IssueModel>,
    {
        let mut matches: Vec<SimilarMatch> = pool
            .into_iter()
            .map(|issue| SimilarMatch {
                issue_id: issue.id,
                similarity_score: self.score(candidate, category, issue),
                title: issue.title.clone(),
            })
            .filter(|m| m.similarity_score > 0.0 && m.similarity_score >= threshold)
            .collect();
        matches.sort_by(ranking_order);
        matches
    }
}

pub fn ranking_order(a: &SimilarMatch, b: &SimilarMatch) -> Ordering {
    b.similarity_score
        .total_cmp(&a.similarity_score)
        .then(a.issue_id.cmp(&b.issue_id))
}
