use crate::config::triage::DedupConfig;
use crate::error::AppResult;
use crate::models::{Category, IssueModel};
use crate::services::proximity::ProximityFilter;
use crate::services::similarity::SimilarityMatcher;
use crate::store::{IssueFilter, IssueStore};
use crate::utils::geo::GeoPoint;
use crate::utils::text::TextProfile;

/// What the resolver needs to know about an incoming report.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub profile: TextProfile,
    pub category: Category,
    pub location: GeoPoint,
}

impl Candidate {
    pub fn new(title: &str, description: &str, category: Category, location: GeoPoint) -> Self {
        Self {
            profile: TextProfile::new(title, description),
            category,
            location,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Unique,
    DuplicateOf { issue_id: i32, similarity: f64 },
}

/// Geo filter first, then text scoring, then the acceptance threshold.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateResolver {
    proximity: ProximityFilter,
    matcher: SimilarityMatcher,
    threshold: f64,
}

impl DuplicateResolver {
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            proximity: ProximityFilter::new(config.radius_meters),
            matcher: SimilarityMatcher::new(config.category_bonus),
            threshold: config.similarity_threshold,
        }
    }

    /// Pure decision over an already fetched pool. Pool members that are not
    /// valid merge targets are skipped, so callers may pass a superset.
    pub fn decide(&self, candidate: &Candidate, pool: &[IssueModel]) -> Resolution {
        let mut ordered: Vec<&IssueModel> = pool.iter().filter(|i| i.is_merge_target()).collect();
        ordered.sort_by_key(|i| i.id);

        let nearby = self.proximity.filter(candidate.location, ordered);
        let mut best: Option<(i32, f64)> = None;

        for scored in self
            .matcher
            .scored(&candidate.profile, candidate.category, nearby)
        {
            // Ascending ids: only a strictly better score replaces the current best.
            if best.map_or(true, |(_, s)| scored.similarity_score > s) {
                best = Some((scored.issue_id, scored.similarity_score));
            }
            if scored.similarity_score >= 1.0 {
                break;
            }
        }

        match best {
            Some((issue_id, similarity)) if similarity > 0.0 && similarity >= self.threshold => {
                Resolution::DuplicateOf {
                    issue_id,
                    similarity,
                }
            }
            _ => Resolution::Unique,
        }
    }

    /// Fetches the merge pool and decides. A pool failure is returned to the caller,
    /// which treats the candidate as unique.
    pub async fn resolve(
        &self,
        store: &dyn IssueStore,
        candidate: &Candidate,
    ) -> AppResult<Resolution> {
        let pool = store.list_issues(&IssueFilter::merge_pool()).await?;
        let resolution = self.decide(candidate, &pool);
        tracing::debug!(
            "Duplicate check over {} pooled issues: {:?}",
            pool.len(),
            resolution
        );
        Ok(resolution)
    }
}
