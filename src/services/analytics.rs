use crate::error::AppResult;
use crate::models::{Category, IssueModel, IssueStatus};
use crate::services::cache::ANALYTICS_PREFIX;
use crate::services::context::TriageContext;
use crate::store::IssueFilter;
use chrono::{Datelike, NaiveDateTime};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

const CACHE_TTL_SECS: u64 = 60;
const HOTSPOT_LIMIT: usize = 10;
const UNKNOWN_LOCATION: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Overview {
    pub total: u64,
    pub new: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub resolved_today: u64,
    pub spam: u64,
    pub open_duplicates: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub total: u64,
    pub open: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyReport {
    /// `YYYY-MM`
    pub month: String,
    pub total: u64,
    pub resolved: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolutionTime {
    pub category: Category,
    pub average_hours: f64,
    pub resolved_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Hotspot {
    pub location: String,
    pub count: u64,
}

pub fn overview(issues: &[IssueModel], now: NaiveDateTime) -> Overview {
    let start_of_day = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
    let mut o = Overview {
        total: issues.len() as u64,
        new: 0,
        in_progress: 0,
        resolved: 0,
        resolved_today: 0,
        spam: 0,
        open_duplicates: 0,
    };

    for issue in issues {
        match issue.status() {
            IssueStatus::New => o.new += 1,
            IssueStatus::InProgress => o.in_progress += 1,
            IssueStatus::Resolved => {
                o.resolved += 1;
                if issue.resolved_at.is_some_and(|at| at >= start_of_day) {
                    o.resolved_today += 1;
                }
            }
        }
        if issue.is_spam {
            o.spam += 1;
        }
        if issue.duplicate_of.is_some() && issue.is_open() && !issue.is_spam {
            o.open_duplicates += 1;
        }
    }
    o
}

/// One row per category, in the fixed category order, zero counts included.
pub fn categories(issues: &[IssueModel], include_spam: bool) -> Vec<CategoryBreakdown> {
    let mut counts: HashMap<Category, (u64, u64)> = HashMap::new();
    for issue in issues.iter().filter(|i| include_spam || !i.is_spam) {
        let entry = counts.entry(issue.category()).or_default();
        entry.0 += 1;
        if issue.is_open() {
            entry.1 += 1;
        }
    }

    Category::ALL
        .iter()
        .map(|&category| {
            let (total, open) = counts.get(&category).copied().unwrap_or_default();
            CategoryBreakdown {
                category,
                total,
                open,
            }
        })
        .collect()
}

/// Chronological month buckets of `created_at`.
pub fn monthly(issues: &[IssueModel]) -> Vec<MonthlyReport> {
    let mut buckets: BTreeMap<(i32, u32), (u64, u64)> = BTreeMap::new();
    for issue in issues {
        let key = (issue.created_at.year(), issue.created_at.month());
        let entry = buckets.entry(key).or_default();
        entry.0 += 1;
        if issue.status() == IssueStatus::Resolved {
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|((year, month), (total, resolved))| MonthlyReport {
            month: format!("{:04}-{:02}", year, month),
            total,
            resolved,
        })
        .collect()
}

/// Mean hours to resolution per category; categories with no resolved issues are omitted.
pub fn resolution_times(issues: &[IssueModel]) -> Vec<ResolutionTime> {
    let mut sums: HashMap<Category, (i64, u64)> = HashMap::new();
    for issue in issues {
        if issue.status() != IssueStatus::Resolved {
            continue;
        }
        if let Some(seconds) = issue.response_time_seconds {
            let entry = sums.entry(issue.category()).or_default();
            entry.0 += seconds.max(0);
            entry.1 += 1;
        }
    }

    Category::ALL
        .iter()
        .filter_map(|&category| {
            let &(seconds, count) = sums.get(&category)?;
            Some(ResolutionTime {
                category,
                average_hours: seconds as f64 / count as f64 / 3600.0,
                resolved_count: count,
            })
        })
        .collect()
}

/// Top locations by report count, ties by name.
pub fn hotspots(issues: &[IssueModel], include_spam: bool) -> Vec<Hotspot> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for issue in issues.iter().filter(|i| include_spam || !i.is_spam) {
        let location = issue
            .location_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_LOCATION);
        *counts.entry(location.to_string()).or_default() += 1;
    }

    let mut spots: Vec<Hotspot> = counts
        .into_iter()
        .map(|(location, count)| Hotspot { location, count })
        .collect();
    spots.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));
    spots.truncate(HOTSPOT_LIMIT);
    spots
}

/// Dashboard aggregations, cached in Redis when it is available.
pub struct AnalyticsService {
    ctx: TriageContext,
}

impl AnalyticsService {
    pub fn new(ctx: TriageContext) -> Self {
        Self { ctx }
    }

    pub async fn overview(&self) -> AppResult<Overview> {
        self.cached("overview", |issues| {
            overview(issues, chrono::Utc::now().naive_utc())
        })
        .await
    }

    pub async fn categories(&self, include_spam: bool) -> AppResult<Vec<CategoryBreakdown>> {
        let key = format!("categories:{}", include_spam);
        self.cached(&key, |issues| categories(issues, include_spam))
            .await
    }

    pub async fn monthly(&self) -> AppResult<Vec<MonthlyReport>> {
        self.cached("monthly", monthly).await
    }

    pub async fn resolution_times(&self) -> AppResult<Vec<ResolutionTime>> {
        self.cached("resolution_times", resolution_times).await
    }

    pub async fn hotspots(&self, include_spam: bool) -> AppResult<Vec<Hotspot>> {
        let key = format!("hotspots:{}", include_spam);
        self.cached(&key, |issues| hotspots(issues, include_spam))
            .await
    }

    async fn cached<T, F>(&self, name: &str, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&[IssueModel]) -> T,
    {
        let key = format!("{}{}", ANALYTICS_PREFIX, name);
        if let Some(cache) = &self.ctx.cache {
            if let Some(hit) = cache.get::<T>(&key).await {
                return Ok(hit);
            }
        }

        let issues = self.ctx.store.list_issues(&IssueFilter::default()).await?;
        let value = compute(&issues);

        if let Some(cache) = &self.ctx.cache {
            cache.set(&key, &value, CACHE_TTL_SECS).await;
        }
        Ok(value)
    }
}
