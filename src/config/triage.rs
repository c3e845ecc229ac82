use std::env;
use std::str::FromStr;

/// Duplicate detection tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupConfig {
    pub radius_meters: f64,
    pub similarity_threshold: f64,
    pub category_bonus: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            radius_meters: 150.0,
            similarity_threshold: 0.6,
            category_bonus: 0.15,
        }
    }
}

/// Weights of the priority formula
/// `w_up*ln(1+upvotes) + w_cat*severity + w_age*ramp(age) + w_dup*duplicates`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityWeights {
    pub upvote: f64,
    pub category: f64,
    pub age: f64,
    pub duplicate: f64,
    pub age_cap_days: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            upvote: 10.0,
            category: 1.0,
            age: 5.0,
            duplicate: 3.0,
            age_cap_days: 30.0,
        }
    }
}

/// Longest accepted rolling window for the submission rate rule (30 days).
pub const MAX_SPAM_WINDOW_SECONDS: i64 = 30 * 86_400;

/// Spam heuristics tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpamConfig {
    pub window_seconds: i64,
    pub max_submissions: u64,
    pub min_description_chars: usize,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            window_seconds: 600,
            max_submissions: 5,
            min_description_chars: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TriageConfig {
    pub dedup: DedupConfig,
    pub priority: PriorityWeights,
    pub spam: SpamConfig,
}

impl TriageConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self::from_lookup(|key| env::var(key).ok(), d)
    }

    fn from_lookup<F>(lookup: F, d: Self) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let dedup = DedupConfig {
            radius_meters: read(&lookup, "DEDUP_RADIUS_METERS", d.dedup.radius_meters, |v| {
                v.is_finite() && *v > 0.0
            }),
            similarity_threshold: read(
                &lookup,
                "DEDUP_SIMILARITY_THRESHOLD",
                d.dedup.similarity_threshold,
                unit_interval,
            ),
            category_bonus: read(
                &lookup,
                "DEDUP_CATEGORY_BONUS",
                d.dedup.category_bonus,
                unit_interval,
            ),
        };

        let priority = PriorityWeights {
            upvote: read(&lookup, "PRIORITY_UPVOTE_WEIGHT", d.priority.upvote, non_negative),
            category: read(&lookup, "PRIORITY_CATEGORY_WEIGHT", d.priority.category, non_negative),
            age: read(&lookup, "PRIORITY_AGE_WEIGHT", d.priority.age, non_negative),
            duplicate: read(
                &lookup,
                "PRIORITY_DUPLICATE_WEIGHT",
                d.priority.duplicate,
                non_negative,
            ),
            age_cap_days: read(&lookup, "PRIORITY_AGE_CAP_DAYS", d.priority.age_cap_days, |v| {
                v.is_finite() && *v > 0.0
            }),
        };

        let spam = SpamConfig {
            window_seconds: read(&lookup, "SPAM_WINDOW_SECONDS", d.spam.window_seconds, |v| {
                (1..=MAX_SPAM_WINDOW_SECONDS).contains(v)
            }),
            max_submissions: read(&lookup, "SPAM_MAX_SUBMISSIONS", d.spam.max_submissions, |v| {
                *v > 0
            }),
            min_description_chars: read(
                &lookup,
                "SPAM_MIN_DESCRIPTION_CHARS",
                d.spam.min_description_chars,
                |_| true,
            ),
        };

        Self {
            dedup,
            priority,
            spam,
        }
    }
}

fn unit_interval(v: &f64) -> bool {
    (0.0..=1.0).contains(v)
}

fn non_negative(v: &f64) -> bool {
    v.is_finite() && *v >= 0.0
}

fn read<T, F, V>(lookup: &F, key: &str, default: T, valid: V) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
    F: Fn(&str) -> Option<String>,
    V: Fn(&T) -> bool,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            tracing::warn!("Invalid {} '{}', using default {:?}", key, raw, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> TriageConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TriageConfig::from_lookup(|k| map.get(k).cloned(), TriageConfig::default())
    }

    #[test]
    fn defaults_when_nothing_set() {
        assert_eq!(from_map(&[]), TriageConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from_map(&[
            ("DEDUP_RADIUS_METERS", "300"),
            ("DEDUP_SIMILARITY_THRESHOLD", "0.75"),
            ("SPAM_MAX_SUBMISSIONS", "3"),
            ("PRIORITY_UPVOTE_WEIGHT", "2.5"),
        ]);
        assert_eq!(cfg.dedup.radius_meters, 300.0);
        assert_eq!(cfg.dedup.similarity_threshold, 0.75);
        assert_eq!(cfg.spam.max_submissions, 3);
        assert_eq!(cfg.priority.upvote, 2.5);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let cfg = from_map(&[
            ("DEDUP_RADIUS_METERS", "-5"),
            ("DEDUP_SIMILARITY_THRESHOLD", "1.5"),
            ("PRIORITY_AGE_WEIGHT", "-1"),
            ("SPAM_WINDOW_SECONDS", "soon"),
        ]);
        let d = TriageConfig::default();
        assert_eq!(cfg.dedup.radius_meters, d.dedup.radius_meters);
        assert_eq!(cfg.dedup.similarity_threshold, d.dedup.similarity_threshold);
        assert_eq!(cfg.priority.age, d.priority.age);
        assert_eq!(cfg.spam.window_seconds, d.spam.window_seconds);
    }

    #[test]
    fn spam_window_is_bounded() {
        let cfg = from_map(&[("SPAM_WINDOW_SECONDS", "10000000000000")]);
        assert_eq!(cfg.spam.window_seconds, SpamConfig::default().window_seconds);

        let cfg = from_map(&[("SPAM_WINDOW_SECONDS", "2592000")]);
        assert_eq!(cfg.spam.window_seconds, MAX_SPAM_WINDOW_SECONDS);
    }
}
