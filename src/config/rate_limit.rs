use std::env;
use std::str::FromStr;

/// Governor quota for one route group: sustained requests per second plus burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

impl FromStr for RateLimitRule {
    type Err = String;

    /// `"<per_second>:<burst>"`, both strictly positive.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (per, burst) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw.trim()))?;
        let per_second = per
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                format!("per_second must be a positive integer, got '{}'", per.trim())
            })?;
        let burst_size = burst
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                format!("burst_size must be a positive integer, got '{}'", burst.trim())
            })?;
        Ok(Self::new(per_second, burst_size))
    }
}

/// Route groups that carry their own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGroup {
    /// Feed, detail, similarity lookups and upvote status.
    PublicRead,
    /// Report submission and upvote toggles.
    Submit,
    /// Moderation and analytics.
    Admin,
}

impl RouteGroup {
    pub const ALL: [RouteGroup; 3] = [
        RouteGroup::PublicRead,
        RouteGroup::Submit,
        RouteGroup::Admin,
    ];

    fn from_alias(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "public" | "public_read" | "read" | "feed" => Some(RouteGroup::PublicRead),
            "submit" | "submissions" | "reports" | "upvotes" => Some(RouteGroup::Submit),
            "admin" | "moderation" | "analytics" => Some(RouteGroup::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub public_read: RateLimitRule,
    pub submit: RateLimitRule,
    pub admin: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_read: RateLimitRule::new(30, 60),
            submit: RateLimitRule::new(2, 5),
            admin: RateLimitRule::new(10, 20),
        }
    }
}

impl RateLimitConfig {
    /// `RATE_LIMIT_ENABLED` toggles limiting; `RATE_LIMIT_CONFIG` overrides quotas either
    /// globally (`"10:20"`) or per group (`"submit=1:3,admin=5:10"`, `*` meaning every group).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = super::parse_bool_env("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            if let Err(err) = cfg.apply_overrides(&raw) {
                tracing::warn!("Ignoring RATE_LIMIT_CONFIG '{}': {}", raw, err);
            }
        }

        cfg
    }

    pub fn rule(&self, group: RouteGroup) -> RateLimitRule {
        match group {
            RouteGroup::PublicRead => self.public_read,
            RouteGroup::Submit => self.submit,
            RouteGroup::Admin => self.admin,
        }
    }

    fn rule_mut(&mut self, group: RouteGroup) -> &mut RateLimitRule {
        match group {
            RouteGroup::PublicRead => &mut self.public_read,
            RouteGroup::Submit => &mut self.submit,
            RouteGroup::Admin => &mut self.admin,
        }
    }

    /// All-or-nothing: a single bad entry leaves every quota untouched.
    /// Group-specific entries win over `*` regardless of their position.
    fn apply_overrides(&mut self, raw: &str) -> Result<(), String> {
        let mut overrides = parse_overrides(raw)?;
        overrides.sort_by_key(|(group, _)| group.is_some());
        for (group, rule) in overrides {
            match group {
                Some(group) => *self.rule_mut(group) = rule,
                None => {
                    for group in RouteGroup::ALL {
                        *self.rule_mut(group) = rule;
                    }
                }
            }
        }
        Ok(())
    }
}

/// `None` targets every group.
type Override = (Option<RouteGroup>, RateLimitRule);

fn parse_overrides(raw: &str) -> Result<Vec<Override>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty value".to_string());
    }
    if !raw.contains('=') {
        return Ok(vec![(None, raw.parse()?)]);
    }

    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, rule) = entry
                .split_once('=')
                .ok_or_else(|| format!("invalid entry '{}', expected group=per:burst", entry))?;
            let group = match name.trim() {
                "*" | "all" => None,
                other => Some(RouteGroup::from_alias(other).ok_or_else(|| {
                    format!("unknown group '{}', expected public, submit, admin or *", other)
                })?),
            };
            let rule: RateLimitRule = rule.parse()?;
            Ok::<Override, String>((group, rule))
        })
        .collect()
}
