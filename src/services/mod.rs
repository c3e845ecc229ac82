pub mod analytics;
pub mod cache;
pub mod context;
pub mod duplicate;
pub mod issue;
pub mod moderation;
pub mod priority;
pub mod proximity;
pub mod similarity;
pub mod spam;
pub mod upvote;

pub use analytics::AnalyticsService;
pub use cache::CacheService;
pub use context::{IssueLocks, TriageContext};
pub use issue::IssueService;
pub use moderation::ModerationService;
pub use upvote::UpvoteService;
