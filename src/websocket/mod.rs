pub mod event;
pub mod feed;
pub mod hub;

pub use event::{ChangeEvent, EntityKind, EventType, FeedMessage, ScoreDelta};
pub use hub::IssueHub;
