pub mod admin;
pub mod analytics;
pub mod issue;
pub mod upvote;
