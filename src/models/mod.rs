pub mod category;
pub mod issue;
pub mod issue_upvote;
pub mod status;

pub use category::Category;
pub use issue::{Entity as Issue, Model as IssueModel};
pub use issue_upvote::{Entity as IssueUpvote, Model as IssueUpvoteModel};
pub use status::IssueStatus;
