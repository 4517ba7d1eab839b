pub mod error;
pub mod issue;
pub mod registry;

pub use error::{IssueError, Result};
pub use issue::{Claim, Issue, IssueId, IssueStatus};
pub use registry::IssueRegistry;
