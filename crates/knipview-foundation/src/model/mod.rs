//! Canonical result model
//!
//! Everything in here is pure schema: the analyzer adapter produces these
//! shapes, the transport carries them, and the export codec flattens them.

mod category;
mod config_info;
mod result;

pub use category::IssueCategory;
pub use config_info::{ConfigInfo, ConfigSource};
pub use result::{
    DependencyIssue, IssueCounts, KnipResult, NamedIssue, SpecifierIssue, SymbolIssue,
};
