//! Knip analyzer adapter
//!
//! Runs the external `knip` command in a project root, captures its JSON
//! report and normalizes it into a [`KnipResult`].
//!
//! The report is heterogeneous: the same field may hold bare strings or
//! located objects, and member categories may be keyed by container. All of
//! that is decoded by the `raw` module and flattened by [`parse_output`], so
//! nothing outside this crate sees the raw shapes.
//!
//! # Example
//!
//! ```ignore
//! use knipview_analysis_knip::{Analyzer, KnipRunner};
//! use knipview_config::AnalyzerConfig;
//! use std::path::Path;
//!
//! let runner = KnipRunner::new(AnalyzerConfig::default());
//! let result = runner.analyze(Path::new(".")).await?;
//! println!("{} issues", result.total());
//! ```

mod normalize;
mod raw;
mod runner;

pub use normalize::parse_output;
pub use runner::KnipRunner;

use async_trait::async_trait;
use knipview_foundation::{KnipResult, KnipviewResult};
use std::path::Path;

/// Something that can produce an analysis result for a project
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Run a full analysis of `project_root`
    async fn analyze(&self, project_root: &Path) -> KnipviewResult<KnipResult>;
}
