//! Aggregate analysis result

use super::IssueCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named symbol at a 1-based source position (exports, types, members)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolIssue {
    pub file: String,
    pub name: String,
    pub line: u32,
    pub col: u32,
}

/// A dependency declared in the package manifest
///
/// The location is absent when the analyzer only reported a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyIssue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
}

impl DependencyIssue {
    /// Dependency reported by name only
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line: None,
            col: None,
        }
    }
}

/// An import or require string that is not yet resolved to a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecifierIssue {
    pub file: String,
    pub specifier: String,
}

/// A named item attributed to a file (binaries, duplicates)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedIssue {
    pub file: String,
    pub name: String,
}

/// Number of issues per category
pub type IssueCounts = BTreeMap<IssueCategory, usize>;

/// Canonical, fully-normalized aggregate of every category
///
/// Fields are declared in [`IssueCategory`] order, which fixes the JSON field
/// order. Missing fields deserialize as empty sequences so a result coming
/// back over the wire is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnipResult {
    pub files: Vec<String>,
    pub exports: Vec<SymbolIssue>,
    pub types: Vec<SymbolIssue>,
    pub dependencies: Vec<DependencyIssue>,
    pub dev_dependencies: Vec<DependencyIssue>,
    pub optional_peer_dependencies: Vec<DependencyIssue>,
    pub unlisted: Vec<SpecifierIssue>,
    pub binaries: Vec<NamedIssue>,
    pub unresolved: Vec<SpecifierIssue>,
    pub duplicates: Vec<NamedIssue>,
    pub enum_members: Vec<SymbolIssue>,
    pub class_members: Vec<SymbolIssue>,
}

impl KnipResult {
    /// Result with every category empty
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of issues in one category
    pub fn count(&self, category: IssueCategory) -> usize {
        match category {
            IssueCategory::Files => self.files.len(),
            IssueCategory::Exports => self.exports.len(),
            IssueCategory::Types => self.types.len(),
            IssueCategory::Dependencies => self.dependencies.len(),
            IssueCategory::DevDependencies => self.dev_dependencies.len(),
            IssueCategory::OptionalPeerDependencies => self.optional_peer_dependencies.len(),
            IssueCategory::Unlisted => self.unlisted.len(),
            IssueCategory::Binaries => self.binaries.len(),
            IssueCategory::Unresolved => self.unresolved.len(),
            IssueCategory::Duplicates => self.duplicates.len(),
            IssueCategory::EnumMembers => self.enum_members.len(),
            IssueCategory::ClassMembers => self.class_members.len(),
        }
    }

    /// Per-category totals, every category present
    pub fn counts(&self) -> IssueCounts {
        IssueCategory::ALL
            .into_iter()
            .map(|category| (category, self.count(category)))
            .collect()
    }

    /// Total number of issues across all categories
    pub fn total(&self) -> usize {
        IssueCategory::ALL
            .into_iter()
            .map(|category| self.count(category))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
