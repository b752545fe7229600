//! Issue categories reported by the analyzer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of reported problem.
///
/// Declaration order is the display and serialization order used everywhere
/// (result fields, JSON export, CSV rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueCategory {
    Files,
    Exports,
    Types,
    Dependencies,
    DevDependencies,
    /// Tracked in results but never offered as a UI filter
    OptionalPeerDependencies,
    Unlisted,
    Binaries,
    Unresolved,
    Duplicates,
    EnumMembers,
    ClassMembers,
}

impl IssueCategory {
    /// Every category, in order
    pub const ALL: [IssueCategory; 12] = [
        Self::Files,
        Self::Exports,
        Self::Types,
        Self::Dependencies,
        Self::DevDependencies,
        Self::OptionalPeerDependencies,
        Self::Unlisted,
        Self::Binaries,
        Self::Unresolved,
        Self::Duplicates,
        Self::EnumMembers,
        Self::ClassMembers,
    ];

    /// Categories a UI may filter by, in display order
    pub const FILTERABLE: [IssueCategory; 11] = [
        Self::Files,
        Self::Exports,
        Self::Types,
        Self::Dependencies,
        Self::DevDependencies,
        Self::Unlisted,
        Self::Binaries,
        Self::Unresolved,
        Self::Duplicates,
        Self::EnumMembers,
        Self::ClassMembers,
    ];

    /// Identifier used on the wire and in the CSV `Category` column
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Exports => "exports",
            Self::Types => "types",
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::OptionalPeerDependencies => "optionalPeerDependencies",
            Self::Unlisted => "unlisted",
            Self::Binaries => "binaries",
            Self::Unresolved => "unresolved",
            Self::Duplicates => "duplicates",
            Self::EnumMembers => "enumMembers",
            Self::ClassMembers => "classMembers",
        }
    }

    /// Whether the category shows up in UI filters
    pub const fn is_filterable(self) -> bool {
        !matches!(self, Self::OptionalPeerDependencies)
    }

    /// Plural label for list headings
    pub const fn label(self) -> &'static str {
        match self {
            Self::Files => "Unused Files",
            Self::Exports => "Unused Exports",
            Self::Types => "Unused Types",
            Self::Dependencies => "Unused Dependencies",
            Self::DevDependencies => "Unused Dev Dependencies",
            Self::OptionalPeerDependencies => "Unused Optional Peer Dependencies",
            Self::Unlisted => "Unlisted Dependencies",
            Self::Binaries => "Unused Binaries",
            Self::Unresolved => "Unresolved Imports",
            Self::Duplicates => "Duplicate Exports",
            Self::EnumMembers => "Unused Enum Members",
            Self::ClassMembers => "Unused Class Members",
        }
    }

    /// Singular label for single item displays
    pub const fn singular_label(self) -> &'static str {
        match self {
            Self::Files => "Unused File",
            Self::Exports => "Unused Export",
            Self::Types => "Unused Type",
            Self::Dependencies => "Unused Dependency",
            Self::DevDependencies => "Unused Dev Dependency",
            Self::OptionalPeerDependencies => "Unused Optional Peer Dependency",
            Self::Unlisted => "Unlisted Dependency",
            Self::Binaries => "Unused Binary",
            Self::Unresolved => "Unresolved Import",
            Self::Duplicates => "Duplicate Export",
            Self::EnumMembers => "Unused Enum Member",
            Self::ClassMembers => "Unused Class Member",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("Unknown issue category: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_declaration_order() {
        let mut sorted = IssueCategory::ALL;
        sorted.sort();
        assert_eq!(sorted, IssueCategory::ALL);
    }

    #[test]
    fn test_filterable_excludes_optional_peers() {
        assert!(!IssueCategory::FILTERABLE.contains(&IssueCategory::OptionalPeerDependencies));
        assert!(IssueCategory::FILTERABLE
            .iter()
            .all(|category| category.is_filterable()));
        assert_eq!(IssueCategory::FILTERABLE[0], IssueCategory::Files);
        assert_eq!(IssueCategory::FILTERABLE[10], IssueCategory::ClassMembers);
    }

    #[test]
    fn test_wire_name_matches_serde() {
        for category in IssueCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
            assert_eq!(category.as_str().parse::<IssueCategory>(), Ok(category));
        }
    }

    #[test]
    fn test_unknown_category_rejected() {
        assert!("unusedThings".parse::<IssueCategory>().is_err());
    }
}
