//! Export codec: JSON dump and flat CSV table of a [`KnipResult`]

mod csv;

pub use self::csv::to_csv;

use crate::errors::{KnipviewError, KnipviewResult};
use crate::model::KnipResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format accepted by `exportResults`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Render `result` in this format
    pub fn render(self, result: &KnipResult) -> KnipviewResult<String> {
        match self {
            Self::Json => to_json(result),
            Self::Csv => Ok(to_csv(result)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = KnipviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(KnipviewError::invalid_request(format!(
                "Unsupported export format '{}' (expected 'json' or 'csv')",
                other
            ))),
        }
    }
}

/// Pretty-printed JSON, two-space indentation
pub fn to_json(result: &KnipResult) -> KnipviewResult<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Parse a JSON export back into a result
pub fn from_json(text: &str) -> KnipviewResult<KnipResult> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DependencyIssue, SymbolIssue};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_round_trip() {
        let result = KnipResult {
            files: vec!["src/unused.ts".into()],
            exports: vec![SymbolIssue {
                file: "src/a.ts".into(),
                name: "helper".into(),
                line: 3,
                col: 14,
            }],
            dependencies: vec![DependencyIssue::named("left-pad")],
            ..KnipResult::default()
        };

        let text = to_json(&result).unwrap();
        assert_eq!(from_json(&text).unwrap(), result);
    }

    #[test]
    fn test_json_fields_follow_category_order() {
        let text = to_json(&KnipResult::empty()).unwrap();
        let files = text.find("\"files\"").unwrap();
        let dev = text.find("\"devDependencies\"").unwrap();
        let class_members = text.find("\"classMembers\"").unwrap();

        assert!(files < dev && dev < class_members);
        assert!(text.contains("\n  \"files\": []"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);

        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.kind(), "InvalidRequestError");
    }
}
