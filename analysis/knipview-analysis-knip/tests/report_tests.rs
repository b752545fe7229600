//! End-to-end normalization of a realistic knip JSON report

use async_trait::async_trait;
use knipview_analysis_knip::{parse_output, Analyzer};
use knipview_foundation::{IssueCategory, KnipResult, KnipviewResult, SymbolIssue};
use pretty_assertions::assert_eq;
use std::path::Path;

const REPORT: &str = r#"{
  "files": ["src/legacy/old.ts", "scripts/unused.js"],
  "issues": [
    {
      "file": "package.json",
      "dependencies": [{"name": "lodash", "line": 12, "col": 6, "pos": 301}],
      "devDependencies": ["@types/lodash"],
      "optionalPeerDependencies": [],
      "unlisted": [],
      "binaries": ["tsx"],
      "unresolved": [],
      "exports": [],
      "types": [],
      "enumMembers": {},
      "classMembers": {},
      "duplicates": []
    },
    {
      "file": "src/utils.ts",
      "dependencies": [],
      "devDependencies": [],
      "unlisted": [{"name": "chalk", "line": 1, "col": 19}],
      "unresolved": [{"name": "./missing", "line": 2, "col": 20}],
      "exports": [{"name": "formatDate", "line": 10, "col": 17, "pos": 220}],
      "types": [{"name": "DateFormat", "line": 3, "col": 13, "pos": 40}],
      "enumMembers": {"Level": [{"name": "Verbose", "line": 30, "col": 3, "pos": 600}]},
      "classMembers": {"Cache": [{"name": "evict", "line": 44, "col": 3, "pos": 900}]},
      "duplicates": [[{"name": "formatDate"}, {"name": "default"}]]
    },
    {
      "file": "packages/web/package.json",
      "dependencies": [{"name": "lodash", "line": 8, "col": 6, "pos": 150}, "react-is"]
    }
  ]
}"#;

fn symbol(file: &str, name: &str, line: u32, col: u32) -> SymbolIssue {
    SymbolIssue {
        file: file.to_string(),
        name: name.to_string(),
        line,
        col,
    }
}

#[test]
fn test_realistic_report() {
    let result = parse_output(REPORT).unwrap();

    assert_eq!(result.files, vec!["src/legacy/old.ts", "scripts/unused.js"]);

    let dependency_names: Vec<&str> = result.dependencies.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(dependency_names, vec!["lodash", "react-is"]);
    assert_eq!(result.dependencies[0].line, Some(8));
    assert_eq!(result.dev_dependencies[0].name, "@types/lodash");

    assert_eq!(result.unlisted[0].specifier, "chalk");
    assert_eq!(result.unresolved[0].specifier, "./missing");
    assert_eq!(result.binaries[0].file, "package.json");

    assert_eq!(result.exports, vec![symbol("src/utils.ts", "formatDate", 10, 17)]);
    assert_eq!(result.types, vec![symbol("src/utils.ts", "DateFormat", 3, 13)]);
    assert_eq!(result.enum_members, vec![symbol("src/utils.ts", "Verbose", 30, 3)]);
    assert_eq!(result.class_members, vec![symbol("src/utils.ts", "evict", 44, 3)]);
    assert_eq!(result.duplicates.len(), 2);

    let counts = result.counts();
    assert_eq!(counts[&IssueCategory::Files], 2);
    assert_eq!(counts[&IssueCategory::OptionalPeerDependencies], 0);
    assert_eq!(result.total(), 14);
}

#[test]
fn test_banner_prefix_report() {
    let stdout = format!("Need to install the following packages:\nknip@5\n{}", REPORT);
    assert_eq!(parse_output(&stdout).unwrap(), parse_output(REPORT).unwrap());
}

struct CannedAnalyzer(&'static str);

#[async_trait]
impl Analyzer for CannedAnalyzer {
    async fn analyze(&self, _project_root: &Path) -> KnipviewResult<KnipResult> {
        parse_output(self.0)
    }
}

#[tokio::test]
async fn test_analyzer_trait_object() {
    let analyzer: Box<dyn Analyzer> = Box::new(CannedAnalyzer(REPORT));
    let result = analyzer.analyze(Path::new(".")).await.unwrap();
    assert!(!result.is_empty());
}
