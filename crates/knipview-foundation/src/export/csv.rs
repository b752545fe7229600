//! Flat six-column table
//!
//! File and Name cells are always quoted. Specifier cells are quoted only
//! when they contain a quote, comma or newline. Dependency rows carry
//! `package.json` in the File column.

use crate::model::{
    DependencyIssue, IssueCategory, KnipResult, NamedIssue, SpecifierIssue, SymbolIssue,
};
use std::fmt::Write;

const HEADER: &str = "Category,File,Name,Line,Column,Specifier\n";
const MANIFEST: &str = "package.json";

pub fn to_csv(result: &KnipResult) -> String {
    let mut out = String::with_capacity(HEADER.len() + result.total() * 48);
    out.push_str(HEADER);

    for category in IssueCategory::ALL {
        match category {
            IssueCategory::Files => {
                for file in &result.files {
                    let _ = writeln!(out, "{},{},,,,", category, quoted(file));
                }
            }
            IssueCategory::Exports => symbol_rows(&mut out, category, &result.exports),
            IssueCategory::Types => symbol_rows(&mut out, category, &result.types),
            IssueCategory::Dependencies => dependency_rows(&mut out, category, &result.dependencies),
            IssueCategory::DevDependencies => {
                dependency_rows(&mut out, category, &result.dev_dependencies)
            }
            IssueCategory::OptionalPeerDependencies => {
                dependency_rows(&mut out, category, &result.optional_peer_dependencies)
            }
            IssueCategory::Unlisted => specifier_rows(&mut out, category, &result.unlisted),
            IssueCategory::Binaries => named_rows(&mut out, category, &result.binaries),
            IssueCategory::Unresolved => specifier_rows(&mut out, category, &result.unresolved),
            IssueCategory::Duplicates => named_rows(&mut out, category, &result.duplicates),
            IssueCategory::EnumMembers => symbol_rows(&mut out, category, &result.enum_members),
            IssueCategory::ClassMembers => symbol_rows(&mut out, category, &result.class_members),
        }
    }

    out
}

fn symbol_rows(out: &mut String, category: IssueCategory, items: &[SymbolIssue]) {
    for item in items {
        let _ = writeln!(
            out,
            "{},{},{},{},{},",
            category,
            quoted(&item.file),
            quoted(&item.name),
            item.line,
            item.col
        );
    }
}

fn dependency_rows(out: &mut String, category: IssueCategory, items: &[DependencyIssue]) {
    for item in items {
        let _ = writeln!(
            out,
            "{},{},{},{},{},",
            category,
            MANIFEST,
            quoted(&item.name),
            optional(item.line),
            optional(item.col)
        );
    }
}

fn specifier_rows(out: &mut String, category: IssueCategory, items: &[SpecifierIssue]) {
    for item in items {
        let _ = writeln!(
            out,
            "{},{},,,,{}",
            category,
            quoted(&item.file),
            escaped(&item.specifier)
        );
    }
}

fn named_rows(out: &mut String, category: IssueCategory, items: &[NamedIssue]) {
    for item in items {
        let _ = writeln!(
            out,
            "{},{},{},,,",
            category,
            quoted(&item.file),
            quoted(&item.name)
        );
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn escaped(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        quoted(value)
    } else {
        value.to_string()
    }
}

fn optional(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
