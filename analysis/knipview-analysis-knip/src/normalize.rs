//! Mapping of raw reporter output onto the canonical result model

use crate::raw::{
    flatten_list, Lenient, LenientList, RawContainer, RawDuplicate, RawEntry, RawMembers,
    RawOutput,
};
use indexmap::IndexMap;
use knipview_foundation::{
    DependencyIssue, KnipResult, KnipviewError, KnipviewResult, NamedIssue, SpecifierIssue,
    SymbolIssue,
};
use tracing::warn;

/// Parse the analyzer's stdout into a result
///
/// Anything before the first `{` is treated as banner noise and dropped.
pub fn parse_output(stdout: &str) -> KnipviewResult<KnipResult> {
    let trimmed = stdout.trim();
    let json = match trimmed.find('{') {
        Some(start) if start > 0 => {
            let prefix = &trimmed[..start];
            warn!(
                prefix = %prefix.chars().take(200).collect::<String>(),
                "Discarding non-JSON prefix in knip output"
            );
            &trimmed[start..]
        }
        _ => trimmed,
    };

    let raw: RawOutput =
        serde_json::from_str(json).map_err(KnipviewError::analyzer_output_parse)?;
    Ok(normalize(raw))
}

/// Flatten raw per-file issues into per-category sequences
pub(crate) fn normalize(raw: RawOutput) -> KnipResult {
    let mut result = KnipResult {
        files: flatten_list(raw.files).collect(),
        ..KnipResult::default()
    };

    let mut dependencies = DependencyMap::default();
    let mut dev_dependencies = DependencyMap::default();
    let mut optional_peer_dependencies = DependencyMap::default();

    for issue in flatten_list(raw.issues) {
        let file = issue.file;

        dependencies.extend(issue.dependencies);
        dev_dependencies.extend(issue.dev_dependencies);
        optional_peer_dependencies.extend(issue.optional_peer_dependencies);

        result
            .unlisted
            .extend(flatten_list(issue.unlisted).map(|entry| SpecifierIssue {
                file: file.clone(),
                specifier: entry.into_name(),
            }));
        result
            .binaries
            .extend(flatten_list(issue.binaries).map(|entry| NamedIssue {
                file: file.clone(),
                name: entry.into_name(),
            }));
        result
            .unresolved
            .extend(flatten_list(issue.unresolved).map(|entry| SpecifierIssue {
                file: file.clone(),
                specifier: entry.into_name(),
            }));

        result.exports.extend(symbols(&file, issue.exports));
        result.types.extend(symbols(&file, issue.types));

        for duplicate in flatten_list(issue.duplicates) {
            let entries: Vec<RawEntry> = match duplicate {
                RawDuplicate::Group(group) => {
                    group.into_iter().filter_map(Lenient::into_option).collect()
                }
                RawDuplicate::Single(entry) => vec![entry],
            };
            result
                .duplicates
                .extend(entries.into_iter().map(|entry| NamedIssue {
                    file: file.clone(),
                    name: entry.into_name(),
                }));
        }

        result.enum_members.extend(members(&file, issue.enum_members));
        result.class_members.extend(members(&file, issue.class_members));
    }

    result.dependencies = dependencies.into_issues();
    result.dev_dependencies = dev_dependencies.into_issues();
    result.optional_peer_dependencies = optional_peer_dependencies.into_issues();

    result
}

/// Name-keyed, insertion-ordered dependency accumulator
///
/// A repeated name overwrites the stored location but keeps its original slot.
#[derive(Default)]
struct DependencyMap(IndexMap<String, DependencyIssue>);

impl DependencyMap {
    fn extend(&mut self, entries: LenientList<RawEntry>) {
        for entry in flatten_list(entries) {
            let issue = match entry {
                RawEntry::Bare(name) => DependencyIssue::named(name),
                RawEntry::Located { name, line, col } => DependencyIssue { name, line, col },
            };
            self.0.insert(issue.name.clone(), issue);
        }
    }

    fn into_issues(self) -> Vec<DependencyIssue> {
        self.0.into_values().collect()
    }
}

fn symbol(file: &str, name: String, line: Option<u32>, col: Option<u32>) -> SymbolIssue {
    SymbolIssue {
        file: file.to_string(),
        name,
        line: line.unwrap_or(0),
        col: col.unwrap_or(0),
    }
}

fn entry_symbol(file: &str, entry: RawEntry) -> SymbolIssue {
    match entry {
        RawEntry::Bare(name) => symbol(file, name, None, None),
        RawEntry::Located { name, line, col } => symbol(file, name, line, col),
    }
}

fn symbols<'a>(
    file: &'a str,
    entries: LenientList<RawEntry>,
) -> impl Iterator<Item = SymbolIssue> + 'a {
    flatten_list(entries).map(move |entry| entry_symbol(file, entry))
}

fn members(file: &str, raw: Lenient<RawMembers>) -> Vec<SymbolIssue> {
    let Some(raw) = raw.into_option() else {
        return Vec::new();
    };

    match raw {
        RawMembers::Flat(entries) => entries
            .into_iter()
            .filter_map(Lenient::into_option)
            .map(|entry| entry_symbol(file, entry))
            .collect(),
        RawMembers::ByContainer(containers) => containers
            .into_values()
            .filter_map(Lenient::into_option)
            .flat_map(|container| match container {
                RawContainer::List(entries) => entries
                    .into_iter()
                    .filter_map(Lenient::into_option)
                    .map(|entry| entry_symbol(file, entry))
                    .collect::<Vec<_>>(),
                RawContainer::Named(named) => named
                    .into_iter()
                    .filter_map(|(name, position)| {
                        position
                            .into_option()
                            .map(|position| symbol(file, name, position.line, position.col))
                    })
                    .collect(),
            })
            .collect(),
    }
}
