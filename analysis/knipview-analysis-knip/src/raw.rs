//! Raw shapes of the knip JSON reporter output
//!
//! Every field is optional and every list element is decoded leniently: a
//! value of an unexpected JSON type becomes an empty contribution instead of
//! failing the whole document.

use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::Deserialize;

/// Either a well-typed `T` or anything else, which is ignored
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Lenient<T> {
    Value(T),
    Ignored(IgnoredAny),
}

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Lenient::Ignored(IgnoredAny)
    }
}

impl<T> Lenient<T> {
    pub(crate) fn into_option(self) -> Option<T> {
        match self {
            Lenient::Value(value) => Some(value),
            Lenient::Ignored(_) => None,
        }
    }
}

/// A list whose unreadable elements are dropped
pub(crate) type LenientList<T> = Lenient<Vec<Lenient<T>>>;

pub(crate) fn flatten_list<T>(list: LenientList<T>) -> impl Iterator<Item = T> {
    list.into_option()
        .unwrap_or_default()
        .into_iter()
        .filter_map(Lenient::into_option)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawOutput {
    pub files: LenientList<String>,
    pub issues: LenientList<RawIssue>,
}

/// Issues reported for one file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawIssue {
    pub file: String,
    #[serde(default)]
    pub dependencies: LenientList<RawEntry>,
    #[serde(default)]
    pub dev_dependencies: LenientList<RawEntry>,
    #[serde(default)]
    pub optional_peer_dependencies: LenientList<RawEntry>,
    #[serde(default)]
    pub unlisted: LenientList<RawEntry>,
    #[serde(default)]
    pub binaries: LenientList<RawEntry>,
    #[serde(default)]
    pub unresolved: LenientList<RawEntry>,
    #[serde(default)]
    pub exports: LenientList<RawEntry>,
    #[serde(default)]
    pub types: LenientList<RawEntry>,
    #[serde(default)]
    pub duplicates: LenientList<RawDuplicate>,
    #[serde(default)]
    pub enum_members: Lenient<RawMembers>,
    #[serde(default)]
    pub class_members: Lenient<RawMembers>,
}

/// A single reported item; offsets such as `pos` are not kept
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawEntry {
    Bare(String),
    Located {
        name: String,
        #[serde(default)]
        line: Option<u32>,
        #[serde(default)]
        col: Option<u32>,
    },
}

impl RawEntry {
    pub(crate) fn into_name(self) -> String {
        match self {
            RawEntry::Bare(name) | RawEntry::Located { name, .. } => name,
        }
    }
}

/// Duplicate exports come as groups of aliases, or occasionally as single items
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawDuplicate {
    Group(Vec<Lenient<RawEntry>>),
    Single(RawEntry),
}

/// Enum or class members
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawMembers {
    Flat(Vec<Lenient<RawEntry>>),
    ByContainer(IndexMap<String, Lenient<RawContainer>>),
}

/// Members of one enum or class
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawContainer {
    List(Vec<Lenient<RawEntry>>),
    Named(IndexMap<String, Lenient<RawPosition>>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawPosition {
    pub line: Option<u32>,
    pub col: Option<u32>,
}
