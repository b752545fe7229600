//! Operations served over the RPC channel

use std::fmt;
use std::str::FromStr;

/// Method a client may invoke on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMethod {
    /// `runAnalysis() -> KnipResult`
    RunAnalysis,
    /// `openInEditor(file, line?, col?) -> null`
    OpenInEditor,
    /// `readFile(file) -> string`
    ReadFile,
    /// `getConfigInfo() -> ConfigInfo`
    GetConfigInfo,
    /// `exportResults("json" | "csv") -> string`
    ExportResults,
}

impl ServerMethod {
    pub const ALL: [ServerMethod; 5] = [
        Self::RunAnalysis,
        Self::OpenInEditor,
        Self::ReadFile,
        Self::GetConfigInfo,
        Self::ExportResults,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunAnalysis => "runAnalysis",
            Self::OpenInEditor => "openInEditor",
            Self::ReadFile => "readFile",
            Self::GetConfigInfo => "getConfigInfo",
            Self::ExportResults => "exportResults",
        }
    }
}

impl fmt::Display for ServerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| format!("Unknown method: {}", s))
    }
}
