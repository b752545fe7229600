//! Analyzer configuration detection

use knipview_foundation::{ConfigInfo, ConfigSource};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Probe `project_root` for knip configuration
///
/// Checks `knip.json`, then `knip.jsonc`, then a truthy `knip` key in
/// `package.json`. An unreadable or malformed manifest counts as no
/// configuration.
pub async fn detect_config(project_root: &Path) -> ConfigInfo {
    for source in ConfigSource::PRIORITY {
        let path = project_root.join(source.file_name());
        let found = match source {
            ConfigSource::PackageJson => manifest_has_knip_key(&path).await,
            _ => tokio::fs::try_exists(&path).await.unwrap_or(false),
        };
        if found {
            debug!(source = source.file_name(), "Detected knip configuration");
            return ConfigInfo::found(source);
        }
    }
    ConfigInfo::missing()
}

async fn manifest_has_knip_key(path: &Path) -> bool {
    let Ok(text) = tokio::fs::read_to_string(path).await else {
        return false;
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(manifest) => manifest.get("knip").is_some_and(is_truthy),
        Err(e) => {
            debug!(error = %e, "Ignoring malformed package.json");
            false
        }
    }
}

/// JavaScript truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    #[tokio::test]
    async fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_config(dir.path()).await, ConfigInfo::missing());
    }

    #[tokio::test]
    async fn test_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"knip":{"entry":["a.ts"]}}"#).unwrap();
        assert_eq!(
            detect_config(dir.path()).await,
            ConfigInfo::found(ConfigSource::PackageJson)
        );

        fs::write(dir.path().join("knip.jsonc"), "{ // comment\n}").unwrap();
        assert_eq!(
            detect_config(dir.path()).await,
            ConfigInfo::found(ConfigSource::KnipJsonc)
        );

        fs::write(dir.path().join("knip.json"), "{}").unwrap();
        assert_eq!(
            detect_config(dir.path()).await,
            ConfigInfo::found(ConfigSource::KnipJson)
        );
    }

    #[tokio::test]
    async fn test_falsy_or_malformed_manifest_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");

        fs::write(&manifest, r#"{"name":"app","knip":false}"#).unwrap();
        assert!(!detect_config(dir.path()).await.exists);

        fs::write(&manifest, r#"{"name":"app"}"#).unwrap();
        assert!(!detect_config(dir.path()).await.exists);

        fs::write(&manifest, "{ not json").unwrap();
        assert!(!detect_config(dir.path()).await.exists);
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("knip.config.ts")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }
}
