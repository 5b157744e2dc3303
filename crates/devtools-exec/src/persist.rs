/*
 * persist.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Writing rewritten artifacts and announcing them to the devtools host.
 */

//! Persistence and change notification.
//!
//! An artifact is written with its old map comments removed and the
//! rewritten comment appended, then announced to connected viewers with a
//! [`ChangeRecord`] whose `content` is exactly what was written.

use std::path::Path;

use devtools_source_map::remove_comments;
use devtools_system_runtime::SystemRuntime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ExecError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    #[default]
    Update,
}

/// How viewers should treat the changed resource.
///
/// Serialized as a single `sync` or `resourceName` key next to the other
/// record fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeTarget {
    /// Re-fetch the resource
    Sync(String),
    /// Replace the named resource with the record's content
    ResourceName(String),
}

/// Notification sent to viewers after an artifact is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub action: ChangeAction,
    pub url: String,
    #[serde(flatten)]
    pub target: ChangeTarget,
    pub event: String,
    pub content: String,
}

impl ChangeRecord {
    pub fn update(url: String, target: ChangeTarget, event: String, content: String) -> Self {
        Self {
            action: ChangeAction::Update,
            url,
            target,
            event,
            content,
        }
    }
}

/// The devtools host an exec plugin reports to.
///
/// Only [`client_page_url`](DevtoolsHost::client_page_url) and
/// [`broadcast`](DevtoolsHost::broadcast) are required; the other hooks have
/// empty defaults.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: several plugins of one host may
/// persist artifacts at the same time.
pub trait DevtoolsHost: Send + Sync {
    /// Base URL of the page viewers are attached to.
    fn client_page_url(&self) -> String;

    /// Deliver a change record to every connected viewer.
    fn broadcast(&self, record: &ChangeRecord);

    /// Called once an artifact of the plugin at `plugin_url` has been written,
    /// before its change record is broadcast.
    fn stream_finished(&self, _plugin_url: &str) {}

    /// Called when producing an artifact failed.
    fn on_error(&self, _error: &ExecError) {}
}

/// Host that only logs what it is told.
#[derive(Debug, Clone, Default)]
pub struct TracingHost {
    client_page_url: String,
}

impl TracingHost {
    pub fn new(client_page_url: impl Into<String>) -> Self {
        Self {
            client_page_url: client_page_url.into(),
        }
    }
}

impl DevtoolsHost for TracingHost {
    fn client_page_url(&self) -> String {
        self.client_page_url.clone()
    }

    fn broadcast(&self, record: &ChangeRecord) {
        info!(url = %record.url, event = %record.event, bytes = record.content.len(), "Broadcast change");
    }

    fn on_error(&self, error: &ExecError) {
        warn!(error = %error, "Artifact failed");
    }
}

/// Final artifact text: old map comments removed, `inline_comment` appended.
///
/// Without a comment the content is returned untouched.
pub fn compose_artifact(content: &str, inline_comment: &str) -> String {
    if inline_comment.is_empty() {
        return content.to_string();
    }
    let stripped = remove_comments(content);
    format!("{}\n{}", stripped.trim_end(), inline_comment)
}

/// Write an artifact, creating its directory first.
///
/// The write is atomic: concurrent readers never see a partial artifact.
pub fn write_artifact(runtime: &dyn SystemRuntime, output_path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        runtime.dir_create(parent, true)?;
    }
    runtime.file_write_atomic(output_path, content.as_bytes())?;
    info!(path = %output_path.display(), bytes = content.len(), "Persisted artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtools_system_runtime::NativeRuntime;
    use tempfile::TempDir;

    const COMMENT: &str = "//# sourceMappingURL=data:application/json;charset=utf-8;base64,e30=";

    #[test]
    fn test_compose_appends_comment() {
        assert_eq!(
            compose_artifact("console.log(1);\n", COMMENT),
            format!("console.log(1);\n{}", COMMENT)
        );
    }

    #[test]
    fn test_compose_replaces_existing_comment() {
        let content = "console.log(1);\n//# sourceMappingURL=data:application/json;base64,AAAA\n";
        let composed = compose_artifact(content, COMMENT);
        assert_eq!(composed, format!("console.log(1);\n{}", COMMENT));
        assert_eq!(composed.matches("sourceMappingURL").count(), 1);
    }

    #[test]
    fn test_compose_style_comment() {
        let comment = "/*# sourceMappingURL=data:application/json;charset=utf-8;base64,e30= */";
        let content = ".a{color:red}\n/*# sourceMappingURL=data:application/json;base64,AAAA */";
        assert_eq!(
            compose_artifact(content, comment),
            format!(".a{{color:red}}\n{}", comment)
        );
    }

    #[test]
    fn test_compose_without_comment_is_identity() {
        let content = "console.log(1);\n//# sourceMappingURL=app.js.map\n";
        assert_eq!(compose_artifact(content, ""), content);
    }

    #[test]
    fn test_write_artifact_creates_directories() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out/nested/app.js");

        write_artifact(&NativeRuntime::new(), &output, "a();").unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "a();");

        write_artifact(&NativeRuntime::new(), &output, "b();").unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "b();");
    }

    #[test]
    fn test_change_record_serialization() {
        let record = ChangeRecord::update(
            "http://localhost:8080/app.js".to_string(),
            ChangeTarget::Sync("app.js".to_string()),
            "app.js".to_string(),
            "console.log(1);".to_string(),
        );
        let json = serde_json::to_string_pretty(&record).unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "action": "update",
          "url": "http://localhost:8080/app.js",
          "sync": "app.js",
          "event": "app.js",
          "content": "console.log(1);"
        }
        "#);
    }

    #[test]
    fn test_change_record_resource_name_round_trip() {
        let record = ChangeRecord::update(
            "/page/site.css".to_string(),
            ChangeTarget::ResourceName("site.css".to_string()),
            "site.css".to_string(),
            ".a{}".to_string(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["resourceName"], "site.css");
        assert!(json.get("sync").is_none());

        let back: ChangeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_tracing_host_defaults() {
        let host = TracingHost::new("http://localhost:3000");
        assert_eq!(host.client_page_url(), "http://localhost:3000");
        host.stream_finished("app.js");
        host.on_error(&ExecError::Build("boom".to_string()));
    }
}
