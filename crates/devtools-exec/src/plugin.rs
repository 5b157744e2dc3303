/*
 * plugin.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The exec plugin: runs a build command and turns its output into
 * persisted, source-mapped artifacts.
 */

//! Exec plugin driver.
//!
//! [`ExecPlugin::init`] registers the plugin's target with the host's
//! [`FileRegistry`] and performs a first build. Every build run
//! ([`ExecPlugin::resolve`]) feeds the [`BuildCommand`] according to the
//! configured [`StreamMode`] and hands each artifact it produces to an
//! [`ExecFile`], which rewrites the embedded map, persists the result and
//! notifies the host.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use devtools_system_runtime::{SharedRuntime, SystemRuntime};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{DevtoolsOptions, ExecOptions, ExecSettings};
use crate::error::{ExecError, Result};
use crate::persist::{ChangeRecord, ChangeTarget, DevtoolsHost, compose_artifact, write_artifact};
use crate::registry::{FileDescriptor, FileRegistry};
use crate::rewrite::{ArtifactOwner, SourceMapRewriter};
use crate::stream::{CommandInput, StreamMode, artifact_content, read_to_stream, stream_to_content};

/// Capacity of the channel the build command writes its output to.
const OUTPUT_CHANNEL_CAPACITY: usize = 16;

/// The external command that produces artifacts.
///
/// It reads from `input` and sends what it generates on `output`. Dropping
/// `output` (returning) ends the run.
#[async_trait]
pub trait BuildCommand: Send + Sync {
    async fn run(&self, input: CommandInput, output: mpsc::Sender<Vec<u8>>) -> Result<()>;
}

/// What a build run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub records: Vec<ChangeRecord>,
    pub errors: Vec<ExecError>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// An exec plugin bound to one target.
pub struct ExecPlugin {
    settings: ExecSettings,
    runtime: SharedRuntime,
    command: Arc<dyn BuildCommand>,
}

impl ExecPlugin {
    /// Create a plugin; relative paths in the options resolve against the
    /// runtime's working directory.
    pub fn new(
        options: &ExecOptions,
        devtools: &DevtoolsOptions,
        runtime: SharedRuntime,
        command: Arc<dyn BuildCommand>,
    ) -> Result<Self> {
        let cwd = runtime.cwd()?;
        let settings = ExecSettings::derive(options, devtools, &cwd)?;
        Ok(Self::with_settings(settings, runtime, command))
    }

    pub fn with_settings(
        settings: ExecSettings,
        runtime: SharedRuntime,
        command: Arc<dyn BuildCommand>,
    ) -> Self {
        Self {
            settings,
            runtime,
            command,
        }
    }

    pub fn settings(&self) -> &ExecSettings {
        &self.settings
    }

    /// Descriptor of the plugin's own target.
    pub fn target_descriptor(&self) -> FileDescriptor {
        FileDescriptor {
            path: self.settings.src.clone(),
            url: self.settings.url.clone(),
            src: self.settings.url.clone(),
            tmp: self.settings.src.clone(),
            plugin: self.settings.url.clone(),
            output: self.settings.output_path.clone(),
        }
    }

    /// Register the target and run the first build.
    pub async fn init(&self, host: &dyn DevtoolsHost, registry: &FileRegistry) -> RunSummary {
        registry.register(self.target_descriptor());
        info!(src = %self.settings.src.display(), url = %self.settings.url, "Exec plugin registered");
        self.resolve(host, registry).await
    }

    /// Run the build command once and persist everything it produces.
    ///
    /// Failures are reported to the host and collected in the summary; a
    /// failed artifact does not stop the ones after it.
    pub async fn resolve(&self, host: &dyn DevtoolsHost, registry: &FileRegistry) -> RunSummary {
        let file = ExecFile::new(&self.settings, self.runtime.as_ref(), host, registry);
        let mut summary = RunSummary::default();

        let input = match self.settings.mode {
            StreamMode::Streamed => CommandInput::Path(self.settings.src.clone()),
            StreamMode::WholeFile => {
                match read_to_stream(self.runtime.as_ref(), &self.settings.src) {
                    Ok(rx) => CommandInput::Files(rx),
                    Err(e) => {
                        file.fail(e, &mut summary);
                        return summary;
                    }
                }
            }
        };

        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (command_result, outcomes) =
            tokio::join!(self.command.run(input, tx), file.consume(self.settings.mode, rx));

        for outcome in outcomes {
            match outcome {
                Ok(record) => summary.records.push(record),
                Err(e) => file.fail(e, &mut summary),
            }
        }
        if let Err(e) = command_result {
            file.fail(e, &mut summary);
        }

        debug!(
            url = %self.settings.url,
            artifacts = summary.records.len(),
            errors = summary.errors.len(),
            "Build run finished"
        );
        summary
    }
}

/// Per-run state for turning generated text into a persisted artifact.
pub struct ExecFile<'a> {
    settings: &'a ExecSettings,
    runtime: &'a dyn SystemRuntime,
    host: &'a dyn DevtoolsHost,
    registry: &'a FileRegistry,
}

impl<'a> ExecFile<'a> {
    pub fn new(
        settings: &'a ExecSettings,
        runtime: &'a dyn SystemRuntime,
        host: &'a dyn DevtoolsHost,
        registry: &'a FileRegistry,
    ) -> Self {
        Self {
            settings,
            runtime,
            host,
            registry,
        }
    }

    async fn consume(
        &self,
        mode: StreamMode,
        mut rx: mpsc::Receiver<Vec<u8>>,
    ) -> Vec<Result<ChangeRecord>> {
        match mode {
            StreamMode::WholeFile => {
                let mut outcomes = Vec::new();
                while let Some(bytes) = rx.recv().await {
                    let outcome = artifact_content(bytes).and_then(|content| self.push_file(&content));
                    outcomes.push(outcome);
                }
                outcomes
            }
            StreamMode::Streamed => match stream_to_content(rx).await {
                // Nothing was streamed (usually a failed command): keep the last artifact
                Ok(content) if content.is_empty() => {
                    debug!(url = %self.settings.url, "Empty stream, nothing to persist");
                    Vec::new()
                }
                Ok(content) => vec![self.push_file(&content)],
                Err(e) => vec![Err(e)],
            },
        }
    }

    fn fail(&self, error: ExecError, summary: &mut RunSummary) {
        warn!(url = %self.settings.url, error = %error, "Exec artifact failed");
        self.host.on_error(&error);
        summary.errors.push(error);
    }

    /// Rewrite, persist and announce one artifact.
    ///
    /// Files referenced by the map are registered only after the artifact
    /// has been written.
    pub fn push_file(&self, content: &str) -> Result<ChangeRecord> {
        let mut rewriter = SourceMapRewriter::with_candidates(
            self.runtime,
            &self.settings.root_dir,
            &self.settings.candidate_dirs(),
            self.owner(),
        );
        let outcome = rewriter.rewrite(content)?;

        let written = self.persist(content, &outcome.comment)?;
        let added = self.registry.register_all(outcome.registrations);
        if added > 0 {
            debug!(url = %self.settings.url, added, "Registered mapped sources");
        }

        let record = self.change_record(written);
        self.host.broadcast(&record);
        Ok(record)
    }

    /// Write the artifact and tell the host the plugin's stream is done.
    ///
    /// Returns the exact text written.
    pub fn persist(&self, content: &str, inline_comment: &str) -> Result<String> {
        let written = compose_artifact(content, inline_comment);
        write_artifact(self.runtime, &self.settings.output_path, &written)?;
        self.host.stream_finished(&self.settings.url);
        Ok(written)
    }

    fn change_record(&self, content: String) -> ChangeRecord {
        let target_path: &Path = &self.settings.src;
        let src = self.settings.url.clone();
        let target = match self.registry.take_content(target_path) {
            Some(_) => ChangeTarget::ResourceName(src.clone()),
            None => ChangeTarget::Sync(src.clone()),
        };
        let url = format!(
            "{}/{}",
            self.host.client_page_url().trim_end_matches('/'),
            self.settings.url.trim_start_matches('/')
        );
        ChangeRecord::update(url, target, src, content)
    }

    fn owner(&self) -> ArtifactOwner {
        ArtifactOwner {
            url: self.settings.url.clone(),
            tmp: self.settings.src.clone(),
            output: self.settings.output_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamMode;
    use devtools_system_runtime::NativeRuntime;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingHost {
        events: Mutex<Vec<String>>,
    }

    impl DevtoolsHost for RecordingHost {
        fn client_page_url(&self) -> String {
            "http://localhost:3000/".to_string()
        }

        fn broadcast(&self, record: &ChangeRecord) {
            self.events.lock().unwrap().push(format!("broadcast {}", record.url));
        }

        fn stream_finished(&self, plugin_url: &str) {
            self.events.lock().unwrap().push(format!("finished {}", plugin_url));
        }
    }

    fn settings(root: &Path) -> ExecSettings {
        ExecSettings {
            src: root.join("src/app.js"),
            url: "app.js".to_string(),
            root_dir: root.to_path_buf(),
            source_dir: root.join(".tmp"),
            output_path: root.join("out/app.js"),
            mode: StreamMode::WholeFile,
        }
    }

    #[test]
    fn test_push_file_finishes_stream_before_broadcast() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        let host = RecordingHost::default();
        let registry = FileRegistry::new();
        let file = ExecFile::new(&settings, &NativeRuntime, &host, &registry);

        let record = file.push_file("console.log(1);\n").unwrap();
        assert_eq!(record.url, "http://localhost:3000/app.js");
        assert_eq!(record.target, ChangeTarget::Sync("app.js".to_string()));
        assert_eq!(record.event, "app.js");
        assert_eq!(record.content, "console.log(1);\n");

        let events = host.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["finished app.js", "broadcast http://localhost:3000/app.js"]
        );
        assert_eq!(
            std::fs::read_to_string(temp.path().join("out/app.js")).unwrap(),
            "console.log(1);\n"
        );
    }

    #[test]
    fn test_transient_content_switches_target_once() {
        let temp = TempDir::new().unwrap();
        let settings = settings(temp.path());
        let host = RecordingHost::default();
        let registry = FileRegistry::new();
        registry.register(FileDescriptor {
            path: settings.src.clone(),
            url: "app.js".to_string(),
            src: "app.js".to_string(),
            tmp: settings.src.clone(),
            plugin: "app.js".to_string(),
            output: settings.output_path.clone(),
        });
        assert!(registry.attach_content(&settings.src, "edited"));

        let file = ExecFile::new(&settings, &NativeRuntime, &host, &registry);
        let first = file.push_file("a();").unwrap();
        assert_eq!(first.target, ChangeTarget::ResourceName("app.js".to_string()));

        let second = file.push_file("a();").unwrap();
        assert_eq!(second.target, ChangeTarget::Sync("app.js".to_string()));
    }

    #[test]
    fn test_target_descriptor() {
        struct Noop;

        #[async_trait]
        impl BuildCommand for Noop {
            async fn run(&self, _input: CommandInput, _output: mpsc::Sender<Vec<u8>>) -> Result<()> {
                Ok(())
            }
        }

        let settings = settings(Path::new("/project"));
        let plugin = ExecPlugin::with_settings(settings, Arc::new(NativeRuntime), Arc::new(Noop));
        let descriptor = plugin.target_descriptor();

        assert_eq!(descriptor.path, PathBuf::from("/project/src/app.js"));
        assert_eq!(descriptor.tmp, descriptor.path);
        assert_eq!(descriptor.url, "app.js");
        assert_eq!(descriptor.src, "app.js");
        assert_eq!(descriptor.plugin, "app.js");
        assert_eq!(descriptor.output, PathBuf::from("/project/out/app.js"));
    }
}
