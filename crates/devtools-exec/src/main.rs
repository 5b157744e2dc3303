//! devtools-exec binary - rewrite already generated build output

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devtools_exec::{ExecConfig, ExecFile, ExecSettings, FileRegistry, PathResolver, TracingHost};
use devtools_system_runtime::{NativeRuntime, SystemRuntime, default_runtime};

#[derive(Parser, Debug)]
#[command(name = "devtools-exec")]
#[command(version, about = "Rewrite embedded source maps of generated build output")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite and persist one generated artifact, printing its change record
    Rewrite {
        /// Exec configuration file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,

        /// Generated file to rewrite (defaults to the configured src)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Base URL of the page viewers are attached to
        #[arg(long, default_value = "http://localhost:3000")]
        client_url: String,
    },

    /// Show where a source path from a map resolves to
    Resolve {
        /// Exec configuration file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,

        /// Source path as written in the map
        source: String,
    },
}

fn load_settings(runtime: &NativeRuntime, config: &Path) -> anyhow::Result<ExecSettings> {
    let config = ExecConfig::load(runtime, config)
        .with_context(|| format!("Failed to load {}", config.display()))?;
    let cwd = runtime.cwd()?;
    Ok(ExecSettings::derive(&config.exec, &config.devtools, &cwd)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devtools_exec=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let runtime = default_runtime();

    match cli.command {
        Commands::Rewrite {
            config,
            input,
            client_url,
        } => {
            let settings = load_settings(&runtime, &config)?;
            let input = input.unwrap_or_else(|| settings.src.clone());
            let content = runtime
                .file_read_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            info!(input = %input.display(), output = %settings.output_path.display(), "Rewriting");

            let host = TracingHost::new(client_url);
            let registry = FileRegistry::new();
            let file = ExecFile::new(&settings, &runtime, &host, &registry);
            let record = file.push_file(&content)?;

            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Resolve { config, source } => {
            let settings = load_settings(&runtime, &config)?;
            let resolver =
                PathResolver::new(&runtime, &settings.root_dir, &settings.candidate_dirs());
            let resolved = resolver.resolve(&source, None)?;

            println!("{}", resolved.root_relative());
            println!("{}", resolved.absolute_path.display());
        }
    }

    Ok(())
}
