// SPDX-License-Identifier: MIT OR Apache-2.0
//! Navigator - headless pipeline host
//!
//! Loads pipelines saved by the editor, executes them and writes them back.
//!
//! ```bash
//! navigator demo hello.pipeline
//! navigator run hello.pipeline --save executed.pipeline
//! navigator --settings ci.ron inspect hello.pipeline
//! ```
//!
//! Log output goes to stderr and is filtered by `RUST_LOG` when set,
//! otherwise by the `log_filter` entry of the settings file.

mod commands;

use clap::{Parser, Subcommand};
use commands::AppError;
use navigator_graph::settings::{DEFAULT_LOG_FILTER, SETTINGS_FILE_NAME};
use navigator_graph::PipelineSettings;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Command line interface
#[derive(Debug, Parser)]
#[command(name = "navigator")]
#[command(about = "Load, execute and save Navigator pipelines")]
#[command(version)]
struct Cli {
    /// Settings file, or a directory holding `navigator.ron`; defaults apply when it does not exist
    #[arg(long, global = true, default_value = SETTINGS_FILE_NAME)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        if self.settings.is_dir() {
            PipelineSettings::settings_file_path(&self.settings)
        } else {
            self.settings.clone()
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a pipeline and print what its labels and image loaders hold
    Run {
        /// Pipeline to load
        file: PathBuf,
        /// Write the executed pipeline here
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print the nodes, ports and connections of a pipeline
    Inspect {
        /// Pipeline to load
        file: PathBuf,
    },
    /// Write a sample pipeline: a text source feeding a label
    Demo {
        /// Output file
        out: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let settings = PipelineSettings::load_or_default(&cli.settings_path());

    let filter = settings
        .as_ref()
        .map_or(DEFAULT_LOG_FILTER, |s| s.log_filter.as_str());
    init_tracing(filter);

    tracing::info!("Starting Navigator v{}", env!("CARGO_PKG_VERSION"));

    let result = settings
        .map_err(AppError::from)
        .and_then(|settings| execute(cli.command, &settings));
    if let Err(e) = result {
        tracing::error!("Navigator failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{filter},navigator_app=info")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn execute(command: Command, settings: &PipelineSettings) -> Result<(), AppError> {
    let mut out = std::io::stdout().lock();
    match command {
        Command::Run { file, save } => {
            commands::run(&file, save.as_deref(), settings, &mut out)?;
        }
        Command::Inspect { file } => commands::inspect(&file, settings, &mut out)?,
        Command::Demo { out: path } => commands::demo(&path, settings, &mut out)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_parse_run_with_save() {
        let cli = Cli::try_parse_from(["navigator", "run", "a.pipeline", "--save", "b.pipeline"])
            .unwrap();
        assert_eq!(cli.settings, PathBuf::from(SETTINGS_FILE_NAME));
        let Command::Run { file, save } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(file, PathBuf::from("a.pipeline"));
        assert_eq!(save, Some(PathBuf::from("b.pipeline")));
    }

    #[test]
    fn test_settings_flag_is_global() {
        let cli =
            Cli::try_parse_from(["navigator", "inspect", "a.pipeline", "--settings", "ci.ron"])
                .unwrap();
        assert_eq!(cli.settings, PathBuf::from("ci.ron"));
        assert!(matches!(cli.command, Command::Inspect { .. }));
    }

    #[test]
    fn test_settings_directory_resolves_to_file() {
        let dir = std::env::temp_dir();
        let args: [OsString; 5] = [
            "navigator".into(),
            "--settings".into(),
            dir.clone().into_os_string(),
            "demo".into(),
            "out.pipeline".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.settings_path(), dir.join(SETTINGS_FILE_NAME));

        let cli = Cli::try_parse_from(["navigator", "--settings", "ci.ron", "demo", "x"]).unwrap();
        assert_eq!(cli.settings_path(), PathBuf::from("ci.ron"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["navigator"]).is_err());
    }
}
