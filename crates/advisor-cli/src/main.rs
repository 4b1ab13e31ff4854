//! career-advisor: interview-driven career recommendations
//!
//! Gathers a profile through a short interview, then runs job search, market
//! analysis and recommendation agents over it.

mod chat;
mod commands;
mod progress;

use advisor_core::{Advisor, AdvisorConfig, Credentials};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "career-advisor")]
#[command(about = "Career recommendations from an interview and market analysis", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to advisor.toml (searched for when omitted)
    #[arg(long, global = true, env = "ADVISOR_CONFIG")]
    config: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(short, long, global = true, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Where the profile JSON is written (overrides config)
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the interview and analysis on the console (default)
    Run {
        /// Also write the markdown report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Number of interview questions
        #[arg(long)]
        max_questions: Option<usize>,
    },

    /// Start an interactive chat session
    Chat {
        /// Also write the markdown report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print a saved profile
    Profile,

    /// Write a commented default advisor.toml
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "advisor.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed arguments
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env"),
    }

    let command = cli.command.unwrap_or(Commands::Run {
        report: None,
        max_questions: None,
    });

    match command {
        Commands::InitConfig { output } => commands::init_config(&output),
        Commands::Profile => {
            let config = load_config(cli.config.as_ref(), cli.model, cli.profile, None)?;
            commands::show_profile(&config.output.profile_path)
        }
        Commands::Run {
            report,
            max_questions,
        } => {
            let config = load_config(cli.config.as_ref(), cli.model, cli.profile, max_questions)?;
            let advisor = build_advisor(&config)?;
            commands::run_batch(&advisor, report).await
        }
        Commands::Chat { report } => {
            let config = load_config(cli.config.as_ref(), cli.model, cli.profile, None)?;
            let advisor = build_advisor(&config)?;
            chat::run(&advisor, report).await
        }
    }
}

/// Defaults, then advisor.toml, then command-line overrides
fn load_config(
    path: Option<&PathBuf>,
    model: Option<String>,
    profile: Option<PathBuf>,
    max_questions: Option<usize>,
) -> Result<AdvisorConfig> {
    let mut config = match path {
        Some(path) => AdvisorConfig::load_from(path)?,
        None => AdvisorConfig::load()?,
    };

    if let Some(model) = model {
        config.llm.model = model;
    }
    if let Some(profile) = profile {
        config.output.profile_path = profile;
    }
    if let Some(max) = max_questions {
        config.interview.max_questions = max;
    }

    debug!(model = %config.llm.model, region = %config.interview.region, "Configuration loaded");
    Ok(config)
}

/// Fails fast when an API key is missing
fn build_advisor(config: &AdvisorConfig) -> Result<Advisor> {
    let credentials = Credentials::from_env()?;
    Advisor::from_config(config, &credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["career-advisor"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "career-advisor",
            "run",
            "--max-questions",
            "3",
            "--report",
            "out.md",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run {
                report,
                max_questions,
            }) => {
                assert_eq!(max_questions, Some(3));
                assert_eq!(report, Some(PathBuf::from("out.md")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("advisor.toml");
        std::fs::write(&path, "[interview]\nregion = \"India\"\ncurrency = \"INR\"\n").unwrap();

        let config = load_config(
            Some(&path),
            Some("gpt-4o".to_string()),
            Some(PathBuf::from("me.json")),
            Some(2),
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.output.profile_path, PathBuf::from("me.json"));
        assert_eq!(config.interview.max_questions, 2);
        assert_eq!(config.interview.region, "India");
    }
}
