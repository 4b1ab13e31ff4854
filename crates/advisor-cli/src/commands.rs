//! Console commands: batch run, profile display, config scaffolding

use advisor_core::session::GREETING;
use advisor_core::{Advisor, AdvisorConfig, AnswerSource, Profile, Question};
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::progress;

// ANSI colors
const GREEN: &str = "\x1b[92m";
const CYAN: &str = "\x1b[96m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Reads one answer per line, no validation
struct LineAnswers<R> {
    input: R,
}

impl<R: BufRead> LineAnswers<R> {
    fn new(input: R) -> Self {
        Self { input }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        if read == 0 {
            anyhow::bail!("Input closed before the interview finished");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<R: BufRead> AnswerSource for LineAnswers<R> {
    fn answer(&mut self, question: &Question) -> Result<String> {
        println!("\n{}{}{}", CYAN, question.text, RESET);
        print!("{}>{} ", DIM, RESET);
        io::stdout().flush()?;
        self.read_line()
    }
}

/// Interview on stdin/stdout, then print the recommendation
pub async fn run_batch(advisor: &Advisor, report_path: Option<PathBuf>) -> Result<()> {
    let stdin = io::stdin();
    let mut answers = LineAnswers::new(stdin.lock());

    println!("{}{}{}", BOLD, GREETING, RESET);
    print!("{}>{} ", DIM, RESET);
    io::stdout().flush()?;
    let description = answers.read_line()?;

    let mut profile = Profile::new(description);
    advisor.sequencer().run(&mut profile, &mut answers).await?;

    profile.save(advisor.profile_path())?;
    println!(
        "\n{}✓{} Profile saved to {}",
        GREEN,
        RESET,
        advisor.profile_path().display()
    );

    let spinner = progress::spinner("Starting the career analysis process...");
    let result = advisor
        .dispatcher()
        .dispatch_with(&profile, |stage| spinner.set_message(stage.status()))
        .await;
    spinner.finish_and_clear();
    let report = result?;

    println!("\n{}{}{}", BOLD, report.heading(), RESET);
    println!("{}", report.recommendation);

    if let Some(path) = report_path {
        report.save_markdown(&path)?;
        info!(path = %path.display(), "Report written");
        println!("\n{}✓{} Report saved to {}", GREEN, RESET, path.display());
    }

    Ok(())
}

/// Print a saved profile as JSON
pub fn show_profile(path: &Path) -> Result<()> {
    let profile = Profile::load(path)?;
    println!("{}", profile.to_json_pretty()?);
    println!(
        "{}{} questions answered, {} fields missing{}",
        DIM,
        profile.conversation.len(),
        profile.missing_fields().len(),
        RESET
    );
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    let path = AdvisorConfig::create_default(path)?;
    println!("{}✓{} Created {}", GREEN, RESET, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::ProfileField;
    use std::io::Cursor;

    #[test]
    fn test_line_answers_strip_newline_only() {
        let mut answers = LineAnswers::new(Cursor::new("  Python, SQL \r\n\nlast"));
        assert_eq!(answers.read_line().unwrap(), "  Python, SQL ");
        assert_eq!(answers.read_line().unwrap(), "");
        assert_eq!(answers.read_line().unwrap(), "last");
        assert!(answers.read_line().is_err());
    }

    #[test]
    fn test_line_answers_as_source() {
        let mut answers = LineAnswers::new(Cursor::new("250k LKR\n"));
        let question = Question {
            field: ProfileField::SalaryExpectation,
            text: "What salary do you expect?".to_string(),
        };
        assert_eq!(answers.answer(&question).unwrap(), "250k LKR");
    }

    #[test]
    fn test_init_config_and_show_profile() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("advisor.toml");
        init_config(&config_path).unwrap();
        assert!(config_path.exists());
        assert!(init_config(&config_path).is_err());

        let profile_path = dir.path().join("user_profile.json");
        Profile::new("tester").save(&profile_path).unwrap();
        show_profile(&profile_path).unwrap();
        assert!(show_profile(&dir.path().join("missing.json")).is_err());
    }
}
