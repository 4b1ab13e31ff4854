//! Interactive chat front end
//!
//! Drives a [`Session`] one turn at a time: agent work runs behind a spinner,
//! then the user is prompted for the next line.

use advisor_core::{Advisor, Session, SessionStage, Speaker, Submission};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

use crate::progress;

// ANSI colors
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Commands recognised in the chat prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlashCommand {
    Help,
    Profile,
    Quit,
}

impl SlashCommand {
    /// Known command word at the start of the line; any other line is an answer
    fn parse(input: &str) -> Option<Self> {
        let word = input.split_whitespace().next()?.to_lowercase();
        match word.as_str() {
            "/help" | "/h" | "/?" => Some(SlashCommand::Help),
            "/profile" | "/p" => Some(SlashCommand::Profile),
            "/quit" | "/exit" | "/q" => Some(SlashCommand::Quit),
            _ => None,
        }
    }
}

/// Run the interactive session until the report is shown or the user quits
pub async fn run(advisor: &Advisor, report_path: Option<PathBuf>) -> Result<()> {
    let mut session = Session::new();
    let mut rl = DefaultEditor::new()?;
    let mut shown = 0;

    print_welcome(advisor);

    loop {
        shown = render_new_messages(&session, shown);

        if session.stage() == SessionStage::Complete {
            if let Some(report) = session.report() {
                println!("\n{}\n", report.recommendation);
                if let Some(path) = &report_path {
                    report.save_markdown(path)?;
                    println!("{}✓{} Report saved to {}", GREEN, RESET, path.display());
                }
            }
            break;
        }

        if !session.awaiting_input() {
            let spinner = progress::spinner(match session.stage() {
                SessionStage::Processing => "Creating career recommendations...",
                _ => "Thinking about the next question...",
            });
            let result = session
                .advance(advisor, |stage| spinner.set_message(stage.status()))
                .await;
            spinner.finish_and_clear();
            result?;
            continue;
        }

        if session.stage() == SessionStage::Questioning {
            println!(
                "{}Questions answered: {}/{}{}",
                DIM,
                session.profile().conversation.len(),
                advisor.sequencer().max_questions(),
                RESET
            );
        }

        let prompt = match session.stage() {
            SessionStage::Initial => format!("{}message>{} ", CYAN, RESET),
            _ => format!("{}answer>{} ", CYAN, RESET),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                if let Some(command) = SlashCommand::parse(&line) {
                    if run_command(&session, command) {
                        break;
                    }
                    continue;
                }

                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.trim());
                }

                if session.submit(&line, advisor)? == Submission::Rejected {
                    println!("{}Please type a response to continue.{}", YELLOW, RESET);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}^C{}", DIM, RESET);
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}Goodbye!{}", DIM, RESET);
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Print assistant messages not yet shown; returns the new count
fn render_new_messages(session: &Session, shown: usize) -> usize {
    for message in session.messages().iter().skip(shown) {
        // user lines are already on screen from the prompt
        if message.role == Speaker::Assistant {
            println!("\n{}advisor:{} {}", GREEN, RESET, message.content);
        }
    }
    session.messages().len()
}

/// Run a command; returns true when the session should end
fn run_command(session: &Session, command: SlashCommand) -> bool {
    match command {
        SlashCommand::Help => print_help(),
        SlashCommand::Profile => match serde_json::to_string_pretty(session.profile()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}Error:{} {}", YELLOW, RESET, e),
        },
        SlashCommand::Quit => {
            println!("{}Goodbye!{}", DIM, RESET);
            return true;
        }
    }
    false
}

fn print_help() {
    println!();
    println!("{}Commands:{}", BOLD, RESET);
    println!("  {}/profile{}  Show the profile gathered so far", CYAN, RESET);
    println!("  {}/help{}     Show this help", CYAN, RESET);
    println!("  {}/quit{}     Leave the session", CYAN, RESET);
    println!();
}

fn print_welcome(advisor: &Advisor) {
    println!();
    println!(
        "{}{} Job Market Career Advisor{}",
        BOLD,
        advisor.region().name,
        RESET
    );
    println!(
        "{}Type {}/help{}{} for commands{}",
        DIM, CYAN, RESET, DIM, RESET
    );
}
