//! CLI command definitions and subcommands

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Workpilot - workflow orchestrator for a work-item tracker
#[derive(Parser)]
#[command(
    name = "wp",
    about = "Specify, plan, and execute work items against a tracking backend",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level filter (overrides config)
    #[arg(long, global = true, help = "Log level filter, e.g. debug or wp=trace")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Gather or finalize a specification for a work item
    Specify {
        /// Work item id
        item: i64,

        /// Answer to a clarifying question, as TOPIC=TEXT (repeatable)
        #[arg(short, long = "answer", value_name = "TOPIC=TEXT")]
        answers: Vec<String>,
    },

    /// Decompose a specified work item into subtasks
    Plan {
        /// Work item id
        item: i64,

        /// Approach hint, e.g. "tdd" or "spike"
        #[arg(short = 'A', long)]
        approach: Option<String>,
    },

    /// Create the planned subtasks in the backend
    Execute {
        /// Work item id
        item: i64,

        /// Preview without creating anything
        #[arg(long)]
        dry_run: bool,

        /// Creations per chunk (clamped to the configured ceiling)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Inspect or clean up workflow sessions
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// List the tools exposed to the assistant
    Tools,
}

/// Session management subcommands
#[derive(Subcommand)]
pub enum SessionCommand {
    /// List all sessions
    List,

    /// Show the session for a work item
    Show {
        /// Work item id
        item: i64,
    },

    /// Delete the session for a work item
    Delete {
        /// Work item id
        item: i64,
    },
}

/// Parse repeated `TOPIC=TEXT` answer arguments into a map. Later values for
/// the same topic win.
pub fn parse_answers(raw: &[String]) -> Result<HashMap<String, String>, String> {
    let mut answers = HashMap::new();
    for entry in raw {
        match entry.split_once('=') {
            Some((topic, text)) if !topic.trim().is_empty() => {
                answers.insert(topic.trim().to_lowercase(), text.trim().to_string());
            }
            _ => return Err(format!("Invalid answer '{entry}', expected TOPIC=TEXT")),
        }
    }
    Ok(answers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answers_splits_on_first_equals() {
        let raw = vec!["acceptance=x == y holds".to_string()];
        let answers = parse_answers(&raw).unwrap();
        assert_eq!(answers["acceptance"], "x == y holds");
    }

    #[test]
    fn test_parse_answers_lowercases_topic_and_keeps_last() {
        let raw = vec!["Scenarios=first".to_string(), "scenarios=second".to_string()];
        let answers = parse_answers(&raw).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers["scenarios"], "second");
    }

    #[test]
    fn test_parse_answers_rejects_missing_equals() {
        assert!(parse_answers(&["nope".to_string()]).is_err());
        assert!(parse_answers(&["=text".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_execute_flags() {
        let cli = Cli::try_parse_from(["wp", "execute", "42", "--dry-run", "-b", "25"]).unwrap();
        match cli.command {
            Command::Execute {
                item,
                dry_run,
                batch_size,
            } => {
                assert_eq!(item, 42);
                assert!(dry_run);
                assert_eq!(batch_size, Some(25));
            }
            _ => panic!("expected execute"),
        }
    }
}
