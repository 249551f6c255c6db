//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// versed - AI poetry translation workflow daemon
#[derive(Parser)]
#[command(
    name = "vd",
    about = "Multi-stage AI poetry translation workflows",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a translation workflow to completion, streaming progress
    Translate {
        /// Poem id to translate
        #[arg(value_name = "POEM_ID")]
        poem_id: String,

        /// Target language name (e.g. "English")
        #[arg(short, long)]
        target_lang: String,

        /// Workflow mode (reasoning, non_reasoning, hybrid)
        #[arg(short, long, default_value = "hybrid")]
        mode: String,
    },

    /// List configured workflow modes and their step bindings
    Modes,

    /// List recent workflow tasks
    Tasks {
        /// Filter by status (pending, running, completed, failed, cancelled)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Manage poems in the store
    Poems {
        #[command(subcommand)]
        command: PoemCommand,
    },
}

/// Poem management subcommands
#[derive(Debug, Subcommand)]
pub enum PoemCommand {
    /// Add a poem (text from a file or stdin)
    Add {
        /// Poet name
        #[arg(long)]
        poet: String,

        /// Poem title
        #[arg(long)]
        title: String,

        /// Source language name (e.g. "Chinese")
        #[arg(long)]
        language: String,

        /// File holding the poem text; reads stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List stored poems
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_translate_args() {
        let cli = Cli::parse_from([
            "vd",
            "translate",
            "poem-123",
            "--target-lang",
            "English",
            "--mode",
            "reasoning",
        ]);
        match cli.command {
            Command::Translate {
                poem_id,
                target_lang,
                mode,
            } => {
                assert_eq!(poem_id, "poem-123");
                assert_eq!(target_lang, "English");
                assert_eq!(mode, "reasoning");
            }
            _ => panic!("expected translate command"),
        }
    }

    #[test]
    fn test_default_mode() {
        let cli = Cli::parse_from(["vd", "translate", "p", "--target-lang", "English"]);
        match cli.command {
            Command::Translate { mode, .. } => assert_eq!(mode, "hybrid"),
            _ => panic!("expected translate command"),
        }
    }
}
