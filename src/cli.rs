//! CLI definitions for webpilot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// webpilot CLI.
#[derive(Parser)]
#[command(name = "webpilot")]
#[command(about = "Browser workflow engine with self-healing selectors")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.webpilot/config.toml when present)
    #[arg(short, long, global = true, env = "WEBPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the HTTP server in foreground (default)
    Run {
        /// Server host, overriding the configuration
        #[arg(long)]
        host: Option<String>,

        /// Server port, overriding the configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// Check a workflow file for structural errors
    Validate {
        /// Workflow JSON file
        workflow: PathBuf,
    },

    /// Classify an error message against a workflow
    Analyze {
        /// Workflow JSON file
        workflow: PathBuf,

        /// Error message reported by the failed run
        #[arg(short, long)]
        error: String,

        /// Node that was executing when the run failed
        #[arg(long)]
        node: Option<String>,

        /// Saved page HTML to infer replacement selectors from
        #[arg(long, requires = "url")]
        dom: Option<PathBuf>,

        /// URL the saved page was captured from
        #[arg(long)]
        url: Option<String>,
    },

    /// Repair a workflow for an error message and print the report
    Fix {
        /// Workflow JSON file
        workflow: PathBuf,

        /// Error message reported by the failed run
        #[arg(short, long)]
        error: String,

        /// Saved page HTML for DOM-based repair
        #[arg(long, requires = "url")]
        dom: Option<PathBuf>,

        /// URL the saved page was captured from
        #[arg(long)]
        url: Option<String>,

        /// Write the repaired workflow here instead of printing the report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_no_command() {
        let cli = Cli::try_parse_from(["webpilot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from([
            "webpilot", "analyze", "wf.json", "--error", "Element not found: #go", "--node", "c",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Analyze { workflow, error, node, dom, .. }) => {
                assert_eq!(workflow, PathBuf::from("wf.json"));
                assert_eq!(error, "Element not found: #go");
                assert_eq!(node.as_deref(), Some("c"));
                assert!(dom.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_dom_requires_url() {
        assert!(Cli::try_parse_from([
            "webpilot", "fix", "wf.json", "--error", "x", "--dom", "page.html",
        ])
        .is_err());
    }
}
