use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "playlog")]
#[command(version)]
#[command(about = "Steam playtime snapshots and inferred play sessions")]
pub struct Cli {
    /// Config file (defaults to config.toml in the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter config to the data directory
    Init,

    /// Poll the configured players and store changed snapshots
    Collect {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Write inferred sessions to a JSON file
    Export {
        /// Output file (defaults to [export] output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only these subjects (repeatable; defaults to all stored)
        #[arg(short, long = "subject")]
        subjects: Vec<String>,
    },

    /// Print inferred sessions for one subject
    Sessions {
        #[arg(short, long)]
        subject: String,

        /// Keep only the most recent N sessions (0 keeps all)
        #[arg(short, long, default_value_t = playlog_core::DEFAULT_QUERY_LIMIT)]
        limit: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List subjects with stored snapshots
    Subjects,

    /// Serve the session query API
    Serve {
        /// Address to listen on (defaults to [server] bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show data directory, database and collector status
    Status,

    /// View collection run history
    History {
        /// Show statistics summary
        #[arg(long)]
        stats: bool,
    },

    /// Print version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::try_parse_from(["playlog", "version"]);
        assert!(cli.is_ok());
        assert!(matches!(cli.unwrap().command, Commands::Version));
    }

    #[test]
    fn test_cli_parse_collect_once() {
        let cli = Cli::try_parse_from(["playlog", "collect", "--once"]).unwrap();
        assert!(matches!(cli.command, Commands::Collect { once: true }));

        let cli = Cli::try_parse_from(["playlog", "collect"]).unwrap();
        assert!(matches!(cli.command, Commands::Collect { once: false }));
    }

    #[test]
    fn test_cli_parse_export_subjects() {
        let cli = Cli::try_parse_from([
            "playlog", "export", "-o", "out.json", "--subject", "a", "--subject", "b",
        ])
        .unwrap();
        if let Commands::Export { output, subjects } = cli.command {
            assert_eq!(output, Some(PathBuf::from("out.json")));
            assert_eq!(subjects, vec!["a".to_string(), "b".to_string()]);
        } else {
            panic!("Expected Export command");
        }
    }

    #[test]
    fn test_cli_parse_sessions_defaults() {
        let cli = Cli::try_parse_from(["playlog", "sessions", "--subject", "765"]).unwrap();
        if let Commands::Sessions {
            subject,
            limit,
            json,
        } = cli.command
        {
            assert_eq!(subject, "765");
            assert_eq!(limit, 2000);
            assert!(!json);
        } else {
            panic!("Expected Sessions command");
        }

        assert!(Cli::try_parse_from(["playlog", "sessions"]).is_err());
    }

    #[test]
    fn test_cli_global_config() {
        let cli = Cli::try_parse_from(["playlog", "status", "--config", "/tmp/p.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::Status));
    }
}
