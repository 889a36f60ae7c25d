use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CONFIG_FILENAME;

/// Command-line client for the listing aggregator.
#[derive(Parser, Debug)]
#[command(name = "listing", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (RON).
    #[arg(long, global = true, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in and remember the session token.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List background tasks.
    Tasks {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one task.
    Task { id: String },
    /// Follow task progress live.
    Monitor {
        /// Stop after this many seconds.
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Refresh a single listing from its source.
    Actualize {
        object_id: String,
        /// Wait until the refresh finishes.
        #[arg(long)]
        wait: bool,
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
    /// Search sources for listings not seen before.
    FindNew {
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long = "region")]
        regions: Vec<String>,
    },
    /// Re-check active listings of a category.
    ActualizeActive {
        category: String,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Re-check archived listings of a category.
    ActualizeArchived {
        category: String,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Search listings with a filter query such as `category=house&rooms=1,2`.
    Search {
        query: Option<String>,
        /// Set one filter field, e.g. `--set priceMax=90000`.
        #[arg(long = "set", value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
        #[arg(long)]
        page: Option<u32>,
    },
    /// Show a listing with its details.
    Object { id: String },
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
    /// Show categories, regions and deal types.
    Dictionaries,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FavoritesCommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Add {
        object_id: String,
    },
    Remove {
        object_id: String,
    },
}

impl Cli {
    /// Directory holding the session file: the one containing the config.
    pub fn state_dir(&self) -> PathBuf {
        match self.config.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn search_collects_assignments() {
        let cli = Cli::try_parse_from([
            "listing",
            "search",
            "category=house",
            "--set",
            "priceMax=90000",
            "--set",
            "rooms=1,2",
            "--page",
            "2",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Search {
                query: Some("category=house".to_string()),
                assignments: vec![
                    ("priceMax".to_string(), "90000".to_string()),
                    ("rooms".to_string(), "1,2".to_string()),
                ],
                page: Some(2),
            }
        );
    }

    #[test]
    fn malformed_assignment_is_rejected() {
        assert!(Cli::try_parse_from(["listing", "search", "--set", "rooms"]).is_err());
        assert!(Cli::try_parse_from(["listing", "search", "--set", "=3"]).is_err());
    }

    #[test]
    fn find_new_accepts_repeated_flags() {
        let cli = Cli::try_parse_from([
            "listing",
            "find-new",
            "--category",
            "apartment",
            "--category",
            "house",
            "--region",
            "minsk",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::FindNew {
                categories: vec!["apartment".to_string(), "house".to_string()],
                regions: vec!["minsk".to_string()],
            }
        );
    }

    #[test]
    fn session_file_lives_next_to_config() {
        let cli = Cli::try_parse_from(["listing", "whoami"]).unwrap();
        assert_eq!(cli.state_dir(), PathBuf::from("."));

        let cli =
            Cli::try_parse_from(["listing", "--config", "/etc/listing/client.ron", "logout"])
                .unwrap();
        assert_eq!(cli.state_dir(), PathBuf::from("/etc/listing"));
    }
}
