use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use directories::ProjectDirs;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Parser)]
#[command(name = "dream_journal", version, about = "A personal dream journal")]
pub struct Cli {
    /// Directory holding the journal and its log file
    #[arg(long, env = "DREAM_JOURNAL_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the profile service
    #[arg(long, env = "DREAM_JOURNAL_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bearer token issued by the identity provider
    #[arg(long, env = "DREAM_JOURNAL_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Seconds before a request to the profile service is abandoned
    #[arg(long, env = "DREAM_JOURNAL_REQUEST_TIMEOUT", default_value_t = 10)]
    pub request_timeout: u64,

    /// Keep a separate journal per signed-in user
    #[arg(long)]
    pub isolate_users: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the session and profile service
    Serve {
        #[arg(long, env = "DREAM_JOURNAL_ADDR", default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// JSON file mapping session tokens to users
        #[arg(long, env = "DREAM_JOURNAL_SESSIONS")]
        sessions: PathBuf,
    },
}

impl Cli {
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("", "", "dream_journal")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| eyre!("no home directory found, pass --data-dir"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_journal_mode() {
        let cli = Cli::try_parse_from(["dream_journal", "--data-dir", "/tmp/dreams"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.api_url, DEFAULT_API_URL);
        assert!(!cli.isolate_users);
        assert_eq!(cli.request_timeout, 10);
        assert_eq!(cli.data_dir().unwrap(), PathBuf::from("/tmp/dreams"));
    }

    #[test]
    fn parses_serve() {
        let cli = Cli::try_parse_from([
            "dream_journal",
            "serve",
            "--addr",
            "0.0.0.0:8080",
            "--sessions",
            "sessions.json",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Serve { addr, sessions }) => {
                assert_eq!(addr.port(), 8080);
                assert_eq!(sessions, PathBuf::from("sessions.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_requires_sessions_file() {
        if std::env::var_os("DREAM_JOURNAL_SESSIONS").is_none() {
            assert!(Cli::try_parse_from(["dream_journal", "serve"]).is_err());
        }
    }
}
