use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dream_journal::client::ApiClient;
use dream_journal::config::{Cli, Command};
use dream_journal::dream_state::{storage_key, DreamStore};
use dream_journal::server::{self, Profile};
use dream_journal::session::{SessionRegistry, SessionStatus, SessionUser};
use dream_journal::storage::FileStorage;
use dream_journal::ui::{Action, JournalView, UI};

const TICK: Duration = Duration::from_millis(250);

enum Update {
    Session(SessionStatus),
    Profile(Profile),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::Serve { addr, sessions }) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
            let registry = SessionRegistry::from_file(sessions)?;
            server::serve(*addr, registry).await
        }
        None => run_journal(&cli).await,
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

// The TUI owns the terminal, so logs go to a file beside the journal.
fn init_file_logging(data_dir: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(data_dir.join("journal.log"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_journal(cli: &Cli) -> Result<()> {
    let data_dir = cli.data_dir()?;
    let storage = FileStorage::open(&data_dir)?;
    init_file_logging(&data_dir)?;
    info!(data_dir = %data_dir.display(), "starting dream journal");

    let client = ApiClient::with_timeout(
        cli.api_url.clone(),
        cli.session_token.clone(),
        Duration::from_secs(cli.request_timeout),
    )?;
    let (tx, mut updates) = mpsc::unbounded_channel();
    {
        let client = client.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let status = client.session().await.unwrap_or_else(|e| {
                warn!(error = %e, "session check failed");
                SessionStatus::Unauthenticated
            });
            let _ = tx.send(Update::Session(status));
        });
    }

    let mut ui = UI::new()?;
    let user = match wait_for_session(&mut ui, &mut updates)? {
        Some(user) => user,
        None => return Ok(()),
    };

    let key = storage_key(cli.isolate_users.then_some(user.email.as_str()));
    let mut store = DreamStore::load(storage, key);
    info!(key = store.key(), count = store.entries().len(), "journal ready");

    {
        let client = client.clone();
        tokio::spawn(async move {
            match client.profile().await {
                Ok(profile) => {
                    let _ = tx.send(Update::Profile(profile));
                }
                Err(e) => warn!(error = %e, "failed to fetch protected data"),
            }
        });
    }

    let mut view = JournalView::new(user);
    let signed_out = loop {
        while let Ok(update) = updates.try_recv() {
            if let Update::Profile(profile) = update {
                view.set_protected_message(profile.message);
            }
        }

        let now = Utc::now();
        ui.display(&view, &store, now)?;

        if let Some(key) = ui.next_key(TICK)? {
            match view.handle_key(key, &mut store, now) {
                Action::Continue => {}
                Action::SignOut => break true,
                Action::Quit => break false,
            }
        }
    };

    // Restore the terminal before touching the network again.
    drop(ui);
    if signed_out {
        info!("signing out");
        client.sign_out().await;
    }

    Ok(())
}

/// Shows the loading screen while the session is `Loading`. `None` means
/// the user is not signed in or gave up waiting.
fn wait_for_session(
    ui: &mut UI,
    updates: &mut UnboundedReceiver<Update>,
) -> Result<Option<SessionUser>> {
    let mut status = SessionStatus::Loading;
    loop {
        match status {
            SessionStatus::Authenticated(user) => return Ok(Some(user)),
            SessionStatus::Unauthenticated => {
                ui.display_message(
                    "Access Denied",
                    "Please sign in to access the dashboard. Press any key to exit.",
                )?;
                while ui.next_key(TICK)?.is_none() {}
                return Ok(None);
            }
            SessionStatus::Loading => {
                ui.display_message("Dream Journal", "Loading...")?;
                status = match updates.try_recv() {
                    Ok(Update::Session(resolved)) => resolved,
                    Ok(Update::Profile(_)) | Err(mpsc::error::TryRecvError::Empty) => {
                        SessionStatus::Loading
                    }
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        SessionStatus::Unauthenticated
                    }
                };
                if status == SessionStatus::Loading {
                    if let Some(key) = ui.next_key(TICK)? {
                        if key.code == crossterm::event::KeyCode::Char('q') {
                            return Ok(None);
                        }
                    }
                }
            }
        }
    }
}
