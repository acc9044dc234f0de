mod app;
mod config;
mod countdown;
mod profile;
mod session;
mod theme;
mod ui;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use config::AppConfig;
use countdown::{EventTarget, Remaining};
use session::{FileSession, SessionProvider};

#[derive(Parser, Debug)]
#[command(name = "kigen")]
#[command(version = "0.1.0")]
#[command(about = "A terminal event countdown and member profile panel")]
struct Args {
    /// Output the current countdown as JSON (for waybar/scripts)
    #[arg(short, long)]
    status: bool,

    /// Event date (YYYY-MM-DD); persisted for later runs
    #[arg(short, long)]
    date: Option<String>,

    /// Event start time (HH:MM, 24-hour); persisted for later runs
    #[arg(short, long)]
    time: Option<String>,

    /// Session file issued by the account service
    #[arg(long)]
    session_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(date) = args.date.clone() {
        config.target_date = Some(date);
    }
    if let Some(time) = args.time.clone() {
        config.target_time = Some(time);
    }
    if let Some(path) = args.session_file.clone() {
        config.session_file = Some(path);
    }

    // A target handed over on the command line must be usable; a stored
    // one only degrades to the expired rendering
    let override_target = args.date.is_some() || args.time.is_some();
    if override_target {
        let date = config.target_date.as_deref().unwrap_or("");
        let time = config.target_time.as_deref().unwrap_or("");
        if let Err(e) = EventTarget::parse(date, time) {
            anyhow::bail!("--date/--time: {}", e);
        }
    }

    // Handle CLI-only commands
    if args.status {
        return print_status(&config);
    }

    if override_target {
        if let Err(e) = config.save() {
            tracing::warn!("Could not save config: {}", e);
        }
    }

    run_tui(config).await
}

fn print_status(config: &AppConfig) -> Result<()> {
    println!("{}", serde_json::to_string(&status_payload(config))?);
    Ok(())
}

// Consumers read the numeric fields unconditionally, so every branch
// carries them
fn status_payload(config: &AppConfig) -> serde_json::Value {
    match (config.target_date.as_deref(), config.target_time.as_deref()) {
        (Some(date), Some(time)) => {
            let resolved = EventTarget::parse(date, time)
                .ok()
                .and_then(|target| target.instant().map(|instant| (target, instant)));

            match resolved {
                Some((target, instant)) => {
                    let remaining = Remaining::between(&Local::now(), &instant);
                    let (text, tooltip) = if remaining.expired {
                        ("started".to_string(), format!("Event {} has started", target))
                    } else {
                        (
                            remaining.compact(),
                            format!("Event {} in {}", target, remaining.compact()),
                        )
                    };
                    let class = if remaining.expired { "expired" } else { "counting" };
                    status_json(&text, &tooltip, class, &remaining)
                }
                // Unusable target counts as already passed
                None => status_json(
                    "started",
                    "Event target unusable; treating it as passed",
                    "expired",
                    &Remaining::EXPIRED,
                ),
            }
        }
        _ => status_json(
            "",
            "No event scheduled",
            "unset",
            &Remaining {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
                expired: false,
            },
        ),
    }
}

fn status_json(text: &str, tooltip: &str, class: &str, remaining: &Remaining) -> serde_json::Value {
    serde_json::json!({
        "text": text,
        "tooltip": tooltip,
        "class": class,
        "alt": class, // Use class as alt text for format-icons
        "days": remaining.days,
        "hours": remaining.hours,
        "minutes": remaining.minutes,
        "seconds": remaining.seconds,
        "expired": remaining.expired,
    })
}

async fn run_tui(config: AppConfig) -> Result<()> {
    let session_path = match config.session_file.clone() {
        Some(path) => path,
        None => FileSession::default_path()?,
    };
    let session: Arc<dyn SessionProvider> = Arc::new(FileSession::new(session_path));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(config, session).await?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.popup == Popup::None && !app.is_editing() => {
                            return Ok(())
                        }
                        KeyCode::Char('c')
                            if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                        {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                app.status_message = Some(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Periodic refresh
        let _ = app.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(date: &str, time: &str) -> AppConfig {
        AppConfig {
            target_date: Some(date.to_string()),
            target_time: Some(time.to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn status_counts_toward_a_future_target() {
        let payload = status_payload(&config_with("2999-12-31", "23:59"));
        assert_eq!(payload["class"], "counting");
        assert_eq!(payload["expired"], false);
        assert!(payload["days"].as_u64().unwrap() > 0);
    }

    #[test]
    fn status_for_a_passed_target_is_zeroed_and_expired() {
        let payload = status_payload(&config_with("2020-01-01", "12:00"));
        assert_eq!(payload["class"], "expired");
        assert_eq!(payload["text"], "started");
        assert_eq!(payload["expired"], true);
        assert_eq!(payload["days"], 0);
        assert_eq!(payload["seconds"], 0);
    }

    #[test]
    fn status_for_an_unusable_target_keeps_the_numeric_fields() {
        let payload = status_payload(&config_with("not-a-date", "whenever"));
        assert_eq!(payload["class"], "expired");
        assert_eq!(payload["expired"], true);
        assert_eq!(payload["days"], 0);
        assert_eq!(payload["hours"], 0);
        assert_eq!(payload["minutes"], 0);
        assert_eq!(payload["seconds"], 0);
    }

    #[test]
    fn status_without_a_target_keeps_the_numeric_fields() {
        let payload = status_payload(&AppConfig::default());
        assert_eq!(payload["class"], "unset");
        assert_eq!(payload["expired"], false);
        assert_eq!(payload["days"], 0);
        assert_eq!(payload["seconds"], 0);
    }
}
