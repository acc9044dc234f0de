use anyhow::Result;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::config::AppConfig;
use crate::countdown::{EventTarget, Remaining, Ticker};
use crate::profile::{ProfileDraft, UserProfile};
use crate::session::{SessionError, SessionProvider, SessionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Countdown,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    EditTarget, // Set/change the event date and time
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    Date,
    Time,
}

/// Countdown panel state. `Expired` is terminal: nothing transitions out
/// of it except mounting a fresh target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownState {
    /// No event configured yet
    Unset,
    Counting {
        target: EventTarget,
        remaining: Remaining,
    },
    /// `target` is `None` when the stored target itself was unusable
    Expired { target: Option<EventTarget> },
}

/// Profile panel mode. The draft only exists inside `Editing`, so
/// leaving the mode discards it by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileMode {
    Viewing,
    Editing(EditState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState {
    pub draft: ProfileDraft,
    pub field: EditField,
    pub submitting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    PhotoUrl,
}

pub struct App {
    pub section: Section,
    pub popup: Popup,

    // Countdown state (top panel)
    pub countdown: CountdownState,
    ticker: Option<Ticker>,

    // Target popup input buffers
    pub date_input: String,
    pub time_input: String,
    pub target_field: TargetField,

    // Profile state (bottom panel)
    pub user: Option<UserProfile>,
    pub mode: ProfileMode,

    // Session plumbing
    session: Arc<dyn SessionProvider>,
    submit_rx: Option<oneshot::Receiver<SessionResult<()>>>,

    // Config
    pub config: AppConfig,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    // Info line content, rebuilt every tick
    pub info_message: String,
}

impl App {
    pub async fn new(config: AppConfig, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let user = session.current_user().await;

        let mut app = Self {
            section: Section::Countdown,
            popup: Popup::None,

            countdown: CountdownState::Unset,
            ticker: None,

            date_input: String::new(),
            time_input: String::new(),
            target_field: TargetField::Date,

            user,
            mode: ProfileMode::Viewing,

            session,
            submit_rx: None,

            config,

            status_message: None,
            status_message_time: None,

            info_message: String::new(),
        };

        match (
            app.config.target_date.clone(),
            app.config.target_time.clone(),
        ) {
            (Some(date), Some(time)) => match EventTarget::parse(&date, &time) {
                Ok(target) => app.set_target(target),
                Err(e) => {
                    // Unusable stored target renders as already passed
                    // instead of silently showing nothing
                    tracing::warn!("Stored event target is unusable: {}", e);
                    app.countdown = CountdownState::Expired { target: None };
                }
            },
            (None, None) => {}
            _ => {
                tracing::warn!("Event target needs both a date and a time; ignoring the half set");
            }
        }

        app.update_info_message();
        Ok(app)
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, ProfileMode::Editing(_))
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }

        // An open edit form captures the keyboard
        if self.is_editing() {
            return self.handle_edit_key(key);
        }

        self.handle_normal_key(key).await
    }

    async fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            // Navigation between panels (Countdown ↔ Profile)
            KeyCode::Tab | KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Countdown => Section::Profile,
                    Section::Profile => Section::Countdown,
                };
            }

            // Panel action
            KeyCode::Char(' ') | KeyCode::Enter => match self.section {
                Section::Countdown => self.open_target_popup(),
                Section::Profile => self.start_edit(),
            },

            // Set/change the event target (Countdown panel)
            KeyCode::Char('t') => {
                if self.section == Section::Countdown {
                    self.open_target_popup();
                }
            }

            // Clear the event (Countdown panel)
            KeyCode::Char('d') | KeyCode::Delete => {
                if self.section == Section::Countdown {
                    self.clear_target();
                }
            }

            // Edit profile (Profile panel)
            KeyCode::Char('e') => {
                if self.section == Section::Profile {
                    self.start_edit();
                }
            }

            // Re-read the session file
            KeyCode::Char('R') => self.refresh().await,

            // Help (? or h)
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::EditTarget => self.handle_target_popup_key(key),
            Popup::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc
                        | KeyCode::Char('?')
                        | KeyCode::Char('h')
                        | KeyCode::Enter
                        | KeyCode::Char('q')
                ) {
                    self.popup = Popup::None;
                }
                Ok(())
            }
            Popup::None => Ok(()),
        }
    }

    fn handle_target_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                // Cancel and close
                self.popup = Popup::None;
                self.date_input.clear();
                self.time_input.clear();
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.target_field = match self.target_field {
                    TargetField::Date => TargetField::Time,
                    TargetField::Time => TargetField::Date,
                };
            }
            KeyCode::F(2) => self.save_target_from_popup(),
            KeyCode::Enter => match self.target_field {
                // Enter moves from date to time, then saves
                TargetField::Date => self.target_field = TargetField::Time,
                TargetField::Time => self.save_target_from_popup(),
            },
            KeyCode::Backspace => match self.target_field {
                TargetField::Date => {
                    self.date_input.pop();
                }
                TargetField::Time => {
                    self.time_input.pop();
                }
            },
            KeyCode::Char(c) => match self.target_field {
                // Date field: YYYY-MM-DD characters only
                TargetField::Date => {
                    if c.is_ascii_digit() || c == '-' {
                        self.date_input.push(c);
                    }
                }
                // Time field: HH:MM characters only
                TargetField::Time => {
                    if c.is_ascii_digit() || c == ':' {
                        self.time_input.push(c);
                    }
                }
            },
            _ => {}
        }
        Ok(())
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            // Esc backs out even while a submit is in flight; the update
            // still completes against the session provider
            KeyCode::Esc => self.cancel_edit(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                if let ProfileMode::Editing(edit) = &mut self.mode {
                    edit.field = match edit.field {
                        EditField::Name => EditField::PhotoUrl,
                        EditField::PhotoUrl => EditField::Name,
                    };
                }
            }
            KeyCode::F(2) => self.start_submit(),
            KeyCode::Enter => {
                let on_name = matches!(
                    &self.mode,
                    ProfileMode::Editing(edit) if edit.field == EditField::Name
                );
                if on_name {
                    if let ProfileMode::Editing(edit) = &mut self.mode {
                        edit.field = EditField::PhotoUrl;
                    }
                } else {
                    self.start_submit();
                }
            }
            KeyCode::Backspace => {
                if let ProfileMode::Editing(edit) = &mut self.mode {
                    match edit.field {
                        EditField::Name => {
                            edit.draft.name.pop();
                        }
                        EditField::PhotoUrl => {
                            edit.draft.photo_url.pop();
                        }
                    }
                }
            }
            KeyCode::Char(c) => {
                if let ProfileMode::Editing(edit) = &mut self.mode {
                    match edit.field {
                        EditField::Name => edit.draft.name.push(c),
                        // URLs carry no whitespace
                        EditField::PhotoUrl => {
                            if !c.is_whitespace() {
                                edit.draft.photo_url.push(c);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_target_popup(&mut self) {
        let existing = match &self.countdown {
            CountdownState::Counting { target, .. } => Some(*target),
            CountdownState::Expired { target } => *target,
            CountdownState::Unset => None,
        };
        if let Some(target) = existing {
            self.date_input = target.date.format("%Y-%m-%d").to_string();
            self.time_input = target.time.format("%H:%M").to_string();
        } else {
            self.date_input.clear();
            self.time_input.clear();
        }
        self.target_field = TargetField::Date;
        self.popup = Popup::EditTarget;
    }

    fn save_target_from_popup(&mut self) {
        match EventTarget::parse(&self.date_input, &self.time_input) {
            Ok(target) => {
                self.config.target_date = Some(target.date.format("%Y-%m-%d").to_string());
                self.config.target_time = Some(target.time.format("%H:%M").to_string());
                if let Err(e) = self.config.save() {
                    tracing::warn!("Could not save config: {}", e);
                }
                self.set_target(target);
                self.popup = Popup::None;
                self.date_input.clear();
                self.time_input.clear();
                self.set_status(format!("Counting down to {}", target));
            }
            // Popup stays open so the input can be fixed
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Mount a target: fresh ticker, fresh state. Replacing the old
    /// ticker drops it, which aborts its refresh task.
    pub fn set_target(&mut self, target: EventTarget) {
        match target.instant() {
            Some(instant) => {
                let remaining = Remaining::between(&Local::now(), &instant);
                if remaining.expired {
                    self.ticker = None;
                    self.countdown = CountdownState::Expired {
                        target: Some(target),
                    };
                } else {
                    self.ticker = Some(Ticker::spawn(instant));
                    self.countdown = CountdownState::Counting { target, remaining };
                }
            }
            None => {
                // DST gap: the wall-clock time never occurs locally
                tracing::warn!("Event target {} never occurs in this timezone", target);
                self.ticker = None;
                self.countdown = CountdownState::Expired {
                    target: Some(target),
                };
            }
        }
    }

    fn clear_target(&mut self) {
        self.ticker = None;
        self.countdown = CountdownState::Unset;
        self.config.target_date = None;
        self.config.target_time = None;
        if let Err(e) = self.config.save() {
            tracing::warn!("Could not save config: {}", e);
        }
        self.set_status("Event cleared");
    }

    /// Fold a ticker snapshot into the panel state. Expired is a latch:
    /// once reached, later snapshots cannot revive the countdown.
    fn apply_snapshot(&mut self, snapshot: Remaining) {
        match std::mem::replace(&mut self.countdown, CountdownState::Unset) {
            CountdownState::Counting { target, .. } if snapshot.expired => {
                self.ticker = None;
                self.countdown = CountdownState::Expired {
                    target: Some(target),
                };
            }
            CountdownState::Counting { target, .. } => {
                self.countdown = CountdownState::Counting {
                    target,
                    remaining: snapshot,
                };
            }
            other => self.countdown = other,
        }
    }

    fn start_edit(&mut self) {
        let Some(user) = &self.user else {
            self.set_status("No active session");
            return;
        };
        self.mode = ProfileMode::Editing(EditState {
            draft: ProfileDraft::from_user(user),
            field: EditField::Name,
            submitting: false,
        });
    }

    fn cancel_edit(&mut self) {
        self.mode = ProfileMode::Viewing;
        self.set_status("Edit cancelled");
    }

    fn start_submit(&mut self) {
        let (name, photo_url) = match &self.mode {
            ProfileMode::Editing(edit) => (
                edit.draft.name.trim().to_string(),
                edit.draft.photo_url_opt().map(str::to_string),
            ),
            ProfileMode::Viewing => return,
        };

        // One update in flight at a time, across cancel and re-edit:
        // the pending receiver is the guard, not the edit session's flag
        if self.submit_rx.is_some() {
            self.set_status("Still saving the previous update");
            return;
        }
        if name.is_empty() {
            self.set_status("Name is required");
            return;
        }

        if let ProfileMode::Editing(edit) = &mut self.mode {
            edit.submitting = true;
        }

        let (tx, rx) = oneshot::channel();
        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            let _ = tx.send(session.update_profile(&name, photo_url.as_deref()).await);
        });
        self.submit_rx = Some(rx);
    }

    async fn finish_submit(&mut self, result: SessionResult<()>) {
        // Only the edit session that spawned the submit carries the
        // flag; a form reopened after cancel is not closed by a stale
        // completion and keeps its draft
        let own_submit = match &mut self.mode {
            ProfileMode::Editing(edit) if edit.submitting => {
                edit.submitting = false;
                true
            }
            _ => false,
        };
        match result {
            Ok(()) => {
                self.user = self.session.current_user().await;
                if own_submit {
                    self.mode = ProfileMode::Viewing;
                }
                self.set_status("Profile updated");
            }
            Err(e) => {
                tracing::error!("Profile update failed: {}", e);
                if self.config.notifications {
                    notify_update_failed(&e.to_string());
                }
                self.set_status(format!("Update failed: {}", e));
                // The form stays open with the draft intact for a retry
            }
        }
    }

    async fn refresh(&mut self) {
        self.user = self.session.current_user().await;
        self.set_status("Session refreshed");
    }

    pub async fn tick(&mut self) -> Result<()> {
        // Latest countdown snapshot, if the ticker produced any
        let snapshot = self.ticker.as_mut().and_then(|t| t.poll());
        if let Some(snapshot) = snapshot {
            self.apply_snapshot(snapshot);
        }

        // A finished profile update resolves here
        if let Some(mut rx) = self.submit_rx.take() {
            match rx.try_recv() {
                Ok(result) => self.finish_submit(result).await,
                Err(TryRecvError::Empty) => self.submit_rx = Some(rx),
                Err(TryRecvError::Closed) => {
                    self.finish_submit(Err(SessionError::Rejected(
                        "update task dropped".to_string(),
                    )))
                    .await
                }
            }
        }

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        self.update_info_message();
        Ok(())
    }

    /// Update the info message with the current event/session summary
    fn update_info_message(&mut self) {
        let mut parts = Vec::new();

        match &self.countdown {
            CountdownState::Counting { target, remaining } => {
                parts.push(format!("󰃭 {} in {}", target, remaining.compact()));
            }
            CountdownState::Expired {
                target: Some(target),
            } => {
                parts.push(format!("󰃭 {} has started", target));
            }
            CountdownState::Expired { target: None } => {
                parts.push("󰃭 event target unusable".to_string());
            }
            CountdownState::Unset => parts.push("󰃭 no event scheduled".to_string()),
        }

        match &self.user {
            Some(user) => parts.push(format!("󰀄 {}", user.email)),
            None => parts.push("󰀄 signed out".to_string()),
        }

        self.info_message = parts.join("  │  ");
    }
}

fn notify_update_failed(message: &str) {
    let _ = notify_rust::Notification::new()
        .summary("kigen")
        .body(&format!("Profile update failed: {}", message))
        .icon("dialog-error")
        .urgency(notify_rust::Urgency::Normal)
        .show();
}
