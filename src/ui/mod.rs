use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::sync::OnceLock;

use crate::app::{App, CountdownState, EditField, EditState, Popup, ProfileMode, Section, TargetField};
use crate::profile::{avatar_initial, AvatarSource, Role, UserProfile};
use crate::theme::Theme;

static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn accent_bright() -> Color { theme().accent_bright }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    // Responsive layout based on terminal height
    let countdown_height = if area.height < 22 {
        Constraint::Length(5)
    } else {
        Constraint::Length(8)
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            countdown_height,      // Countdown box
            Constraint::Min(9),    // Profile box
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_countdown_box(f, app, chunks[1]);
    draw_profile_box(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::EditTarget => draw_target_popup(f, app),
        Popup::Help => draw_help_popup(f),
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Action feedback wins over the standing event/session summary
    let line = if let Some(ref status) = app.status_message {
        // e.g. "Profile updated", "Event cleared"
        Line::from(vec![Span::styled(status, Style::default().fg(warning()))])
    } else {
        Line::from(vec![Span::styled(
            app.info_message.as_str(),
            Style::default().fg(text_dim()),
        )])
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_countdown_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Countdown;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Event Countdown ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    match &app.countdown {
        CountdownState::Unset => {
            let hint = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No event scheduled",
                    Style::default().fg(text_dim()),
                )),
                Line::from(vec![
                    Span::styled("Press ", Style::default().fg(text_dim())),
                    Span::styled("t", Style::default().fg(accent())),
                    Span::styled(" to set a date and time", Style::default().fg(text_dim())),
                ]),
            ])
            .alignment(Alignment::Center)
            .block(block);
            f.render_widget(hint, area);
        }
        CountdownState::Expired { target } => {
            let detail = match target {
                Some(target) => Line::from(Span::styled(
                    target.to_string(),
                    Style::default().fg(text_dim()),
                )),
                None => Line::from(Span::styled(
                    "The stored event target could not be read",
                    Style::default().fg(text_dim()),
                )),
            };
            let banner = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "󰔛  The event has started!",
                    Style::default().fg(danger()).add_modifier(Modifier::BOLD),
                )),
                detail,
            ])
            .alignment(Alignment::Center)
            .block(block);
            f.render_widget(banner, area);
        }
        CountdownState::Counting { target, remaining } if area.height < 7 || area.width < 46 => {
            // Compact rendering for small terminals
            let compact = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    remaining.compact(),
                    Style::default()
                        .fg(accent_bright())
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("until {}", target),
                    Style::default().fg(text_dim()),
                )),
            ])
            .alignment(Alignment::Center)
            .block(block);
            f.render_widget(compact, area);
        }
        CountdownState::Counting { target, remaining } => {
            f.render_widget(block, area);

            let inner = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(4), // Unit cells
                    Constraint::Length(1), // Target line
                    Constraint::Min(0),
                ])
                .split(area);

            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Ratio(1, 4),
                    Constraint::Ratio(1, 4),
                    Constraint::Ratio(1, 4),
                    Constraint::Ratio(1, 4),
                ])
                .split(inner[0]);

            draw_unit_cell(f, remaining.days, "Days", cells[0]);
            draw_unit_cell(f, remaining.hours, "Hours", cells[1]);
            draw_unit_cell(f, remaining.minutes, "Minutes", cells[2]);
            draw_unit_cell(f, remaining.seconds, "Seconds", cells[3]);

            let target_line = Paragraph::new(Line::from(vec![
                Span::styled("until ", Style::default().fg(text_dim())),
                Span::styled(target.to_string(), Style::default().fg(text())),
            ]))
            .alignment(Alignment::Center);
            f.render_widget(target_line, inner[1]);
        }
    }
}

fn draw_unit_cell(f: &mut Frame, value: u64, label: &str, area: Rect) {
    let cell = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("{:02}", value),
            Style::default()
                .fg(accent_bright())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(label, Style::default().fg(text_dim()))),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(inactive())),
    );
    f.render_widget(cell, area);
}

fn role_color(role: Role) -> Color {
    match role {
        Role::User => success(),
        Role::Vendor => warning(),
        Role::Admin => danger(),
    }
}

fn draw_profile_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Profile;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Member Profile ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    match &app.mode {
        ProfileMode::Viewing => {
            let card = Paragraph::new(profile_card_lines(app.user.as_ref()))
                .wrap(Wrap { trim: false })
                .block(block);
            f.render_widget(card, area);
        }
        ProfileMode::Editing(edit) => {
            f.render_widget(block, area);
            draw_profile_form(f, edit, area);
        }
    }
}

fn profile_card_lines(user: Option<&UserProfile>) -> Vec<Line<'static>> {
    let avatar = AvatarSource::resolve(
        user.and_then(|u| u.photo_url.as_deref()),
        user.map(|u| u.name.as_str()),
    );
    let badge = format!("[{}]", avatar_initial(user.map(|u| u.name.as_str())));

    let Some(user) = user else {
        return vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!("  {}  ", badge),
                    Style::default().fg(accent()).add_modifier(Modifier::BOLD),
                ),
                Span::styled("Not signed in", Style::default().fg(text_dim())),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled("  Avatar   ", Style::default().fg(header())),
                Span::styled(avatar.url().to_string(), Style::default().fg(text_dim())),
                Span::styled("  (generated)", Style::default().fg(warning())),
            ]),
        ];
    };

    let mut avatar_spans = vec![
        Span::styled("  Avatar   ", Style::default().fg(header())),
        Span::styled(avatar.url().to_string(), Style::default().fg(text_dim())),
    ];
    if avatar.is_generated() {
        avatar_spans.push(Span::styled("  (generated)", Style::default().fg(warning())));
    }

    vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!("  {}  ", badge),
                Style::default().fg(accent()).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                user.name.clone(),
                Style::default().fg(text()).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  ", Style::default()),
            Span::styled(
                user.role.label(),
                Style::default().fg(role_color(user.role)),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Email    ", Style::default().fg(header())),
            Span::styled(user.email.clone(), Style::default().fg(text())),
        ]),
        Line::from(vec![
            Span::styled("  Joined   ", Style::default().fg(header())),
            Span::styled(
                crate::profile::join_date_label(user.created_at.as_ref()),
                Style::default().fg(text()),
            ),
        ]),
        Line::from(avatar_spans),
    ]
}

fn draw_profile_form(f: &mut Frame, edit: &EditState, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Name input
            Constraint::Length(3), // Photo URL input
            Constraint::Length(1), // Avatar preview
            Constraint::Length(3), // Action buttons
            Constraint::Min(0),
        ])
        .split(area);

    let name_active = edit.field == EditField::Name;
    let name_cursor = if name_active { "_" } else { "" };
    let name_input = Paragraph::new(format!("{}{}", edit.draft.name, name_cursor))
        .style(Style::default().fg(text()))
        .block(
            Block::default()
                .title(Span::styled(
                    " Name ",
                    Style::default().fg(if name_active { accent() } else { header() }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if name_active { accent() } else { inactive() })),
        );
    f.render_widget(name_input, rows[0]);

    let photo_active = edit.field == EditField::PhotoUrl;
    let photo_cursor = if photo_active { "_" } else { "" };
    let photo_input = Paragraph::new(format!("{}{}", edit.draft.photo_url, photo_cursor))
        .style(Style::default().fg(text()))
        .block(
            Block::default()
                .title(Span::styled(
                    " Photo URL (empty clears it) ",
                    Style::default().fg(if photo_active { accent() } else { header() }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if photo_active {
                    accent()
                } else {
                    inactive()
                })),
        );
    f.render_widget(photo_input, rows[1]);

    // Live avatar preview for the draft
    let preview = AvatarSource::resolve(edit.draft.photo_url_opt(), Some(edit.draft.name.as_str()));
    let mut preview_spans = vec![
        Span::styled("  Preview  ", Style::default().fg(header())),
        Span::styled(preview.url().to_string(), Style::default().fg(text_dim())),
    ];
    if preview.is_generated() {
        preview_spans.push(Span::styled("  (generated)", Style::default().fg(warning())));
    }
    f.render_widget(Paragraph::new(Line::from(preview_spans)), rows[2]);

    // Action buttons / busy indicator
    let buttons = if edit.submitting {
        Paragraph::new(Line::from(vec![
            Span::styled("󰔟 ", Style::default().fg(warning())),
            Span::styled(
                "Saving...",
                Style::default().fg(warning()).add_modifier(Modifier::BOLD),
            ),
        ]))
    } else {
        Paragraph::new(Line::from(vec![
            Span::styled("  [ ", Style::default().fg(text_dim())),
            Span::styled(
                "F2 = Save",
                Style::default().fg(success()).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ]  [ ", Style::default().fg(text_dim())),
            Span::styled("Tab = Switch Field", Style::default().fg(accent())),
            Span::styled(" ]  [ ", Style::default().fg(text_dim())),
            Span::styled("Esc = Cancel", Style::default().fg(danger())),
            Span::styled(" ]  ", Style::default().fg(text_dim())),
        ]))
    };
    let buttons = buttons.alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(inactive())),
    );
    f.render_widget(buttons, rows[3]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = if app.is_editing() {
        vec![
            ("Tab", "Field"),
            ("Enter", "Next/Save"),
            ("F2", "Save"),
            ("Esc", "Cancel"),
        ]
    } else {
        match app.section {
            Section::Countdown => vec![
                ("t", "Set"),
                ("d", "Clear"),
                ("Tab", "Next"),
                ("R", "Refresh"),
                ("h", "Help"),
                ("q", "Quit"),
            ],
            Section::Profile => vec![
                ("e", "Edit"),
                ("R", "Refresh"),
                ("Tab", "Next"),
                ("h", "Help"),
                ("q", "Quit"),
            ],
        }
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 {
        4
    } else if area.width < 80 {
        5
    } else {
        hints.len()
    };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    // Footer is commands legend ONLY - no status messages here
    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_target_popup(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 70 { 90 } else { 50 },
        if area.height < 24 { 70 } else { 45 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(
            " 󰃭 Set Event Target ",
            Style::default().fg(accent()),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Date input
            Constraint::Length(3), // Time input
            Constraint::Length(3), // Action buttons
            Constraint::Min(0),
        ])
        .split(popup_area);

    let date_active = app.target_field == TargetField::Date;
    let date_cursor = if date_active { "_" } else { "" };
    let date_input = Paragraph::new(format!("{}{}", app.date_input, date_cursor))
        .style(Style::default().fg(text()))
        .block(
            Block::default()
                .title(Span::styled(
                    " Date (YYYY-MM-DD) ",
                    Style::default().fg(if date_active { accent() } else { header() }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if date_active { accent() } else { inactive() })),
        );
    f.render_widget(date_input, inner[0]);

    let time_active = app.target_field == TargetField::Time;
    let time_cursor = if time_active { "_" } else { "" };
    let time_input = Paragraph::new(format!("{}{}", app.time_input, time_cursor))
        .style(Style::default().fg(text()))
        .block(
            Block::default()
                .title(Span::styled(
                    " Time (HH:MM, 24-hour) ",
                    Style::default().fg(if time_active { accent() } else { header() }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if time_active { accent() } else { inactive() })),
        );
    f.render_widget(time_input, inner[1]);

    let buttons = Paragraph::new(Line::from(vec![
        Span::styled("  [ ", Style::default().fg(text_dim())),
        Span::styled(
            "F2 = Save",
            Style::default().fg(success()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ]  [ ", Style::default().fg(text_dim())),
        Span::styled("Tab = Switch Field", Style::default().fg(accent())),
        Span::styled(" ]  [ ", Style::default().fg(text_dim())),
        Span::styled("Esc = Cancel", Style::default().fg(danger())),
        Span::styled(" ]  ", Style::default().fg(text_dim())),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(inactive())),
    );
    f.render_widget(buttons, inner[2]);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 75 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "═══ Navigation ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  Tab       ", Style::default().fg(accent())),
            Span::raw("Switch panels (Countdown ↔ Profile)"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Countdown ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  t/Enter   ", Style::default().fg(accent())),
            Span::raw("Set or change the event date and time"),
        ]),
        Line::from(vec![
            Span::styled("  d         ", Style::default().fg(accent())),
            Span::raw("Clear the event"),
        ]),
        Line::from(vec![
            Span::raw("            Once the countdown hits zero it stays expired"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Profile ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  e/Enter   ", Style::default().fg(accent())),
            Span::raw("Edit name and photo URL"),
        ]),
        Line::from(vec![
            Span::styled("  R         ", Style::default().fg(accent())),
            Span::raw("Re-read the session file"),
        ]),
        Line::from(vec![
            Span::styled("  F2        ", Style::default().fg(accent())),
            Span::raw("Save the open form (Esc cancels, nothing is kept)"),
        ]),
        Line::from(vec![
            Span::raw("            An unreachable photo URL falls back to a"),
        ]),
        Line::from(vec![Span::raw("            generated initial-letter avatar")]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Quick Start ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  kigen                       ", Style::default().fg(accent())),
            Span::raw("Launch this TUI"),
        ]),
        Line::from(vec![
            Span::styled("  kigen --status              ", Style::default().fg(accent())),
            Span::raw("JSON countdown for scripts/waybar"),
        ]),
        Line::from(vec![
            Span::styled("  kigen -d DATE -t TIME       ", Style::default().fg(accent())),
            Span::raw("Set the event from the shell"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Session ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::raw("  • Sign-in state lives in a session file owned by the"),
        ]),
        Line::from(vec![
            Span::raw("    account service (default: ~/.config/kigen/session.toml)"),
        ]),
        Line::from(vec![
            Span::styled("  • Override with ", Style::default()),
            Span::styled("--session-file PATH", Style::default().fg(text_dim())),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 kigen Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn flatten(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn profile_card_shows_every_field() {
        let user = UserProfile {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            photo_url: None,
            role: Role::Vendor,
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()),
        };
        let text = flatten(&profile_card_lines(Some(&user)));

        assert!(text.contains("[A]"));
        assert!(text.contains("Alice"));
        assert!(text.contains("a@x.com"));
        assert!(text.contains("Vendor"));
        assert!(text.contains("January 15, 2024"));
        assert!(text.contains("https://ui-avatars.com/api/?name=A"));
        assert!(text.contains("(generated)"));
    }

    #[test]
    fn each_role_gets_its_own_color() {
        let colors = [
            role_color(Role::User),
            role_color(Role::Vendor),
            role_color(Role::Admin),
        ];
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(colors[0], colors[2]);
    }

    #[test]
    fn signed_out_card_is_defensive() {
        let text = flatten(&profile_card_lines(None));
        assert!(text.contains("Not signed in"));
        assert!(text.contains("https://ui-avatars.com/api/?name=U"));
    }
}
