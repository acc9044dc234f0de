//! Fixed color palette for the panels.

use ratatui::style::Color;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,        // Active borders, highlights
    pub accent_bright: Color, // Countdown digits
    pub danger: Color,        // Errors, expired state
    pub success: Color,       // Positive badges
    pub warning: Color,       // Status line, attention
    pub text: Color,          // Primary text
    pub text_dim: Color,      // Dimmed text, hints
    pub inactive: Color,      // Inactive borders
    pub header: Color,        // Field labels, headers
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired colors
        Self {
            accent: Color::Rgb(250, 179, 135),
            accent_bright: Color::Rgb(245, 194, 231),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(243, 139, 168),
        }
    }
}
