//! Member profile data: the session-provided user record, the edit
//! draft, and avatar source resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Endpoint that renders initial-letter avatars.
pub const AVATAR_ENDPOINT: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Vendor,
    Admin,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Vendor => "Vendor",
            Role::Admin => "Admin",
        }
    }
}

/// The signed-in user as handed out by the account service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Editable copy of the profile fields. Lives only while the edit form
/// is open; discarding it reverts every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub photo_url: String,
}

impl ProfileDraft {
    pub fn from_user(user: &UserProfile) -> Self {
        Self {
            name: user.name.clone(),
            photo_url: user.photo_url.clone().unwrap_or_default(),
        }
    }

    /// The photo URL as submitted: trimmed, with empty meaning "clear it".
    pub fn photo_url_opt(&self) -> Option<&str> {
        let trimmed = self.photo_url.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// First letter of the display name, uppercased, with `U` standing in
/// when there is no usable name.
pub fn avatar_initial(name: Option<&str>) -> char {
    name.and_then(|n| n.trim().chars().next())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('U')
}

pub fn fallback_avatar_url(name: Option<&str>) -> String {
    format!("{}?name={}", AVATAR_ENDPOINT, avatar_initial(name))
}

fn looks_loadable(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// What the avatar slot should show: the user's own photo when it points
/// somewhere loadable, otherwise a generated initial-letter image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSource {
    Remote(String),
    Generated(String),
}

impl AvatarSource {
    pub fn resolve(photo_url: Option<&str>, name: Option<&str>) -> Self {
        match photo_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) if looks_loadable(url) => AvatarSource::Remote(url.to_string()),
            // A photo source that cannot load degrades to the generated
            // avatar instead of an empty slot.
            Some(_) | None => AvatarSource::Generated(fallback_avatar_url(name)),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            AvatarSource::Remote(url) | AvatarSource::Generated(url) => url,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, AvatarSource::Generated(_))
    }
}

/// Join date as shown on the profile card, `N/A` when the account record
/// carries none.
pub fn join_date_label(created_at: Option<&DateTime<Utc>>) -> String {
    match created_at {
        Some(ts) => ts.format("%B %-d, %Y").to_string(),
        None => "N/A".to_string(),
    }
}
