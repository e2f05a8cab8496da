pub mod attachment;
pub mod chat;
pub mod input;
pub mod mode;

pub mod settings {
    use serde::{Deserialize, Serialize};

    /// Display theme, persisted as a plain string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Theme {
        Light,
        Dark,
        System,
    }

    impl Theme {
        pub fn as_str(&self) -> &'static str {
            match self {
                Theme::Light => "light",
                Theme::Dark => "dark",
                Theme::System => "system",
            }
        }

        pub fn from_str(s: &str) -> Option<Theme> {
            match s {
                "light" => Some(Theme::Light),
                "dark" => Some(Theme::Dark),
                "system" => Some(Theme::System),
                _ => None,
            }
        }
    }

    /// Coordinates used to geo-scope the maps tool.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct UserLocation {
        pub latitude: f64,
        pub longitude: f64,
    }

    /// Versioned blob-store keys. The legacy single-key history format is
    /// still referenced by old installs but is not migrated here.
    pub const SESSIONS_KEY: &str = "genesis_chat_sessions_v2";
    pub const LEGACY_HISTORY_KEY: &str = "genesis_chat_history_v1";
    pub const THEME_KEY: &str = "genesis_theme";
    pub const ONBOARDING_KEY: &str = "genesis_onboarding_complete_v1";
}
