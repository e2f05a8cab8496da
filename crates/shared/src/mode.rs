//! Interaction modes. Exactly one is active at a time; switching modes
//! never touches already-stored messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    Fast,
    Smart,
    Thinking,
    Search,
    Maps,
    Code,
    Image,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Fast => "fast",
            AppMode::Smart => "smart",
            AppMode::Thinking => "thinking",
            AppMode::Search => "search",
            AppMode::Maps => "maps",
            AppMode::Code => "code",
            AppMode::Image => "image",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppMode::Fast => "Fast",
            AppMode::Smart => "Smart",
            AppMode::Thinking => "Thinking",
            AppMode::Search => "Search",
            AppMode::Maps => "Maps",
            AppMode::Code => "Code",
            AppMode::Image => "Image",
        }
    }

    pub fn from_str(s: &str) -> Option<AppMode> {
        match s {
            "fast" => Some(AppMode::Fast),
            "smart" => Some(AppMode::Smart),
            "thinking" => Some(AppMode::Thinking),
            "search" => Some(AppMode::Search),
            "maps" => Some(AppMode::Maps),
            "code" => Some(AppMode::Code),
            "image" => Some(AppMode::Image),
            _ => None,
        }
    }

    pub fn all() -> &'static [AppMode] {
        &[
            AppMode::Fast,
            AppMode::Smart,
            AppMode::Thinking,
            AppMode::Search,
            AppMode::Maps,
            AppMode::Code,
            AppMode::Image,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_modes() {
        for mode in AppMode::all() {
            assert_eq!(AppMode::from_str(mode.as_str()), Some(*mode));
        }
    }

    #[test]
    fn test_unknown_mode_string() {
        assert_eq!(AppMode::from_str("turbo"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&AppMode::Thinking).unwrap();
        assert_eq!(json, "\"thinking\"");
    }
}
