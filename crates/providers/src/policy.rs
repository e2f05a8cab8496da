//! Mode policy: maps the selected mode to a concrete backend request plan.
//!
//! Each mode carries exactly the config fields it needs; there is no
//! loosely shaped config blob. The precedence below is load-bearing and
//! asserted by tests: a specialized mode is never overridden by the
//! presence of media, only the generic fast/smart path escalates.

use shared::mode::AppMode;
use shared::settings::UserLocation;

pub const FAST_MODEL: &str = "gemini-3-flash-preview";
pub const DEEP_MODEL: &str = "gemini-3-pro-preview";
pub const MAPS_MODEL: &str = "gemini-2.5-flash-lite-latest";
pub const IMAGE_MODEL: &str = "imagen-4.0-generate-001";

pub const THINKING_BUDGET: u32 = 32768;

pub const CODE_SYSTEM_INSTRUCTION: &str = "You are a world-class senior software engineer. Provide concise, efficient, and well-documented code solutions. Explain complex logic clearly.";

/// What a submitted turn should become on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPlan {
    /// Route to the dedicated image-synthesis endpoint.
    Image,
    /// Text/multimodal generation against `model`.
    Text {
        model: &'static str,
        config: ModeConfig,
    },
}

/// Per-mode request configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeConfig {
    Plain,
    Thinking { thinking_budget: u32 },
    Search,
    Maps { location: Option<UserLocation> },
    Code,
}

/// Resolve mode, media presence and an optional location into a plan.
pub fn resolve(mode: AppMode, has_media: bool, location: Option<UserLocation>) -> RequestPlan {
    match mode {
        AppMode::Image => RequestPlan::Image,
        AppMode::Thinking => RequestPlan::Text {
            model: DEEP_MODEL,
            config: ModeConfig::Thinking {
                thinking_budget: THINKING_BUDGET,
            },
        },
        AppMode::Search => RequestPlan::Text {
            model: FAST_MODEL,
            config: ModeConfig::Search,
        },
        AppMode::Maps => RequestPlan::Text {
            model: MAPS_MODEL,
            config: ModeConfig::Maps { location },
        },
        AppMode::Code => RequestPlan::Text {
            model: DEEP_MODEL,
            config: ModeConfig::Code,
        },
        // Multimodal input escalates the generic modes to the deep model.
        AppMode::Fast | AppMode::Smart if has_media => RequestPlan::Text {
            model: DEEP_MODEL,
            config: ModeConfig::Plain,
        },
        AppMode::Smart => RequestPlan::Text {
            model: DEEP_MODEL,
            config: ModeConfig::Plain,
        },
        AppMode::Fast => RequestPlan::Text {
            model: FAST_MODEL,
            config: ModeConfig::Plain,
        },
    }
}
