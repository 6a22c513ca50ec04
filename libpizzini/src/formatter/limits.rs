//! Platform identities and their publishing limits

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Publishing destinations the formatter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    X,
    Instagram,
    Facebook,
    LinkedIn,
}

/// Text and hashtag ceilings for one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformLimits {
    pub max_text_length: usize,
    pub max_hashtags: usize,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Twitter,
        Platform::X,
        Platform::Instagram,
        Platform::Facebook,
        Platform::LinkedIn,
    ];

    /// Case-insensitive lookup; `None` for platforms we have no profile for
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "twitter" => Some(Platform::Twitter),
            "x" => Some(Platform::X),
            "instagram" => Some(Platform::Instagram),
            "facebook" => Some(Platform::Facebook),
            "linkedin" => Some(Platform::LinkedIn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::X => "x",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::LinkedIn => "linkedin",
        }
    }

    pub fn limits(&self) -> PlatformLimits {
        let (max_text_length, max_hashtags) = match self {
            Platform::Twitter | Platform::X => (280, 2),
            Platform::Instagram => (2200, 30),
            Platform::Facebook => (63206, 3),
            Platform::LinkedIn => (3000, 3),
        };
        PlatformLimits {
            max_text_length,
            max_hashtags,
        }
    }

    /// Twitter and X share the tight microblog profile
    pub fn is_microblog(&self) -> bool {
        matches!(self, Platform::Twitter | Platform::X)
    }

    /// Human-readable best posting windows
    pub fn optimal_posting_window(&self) -> &'static str {
        match self {
            Platform::Twitter | Platform::X => "9:00-10:00 AM, 7:00-9:00 PM",
            Platform::Instagram => "11:00 AM-1:00 PM, 7:00-9:00 PM",
            Platform::Facebook => "1:00-3:00 PM, 7:00-9:00 PM",
            Platform::LinkedIn => "8:00-10:00 AM, 12:00-2:00 PM",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::from_name(s).ok_or_else(|| {
            format!(
                "Unknown platform: '{}'. Valid options: twitter, x, instagram, facebook, linkedin",
                s
            )
        })
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PlatformLimits {
    /// Limits for any platform name; unknown names get the twitter profile
    pub fn for_name(name: &str) -> Self {
        Platform::from_name(name)
            .unwrap_or(Platform::Twitter)
            .limits()
    }
}

/// Posting window for any platform name, with a generic default
pub fn optimal_posting_window(name: &str) -> &'static str {
    Platform::from_name(name)
        .map(|p| p.optimal_posting_window())
        .unwrap_or("9:00 AM-12:00 PM")
}
