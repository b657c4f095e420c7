//! Dark or light look of the HTML dashboard, remembered in storage.
use std::fmt;
use std::str::FromStr;

use crate::storage::{Storage, StorageError, THEME_KEY};

/// Colour scheme of the HTML dashboard. Dark unless the user picked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Dark
    }
}

impl Theme {
    pub fn toggle(self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Theme::Dark => "🌙",
            Theme::Light => "☀️",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Stored theme, falling back to dark when none or an unknown one is stored.
    pub fn load<S: Storage>(storage: &S) -> Result<Theme, StorageError> {
        Ok(storage
            .get(THEME_KEY)?
            .and_then(|t| t.parse().ok())
            .unwrap_or_default())
    }

    pub fn save<S: Storage>(self, storage: &S) -> Result<(), StorageError> {
        storage.set(THEME_KEY, self.as_str())
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown theme {0:?}, expected dark or light")]
pub struct UnknownTheme(String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}
