//! Theme preference.
//!
//! The theme is process-wide state with one initialization point
//! ([`ThemePreference::init`]) and one mutation point
//! ([`ThemePreference::toggle`]). It is handed to the conversation view
//! explicitly rather than read from a global.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// The two theme variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other variant.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(ThemeError::Unknown(other.to_string())),
        }
    }
}

/// Theme storage errors.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("unknown theme: {0}")]
    Unknown(String),
    #[error("theme store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("theme store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the chosen theme survives restarts.
pub trait ThemeStore: Send + Sync {
    /// The persisted theme, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<Theme>, ThemeError>;

    /// Persist a theme, replacing any previous value.
    fn save(&self, theme: Theme) -> Result<(), ThemeError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTheme {
    theme: Theme,
}

/// Stores the theme as a small JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileThemeStore {
    path: PathBuf,
}

impl FileThemeStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ThemeError {
        ThemeError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ThemeStore for FileThemeStore {
    fn load(&self) -> Result<Option<Theme>, ThemeError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let stored: StoredTheme =
            serde_json::from_str(&raw).map_err(|source| ThemeError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(stored.theme))
    }

    fn save(&self, theme: Theme) -> Result<(), ThemeError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string(&StoredTheme { theme }).map_err(|source| {
            ThemeError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}

/// In-memory store, for tests and for running without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryThemeStore {
    theme: RwLock<Option<Theme>>,
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> Result<Option<Theme>, ThemeError> {
        Ok(*self.theme.read().unwrap_or_else(std::sync::PoisonError::into_inner))
    }

    fn save(&self, theme: Theme) -> Result<(), ThemeError> {
        *self
            .theme
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(theme);
        Ok(())
    }
}

/// The process-wide theme choice.
///
/// Resolution order: explicit choice (persisted or toggled), then the
/// client's ambient light/dark hint, then the configured fallback.
pub struct ThemePreference {
    store: Arc<dyn ThemeStore>,
    explicit: RwLock<Option<Theme>>,
    fallback: Theme,
}

impl fmt::Debug for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemePreference")
            .field("explicit", &self.explicit())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl ThemePreference {
    /// Load the persisted theme from `store`.
    ///
    /// A missing or unreadable store leaves the preference unset.
    #[must_use]
    pub fn init(store: Arc<dyn ThemeStore>, fallback: Theme) -> Self {
        let explicit = match store.load() {
            Ok(theme) => theme,
            Err(e) => {
                tracing::warn!(name: "theme.load.failed", error = %e, "Ignoring persisted theme");
                None
            }
        };
        tracing::info!(
            name: "theme.initialized",
            persisted = ?explicit,
            fallback = %fallback,
            "Theme preference loaded"
        );
        Self {
            store,
            explicit: RwLock::new(explicit),
            fallback,
        }
    }

    /// The explicitly chosen theme, if any.
    #[must_use]
    pub fn explicit(&self) -> Option<Theme> {
        *self
            .explicit
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The theme to apply for a client reporting `ambient`.
    #[must_use]
    pub fn resolve(&self, ambient: Option<Theme>) -> Theme {
        self.explicit().or(ambient).unwrap_or(self.fallback)
    }

    /// Flip the theme the client currently sees and persist the result.
    ///
    /// Persisting is best effort: a failed write is logged and the new
    /// theme still applies for the rest of the process lifetime.
    pub fn toggle(&self, ambient: Option<Theme>) -> Theme {
        let next = {
            let mut guard = self
                .explicit
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let next = guard.or(ambient).unwrap_or(self.fallback).toggled();
            *guard = Some(next);
            next
        };
        if let Err(e) = self.store.save(next) {
            tracing::warn!(name: "theme.persist.failed", error = %e, "Theme not persisted");
        }
        tracing::info!(name: "theme.toggled", theme = %next, "Theme toggled");
        next
    }
}
