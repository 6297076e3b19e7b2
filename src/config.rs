//! Configuration of a [`MediaRequestManager`] before it is built.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::request::MediaKind;
use crate::wire::WireMediaRequest;
use crate::MediaRequestManager;

/// How long a preferred frame size update from a receive slot waits before it is applied.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Knobs for frame size degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradationPreferences {
    /// Budget for the sum of `frame size × live slots` over all video requests.
    pub max_macroblocks_limit: u64,
}

impl DegradationPreferences {
    /// No limit, nothing is ever degraded.
    pub const UNLIMITED: Self = DegradationPreferences {
        max_macroblocks_limit: u64::MAX,
    };

    /// Preferences with the given macroblock budget.
    pub fn with_limit(max_macroblocks_limit: u64) -> Self {
        DegradationPreferences {
            max_macroblocks_limit,
        }
    }
}

impl Default for DegradationPreferences {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

/// Customized config for creating a [`MediaRequestManager`].
///
/// ```
/// use media_request::{DegradationPreferences, MediaKind, MediaRequestConfig};
///
/// let manager = MediaRequestConfig::new()
///     .set_kind(MediaKind::Video)
///     .set_degradation_preferences(DegradationPreferences::with_limit(32400))
///     .build(|batch| println!("send {} requests", batch.len()));
/// ```
///
/// Configs implement [`Clone`] to help create multiple managers, typically one for audio
/// and one for video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaRequestConfig {
    kind: MediaKind,
    degradation_preferences: DegradationPreferences,
    debounce: Duration,
}

impl MediaRequestConfig {
    /// Creates a new default config.
    pub fn new() -> Self {
        MediaRequestConfig::default()
    }

    /// The kind of every request in the manager.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Set the kind of media requested.
    ///
    /// Defaults to [`MediaKind::Video`].
    pub fn set_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Degradation preferences at start.
    pub fn degradation_preferences(&self) -> DegradationPreferences {
        self.degradation_preferences
    }

    /// Set the initial degradation preferences.
    ///
    /// Defaults to [`DegradationPreferences::UNLIMITED`]. They can be changed later
    /// with [`MediaRequestManager::set_degradation_preferences()`].
    pub fn set_degradation_preferences(mut self, prefs: DegradationPreferences) -> Self {
        self.degradation_preferences = prefs;
        self
    }

    /// Quiet period after a preferred frame size update before it is applied.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Set the quiet period for preferred frame size updates.
    ///
    /// Defaults to 1 second.
    pub fn set_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Create a [`MediaRequestManager`] that sends batches to `send`.
    ///
    /// The closure is called synchronously from within the manager whenever the set of requests
    /// changes, and should hand the batch off to the transport without blocking.
    pub fn build(
        self,
        send: impl FnMut(Vec<WireMediaRequest>) + Send + 'static,
    ) -> MediaRequestManager {
        MediaRequestManager::new_from_config(self, Box::new(send))
    }
}

impl Default for MediaRequestConfig {
    fn default() -> Self {
        Self {
            kind: MediaKind::Video,
            degradation_preferences: DegradationPreferences::default(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}
