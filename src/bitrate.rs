//! Recommended bitrates and macroblock rates for requested frame sizes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::MediaKind;

/// Default frame rate in 1/100 frames per second, i.e. 30 fps.
pub const DEFAULT_MAX_FPS: u32 = 3000;

/// Bitrate recommended for any audio request (opus, fullband mono music).
pub const AUDIO_BITRATE: Bitrate = Bitrate::kbps(64);

// Floor lookup: the entry with the largest frame size not above the requested one wins.
// Frame sizes below the first entry use the first entry.
const VIDEO_BITRATES: [(u32, Bitrate); 8] = [
    (60, Bitrate::new(99_000)),
    (240, Bitrate::new(199_000)),
    (576, Bitrate::new(300_000)),
    (920, Bitrate::new(640_000)),
    (1296, Bitrate::new(720_000)),
    (2304, Bitrate::new(880_000)),
    (3600, Bitrate::new(2_500_000)),
    (8192, Bitrate::new(4_000_000)),
];

/// A data rate expressed as bits per second (bps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bitrate(u64);

impl Bitrate {
    /// Zero bits per second.
    pub const ZERO: Self = Self::new(0);

    /// Bitrate from bits per second.
    pub const fn new(bps: u64) -> Self {
        Bitrate(bps)
    }

    /// Bitrate from kilobits per second.
    pub const fn kbps(kbps: u64) -> Self {
        Self::new(kbps * 1_000)
    }

    /// Bitrate from megabits per second.
    pub const fn mbps(mbps: u64) -> Self {
        Self::new(mbps * 1_000_000)
    }

    /// The value in bits per second.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Bitrate {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.0 as f64;

        match self.0 {
            0..=999 => write!(f, "{}bit/s", self.0),
            1_000..=999_999 => write!(f, "{:.3}kbit/s", rate / 1e3),
            1_000_000..=999_999_999 => write!(f, "{:.3}Mbit/s", rate / 1e6),
            _ => write!(f, "{:.3}Gbit/s", rate / 1e9),
        }
    }
}

/// Recommended max payload bitrate for a request of `kind` with the frame size ceiling `max_fs`.
///
/// Audio always gets [`AUDIO_BITRATE`], independent of any frame size.
///
/// For video the result is a step function of `max_fs` that never decreases as the frame size
/// grows. The anchors are 920 → 640kbit/s, 3600 → 2.5Mbit/s and 8192 → 4Mbit/s.
pub fn recommended_bitrate(kind: MediaKind, max_fs: u32) -> Bitrate {
    match kind {
        MediaKind::Audio => AUDIO_BITRATE,
        MediaKind::Video => VIDEO_BITRATES
            .iter()
            .rev()
            .find(|(fs, _)| max_fs >= *fs)
            .map(|(_, b)| *b)
            .unwrap_or(VIDEO_BITRATES[0].1),
    }
}

/// Macroblocks per second for a frame size and a frame rate in 1/100 fps.
pub fn max_mbps(max_fs: u32, max_fps: u32) -> u64 {
    max_fs as u64 * max_fps as u64 / 100
}
