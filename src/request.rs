//! Media requests as handed to the [`MediaRequestManager`][crate::MediaRequestManager].

use serde::{Deserialize, Serialize};

use crate::bitrate::DEFAULT_MAX_FPS;
use crate::id::{Csi, SlotId};

/// Frame size of the default H.264 request, in macroblocks (1080p).
pub const DEFAULT_MAX_FS: u32 = 8192;

/// Audio or video. Set per manager, every request it holds has the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio requests carry no codec descriptors and are never degraded.
    Audio,
    /// Video requests take part in degradation.
    Video,
}

impl MediaKind {
    /// Tests if this is [`MediaKind::Audio`].
    pub fn is_audio(&self) -> bool {
        *self == MediaKind::Audio
    }

    /// Tests if this is [`MediaKind::Video`].
    pub fn is_video(&self) -> bool {
        *self == MediaKind::Video
    }
}

/// How the remote side chooses which source to send into the requested slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyInfo {
    /// Sources are picked dynamically by speaker activity.
    ActiveSpeaker(ActiveSpeakerInfo),
    /// One specific remote source.
    ReceiverSelected {
        /// Content source identifier of the remote source.
        csi: Csi,
    },
}

/// Parameters of an active-speaker request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSpeakerInfo {
    /// Higher priority groups are filled first.
    pub priority: u8,
    /// Whether a source may appear in several groups of different priority.
    pub cross_priority_duplication: bool,
    /// Whether a source may appear both here and in a receiver-selected request.
    pub cross_policy_duplication: bool,
    /// Prefer sources that currently send video.
    pub prefer_live_video: bool,
}

/// Named frame size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// 1080p.
    Best,
    /// 1080p.
    Large,
    /// 720p.
    Medium,
    /// 360p.
    Small,
    /// 180p.
    VerySmall,
    /// 90p.
    Thumbnail,
}

impl Resolution {
    /// Frame size ceiling in macroblocks.
    pub fn max_fs(&self) -> u32 {
        match self {
            Resolution::Best | Resolution::Large => 8192,
            Resolution::Medium => 3600,
            Resolution::Small => 920,
            Resolution::VerySmall => 240,
            Resolution::Thumbnail => 60,
        }
    }
}

/// Requested H.264 parameters. Unset values fall back to the codec defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecInfo {
    /// Max frame size in macroblocks.
    pub max_fs: Option<u32>,
    /// Max frame rate in 1/100 frames per second (3000 is 30 fps).
    pub max_fps: Option<u32>,
    /// Ignored on the wire, where it is always derived from frame size and rate.
    pub max_mbps: Option<u64>,
    /// Passed through to the remote side.
    pub max_width: Option<u32>,
    /// Passed through to the remote side.
    pub max_height: Option<u32>,
}

impl CodecInfo {
    /// Codec info with only the frame size set.
    pub fn with_max_fs(max_fs: u32) -> Self {
        CodecInfo {
            max_fs: Some(max_fs),
            ..Default::default()
        }
    }

    /// Codec info for a resolution preset.
    pub fn with_resolution(resolution: Resolution) -> Self {
        Self::with_max_fs(resolution.max_fs())
    }

    pub(crate) fn max_fs_or_default(&self) -> u32 {
        self.max_fs.unwrap_or(DEFAULT_MAX_FS)
    }

    pub(crate) fn max_fps_or_default(&self) -> u32 {
        self.max_fps.unwrap_or(DEFAULT_MAX_FPS)
    }
}

/// One outstanding ask for media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    /// The selection policy.
    pub policy: PolicyInfo,
    /// Slots to deliver into, in order.
    ///
    /// Active-speaker requests need at least one, receiver-selected exactly one.
    pub receive_slots: Vec<SlotId>,
    /// Absent for audio.
    pub codec_info: Option<CodecInfo>,
}

impl MediaRequest {
    /// An active-speaker request.
    pub fn active_speaker(
        info: ActiveSpeakerInfo,
        receive_slots: Vec<SlotId>,
        codec_info: Option<CodecInfo>,
    ) -> Self {
        MediaRequest {
            policy: PolicyInfo::ActiveSpeaker(info),
            receive_slots,
            codec_info,
        }
    }

    /// A receiver-selected request for one source into one slot.
    pub fn receiver_selected(csi: Csi, slot: SlotId, codec_info: Option<CodecInfo>) -> Self {
        MediaRequest {
            policy: PolicyInfo::ReceiverSelected { csi },
            receive_slots: vec![slot],
            codec_info,
        }
    }
}

/// Parameters derived for a request on the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effective {
    /// Frame size after degradation. `None` for audio.
    pub frame_size: Option<u32>,
    /// Macroblocks per second for `frame_size`. `None` for audio.
    pub max_mbps: Option<u64>,
    /// Max payload bitrate sent with the request.
    pub max_payload_bitrate: crate::Bitrate,
}
