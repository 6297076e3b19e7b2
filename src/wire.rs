//! The request batch handed to the transport layer.
//!
//! Field names serialize in camelCase to match the JSON multistream protocol, so a batch can be
//! put on the wire as is.

use serde::{Deserialize, Serialize};

use crate::bitrate::Bitrate;
use crate::id::{Csi, Pt, TransportSlotId};
use crate::request::{ActiveSpeakerInfo, PolicyInfo};

/// Payload type announced for the H.264 codec descriptor.
pub const H264_PT: Pt = Pt::new(0x80);

/// One request in the batch sent to the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMediaRequest {
    /// Policy tag.
    pub policy: WirePolicy,
    /// Parameters of `policy`.
    pub policy_specific_info: PolicySpecificInfo,
    /// Transport slot handles, in request order.
    pub receive_slots: Vec<TransportSlotId>,
    /// Max payload bitrate for each slot.
    pub max_payload_bits_per_second: Bitrate,
    /// Empty for audio, one H.264 descriptor for video.
    pub codec_infos: Vec<CodecDescriptor>,
}

/// Policy tag of a [`WireMediaRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WirePolicy {
    /// Sources chosen by speaker activity.
    ActiveSpeaker,
    /// One source chosen by the receiver.
    ReceiverSelected,
}

/// Parameters for the [`WirePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicySpecificInfo {
    /// For [`WirePolicy::ActiveSpeaker`].
    ActiveSpeaker(ActiveSpeakerInfo),
    /// For [`WirePolicy::ReceiverSelected`].
    ReceiverSelected {
        /// The requested source.
        csi: Csi,
    },
}

impl From<PolicyInfo> for (WirePolicy, PolicySpecificInfo) {
    fn from(p: PolicyInfo) -> Self {
        match p {
            PolicyInfo::ActiveSpeaker(info) => (
                WirePolicy::ActiveSpeaker,
                PolicySpecificInfo::ActiveSpeaker(info),
            ),
            PolicyInfo::ReceiverSelected { csi } => (
                WirePolicy::ReceiverSelected,
                PolicySpecificInfo::ReceiverSelected { csi },
            ),
        }
    }
}

/// Codec parameters of a video request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecDescriptor {
    /// Always [`H264_PT`].
    pub payload_type: Pt,
    /// H.264 frame parameters.
    pub h264: H264Descriptor,
}

/// H.264 frame parameters after degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct H264Descriptor {
    /// Max frame size in macroblocks.
    pub max_fs: u32,
    /// Max frame rate in 1/100 frames per second.
    pub max_fps: u32,
    /// Max macroblocks per second, `max_fs × max_fps / 100`.
    pub max_mbps: u64,
    /// Max width in pixels, if the request limits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    /// Max height in pixels, if the request limits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

impl CodecDescriptor {
    pub(crate) fn h264(h264: H264Descriptor) -> Self {
        CodecDescriptor {
            payload_type: H264_PT,
            h264,
        }
    }
}
