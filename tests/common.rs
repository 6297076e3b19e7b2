#![allow(unused)]
use std::ops::{Deref, DerefMut, Range};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use media_request::wire::{CodecDescriptor, H264Descriptor, PolicySpecificInfo};
use media_request::wire::{WireMediaRequest, WirePolicy, H264_PT};
use media_request::{ActiveSpeakerInfo, Bitrate, CodecInfo, Csi, DegradationPreferences};
use media_request::{Input, MediaKind, MediaRequest, MediaRequestConfig, MediaRequestError};
use media_request::{MediaRequestManager, RequestId, SlotId, SourceState, TransportSlotId};

pub const NUM_SLOTS: u32 = 15;

pub const MAX_FS_360P: u32 = 920;
pub const MAX_FS_720P: u32 = 3600;
pub const MAX_FS_1080P: u32 = 8192;

pub const MAX_PAYLOAD_BPS_360P: u64 = 640_000;
pub const MAX_PAYLOAD_BPS_720P: u64 = 2_500_000;
pub const MAX_PAYLOAD_BPS_1080P: u64 = 4_000_000;

/// Transport handles are offset from the slot index to tell them apart in asserts.
pub const TRANSPORT_BASE: u32 = 1000;

pub type Sent = Arc<Mutex<Vec<Vec<WireMediaRequest>>>>;

/// A manager with `NUM_SLOTS` live receive slots, recording every batch it sends.
pub struct TestManager {
    pub manager: MediaRequestManager,
    pub sent: Sent,
    pub slots: Vec<SlotId>,
    pub start: Instant,
}

impl TestManager {
    pub fn new(prefs: DegradationPreferences) -> Self {
        Self::with_config(MediaRequestConfig::new().set_degradation_preferences(prefs))
    }

    pub fn with_config(config: MediaRequestConfig) -> Self {
        init_log();

        let sent: Sent = Default::default();
        let sink = sent.clone();
        let mut manager = config.build(move |batch| sink.lock().unwrap().push(batch));

        let slots = (0..NUM_SLOTS)
            .map(|i| {
                let slot = manager.add_receive_slot(TransportSlotId::from(TRANSPORT_BASE + i));
                manager.handle_input(Input::SourceUpdate(slot, SourceState::Live));
                slot
            })
            .collect();

        TestManager {
            manager,
            sent,
            slots,
            start: Instant::now(),
        }
    }

    /// Drain the batches sent so far.
    pub fn take_sent(&self) -> Vec<Vec<WireMediaRequest>> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Assert exactly one batch was sent since last time, and return it.
    pub fn sent_once(&self) -> Vec<WireMediaRequest> {
        let mut sent = self.take_sent();
        assert_eq!(sent.len(), 1, "expected one batch, got {:?}", sent);
        sent.remove(0)
    }

    pub fn assert_nothing_sent(&self) {
        let sent = self.take_sent();
        assert!(sent.is_empty(), "expected nothing sent, got {:?}", sent);
    }

    pub fn slot_range(&self, range: Range<u32>) -> Vec<SlotId> {
        range.map(|i| self.slots[i as usize]).collect()
    }

    pub fn set_source_state(&mut self, range: Range<u32>, state: SourceState) {
        for slot in self.slot_range(range) {
            self.manager
                .handle_input(Input::SourceUpdate(slot, state));
        }
    }

    pub fn add_active_speaker(
        &mut self,
        priority: u8,
        range: Range<u32>,
        max_fs: u32,
        commit: bool,
    ) -> Result<RequestId, MediaRequestError> {
        let slots = self.slot_range(range);
        let request = MediaRequest::active_speaker(
            as_info(priority),
            slots,
            Some(CodecInfo::with_max_fs(max_fs)),
        );
        self.manager.add_request(request, commit)
    }

    pub fn add_receiver_selected(
        &mut self,
        csi: u64,
        slot: u32,
        max_fs: u32,
        commit: bool,
    ) -> Result<RequestId, MediaRequestError> {
        let request = MediaRequest::receiver_selected(
            Csi::from(csi),
            self.slots[slot as usize],
            Some(CodecInfo::with_max_fs(max_fs)),
        );
        self.manager.add_request(request, commit)
    }

    pub fn timeout(&mut self, after: Duration) {
        self.manager.handle_input(Input::Timeout(self.start + after));
    }

    pub fn max_fs_update(&mut self, at: Duration, slot: u32, max_fs: u32) {
        let slot = self.slots[slot as usize];
        self.manager
            .handle_input(Input::MaxFsUpdate(self.start + at, slot, max_fs));
    }
}

impl Deref for TestManager {
    type Target = MediaRequestManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

impl DerefMut for TestManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.manager
    }
}

pub fn as_info(priority: u8) -> ActiveSpeakerInfo {
    ActiveSpeakerInfo {
        priority,
        cross_priority_duplication: true,
        cross_policy_duplication: true,
        prefer_live_video: true,
    }
}

fn transports(range: Range<u32>) -> Vec<TransportSlotId> {
    range.map(|i| TransportSlotId::from(TRANSPORT_BASE + i)).collect()
}

fn h264(max_fs: u32) -> Vec<CodecDescriptor> {
    vec![CodecDescriptor {
        payload_type: H264_PT,
        h264: H264Descriptor {
            max_fs,
            max_fps: 3000,
            max_mbps: max_fs as u64 * 30,
            max_width: None,
            max_height: None,
        },
    }]
}

/// Expected wire request for `TestManager::add_active_speaker`.
pub fn expect_active_speaker(
    priority: u8,
    range: Range<u32>,
    max_fs: u32,
    bps: u64,
) -> WireMediaRequest {
    WireMediaRequest {
        policy: WirePolicy::ActiveSpeaker,
        policy_specific_info: PolicySpecificInfo::ActiveSpeaker(as_info(priority)),
        receive_slots: transports(range),
        max_payload_bits_per_second: Bitrate::new(bps),
        codec_infos: h264(max_fs),
    }
}

/// Expected wire request for `TestManager::add_receiver_selected`.
pub fn expect_receiver_selected(csi: u64, slot: u32, max_fs: u32, bps: u64) -> WireMediaRequest {
    WireMediaRequest {
        policy: WirePolicy::ReceiverSelected,
        policy_specific_info: PolicySpecificInfo::ReceiverSelected {
            csi: Csi::from(csi),
        },
        receive_slots: transports(slot..slot + 1),
        max_payload_bits_per_second: Bitrate::new(bps),
        codec_infos: h264(max_fs),
    }
}

pub fn init_log() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    static START: Once = Once::new();

    START.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    });
}
