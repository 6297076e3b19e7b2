//! Sans-IO admission control for multistream media requests.
//!
//! In a multi-party session the receiving side tells the remote media server, for every
//! remote source it wants, which receive slot to deliver it into and at what frame size and
//! bitrate. The number of simultaneous high resolution streams is bounded by how many
//! macroblocks per second the local decoders can handle.
//!
//! The [`MediaRequestManager`] keeps track of all outstanding [`MediaRequest`]s. On commit it
//! derives frame sizes and bitrates, lowers the most expensive frame sizes until the total fits
//! the [`DegradationPreferences`], and hands the complete batch to a callback. A batch identical
//! to the one sent last is not sent again.
//!
//! # Sans-IO
//!
//! Like a Sans-IO WebRTC stack, the manager does no I/O and never looks at the clock. Slot
//! events and time are fed in through [`MediaRequestManager::handle_input()`], and
//! [`MediaRequestManager::poll_timeout()`] says when the next [`Input::Timeout`] is due.
//!
//! # Usage
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use media_request::{ActiveSpeakerInfo, CodecInfo, DegradationPreferences, Input};
//! use media_request::{MediaRequest, MediaRequestManager, Resolution, SourceState};
//! use media_request::TransportSlotId;
//!
//! let sent = Arc::new(Mutex::new(Vec::new()));
//! let sink = sent.clone();
//!
//! let mut manager = MediaRequestManager::builder()
//!     .set_degradation_preferences(DegradationPreferences::with_limit(32400))
//!     .build(move |batch| sink.lock().unwrap().push(batch));
//!
//! let slots: Vec<_> = (0..4)
//!     .map(|i| manager.add_receive_slot(TransportSlotId::from(i)))
//!     .collect();
//!
//! for slot in &slots {
//!     manager.handle_input(Input::SourceUpdate(*slot, SourceState::Live));
//! }
//!
//! let info = ActiveSpeakerInfo {
//!     priority: 255,
//!     cross_priority_duplication: false,
//!     cross_policy_duplication: false,
//!     prefer_live_video: true,
//! };
//! let codec = CodecInfo::with_resolution(Resolution::Large);
//! let id = manager.add_request(MediaRequest::active_speaker(info, slots, Some(codec)), true)?;
//!
//! // 4 × 8192 macroblocks is above the budget, so all four get 720p.
//! assert_eq!(manager.effective(id).unwrap().frame_size, Some(3600));
//! assert_eq!(sent.lock().unwrap().len(), 1);
//! # Ok::<(), media_request::MediaRequestError>(())
//! ```
//!
//! # Threads
//!
//! The manager is `Send` but expects a single driver. All operations take `&mut self`, so
//! sharing it between threads means putting it behind a mutex, which keeps every
//! recompute-then-send atomic.

#![forbid(unsafe_code)]
#![allow(clippy::new_without_default)]
#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

mod bitrate;
pub use bitrate::{max_mbps, recommended_bitrate, Bitrate, AUDIO_BITRATE, DEFAULT_MAX_FPS};

mod config;
pub use config::{DegradationPreferences, MediaRequestConfig, DEFAULT_DEBOUNCE};

pub mod degrade;
use degrade::{Demand, TIER_LADDER};

mod id;
pub use id::{Csi, Pt, RequestId, SlotId, TransportSlotId};

mod request;
pub use request::{ActiveSpeakerInfo, CodecInfo, Effective, MediaKind, MediaRequest};
pub use request::{PolicyInfo, Resolution, DEFAULT_MAX_FS};

mod slot;
use slot::SlotTable;
pub use slot::{ReceiveSlot, SourceState};

pub mod wire;
use wire::{CodecDescriptor, H264Descriptor, PolicySpecificInfo, WireMediaRequest, WirePolicy};

mod util;
use util::Pii;

/// Errors for invalid requests passed to [`MediaRequestManager::add_request()`], and for
/// [`MediaRequestManager::remove_receive_slot()`].
///
/// Nothing in the manager changes when an error is returned.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MediaRequestError {
    /// Receiver-selected requests deliver one source into exactly one slot.
    #[error("Receiver-selected request needs exactly one receive slot, got {0}")]
    ReceiverSelectedSlotCount(usize),

    /// Active-speaker requests need somewhere to deliver into.
    #[error("Active-speaker request needs at least one receive slot")]
    NoReceiveSlots,

    /// The slot was not added with [`MediaRequestManager::add_receive_slot()`].
    #[error("Receive slot is unknown {0}")]
    UnknownReceiveSlot(SlotId),

    /// A slot can't be removed while a request delivers into it.
    #[error("Receive slot {0} is used by request {1}")]
    ReceiveSlotInUse(SlotId, RequestId),
}

/// Input as expected by [`MediaRequestManager::handle_input()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Time has moved on. Fires debounced frame size updates that are due.
    Timeout(Instant),

    /// The source state of a receive slot changed.
    ///
    /// If any request uses the slot, this commits straight away.
    SourceUpdate(SlotId, SourceState),

    /// The transport thinks the slot would do with a smaller frame size.
    ///
    /// The new size is applied to every request using the slot once no further update
    /// arrived for the debounce period (see [`MediaRequestConfig::set_debounce()`]).
    MaxFsUpdate(Instant, SlotId, u32),
}

/// Keeps the outstanding media requests and sends them to the transport when they change.
///
/// See the [crate documentation](crate) for an example.
pub struct MediaRequestManager {
    kind: MediaKind,
    degradation: DegradationPreferences,
    debounce: Duration,
    slots: SlotTable,
    requests: Vec<ClientRequest>,
    next_id: RequestId,
    last_sent: Option<Vec<WireMediaRequest>>,
    send: Box<dyn FnMut(Vec<WireMediaRequest>) + Send>,
}

struct ClientRequest {
    id: RequestId,
    request: MediaRequest,
    preferred_max_fs: Option<u32>,
    pending: Option<PendingMaxFs>,
    effective: Option<Effective>,
}

#[derive(Debug, Clone, Copy)]
struct PendingMaxFs {
    at: Instant,
    max_fs: u32,
}

impl ClientRequest {
    fn codec_info(&self) -> CodecInfo {
        self.request.codec_info.unwrap_or_default()
    }

    /// Frame size to degrade from. Never above what the caller asked for.
    fn requested_max_fs(&self) -> u32 {
        let preferred = self.preferred_max_fs.unwrap_or(DEFAULT_MAX_FS);
        preferred.min(self.codec_info().max_fs_or_default())
    }

    fn uses_slot(&self, slot: SlotId) -> bool {
        self.request.receive_slots.contains(&slot)
    }
}

impl MediaRequestManager {
    /// Creates a new video manager with default settings.
    ///
    /// To configure the instance, use [`MediaRequestConfig`].
    pub fn new(send: impl FnMut(Vec<WireMediaRequest>) + Send + 'static) -> Self {
        MediaRequestConfig::default().build(send)
    }

    /// Creates a config builder that configures a [`MediaRequestManager`].
    pub fn builder() -> MediaRequestConfig {
        MediaRequestConfig::new()
    }

    pub(crate) fn new_from_config(
        config: MediaRequestConfig,
        send: Box<dyn FnMut(Vec<WireMediaRequest>) + Send>,
    ) -> Self {
        MediaRequestManager {
            kind: config.kind(),
            degradation: config.degradation_preferences(),
            debounce: config.debounce(),
            slots: SlotTable::default(),
            requests: vec![],
            next_id: RequestId::from(0),
            last_sent: None,
            send,
        }
    }

    /// The kind of media this manager requests.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Register a transport receive slot so requests can refer to it.
    ///
    /// The slot starts out in [`SourceState::NoSource`].
    pub fn add_receive_slot(&mut self, transport: TransportSlotId) -> SlotId {
        let id = self.slots.insert(transport);
        debug!("Add receive slot {} for transport slot {}", id, transport);
        id
    }

    /// Release a receive slot that no request uses any more.
    ///
    /// Slot ids are not reused, so a request referring to the removed slot is rejected with
    /// [`MediaRequestError::UnknownReceiveSlot`].
    pub fn remove_receive_slot(&mut self, id: SlotId) -> Result<ReceiveSlot, MediaRequestError> {
        if let Some(r) = self.requests.iter().find(|r| r.uses_slot(id)) {
            return Err(MediaRequestError::ReceiveSlotInUse(id, r.id));
        }

        let slot = self
            .slots
            .remove(id)
            .ok_or(MediaRequestError::UnknownReceiveSlot(id))?;

        debug!("Remove receive slot {}", id);

        Ok(slot)
    }

    /// A registered receive slot.
    pub fn receive_slot(&self, id: SlotId) -> Option<&ReceiveSlot> {
        self.slots.get(id)
    }

    /// Add a request.
    ///
    /// Unless `commit` is set the request is only staged, and goes out with the next commit.
    pub fn add_request(
        &mut self,
        request: MediaRequest,
        commit: bool,
    ) -> Result<RequestId, MediaRequestError> {
        self.validate(&request)?;

        let id = self.next_id;
        self.next_id = id.next();

        match &request.policy {
            PolicyInfo::ActiveSpeaker(info) => debug!(
                "Add request {}: active-speaker priority {} with {} slots",
                id,
                info.priority,
                request.receive_slots.len()
            ),
            PolicyInfo::ReceiverSelected { csi } => {
                debug!("Add request {}: receiver-selected csi {}", id, Pii(csi))
            }
        }

        self.requests.push(ClientRequest {
            id,
            request,
            preferred_max_fs: None,
            pending: None,
            effective: None,
        });

        if commit {
            self.commit();
        }

        Ok(id)
    }

    fn validate(&self, request: &MediaRequest) -> Result<(), MediaRequestError> {
        let count = request.receive_slots.len();

        match request.policy {
            PolicyInfo::ActiveSpeaker(_) if count == 0 => {
                return Err(MediaRequestError::NoReceiveSlots)
            }
            PolicyInfo::ReceiverSelected { .. } if count != 1 => {
                return Err(MediaRequestError::ReceiverSelectedSlotCount(count))
            }
            _ => {}
        }

        if let Some(unknown) = request
            .receive_slots
            .iter()
            .find(|s| !self.slots.contains(**s))
        {
            return Err(MediaRequestError::UnknownReceiveSlot(*unknown));
        }

        Ok(())
    }

    /// Remove a request.
    ///
    /// A pending preferred frame size update for the request is dropped with it. Unknown
    /// ids are ignored.
    pub fn cancel_request(&mut self, id: RequestId, commit: bool) {
        let before = self.requests.len();
        self.requests.retain(|r| r.id != id);

        if self.requests.len() == before {
            debug!("Cancel of unknown request {}", id);
        } else {
            debug!("Cancel request {}", id);
        }

        if commit {
            self.commit();
        }
    }

    /// Drop all requests without sending anything.
    ///
    /// The next commit sends the (possibly empty) batch if it differs from the one sent last.
    pub fn reset(&mut self) {
        debug!("Reset {} requests", self.requests.len());
        self.requests.clear();
    }

    /// Forget the batch sent last, so that the next commit sends even if nothing changed.
    pub fn clear_previous_requests(&mut self) {
        self.last_sent = None;
    }

    /// Current degradation preferences.
    pub fn degradation_preferences(&self) -> DegradationPreferences {
        self.degradation
    }

    /// Change the degradation preferences. This commits straight away.
    pub fn set_degradation_preferences(&mut self, prefs: DegradationPreferences) {
        debug!(
            "Set max macroblocks limit: {}",
            prefs.max_macroblocks_limit
        );
        self.degradation = prefs;
        self.commit();
    }

    /// The request as it was added.
    pub fn request(&self, id: RequestId) -> Option<&MediaRequest> {
        self.client_request(id).map(|r| &r.request)
    }

    /// Parameters derived for the request on the last commit.
    ///
    /// `None` for unknown requests and for requests that were not committed yet.
    pub fn effective(&self, id: RequestId) -> Option<Effective> {
        self.client_request(id).and_then(|r| r.effective)
    }

    fn client_request(&self, id: RequestId) -> Option<&ClientRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Recalculate all requests and send them, unless the result is the same as last sent.
    pub fn commit(&mut self) {
        let batch = self.derive_batch();

        if self.last_sent.as_ref() == Some(&batch) {
            debug!("Skip sending duplicate media requests");
            return;
        }

        info!("Send {} media requests", batch.len());
        self.last_sent = Some(batch.clone());
        (self.send)(batch);
    }

    fn derive_batch(&mut self) -> Vec<WireMediaRequest> {
        let frame_sizes: Vec<Option<u32>> = match self.kind {
            MediaKind::Audio => vec![None; self.requests.len()],
            MediaKind::Video => {
                let demands: Vec<Demand> = self
                    .requests
                    .iter()
                    .map(|r| Demand {
                        max_fs: r.requested_max_fs(),
                        live_slots: r
                            .request
                            .receive_slots
                            .iter()
                            .filter(|s| self.slots.is_live(**s))
                            .count() as u64,
                    })
                    .collect();

                degrade::degrade(
                    &demands,
                    &TIER_LADDER,
                    self.degradation.max_macroblocks_limit,
                )
                .into_iter()
                .map(Some)
                .collect()
            }
        };

        let kind = self.kind;
        let slots = &self.slots;

        self.requests
            .iter_mut()
            .zip(frame_sizes)
            .map(|(r, frame_size)| {
                let codec = r.codec_info();
                let max_fps = codec.max_fps_or_default();

                let max_payload_bitrate =
                    recommended_bitrate(kind, frame_size.unwrap_or(DEFAULT_MAX_FS));
                let max_mbps = frame_size.map(|fs| max_mbps(fs, max_fps));

                r.effective = Some(Effective {
                    frame_size,
                    max_mbps,
                    max_payload_bitrate,
                });

                let codec_infos = match (frame_size, max_mbps) {
                    (Some(max_fs), Some(max_mbps)) => vec![CodecDescriptor::h264(H264Descriptor {
                        max_fs,
                        max_fps,
                        max_mbps,
                        max_width: codec.max_width,
                        max_height: codec.max_height,
                    })],
                    _ => vec![],
                };

                let (policy, policy_specific_info): (WirePolicy, PolicySpecificInfo) =
                    r.request.policy.into();

                WireMediaRequest {
                    policy,
                    policy_specific_info,
                    receive_slots: r
                        .request
                        .receive_slots
                        .iter()
                        .filter_map(|s| slots.get(*s).map(|s| s.transport()))
                        .collect(),
                    max_payload_bits_per_second: max_payload_bitrate,
                    codec_infos,
                }
            })
            .collect()
    }

    /// Feed slot events and time into the manager.
    pub fn handle_input(&mut self, input: Input) {
        match input {
            Input::Timeout(now) => self.handle_timeout(now),
            Input::SourceUpdate(slot, state) => self.handle_source_update(slot, state),
            Input::MaxFsUpdate(now, slot, max_fs) => self.handle_max_fs_update(now, slot, max_fs),
        }
    }

    /// When the manager next wants an [`Input::Timeout`]. `None` if nothing is pending.
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.requests
            .iter()
            .filter_map(|r| r.pending.map(|p| p.at))
            .min()
    }

    fn handle_timeout(&mut self, now: Instant) {
        let mut fired = false;

        for r in &mut self.requests {
            let Some(pending) = r.pending else {
                continue;
            };

            if pending.at <= now {
                debug!(
                    "Apply preferred max-fs {} to request {}",
                    pending.max_fs, r.id
                );
                r.preferred_max_fs = Some(pending.max_fs);
                r.pending = None;
                fired = true;
            }
        }

        if fired {
            self.commit();
        }
    }

    fn handle_source_update(&mut self, slot: SlotId, state: SourceState) {
        let Some(receive_slot) = self.slots.get_mut(slot) else {
            debug!("Source update for unknown receive slot {}", slot);
            return;
        };

        if receive_slot.set_source_state(state) {
            trace!("Receive slot {} source state: {:?}", slot, state);
        }

        if self.requests.iter().any(|r| r.uses_slot(slot)) {
            self.commit();
        }
    }

    fn handle_max_fs_update(&mut self, now: Instant, slot: SlotId, max_fs: u32) {
        let Some(at) = now.checked_add(self.debounce) else {
            warn!(
                "Debounce {:?} out of range, drop max-fs {} for receive slot {}",
                self.debounce, max_fs, slot
            );
            return;
        };

        for r in self.requests.iter_mut().filter(|r| r.uses_slot(slot)) {
            trace!(
                "Receive slot {} prefers max-fs {}, request {} due at {:?}",
                slot,
                max_fs,
                r.id,
                at
            );
            // Replaces any earlier pending update for the request.
            r.pending = Some(PendingMaxFs { at, max_fs });
        }
    }
}

impl fmt::Debug for MediaRequestManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaRequestManager")
            .field("kind", &self.kind)
            .field("degradation", &self.degradation)
            .field("slots", &self.slots.len())
            .field("requests", &self.requests.len())
            .finish()
    }
}
