//! Receive slots, the decode targets requests deliver into.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{SlotId, TransportSlotId};

/// What a receive slot currently gets from the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceState {
    /// A decodable source is flowing into the slot.
    Live,
    /// Nothing is assigned to the slot.
    NoSource,
    /// The source has no video and shows an avatar.
    Avatar,
    /// The source cannot be decoded.
    InvalidSource,
    /// The source is blocked by the remote side.
    Blocked,
}

impl SourceState {
    /// Only live slots count towards the macroblock budget.
    pub fn is_live(&self) -> bool {
        *self == SourceState::Live
    }
}

/// Mirror of one transport-layer receive slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveSlot {
    id: SlotId,
    transport: TransportSlotId,
    source_state: SourceState,
}

impl ReceiveSlot {
    pub(crate) fn new(id: SlotId, transport: TransportSlotId) -> Self {
        ReceiveSlot {
            id,
            transport,
            source_state: SourceState::NoSource,
        }
    }

    /// Identifier in the manager.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Handle of the underlying transport slot. Sent on the wire verbatim.
    pub fn transport(&self) -> TransportSlotId {
        self.transport
    }

    /// Current source state.
    pub fn source_state(&self) -> SourceState {
        self.source_state
    }

    pub(crate) fn set_source_state(&mut self, state: SourceState) -> bool {
        let changed = self.source_state != state;
        self.source_state = state;
        changed
    }
}

#[derive(Debug, Default)]
pub(crate) struct SlotTable {
    slots: BTreeMap<SlotId, ReceiveSlot>,
    next_id: SlotId,
}

impl SlotTable {
    pub fn insert(&mut self, transport: TransportSlotId) -> SlotId {
        let id = self.next_id;
        self.next_id = id.next();
        self.slots.insert(id, ReceiveSlot::new(id, transport));
        id
    }

    pub fn remove(&mut self, id: SlotId) -> Option<ReceiveSlot> {
        self.slots.remove(&id)
    }

    pub fn get(&self, id: SlotId) -> Option<&ReceiveSlot> {
        self.slots.get(&id)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut ReceiveSlot> {
        self.slots.get_mut(&id)
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn is_live(&self, id: SlotId) -> bool {
        self.get(id)
            .map(|s| s.source_state.is_live())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
