#![allow(missing_docs)]

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

macro_rules! num_id {
    ($id:ident, $t:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $id($t);

        impl $id {
            pub const fn new(v: $t) -> Self {
                $id(v)
            }
        }

        impl Deref for $id {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$t> for $id {
            fn from(v: $t) -> Self {
                $id(v)
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

num_id!(RequestId, u64);
num_id!(SlotId, u32);
num_id!(TransportSlotId, u32);
num_id!(Csi, u64);
num_id!(Pt, u8);

impl RequestId {
    pub(crate) fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl Default for SlotId {
    fn default() -> Self {
        SlotId(0)
    }
}

impl SlotId {
    pub(crate) fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}
