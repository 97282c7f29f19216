//! Stable identifiers for layout nodes and panels.
//!
//! Both id kinds are drawn from the same per-scope [`IdAllocator`], so a node
//! and a panel never share a raw value inside one scope. `0` is reserved.
//!
//! Valid raw values are `1..=MAX_RAW_ID`. The ceiling keeps ids exact for
//! JSON readers that store numbers as doubles, and leaves the allocator room
//! that no scope can exhaust.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest raw value a [`NodeId`] or [`PanelId`] may carry (`2^53 - 1`).
pub const MAX_RAW_ID: u64 = (1 << 53) - 1;

/// Raw value outside `1..=MAX_RAW_ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("id {0} is outside 1..={max}", max = MAX_RAW_ID)]
pub struct IdRangeError(pub u64);

/// Identifier of a node in the layout tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct NodeId(u64);

/// Identifier of a panel in the panel registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PanelId(u64);

macro_rules! raw_id {
    ($name:ident, $prefix:literal) => {
        impl $name {
            /// Wrap a raw value. Returns `None` outside `1..=MAX_RAW_ID`.
            #[must_use]
            pub const fn new(raw: u64) -> Option<Self> {
                if raw == 0 || raw > MAX_RAW_ID {
                    None
                } else {
                    Some(Self(raw))
                }
            }

            /// Raw numeric value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl TryFrom<u64> for $name {
            type Error = IdRangeError;

            fn try_from(raw: u64) -> Result<Self, Self::Error> {
                Self::new(raw).ok_or(IdRangeError(raw))
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

raw_id!(NodeId, "node-");
raw_id!(PanelId, "panel-");

/// Monotonic id source owned by one scope.
///
/// Serialized as the next value to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Start allocating at `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Resume from a persisted counter. `0` is treated as `1`.
    #[must_use]
    pub const fn starting_at(next: u64) -> Self {
        Self {
            next: if next == 0 { 1 } else { next },
        }
    }

    /// Next value that will be handed out.
    #[must_use]
    pub const fn peek(self) -> u64 {
        self.next
    }

    /// Whether the next id would fall past [`MAX_RAW_ID`].
    #[must_use]
    pub const fn is_exhausted(self) -> bool {
        self.next > MAX_RAW_ID
    }

    /// Ensure future ids are strictly greater than `seen`.
    pub fn observe(&mut self, seen: u64) {
        if seen >= self.next {
            self.next = seen.saturating_add(1);
        }
    }

    pub fn node(&mut self) -> NodeId {
        NodeId(self.bump())
    }

    pub fn panel(&mut self) -> PanelId {
        PanelId(self.bump())
    }

    fn bump(&mut self) -> u64 {
        let id = self.next;
        // u64 exhaustion is not reachable from user interaction; saturate
        // rather than wrap onto the reserved zero.
        self.next = self.next.saturating_add(1);
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_reserved() {
        assert!(NodeId::new(0).is_none());
        assert!(PanelId::new(0).is_none());
        assert_eq!(PanelId::new(7).map(PanelId::get), Some(7));
    }

    #[test]
    fn allocator_shares_counter_across_kinds() {
        let mut ids = IdAllocator::new();
        let node = ids.node();
        let panel = ids.panel();
        assert_eq!(node.get(), 1);
        assert_eq!(panel.get(), 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn observe_only_moves_forward() {
        let mut ids = IdAllocator::starting_at(10);
        ids.observe(4);
        assert_eq!(ids.peek(), 10);
        ids.observe(15);
        assert_eq!(ids.peek(), 16);
    }

    #[test]
    fn ids_above_ceiling_are_rejected() {
        assert_eq!(PanelId::new(MAX_RAW_ID).map(PanelId::get), Some(MAX_RAW_ID));
        assert!(NodeId::new(MAX_RAW_ID + 1).is_none());
        assert_eq!(PanelId::try_from(u64::MAX), Err(IdRangeError(u64::MAX)));
    }

    #[test]
    fn allocator_reports_exhaustion() {
        let mut ids = IdAllocator::starting_at(1);
        ids.observe(MAX_RAW_ID - 1);
        assert!(!ids.is_exhausted());
        ids.observe(MAX_RAW_ID);
        assert!(ids.is_exhausted());
    }

    #[test]
    fn starting_at_zero_is_normalized() {
        assert_eq!(IdAllocator::starting_at(0).peek(), 1);
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(NodeId(3).to_string(), "node-3");
        assert_eq!(PanelId(4).to_string(), "panel-4");
    }

    #[test]
    fn ids_serialize_as_numbers() {
        let json = serde_json::to_string(&PanelId(9)).unwrap();
        assert_eq!(json, "9");
        let back: NodeId = serde_json::from_str("12").unwrap();
        assert_eq!(back.get(), 12);
    }

    #[test]
    fn reserved_and_oversized_ids_do_not_deserialize() {
        assert!(serde_json::from_str::<PanelId>("0").is_err());
        assert!(serde_json::from_str::<NodeId>("0").is_err());
        assert!(serde_json::from_str::<PanelId>(&u64::MAX.to_string()).is_err());

        let keyed: std::collections::BTreeMap<PanelId, u8> =
            serde_json::from_str(r#"{"5": 1}"#).unwrap();
        assert!(keyed.contains_key(&PanelId(5)));
        assert!(serde_json::from_str::<std::collections::BTreeMap<PanelId, u8>>(r#"{"0": 1}"#).is_err());
    }
}
