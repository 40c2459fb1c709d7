//! A single B+tree node and its fixed-size on-disk slot.
//!
//! Nodes are identified by their byte offset in the index file; every
//! cross-reference (`parent`, sibling links, child pointers) is such an
//! offset. An internal entry's key is the *largest* key reachable through
//! the child it points at, so routing a key that exceeds every key in a
//! node must still fall through to the rightmost subtree — inserting past
//! the current maximum extends that subtree and the index entries above it
//! are rewritten afterwards.
//!
//! Every node serialises into exactly [`slot_size`] bytes regardless of
//! fill: unused KV slots are padded with `(INVALID, INVALID)` pairs.

use crate::errors::Error;
use bincode::config::{self, Config};
use bincode::{Decode, Encode};
use once_cell::sync::Lazy;

/// A byte position in the index or data file.
pub type Offset = u64;

/// Sentinel offset meaning "no such node".
pub const INVALID: Offset = 0xdead_beef;

/// B+tree order: the maximum number of KV entries per node.
pub const ORDER: usize = 4;

/// Balance number: the minimum number of entries in a non-root node.
pub const BALANCE: usize = (ORDER + 1) / 2;

/// Number of KV slots serialised per node, filled or not.
pub const SLOTS: usize = 2 * BALANCE;

/// Entry storage with one slot of headroom so a node can hold the
/// transient overfull state between an insert and the split it triggers.
pub type EntryVec = heapless::Vec<Entry, { ORDER + 1 }>;

/// One KV slot. In a leaf `val` is a data-file offset; in an internal
/// node it is the offset of the child whose largest key is `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub key: u64,
    pub val: Offset,
}

/// The two node shapes, distinguished statically so sibling links cannot
/// be consulted on an internal node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { prev: Offset, next: Offset },
    Internal,
}

/// An in-memory copy of one node slot.
///
/// Loading the same offset twice yields two independent copies; mutation
/// paths must load, mutate, and flush a single copy in a straight line or
/// updates are lost.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub offset: Offset,
    pub parent: Offset,
    pub active: bool,
    pub kind: NodeKind,
    pub entries: EntryVec,
}

impl Node {
    pub fn new(offset: Offset, kind: NodeKind) -> Self {
        Node {
            offset,
            parent: INVALID,
            active: true,
            kind,
            entries: EntryVec::new(),
        }
    }

    /// The placeholder returned when loading `INVALID`.
    pub fn inactive() -> Self {
        Node {
            offset: INVALID,
            parent: INVALID,
            active: false,
            kind: NodeKind::Leaf {
                prev: INVALID,
                next: INVALID,
            },
            entries: EntryVec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// The largest key in the node, `None` when empty.
    pub fn max_key(&self) -> Option<u64> {
        self.entries.last().map(|e| e.key)
    }

    /// Index of `key`, or the insertion index that keeps entries sorted.
    pub fn search(&self, key: u64) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&key, |e| e.key)
    }

    /// Descent index: the first entry whose key is `>= key`, or the last
    /// entry when `key` exceeds every key in the node.
    ///
    /// Must not be called on an empty node.
    pub fn route(&self, key: u64) -> usize {
        match self.search(key) {
            Ok(idx) => idx,
            Err(idx) if idx < self.entries.len() => idx,
            Err(_) => self.entries.len() - 1,
        }
    }

    pub fn insert_entry(&mut self, idx: usize, entry: Entry) -> Result<(), Error> {
        self.entries.insert(idx, entry).map_err(|_| {
            err!(
                Invariant,
                "node {} exceeded {} entries",
                self.offset,
                ORDER + 1
            )
        })
    }

    pub fn push_entry(&mut self, entry: Entry) -> Result<(), Error> {
        self.entries.push(entry).map_err(|_| {
            err!(
                Invariant,
                "node {} exceeded {} entries",
                self.offset,
                ORDER + 1
            )
        })
    }

    pub fn remove_entry(&mut self, idx: usize) -> Entry {
        self.entries.remove(idx)
    }
}

// On-disk slot layout

/// Exact image of a node slot, fields in file order, little-endian.
#[derive(Debug, Encode, Decode)]
struct RawNode {
    active: u8,
    is_leaf: u8,
    self_off: u64,
    prev: u64,
    next: u64,
    parent: u64,
    n_kv: u8,
    slots: [RawSlot; SLOTS],
}

#[derive(Debug, Clone, Copy, Encode, Decode)]
struct RawSlot {
    key: u64,
    val: u64,
}

impl Default for RawSlot {
    fn default() -> Self {
        RawSlot {
            key: INVALID,
            val: INVALID,
        }
    }
}

impl Default for RawNode {
    fn default() -> Self {
        RawNode {
            active: 0,
            is_leaf: 0,
            self_off: INVALID,
            prev: INVALID,
            next: INVALID,
            parent: INVALID,
            n_kv: 0,
            slots: [RawSlot::default(); SLOTS],
        }
    }
}

fn slot_config() -> impl Config {
    config::standard().with_fixed_int_encoding()
}

static SLOT_SIZE: Lazy<usize> = Lazy::new(|| {
    bincode::encode_to_vec(RawNode::default(), slot_config())
        .map(|bytes| bytes.len())
        .unwrap()
});

/// Serialised size of one node slot, computed once at startup. Every node
/// occupies exactly this many bytes regardless of fill.
pub fn slot_size() -> usize {
    *SLOT_SIZE
}

impl Node {
    /// Serialises the node into one slot image, padding unused KV slots
    /// with `(INVALID, INVALID)`.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        if self.entries.len() > SLOTS {
            return Err(err!(
                Invariant,
                "node {} flushed while overfull ({} entries)",
                self.offset,
                self.entries.len()
            ));
        }
        let (prev, next) = match self.kind {
            NodeKind::Leaf { prev, next } => (prev, next),
            NodeKind::Internal => (INVALID, INVALID),
        };
        let mut slots = [RawSlot::default(); SLOTS];
        for (slot, entry) in slots.iter_mut().zip(self.entries.iter()) {
            slot.key = entry.key;
            slot.val = entry.val;
        }
        let raw = RawNode {
            active: self.active as u8,
            is_leaf: self.is_leaf() as u8,
            self_off: self.offset,
            prev,
            next,
            parent: self.parent,
            n_kv: self.entries.len() as u8,
            slots,
        };
        let bytes = bincode::encode_to_vec(raw, slot_config())
            .map_err(|e| err!(Invariant, "failed to encode node {}: {}", self.offset, e))?;
        if bytes.len() != slot_size() {
            return Err(err!(
                Invariant,
                "node {} encoded to {} bytes, slot is {}",
                self.offset,
                bytes.len(),
                slot_size()
            ));
        }
        Ok(bytes)
    }

    /// Decodes one slot image. Padding beyond `n_kv` is ignored.
    pub fn decode(bytes: &[u8]) -> Result<Node, Error> {
        let (raw, _): (RawNode, usize) = bincode::decode_from_slice(bytes, slot_config())
            .map_err(|e| err!(Invariant, "failed to decode node slot: {}", e))?;
        if raw.n_kv as usize > SLOTS {
            return Err(err!(
                Invariant,
                "node {} claims {} entries, a slot holds {}",
                raw.self_off,
                raw.n_kv,
                SLOTS
            ));
        }
        let kind = match raw.is_leaf {
            0 => NodeKind::Internal,
            1 => NodeKind::Leaf {
                prev: raw.prev,
                next: raw.next,
            },
            other => {
                return Err(err!(
                    Invariant,
                    "invalid leaf flag {} in node {}",
                    other,
                    raw.self_off
                ))
            }
        };
        let mut entries = EntryVec::new();
        for slot in raw.slots.iter().take(raw.n_kv as usize) {
            entries
                .push(Entry {
                    key: slot.key,
                    val: slot.val,
                })
                .map_err(|_| err!(Invariant, "node {} overflows its slots", raw.self_off))?;
        }
        Ok(Node {
            offset: raw.self_off,
            parent: raw.parent,
            active: raw.active == 1,
            kind,
            entries,
        })
    }
}
