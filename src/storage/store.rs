//! Offset-addressed storage for node slots in the index file.
//!
//! The first 8 bytes of the file hold the current root offset; node slots
//! follow. Allocation is a bump on the file length — slots are never
//! reclaimed, a merged-away node simply becomes unreachable.

use super::node::{self, Node, NodeKind, Offset, INVALID};
use crate::errors::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Size of the index-file header holding the root offset.
pub const HEADER_SIZE: u64 = 8;

/// Placeholder written into a freshly created header; the in-memory root
/// stays `INVALID` until the first insert.
const EMPTY_ROOT: Offset = HEADER_SIZE;

pub struct NodeStore {
    file: File,
    size: u64,
}

impl NodeStore {
    /// Opens or creates the index file. A fresh file gets its 8-byte
    /// header written immediately; the first allocatable slot starts
    /// right after it.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let size = file.metadata()?.len();
        let mut store = NodeStore { file, size };
        if store.size == 0 {
            store.write_root(EMPTY_ROOT)?;
        }
        Ok(store)
    }

    /// Current length of the index file; also the next allocation offset.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Hands out the next free slot. The watermark advances immediately
    /// so consecutive allocations cannot collide; the slot bytes hit the
    /// file on the first `flush`.
    pub fn allocate(&mut self, kind: NodeKind) -> Node {
        let offset = self.size;
        self.size += node::slot_size() as u64;
        debug!(offset, "Allocated node slot");
        Node::new(offset, kind)
    }

    /// Reads one slot into a fresh in-memory copy. Loading `INVALID`
    /// yields an inactive placeholder without touching the file.
    pub fn load(&mut self, offset: Offset) -> Result<Node, Error> {
        if offset == INVALID {
            return Ok(Node::inactive());
        }
        let mut buf = vec![0u8; node::slot_size()];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;
        let node = Node::decode(&buf)?;
        if node.offset != offset {
            return Err(err!(Invariant, "slot at {} names itself {}", offset, node.offset));
        }
        Ok(node)
    }

    /// Writes the node's slot at its own offset.
    pub fn flush(&mut self, node: &Node) -> Result<(), Error> {
        let bytes = node.encode()?;
        self.file.seek(SeekFrom::Start(node.offset))?;
        self.file.write_all(&bytes)?;
        Ok(())
    }

    /// Reads the root offset out of the header.
    pub fn read_root(&mut self) -> Result<Offset, Error> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        self.file.seek(SeekFrom::Start(0))?;
        self.file
            .read_exact(&mut buf)
            .map_err(|e| err!(HeaderCorrupt, "could not read the root header: {}", e))?;
        Ok(Offset::from_le_bytes(buf))
    }

    /// Persists a new root offset in the header.
    pub fn write_root(&mut self, offset: Offset) -> Result<(), Error> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&offset.to_le_bytes())?;
        if self.size < HEADER_SIZE {
            self.size = HEADER_SIZE;
        }
        Ok(())
    }

    pub fn sync(&mut self) -> Result<(), Error> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::node::{slot_size, Entry};
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> NodeStore {
        NodeStore::open(&dir.path().join("test.idx")).unwrap()
    }

    #[test]
    fn fresh_file_gets_placeholder_header() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        assert_eq!(store.size(), HEADER_SIZE);
        assert_eq!(store.read_root().unwrap(), EMPTY_ROOT);
    }

    #[test]
    fn allocation_advances_by_whole_slots() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let first = store.allocate(NodeKind::Internal);
        let second = store.allocate(NodeKind::Internal);
        assert_eq!(first.offset, HEADER_SIZE);
        assert_eq!(second.offset, HEADER_SIZE + slot_size() as u64);
        assert_eq!(store.size(), HEADER_SIZE + 2 * slot_size() as u64);
    }

    #[test]
    fn flush_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let mut node = store.allocate(NodeKind::Leaf {
            prev: INVALID,
            next: INVALID,
        });
        node.push_entry(Entry { key: 3, val: 17 }).unwrap();
        store.flush(&node).unwrap();
        assert_eq!(store.load(node.offset).unwrap(), node);
    }

    #[test]
    fn loading_invalid_yields_inactive_node() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let node = store.load(INVALID).unwrap();
        assert!(!node.active);
        assert!(node.entries.is_empty());
    }

    #[test]
    fn root_header_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.idx");
        {
            let mut store = NodeStore::open(&path).unwrap();
            store.write_root(123).unwrap();
        }
        let mut store = NodeStore::open(&path).unwrap();
        assert_eq!(store.read_root().unwrap(), 123);
    }
}
