//! The disk-resident B+tree engine.
//!
//! The tree maps fixed-width `u64` keys to offsets in the value heap.
//! Internal entries carry the *maximum* key of the subtree they point at
//! (rather than the more common separator key), which buys a simple
//! descent rule at the cost of an index-rewrite protocol: whenever the
//! largest key of a node changes — an insert past the end, a delete of
//! the last entry, a borrow between siblings — the entry naming that node
//! in its parent must be rewritten, and the rewrite keeps climbing while
//! the replaced entry was itself the parent's last.
//!
//! All structural surgery happens here: recursive splits on insert,
//! borrow-or-merge rebalancing on delete, root growth and collapse, and
//! maintenance of the doubly linked leaf chain. Node slots are never
//! reclaimed; a merged-away node just becomes unreachable.

use super::heap::Heap;
use super::node::{Entry, Node, NodeKind, Offset, BALANCE, INVALID, ORDER};
use super::store::NodeStore;
use crate::errors::Error;
use std::path::Path;
use tracing::{debug, info, trace};

/// Entry index at which an overfull node is cut in two: the lower
/// `SPLIT_AT` entries stay in place, the rest move to the new right
/// sibling.
const SPLIT_AT: usize = (ORDER + 1) / 2;

pub struct Tree {
    store: NodeStore,
    heap: Heap,
    root: Offset,
}

impl Tree {
    /// Opens (or creates) the index and data files and loads the root
    /// pointer. A stored root that is `INVALID` or beyond the end of the
    /// index file means the tree is empty.
    pub fn open(index_path: &Path, data_path: &Path) -> Result<Self, Error> {
        let mut store = NodeStore::open(index_path)?;
        let heap = Heap::open(data_path)?;
        let mut root = store.read_root()?;
        if root == INVALID || root >= store.size() {
            root = INVALID;
        }
        info!(
            index = %index_path.display(),
            data = %data_path.display(),
            root,
            "Opened store"
        );
        Ok(Tree { store, heap, root })
    }

    /// Syncs the index file and drops both file handles.
    pub fn close(mut self) -> Result<(), Error> {
        self.store.sync()?;
        info!("Closed store");
        Ok(())
    }

    /// Stores `value` under a previously absent `key`.
    pub fn insert(&mut self, key: u64, value: &[u8]) -> Result<(), Error> {
        let val_off = self.heap.append(value)?;
        trace!(key, val_off, "Inserting");
        if self.root == INVALID {
            let mut leaf = self.store.allocate(NodeKind::Leaf {
                prev: INVALID,
                next: INVALID,
            });
            leaf.push_entry(Entry { key, val: val_off })?;
            self.store.flush(&leaf)?;
            return self.set_root(leaf.offset);
        }
        let mut leaf = self.descend(key)?;
        let idx = match leaf.search(key) {
            Ok(_) => return Err(Error::KeyExists(key)),
            Err(idx) => idx,
        };
        let old_max = leaf.max_key();
        leaf.insert_entry(idx, Entry { key, val: val_off })?;
        if idx + 1 == leaf.entries.len() && leaf.parent != INVALID {
            if let Some(old_max) = old_max {
                self.replace_max_key(leaf.parent, old_max, key)?;
            }
        }
        if leaf.entries.len() <= ORDER {
            self.store.flush(&leaf)
        } else {
            self.split(leaf)
        }
    }

    /// Returns the value stored under `key`.
    pub fn find(&mut self, key: u64) -> Result<Vec<u8>, Error> {
        if self.root == INVALID {
            return Err(Error::KeyNotFound(key));
        }
        let leaf = self.descend(key)?;
        // leaves are tiny, an equality scan is enough
        let entry = leaf
            .entries
            .iter()
            .find(|e| e.key == key)
            .ok_or(Error::KeyNotFound(key))?;
        self.heap.read(entry.val)
    }

    /// Replaces the value stored under `key` in place. The heap slot is
    /// reused, so the replacement must not be longer than the value it
    /// overwrites.
    pub fn update(&mut self, key: u64, value: &[u8]) -> Result<(), Error> {
        if self.root == INVALID {
            return Err(Error::KeyNotFound(key));
        }
        let leaf = self.descend(key)?;
        let idx = leaf.search(key).map_err(|_| Error::KeyNotFound(key))?;
        let val_off = leaf.entries[idx].val;
        let stored = self.heap.read(val_off)?;
        if value.len() > stored.len() {
            return Err(Error::ValueTooLong(value.len()));
        }
        trace!(key, val_off, "Updating");
        self.heap.overwrite(val_off, value)
    }

    /// Removes `key`, rebalancing the tree if the owning leaf drops below
    /// the minimum occupancy.
    pub fn delete(&mut self, key: u64) -> Result<(), Error> {
        if self.root == INVALID {
            return Err(Error::KeyNotFound(key));
        }
        let mut leaf = self.descend(key)?;
        let idx = leaf.search(key).map_err(|_| Error::KeyNotFound(key))?;
        leaf.remove_entry(idx);
        trace!(key, leaf = leaf.offset, "Deleted");
        if idx == leaf.entries.len() && leaf.parent != INVALID {
            if let Some(new_max) = leaf.max_key() {
                self.replace_max_key(leaf.parent, key, new_max)?;
            }
        }
        self.store.flush(&leaf)?;
        if leaf.offset == self.root || leaf.entries.len() >= BALANCE {
            return Ok(());
        }
        self.rebalance(leaf)
    }

    /// Renders the node structure level by level, for the console's
    /// `.tree` command.
    pub fn dump(&mut self) -> Result<Vec<String>, Error> {
        let mut lines = Vec::new();
        if self.root == INVALID {
            lines.push("(empty)".to_string());
            return Ok(lines);
        }
        let mut level = vec![self.root];
        let mut depth = 0;
        while !level.is_empty() {
            let mut next_level = Vec::new();
            let mut rendered = Vec::new();
            for offset in &level {
                let node = self.store.load(*offset)?;
                let keys: Vec<String> = node.entries.iter().map(|e| e.key.to_string()).collect();
                let tag = if node.is_leaf() { "leaf" } else { "node" };
                rendered.push(format!("{}@{}[{}]", tag, node.offset, keys.join(",")));
                if !node.is_leaf() {
                    next_level.extend(node.entries.iter().map(|e| e.val));
                }
            }
            lines.push(format!("{}: {}", depth, rendered.join(" ")));
            level = next_level;
            depth += 1;
        }
        Ok(lines)
    }

    /// Walks from the root to the leaf that owns `key`.
    fn descend(&mut self, key: u64) -> Result<Node, Error> {
        let mut node = self.store.load(self.root)?;
        while let NodeKind::Internal = node.kind {
            let child = node.entries[node.route(key)].val;
            node = self.store.load(child)?;
        }
        Ok(node)
    }

    /// The parent-index rewrite: replaces the entry keyed `old_key` with
    /// `new_key` in the node at `parent`, then keeps climbing while the
    /// replaced entry was the parent's last (and therefore its maximum).
    /// Stops at the root or as soon as `old_key` is not present.
    fn replace_max_key(
        &mut self,
        mut parent: Offset,
        old_key: u64,
        new_key: u64,
    ) -> Result<(), Error> {
        while parent != INVALID {
            let mut node = self.store.load(parent)?;
            let idx = match node.search(old_key) {
                Ok(idx) => idx,
                Err(_) => break,
            };
            node.entries[idx].key = new_key;
            let was_last = idx + 1 == node.entries.len();
            self.store.flush(&node)?;
            if !was_last {
                break;
            }
            parent = node.parent;
        }
        Ok(())
    }

    /// The index of the entry in `parent` pointing at `child`.
    fn position_of(parent: &Node, child: Offset) -> Result<usize, Error> {
        parent
            .entries
            .iter()
            .position(|e| e.val == child)
            .ok_or_else(|| err!(Invariant, "node {} missing from parent {}", child, parent.offset))
    }

    /// Points the in-memory root and the index-file header at `offset`.
    fn set_root(&mut self, offset: Offset) -> Result<(), Error> {
        self.root = offset;
        self.store.write_root(offset)
    }

    /// Cuts an overfull node into itself plus a new right sibling and
    /// pushes the sibling up into the parent, recursing when the parent
    /// overflows in turn. Splitting the root grows the tree by one level.
    fn split(&mut self, mut left: Node) -> Result<(), Error> {
        let mut right = self.store.allocate(match left.kind {
            NodeKind::Leaf { .. } => NodeKind::Leaf {
                prev: INVALID,
                next: INVALID,
            },
            NodeKind::Internal => NodeKind::Internal,
        });
        right.parent = left.parent;
        for entry in &left.entries[SPLIT_AT..] {
            right.push_entry(*entry)?;
        }
        left.entries.truncate(SPLIT_AT);
        debug!(left = left.offset, right = right.offset, "Splitting node");

        if let NodeKind::Leaf { next, .. } = &mut left.kind {
            // splice the new leaf into the sibling chain
            let old_next = std::mem::replace(next, right.offset);
            right.kind = NodeKind::Leaf {
                prev: left.offset,
                next: old_next,
            };
            if old_next != INVALID {
                let mut neighbour = self.store.load(old_next)?;
                if let NodeKind::Leaf { prev, .. } = &mut neighbour.kind {
                    *prev = right.offset;
                }
                self.store.flush(&neighbour)?;
            }
        } else {
            // children that moved right now answer to the new sibling
            for entry in right.entries.iter() {
                let mut child = self.store.load(entry.val)?;
                child.parent = right.offset;
                self.store.flush(&child)?;
            }
        }

        let left_max = left
            .max_key()
            .ok_or_else(|| err!(Invariant, "split left node {} empty", left.offset))?;
        let right_max = right
            .max_key()
            .ok_or_else(|| err!(Invariant, "split right node {} empty", right.offset))?;

        if left.parent == INVALID {
            let mut root = self.store.allocate(NodeKind::Internal);
            root.push_entry(Entry {
                key: left_max,
                val: left.offset,
            })?;
            root.push_entry(Entry {
                key: right_max,
                val: right.offset,
            })?;
            left.parent = root.offset;
            right.parent = root.offset;
            self.store.flush(&left)?;
            self.store.flush(&right)?;
            self.store.flush(&root)?;
            debug!(root = root.offset, "Grew a new root");
            return self.set_root(root.offset);
        }

        self.store.flush(&left)?;
        self.store.flush(&right)?;

        let mut parent = self.store.load(left.parent)?;
        let pos = Self::position_of(&parent, left.offset)?;
        parent.entries[pos].key = left_max;
        parent.insert_entry(
            pos + 1,
            Entry {
                key: right_max,
                val: right.offset,
            },
        )?;
        if parent.entries.len() <= ORDER {
            self.store.flush(&parent)
        } else {
            self.split(parent)
        }
    }

    /// Restores the minimum occupancy of an underfull non-root node,
    /// first by borrowing a spare entry from a sibling, otherwise by
    /// merging with one.
    fn rebalance(&mut self, mut node: Node) -> Result<(), Error> {
        let parent = self.store.load(node.parent)?;
        let pos = Self::position_of(&parent, node.offset)?;

        if pos > 0 {
            let mut left = self.store.load(parent.entries[pos - 1].val)?;
            if left.entries.len() > BALANCE {
                let moved = left
                    .entries
                    .pop()
                    .ok_or_else(|| err!(Invariant, "empty sibling {}", left.offset))?;
                let left_max = left
                    .max_key()
                    .ok_or_else(|| err!(Invariant, "drained sibling {}", left.offset))?;
                node.insert_entry(0, moved)?;
                if !node.is_leaf() {
                    let mut child = self.store.load(moved.val)?;
                    child.parent = node.offset;
                    self.store.flush(&child)?;
                }
                self.store.flush(&left)?;
                self.store.flush(&node)?;
                debug!(node = node.offset, donor = left.offset, "Borrowed from left sibling");
                // the donor's maximum shrank
                return self.replace_max_key(node.parent, moved.key, left_max);
            }
        }
        if pos + 1 < parent.entries.len() {
            let mut right = self.store.load(parent.entries[pos + 1].val)?;
            if right.entries.len() > BALANCE {
                let moved = right.remove_entry(0);
                let old_max = node
                    .max_key()
                    .ok_or_else(|| err!(Invariant, "empty non-root node {}", node.offset))?;
                node.push_entry(moved)?;
                if !node.is_leaf() {
                    let mut child = self.store.load(moved.val)?;
                    child.parent = node.offset;
                    self.store.flush(&child)?;
                }
                self.store.flush(&right)?;
                self.store.flush(&node)?;
                debug!(node = node.offset, donor = right.offset, "Borrowed from right sibling");
                // this node's maximum grew
                return self.replace_max_key(node.parent, old_max, moved.key);
            }
        }

        if pos + 1 < parent.entries.len() {
            let right = self.store.load(parent.entries[pos + 1].val)?;
            self.merge(parent, pos, node, right)
        } else if pos > 0 {
            let left = self.store.load(parent.entries[pos - 1].val)?;
            self.merge(parent, pos - 1, left, node)
        } else {
            Err(err!(Invariant, "underfull node {} has no siblings", node.offset))
        }
    }

    /// Folds `left` into its right sibling. The vanished node's entry is
    /// removed from the parent, which may leave the parent underfull and
    /// cascade, or leave the root with a single child and collapse it.
    fn merge(
        &mut self,
        mut parent: Node,
        left_pos: usize,
        left: Node,
        mut right: Node,
    ) -> Result<(), Error> {
        debug!(gone = left.offset, survivor = right.offset, "Merging nodes");
        for (i, entry) in left.entries.iter().enumerate() {
            right.insert_entry(i, *entry)?;
        }
        match (&left.kind, &mut right.kind) {
            (&NodeKind::Leaf { prev: left_prev, .. }, NodeKind::Leaf { prev, .. }) => {
                // the survivor takes over the vanished leaf's place in the chain
                *prev = left_prev;
                if left_prev != INVALID {
                    let mut neighbour = self.store.load(left_prev)?;
                    if let NodeKind::Leaf { next, .. } = &mut neighbour.kind {
                        *next = right.offset;
                    }
                    self.store.flush(&neighbour)?;
                }
            }
            _ => {
                for entry in left.entries.iter() {
                    let mut child = self.store.load(entry.val)?;
                    child.parent = right.offset;
                    self.store.flush(&child)?;
                }
            }
        }
        self.store.flush(&right)?;
        parent.remove_entry(left_pos);

        if parent.offset == self.root {
            if parent.entries.len() == 1 {
                // a root with a single child is pure indirection
                let child_off = parent.entries[0].val;
                let mut child = self.store.load(child_off)?;
                child.parent = INVALID;
                self.store.flush(&child)?;
                debug!(root = child_off, "Collapsing root");
                return self.set_root(child_off);
            }
            return self.store.flush(&parent);
        }
        self.store.flush(&parent)?;
        if parent.entries.len() >= BALANCE {
            return Ok(());
        }
        self.rebalance(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::node::slot_size;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn open_tree(dir: &TempDir) -> Tree {
        Tree::open(&dir.path().join("test.idx"), &dir.path().join("test.db")).unwrap()
    }

    fn pair_value(key: u64) -> Vec<u8> {
        format!("{} + {}", key, key).into_bytes()
    }

    /// Walks the whole tree checking the structural invariants: sorted
    /// unique keys, occupancy bounds, max-key parent entries, parent
    /// back-links, and the leaf sibling chain.
    fn check_structure(tree: &mut Tree) {
        if tree.root == INVALID {
            return;
        }
        let root = tree.store.load(tree.root).unwrap();
        assert_eq!(root.parent, INVALID, "root must not have a parent");
        let mut leaves = Vec::new();
        check_node(tree, &root, true, &mut leaves);

        let mut prev = INVALID;
        for (i, offset) in leaves.iter().enumerate() {
            let leaf = tree.store.load(*offset).unwrap();
            match leaf.kind {
                NodeKind::Leaf { prev: p, next: n } => {
                    assert_eq!(p, prev, "prev link of leaf {}", offset);
                    let expect_next = leaves.get(i + 1).copied().unwrap_or(INVALID);
                    assert_eq!(n, expect_next, "next link of leaf {}", offset);
                }
                NodeKind::Internal => panic!("internal node {} in leaf chain", offset),
            }
            prev = *offset;
        }
    }

    fn check_node(tree: &mut Tree, node: &Node, is_root: bool, leaves: &mut Vec<Offset>) -> Option<u64> {
        assert!(node.active, "node {} inactive", node.offset);
        if is_root {
            assert!(node.entries.len() <= ORDER);
        } else {
            assert!(
                (BALANCE..=ORDER).contains(&node.entries.len()),
                "occupancy of node {} is {}",
                node.offset,
                node.entries.len()
            );
        }
        for pair in node.entries.windows(2) {
            assert!(pair[0].key < pair[1].key, "keys out of order in node {}", node.offset);
        }
        match node.kind {
            NodeKind::Leaf { .. } => {
                leaves.push(node.offset);
                node.max_key()
            }
            NodeKind::Internal => {
                for entry in node.entries.iter() {
                    let child = tree.store.load(entry.val).unwrap();
                    assert_eq!(child.parent, node.offset, "parent link of node {}", child.offset);
                    let child_max = check_node(tree, &child, false, leaves);
                    assert_eq!(
                        child_max,
                        Some(entry.key),
                        "max-key index entry for child {}",
                        child.offset
                    );
                }
                node.max_key()
            }
        }
    }

    #[test]
    fn sequential_inserts_stay_findable() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        for key in 1..=13u64 {
            tree.insert(key, &pair_value(key)).unwrap();
            for seen in 1..=key {
                assert_eq!(tree.find(seen).unwrap(), pair_value(seen));
            }
            check_structure(&mut tree);
        }
        // thirteen ascending inserts leave the leaves two levels below the root
        let root = tree.store.load(tree.root).unwrap();
        assert!(!root.is_leaf());
        let child = tree.store.load(root.entries[0].val).unwrap();
        assert!(!child.is_leaf());
        let grandchild = tree.store.load(child.entries[0].val).unwrap();
        assert!(grandchild.is_leaf());
    }

    #[test]
    fn six_inserts_split_once() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        for key in 1..=6u64 {
            tree.insert(key, &pair_value(key)).unwrap();
        }
        let root = tree.store.load(tree.root).unwrap();
        assert!(!root.is_leaf());
        assert_eq!(root.entries.len(), 2);
        assert_eq!(root.entries[0].key, 2);
        assert_eq!(root.entries[1].key, 6);
        let left = tree.store.load(root.entries[0].val).unwrap();
        let right = tree.store.load(root.entries[1].val).unwrap();
        let left_keys: Vec<u64> = left.entries.iter().map(|e| e.key).collect();
        let right_keys: Vec<u64> = right.entries.iter().map(|e| e.key).collect();
        assert_eq!(left_keys, vec![1, 2]);
        assert_eq!(right_keys, vec![3, 4, 5, 6]);
        check_structure(&mut tree);
    }

    #[test]
    fn delete_cascade_keeps_survivors() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        for key in 1..=11u64 {
            tree.insert(key, &pair_value(key)).unwrap();
        }
        for key in [4u64, 8, 9] {
            tree.delete(key).unwrap();
            check_structure(&mut tree);
        }
        for key in [4u64, 8, 9] {
            assert!(matches!(tree.find(key), Err(Error::KeyNotFound(_))));
        }
        for key in (1..=11u64).filter(|k| ![4, 8, 9].contains(k)) {
            assert_eq!(tree.find(key).unwrap(), pair_value(key));
        }
    }

    #[test]
    fn update_respects_stored_capacity() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        tree.insert(1, b"1 + 1").unwrap();
        assert!(matches!(
            tree.update(1, b"1+1=2!"),
            Err(Error::ValueTooLong(_))
        ));
        assert_eq!(tree.find(1).unwrap(), b"1 + 1");
        tree.update(1, b"1=2").unwrap();
        assert_eq!(tree.find(1).unwrap(), b"1=2");
    }

    #[test]
    fn reopened_store_keeps_data() {
        let dir = TempDir::new().unwrap();
        {
            let mut tree = open_tree(&dir);
            for key in 1..=5u64 {
                tree.insert(key, &pair_value(key)).unwrap();
            }
            tree.close().unwrap();
        }
        let mut tree = open_tree(&dir);
        assert_eq!(tree.find(3).unwrap(), b"3 + 3");
        for key in 1..=5u64 {
            assert_eq!(tree.find(key).unwrap(), pair_value(key));
        }
        check_structure(&mut tree);
    }

    #[test]
    fn reopen_without_inserts_is_still_empty() {
        let dir = TempDir::new().unwrap();
        {
            let tree = open_tree(&dir);
            tree.close().unwrap();
        }
        let mut tree = open_tree(&dir);
        assert_eq!(tree.root, INVALID);
        assert!(matches!(tree.find(1), Err(Error::KeyNotFound(1))));
    }

    #[test]
    fn root_tracks_global_max() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        for key in 1..=9u64 {
            tree.insert(key, &pair_value(key)).unwrap();
        }
        let root = tree.store.load(tree.root).unwrap();
        assert_eq!(root.max_key(), Some(9));
        tree.delete(9).unwrap();
        let root = tree.store.load(tree.root).unwrap();
        assert_eq!(root.max_key(), Some(8));
        check_structure(&mut tree);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        tree.insert(7, b"first").unwrap();
        assert!(matches!(tree.insert(7, b"again"), Err(Error::KeyExists(7))));
        assert_eq!(tree.find(7).unwrap(), b"first");
    }

    #[test]
    fn missing_keys_are_reported() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        assert!(matches!(tree.find(1), Err(Error::KeyNotFound(1))));
        assert!(matches!(tree.delete(1), Err(Error::KeyNotFound(1))));
        assert!(matches!(tree.update(1, b"x"), Err(Error::KeyNotFound(1))));
        tree.insert(1, b"one").unwrap();
        assert!(matches!(tree.find(2), Err(Error::KeyNotFound(2))));
        assert!(matches!(tree.delete(2), Err(Error::KeyNotFound(2))));
    }

    #[test]
    fn oversized_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        let too_long = vec![b'v'; 256];
        assert!(matches!(
            tree.insert(1, &too_long),
            Err(Error::ValueTooLong(256))
        ));
        let just_fits = vec![b'v'; 255];
        tree.insert(1, &just_fits).unwrap();
        assert_eq!(tree.find(1).unwrap(), just_fits);
    }

    #[test]
    fn delete_to_empty_and_reinsert() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        tree.insert(1, b"one").unwrap();
        tree.insert(2, b"two").unwrap();
        tree.delete(1).unwrap();
        tree.delete(2).unwrap();
        assert!(matches!(tree.find(1), Err(Error::KeyNotFound(_))));
        assert!(matches!(tree.find(2), Err(Error::KeyNotFound(_))));
        tree.insert(3, b"three").unwrap();
        assert_eq!(tree.find(3).unwrap(), b"three");
        check_structure(&mut tree);
    }

    #[test]
    fn index_file_grows_by_whole_slots() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("test.idx");
        let mut tree = Tree::open(&index_path, &dir.path().join("test.db")).unwrap();
        tree.insert(1, b"one").unwrap();
        assert_eq!(
            std::fs::metadata(&index_path).unwrap().len(),
            8 + slot_size() as u64
        );
        for key in 2..=50u64 {
            tree.insert(key, b"x").unwrap();
        }
        let len = std::fs::metadata(&index_path).unwrap().len();
        assert_eq!((len - 8) % slot_size() as u64, 0);
    }

    #[test]
    fn dump_renders_every_level() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        assert_eq!(tree.dump().unwrap(), vec!["(empty)".to_string()]);
        for key in 1..=6u64 {
            tree.insert(key, &pair_value(key)).unwrap();
        }
        let lines = tree.dump().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0: node@"));
        assert!(lines[1].contains("leaf@"));
    }

    #[test]
    fn randomized_against_model() {
        let dir = TempDir::new().unwrap();
        let mut tree = open_tree(&dir);
        let mut model: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
        let mut rng = StdRng::seed_from_u64(42);

        for step in 0..2000u32 {
            let key = rng.random_range(0..200u64);
            match rng.random_range(0..100u32) {
                0..=39 => {
                    let value = format!("{:06}:{:06}", key, step).into_bytes();
                    let result = tree.insert(key, &value);
                    if model.contains_key(&key) {
                        assert!(matches!(result, Err(Error::KeyExists(_))));
                    } else {
                        result.unwrap();
                        model.insert(key, value);
                    }
                }
                40..=64 => {
                    let result = tree.delete(key);
                    if model.remove(&key).is_some() {
                        result.unwrap();
                    } else {
                        assert!(matches!(result, Err(Error::KeyNotFound(_))));
                    }
                }
                65..=79 => {
                    let value = format!("{:06}:{:06}", key, step).into_bytes();
                    let result = tree.update(key, &value);
                    if let Some(stored) = model.get_mut(&key) {
                        result.unwrap();
                        *stored = value;
                    } else {
                        assert!(matches!(result, Err(Error::KeyNotFound(_))));
                    }
                }
                _ => match model.get(&key) {
                    Some(value) => assert_eq!(&tree.find(key).unwrap(), value),
                    None => assert!(matches!(tree.find(key), Err(Error::KeyNotFound(_)))),
                },
            }
            if step % 100 == 0 {
                check_structure(&mut tree);
            }
        }
        check_structure(&mut tree);
        for (key, value) in &model {
            assert_eq!(&tree.find(*key).unwrap(), value);
        }

        tree.close().unwrap();
        let mut tree = open_tree(&dir);
        for (key, value) in &model {
            assert_eq!(&tree.find(*key).unwrap(), value);
        }
        check_structure(&mut tree);
    }
}
