//! The tree: construction, node-table primitives and cursor operations.

use std::fmt;

use crate::arena::{Arena, Storage};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::node::{NodeId, NodeRecord, NodeType, Payload, StringSlot};
use crate::value::{FromValue, Scalar, Value};

/// A JSON-like value tree stored entirely inside `S`.
///
/// Node 0 is the root and is always an object. A tree built over storage too
/// small for the root is inert: every operation is a no-op and every read
/// returns its default.
pub struct Tree<S> {
    pub(crate) arena: Arena<S>,
    pub(crate) revision: u32,
}

/// Snapshot of space usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Usable bytes after alignment and capping.
    pub capacity: usize,
    /// Occupied node slots, including tombstones awaiting collection.
    pub nodes: usize,
    /// Nodes with the liveness bit set, counted when the snapshot is taken.
    /// Descendants of an unset node still count until the next collection.
    pub live_nodes: usize,
    pub node_bytes: usize,
    pub string_bytes: usize,
    pub free_bytes: usize,
    pub revision: u32,
}

impl Tree<Box<[u8]>> {
    /// Allocates a zeroed region of `bytes` once; the tree never grows it.
    pub fn with_capacity(bytes: usize) -> Self {
        Tree::new(vec![0u8; bytes].into_boxed_slice())
    }
}

impl<S: Storage> Tree<S> {
    pub fn new(storage: S) -> Self {
        let mut arena = Arena::new(storage);
        if arena.is_inert() {
            tracing::warn!("buffer cannot hold the root node; tree is inert");
            return Self { arena, revision: 0 };
        }
        let root = NodeRecord::live(Payload::Object, None);
        if arena.push_node(&root).is_none() {
            tracing::warn!("root allocation failed; tree is inert");
            return Self { arena, revision: 0 };
        }
        Self { arena, revision: 1 }
    }

    /// Whether the tree has a usable buffer and a live root.
    pub fn is_valid(&self) -> bool {
        !self.arena.is_inert() && self.arena.node_count() > 0
    }

    /// Collection counter. Cursors resolved under an older revision are stale.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Bytes between the node region and the string region.
    pub fn free_bytes(&self) -> usize {
        self.arena.free_bytes()
    }

    /// Space usage. `live_nodes` is counted by scanning the node table on
    /// each call, so it costs O(nodes); the other fields are read directly.
    pub fn stats(&self) -> TreeStats {
        if !self.is_valid() {
            return TreeStats::default();
        }
        let nodes = self.arena.node_count();
        TreeStats {
            capacity: self.arena.capacity(),
            nodes,
            live_nodes: (0..nodes).filter(|i| self.arena.is_live(*i)).count(),
            node_bytes: self.arena.node_top(),
            string_bytes: self.arena.capacity() - self.arena.str_top(),
            free_bytes: self.arena.free_bytes(),
            revision: self.revision,
        }
    }

    /// A cursor attached to the root.
    pub fn cursor(&self) -> Cursor {
        Cursor::attached(NodeId::ROOT, self.revision)
    }

    pub(crate) fn check_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::Inert)
        }
    }

    pub(crate) fn record(&self, id: NodeId) -> Option<NodeRecord> {
        self.arena.node(id)
    }

    pub(crate) fn live_record(&self, id: NodeId) -> Result<NodeRecord> {
        match self.arena.node(id) {
            Some(record) if record.live => Ok(record),
            _ => Err(Error::Tombstoned(id)),
        }
    }

    /// Whether `id` is live and its parent chain leads to the root. Children
    /// of an unset node keep their live bit but fail this check.
    pub(crate) fn is_reachable(&self, mut id: NodeId) -> bool {
        for _ in 0..=self.arena.node_count() {
            if id == NodeId::ROOT {
                return true;
            }
            match self.record(id) {
                Some(NodeRecord {
                    live: true,
                    parent: Some(parent),
                    ..
                }) => id = parent,
                _ => return false,
            }
        }
        false
    }

    pub(crate) fn key_bytes(&self, slot: Option<StringSlot>) -> Option<&[u8]> {
        slot.and_then(|slot| self.arena.string(slot))
    }

    pub(crate) fn view(&self, record: &NodeRecord) -> Value<'_> {
        match record.payload {
            Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(b),
            Payload::Int(n) => Value::Int(n),
            Payload::Double(n) => Value::Double(n),
            Payload::Str(slot) => Value::Str(self.key_bytes(slot).unwrap_or_default()),
            Payload::Object => Value::Object,
            Payload::Array => Value::Array,
        }
    }

    // ---------------------------------------------------------------------
    // Node table primitives
    // ---------------------------------------------------------------------

    /// Appends a live Null child at the end of `parent`'s sibling chain.
    pub(crate) fn append_child(&mut self, parent: NodeId) -> Result<NodeId> {
        let mut parent_record = self.live_record(parent)?;
        let child = self
            .arena
            .push_node(&NodeRecord::live(Payload::Null, Some(parent)))
            .ok_or(Error::NodeTableFull)?;
        match parent_record.first_child {
            None => {
                parent_record.first_child = Some(child);
                self.arena.store(parent, &parent_record);
            }
            Some(first) => {
                let mut tail = first;
                while let Some(next) = self.record(tail).and_then(|r| r.next_sibling) {
                    tail = next;
                }
                if let Some(mut tail_record) = self.record(tail) {
                    tail_record.next_sibling = Some(child);
                    self.arena.store(tail, &tail_record);
                }
            }
        }
        Ok(child)
    }

    /// Unlinks `id` from its parent's chain and tombstones it. Its slot and
    /// strings stay in place until the next collection.
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(mut record) = self.record(id) else {
            return;
        };
        let Some(parent) = record.parent else {
            return;
        };
        if let Some(mut parent_record) = self.record(parent) {
            if parent_record.first_child == Some(id) {
                parent_record.first_child = record.next_sibling;
                self.arena.store(parent, &parent_record);
            } else {
                let mut current = parent_record.first_child;
                while let Some(index) = current {
                    let Some(mut sibling) = self.record(index) else {
                        break;
                    };
                    if sibling.next_sibling == Some(id) {
                        sibling.next_sibling = record.next_sibling;
                        self.arena.store(index, &sibling);
                        break;
                    }
                    current = sibling.next_sibling;
                }
            }
        }
        record.parent = None;
        record.next_sibling = None;
        record.live = false;
        record.payload = Payload::Null;
        self.arena.store(id, &record);
    }

    /// Tombstones every child of `id`, leaving `id` itself in place.
    pub(crate) fn tombstone_children(&mut self, id: NodeId) {
        let Some(mut record) = self.record(id) else {
            return;
        };
        let mut current = record.first_child.take();
        self.arena.store(id, &record);
        while let Some(child) = current {
            let Some(mut child_record) = self.record(child) else {
                break;
            };
            current = child_record.next_sibling;
            child_record.parent = None;
            child_record.next_sibling = None;
            child_record.live = false;
            child_record.payload = Payload::Null;
            self.arena.store(child, &child_record);
        }
    }

    pub(crate) fn set_payload(&mut self, id: NodeId, payload: Payload) -> Result<()> {
        let mut record = self.live_record(id)?;
        record.payload = payload;
        self.arena.store(id, &record);
        Ok(())
    }

    /// Builds the payload for `value`. String bytes are interned here, before
    /// any node on the path is created.
    fn payload_for(&mut self, value: Scalar<'_>) -> Result<Payload> {
        Ok(match value {
            Scalar::Null => Payload::Null,
            Scalar::Bool(b) => Payload::Bool(b),
            Scalar::Int(n) => Payload::Int(n),
            Scalar::Double(n) => Payload::Double(n),
            Scalar::Str(bytes) => {
                Payload::Str(Some(self.arena.intern(bytes).ok_or(Error::StringPoolFull)?))
            }
        })
    }

    /// Gives back the string of a payload that was never stored, unless a key
    /// was interned below it in the meantime.
    fn release_payload(&mut self, payload: Payload, top: usize) {
        if let Payload::Str(Some(slot)) = payload {
            if self.arena.str_top() == slot.offset() {
                self.arena.reset_str_top(top);
            }
        }
    }

    /// Writes `payload` over `id`, tombstoning any children it held.
    pub(crate) fn assign(&mut self, id: NodeId, payload: Payload) -> Result<()> {
        let current = self.live_record(id)?;
        if current.first_child.is_some() {
            self.tombstone_children(id);
        }
        self.set_payload(id, payload)
    }

    pub(crate) fn find_child_by_key(&self, parent: NodeId, key: &[u8]) -> Option<NodeId> {
        let record = self.record(parent)?;
        if !record.live || record.node_type() != NodeType::Object {
            return None;
        }
        let mut current = record.first_child;
        while let Some(child) = current {
            let child_record = self.record(child)?;
            if child_record.live {
                if let Some(slot) = child_record.key {
                    if slot.len() == key.len() && self.arena.string(slot) == Some(key) {
                        return Some(child);
                    }
                }
            }
            current = child_record.next_sibling;
        }
        None
    }

    pub(crate) fn find_child_by_index(&self, parent: NodeId, target: usize) -> Option<NodeId> {
        let record = self.record(parent)?;
        if !record.live || record.node_type() != NodeType::Array {
            return None;
        }
        self.live_children(parent).nth(target)
    }

    pub(crate) fn count_children(&self, parent: NodeId) -> usize {
        self.live_children(parent).count()
    }

    /// Live children of `parent` in sibling order.
    pub(crate) fn live_children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self
            .record(parent)
            .filter(|r| r.live)
            .and_then(|r| r.first_child);
        std::iter::from_fn(move || loop {
            let id = current?;
            let record = self.record(id)?;
            current = record.next_sibling;
            if record.live {
                return Some(id);
            }
        })
    }

    // ---------------------------------------------------------------------
    // Cursor operations
    // ---------------------------------------------------------------------

    /// Assigns `value` at the cursor, creating the path as needed.
    pub fn set<'v>(&mut self, cursor: &mut Cursor, value: impl Into<Scalar<'v>>) {
        let _ = self.try_set(cursor, value);
    }

    /// Like [`set`](Self::set). A string that does not fit fails before the
    /// path is created, so the tree is left as it was.
    pub fn try_set<'v>(&mut self, cursor: &mut Cursor, value: impl Into<Scalar<'v>>) -> Result<()> {
        self.check_valid()?;
        cursor.check_status()?;
        let top = self.arena.str_top();
        let payload = self.payload_for(value.into())?;
        let result = self.ensure_attached(cursor).and_then(|id| {
            if id == NodeId::ROOT {
                return Err(Error::RootIsObject);
            }
            self.assign(id, payload)
        });
        if result.is_err() {
            self.release_payload(payload, top);
        }
        result
    }

    /// Appends `value` after the last live child of the cursor's array,
    /// creating the array if the path ends at a missing or Null node.
    pub fn append<'v>(&mut self, cursor: &mut Cursor, value: impl Into<Scalar<'v>>) {
        let _ = self.try_append(cursor, value);
    }

    /// Like [`append`](Self::append), returning a cursor to the new element.
    pub fn try_append<'v>(
        &mut self,
        cursor: &mut Cursor,
        value: impl Into<Scalar<'v>>,
    ) -> Result<Cursor> {
        self.check_valid()?;
        cursor.check_status()?;
        let top = self.arena.str_top();
        let payload = self.payload_for(value.into())?;
        let result = self.append_payload(cursor, payload);
        if result.is_err() {
            self.release_payload(payload, top);
        }
        result
    }

    fn append_payload(&mut self, cursor: &mut Cursor, payload: Payload) -> Result<Cursor> {
        let container = self.ensure_attached(cursor)?;
        let size = self.count_children(container);
        let mut element = cursor.index(size);
        let id = self.ensure_attached(&mut element)?;
        self.assign(id, payload)?;
        Ok(element)
    }

    /// Tombstones every live child of the resolved object or array.
    pub fn clear(&mut self, cursor: &Cursor) {
        let _ = self.try_clear(cursor);
    }

    pub fn try_clear(&mut self, cursor: &Cursor) -> Result<()> {
        let id = self.resolve_existing(cursor)?;
        let node_type = self.live_record(id)?.node_type();
        if !node_type.is_container() {
            return Err(Error::NotContainer(node_type));
        }
        self.tombstone_children(id);
        Ok(())
    }

    /// Removes the resolved node. The cursor is reset to the root with no
    /// attachment, so it must be extended again before use.
    pub fn unset(&mut self, cursor: &mut Cursor) {
        let _ = self.try_unset(cursor);
    }

    pub fn try_unset(&mut self, cursor: &mut Cursor) -> Result<()> {
        let id = self.resolve_existing(cursor)?;
        if id == NodeId::ROOT {
            return Err(Error::RootIsObject);
        }
        self.detach(id);
        cursor.reset_to_root(self.revision);
        Ok(())
    }

    pub fn exists(&self, cursor: &Cursor) -> bool {
        self.resolve_existing(cursor).is_ok()
    }

    pub fn node_type(&self, cursor: &Cursor) -> Option<NodeType> {
        let id = self.resolve_existing(cursor).ok()?;
        self.record(id).map(|r| r.node_type())
    }

    /// Live children of a resolved object or array; 0 for anything else.
    pub fn size(&self, cursor: &Cursor) -> usize {
        match self.resolve_existing(cursor) {
            Ok(id) if self.record(id).is_some_and(|r| r.node_type().is_container()) => {
                self.count_children(id)
            }
            _ => 0,
        }
    }

    pub fn contains(&self, cursor: &Cursor, key: impl AsRef<[u8]>) -> bool {
        self.resolve_existing(cursor)
            .ok()
            .and_then(|id| self.find_child_by_key(id, key.as_ref()))
            .is_some()
    }

    pub fn value(&self, cursor: &Cursor) -> Option<Value<'_>> {
        let id = self.resolve_existing(cursor).ok()?;
        let record = self.record(id)?;
        Some(self.view(&record))
    }

    /// Reads the cursor's value converted to `T`, or `default` when the path
    /// is missing or the value does not convert.
    pub fn get<T: FromValue>(&self, cursor: &Cursor, default: T) -> T {
        self.value(cursor)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// Raw bytes of a string value.
    pub fn get_bytes(&self, cursor: &Cursor) -> Option<&[u8]> {
        let id = self.resolve_existing(cursor).ok()?;
        match self.record(id)?.payload {
            Payload::Str(slot) => self.key_bytes(slot),
            _ => None,
        }
    }

    /// A string value, when it is valid UTF-8.
    pub fn get_str(&self, cursor: &Cursor) -> Option<&str> {
        std::str::from_utf8(self.get_bytes(cursor)?).ok()
    }

    /// Null and missing are false; booleans are themselves; numbers are
    /// non-zero; strings are non-empty; containers have a live child.
    pub fn truthy(&self, cursor: &Cursor) -> bool {
        let Ok(id) = self.resolve_existing(cursor) else {
            return false;
        };
        let Some(record) = self.record(id) else {
            return false;
        };
        match record.payload {
            Payload::Null => false,
            Payload::Bool(b) => b,
            Payload::Int(n) => n != 0,
            Payload::Double(n) => n != 0.0,
            Payload::Str(slot) => slot.is_some_and(|s| !s.is_empty()),
            Payload::Object | Payload::Array => self.live_children(id).next().is_some(),
        }
    }
}

impl<S: Storage> fmt::Debug for Tree<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("Tree")
            .field("capacity", &stats.capacity)
            .field("nodes", &stats.nodes)
            .field("free_bytes", &stats.free_bytes)
            .field("revision", &stats.revision)
            .finish()
    }
}
