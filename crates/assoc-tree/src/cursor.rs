//! Lazy cursors.
//!
//! A [`Cursor`] is a plain value describing a location relative to an anchor
//! node. It is attached (caches a resolved node and the revision it was
//! resolved under), pending (anchor plus unresolved segments), or dead
//! (overflowed or detached). Extending a cursor never touches the tree.
//!
//! Reads resolve pending segments without creating anything. Writes resolve
//! them creating what is missing: a Null node becomes an Object under a key
//! segment or an Array under an index segment, missing keys are appended, and
//! arrays are extended with Null elements up to the requested index.
//!
//! A collection bumps the tree revision. Attached cursors from an earlier
//! revision no longer resolve, and pending cursors anchored at a node other
//! than the root report [`Error::Stale`]. A cursor attached inside a removed
//! subtree reports [`Error::NotFound`] from then on.

use crate::arena::Storage;
use crate::error::{Error, Result};
use crate::node::{NodeId, NodeType, Payload};
use crate::path::{PendingPath, SegmentRef, Step};
use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Live,
    Overflowed,
    Detached,
}

#[derive(Debug, Clone)]
pub struct Cursor {
    status: Status,
    anchor: NodeId,
    attached: Option<NodeId>,
    revision: u32,
    path: PendingPath,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::detached()
    }
}

impl Cursor {
    pub(crate) fn attached(id: NodeId, revision: u32) -> Self {
        Self {
            status: Status::Live,
            anchor: id,
            attached: Some(id),
            revision,
            path: PendingPath::new(),
        }
    }

    /// A permanently dead cursor: reads return defaults, writes do nothing.
    pub fn detached() -> Self {
        Self {
            status: Status::Detached,
            anchor: NodeId::ROOT,
            attached: None,
            revision: 0,
            path: PendingPath::new(),
        }
    }

    pub fn key(&self, key: impl AsRef<[u8]>) -> Cursor {
        self.with_segment(|path| path.push_key(key.as_ref()))
    }

    pub fn index(&self, index: usize) -> Cursor {
        self.with_segment(|path| path.push_index(index))
    }

    /// Extends the cursor by a key or index step.
    pub fn at<'s>(&self, step: impl Into<Step<'s>>) -> Cursor {
        match step.into() {
            Step::Key(key) => self.key(key),
            Step::Index(index) => self.index(index),
            Step::Invalid => Cursor::detached(),
        }
    }

    fn with_segment(&self, push: impl FnOnce(&mut PendingPath) -> bool) -> Cursor {
        if self.status != Status::Live {
            return self.clone();
        }
        let mut next = self.clone();
        if next.path.is_empty() {
            if let Some(id) = next.attached.take() {
                next.anchor = id;
            }
        }
        if !push(&mut next.path) {
            tracing::trace!(
                segments = next.path.len(),
                key_bytes = next.path.key_bytes(),
                "cursor path overflowed"
            );
            next.status = Status::Overflowed;
            next.path.clear();
        }
        next
    }

    /// Whether the cursor exceeded its segment or key byte budget.
    pub fn is_overflowed(&self) -> bool {
        self.status == Status::Overflowed
    }

    pub fn is_detached(&self) -> bool {
        self.status == Status::Detached
    }

    /// Number of segments not yet resolved.
    pub fn pending_segments(&self) -> usize {
        self.path.len()
    }

    pub(crate) fn reset_to_root(&mut self, revision: u32) {
        self.anchor = NodeId::ROOT;
        self.attached = None;
        self.revision = revision;
        self.path.clear();
    }

    pub(crate) fn check_status(&self) -> Result<()> {
        match self.status {
            Status::Live => Ok(()),
            Status::Overflowed => Err(Error::Overflow),
            Status::Detached => Err(Error::Detached),
        }
    }
}

impl<S: Storage> Tree<S> {
    /// True when the cursor has no pending segments and its attachment was
    /// made under the current revision.
    pub fn is_attached(&self, cursor: &Cursor) -> bool {
        self.is_valid()
            && cursor.status == Status::Live
            && cursor.path.is_empty()
            && cursor.attached.is_some()
            && cursor.revision == self.revision
    }

    fn anchor_of(&self, cursor: &Cursor) -> Result<NodeId> {
        if cursor.anchor != NodeId::ROOT && cursor.revision != self.revision {
            return Err(Error::Stale);
        }
        self.live_record(cursor.anchor)?;
        if !self.is_reachable(cursor.anchor) {
            return Err(Error::NotFound);
        }
        Ok(cursor.anchor)
    }

    fn attachment_of(&self, cursor: &Cursor) -> Result<NodeId> {
        match cursor.attached {
            Some(id) if cursor.revision == self.revision => {
                if !self.is_reachable(id) {
                    return Err(Error::NotFound);
                }
                Ok(id)
            }
            _ if cursor.revision != self.revision => Err(Error::Stale),
            _ => Err(Error::NotFound),
        }
    }

    /// Resolves the cursor without modifying the tree.
    pub fn resolve_existing(&self, cursor: &Cursor) -> Result<NodeId> {
        self.check_valid()?;
        cursor.check_status()?;
        if cursor.path.is_empty() {
            return self.attachment_of(cursor);
        }
        let mut current = self.anchor_of(cursor)?;
        for segment in cursor.path.iter() {
            current = match segment {
                SegmentRef::Key(key) => self.find_child_by_key(current, key),
                SegmentRef::Index(index) => self.find_child_by_index(current, index),
            }
            .ok_or(Error::NotFound)?;
        }
        Ok(current)
    }

    /// Resolves the cursor, creating missing nodes, and attaches it.
    ///
    /// On failure nodes created by earlier steps stay in the tree.
    pub fn ensure_attached(&mut self, cursor: &mut Cursor) -> Result<NodeId> {
        self.check_valid()?;
        cursor.check_status()?;
        if cursor.path.is_empty() {
            let result = self.attachment_of(cursor);
            if result == Err(Error::Stale) {
                cursor.attached = None;
            }
            return result;
        }
        let anchor = self.anchor_of(cursor)?;
        let id = self.ensure_path(anchor, cursor)?;
        cursor.anchor = id;
        cursor.attached = Some(id);
        cursor.revision = self.revision;
        cursor.path.clear();
        Ok(id)
    }

    fn ensure_path(&mut self, anchor: NodeId, cursor: &Cursor) -> Result<NodeId> {
        let mut current = anchor;
        for segment in cursor.path.iter() {
            current = match segment {
                SegmentRef::Key(key) => self.ensure_key(current, key)?,
                SegmentRef::Index(index) => self.ensure_index(current, index)?,
            };
        }
        Ok(current)
    }

    fn coerce_container(&mut self, id: NodeId, expected: NodeType) -> Result<()> {
        let found = self.live_record(id)?.node_type();
        if found == NodeType::Null {
            let payload = if expected == NodeType::Object {
                Payload::Object
            } else {
                Payload::Array
            };
            return self.set_payload(id, payload);
        }
        if found != expected {
            return Err(Error::TypeConflict { expected, found });
        }
        Ok(())
    }

    fn ensure_key(&mut self, parent: NodeId, key: &[u8]) -> Result<NodeId> {
        self.coerce_container(parent, NodeType::Object)?;
        if let Some(child) = self.find_child_by_key(parent, key) {
            return Ok(child);
        }
        let child = self.append_child(parent)?;
        let Some(slot) = self.arena.intern(key) else {
            self.detach(child);
            return Err(Error::StringPoolFull);
        };
        if let Some(mut record) = self.record(child) {
            record.key = Some(slot);
            self.arena.store(child, &record);
        }
        Ok(child)
    }

    fn ensure_index(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        self.coerce_container(parent, NodeType::Array)?;
        if let Some(child) = self.find_child_by_index(parent, index) {
            return Ok(child);
        }
        let mut count = self.count_children(parent);
        loop {
            let child = self.append_child(parent)?;
            if count == index {
                return Ok(child);
            }
            count += 1;
        }
    }
}
