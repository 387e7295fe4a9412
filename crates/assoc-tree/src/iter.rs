//! Iteration over the live children of an object or array.

use crate::arena::Storage;
use crate::cursor::Cursor;
use crate::node::NodeId;
use crate::tree::Tree;

/// One child visited by [`Children`].
#[derive(Debug, Clone)]
pub struct Entry<'t> {
    /// Key bytes for object members; `None` for array elements.
    pub key: Option<&'t [u8]>,
    /// Logical position among live siblings.
    pub index: usize,
    /// Cursor attached to the child.
    pub value: Cursor,
}

impl<'t> Entry<'t> {
    pub fn key_str(&self) -> Option<&'t str> {
        self.key.and_then(|key| std::str::from_utf8(key).ok())
    }
}

/// Position in a child chain, detached from any borrow of the tree.
///
/// Holds the revision it was created under and ends as soon as the tree has
/// been collected since, so it can be advanced between mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRange {
    next: Option<NodeId>,
    index: usize,
    revision: u32,
}

impl ChildRange {
    fn empty() -> Self {
        Self {
            next: None,
            index: 0,
            revision: 0,
        }
    }

    pub fn next_entry<'t, S: Storage>(&mut self, tree: &'t Tree<S>) -> Option<Entry<'t>> {
        if self.revision != tree.revision {
            self.next = None;
            return None;
        }
        loop {
            let id = self.next?;
            let Some(record) = tree.record(id) else {
                self.next = None;
                return None;
            };
            self.next = record.next_sibling;
            if !record.live {
                continue;
            }
            let entry = Entry {
                key: tree.key_bytes(record.key),
                index: self.index,
                value: Cursor::attached(id, self.revision),
            };
            self.index += 1;
            return Some(entry);
        }
    }
}

/// Iterator over live children, borrowing the tree.
pub struct Children<'t, S> {
    tree: &'t Tree<S>,
    range: ChildRange,
}

impl<'t, S: Storage> Iterator for Children<'t, S> {
    type Item = Entry<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        self.range.next_entry(self.tree)
    }
}

impl<S: Storage> Tree<S> {
    /// Live children of the object or array at `cursor`, in sibling order.
    /// Empty for anything else.
    pub fn children(&self, cursor: &Cursor) -> Children<'_, S> {
        Children {
            tree: self,
            range: self.child_range(cursor),
        }
    }

    pub fn child_range(&self, cursor: &Cursor) -> ChildRange {
        let Ok(id) = self.resolve_existing(cursor) else {
            return ChildRange::empty();
        };
        match self.record(id) {
            Some(record) if record.live && record.node_type().is_container() => ChildRange {
                next: record.first_child,
                index: 0,
                revision: self.revision,
            },
            _ => ChildRange::empty(),
        }
    }
}
