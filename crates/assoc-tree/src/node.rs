//! Node table records.
//!
//! Every node occupies [`NODE_SIZE`] bytes in the low region of the buffer.
//! Records are little-endian encoded so the buffer carries no alignment or
//! padding requirements of the host:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 1 | type tag |
//! | 1 | 1 | flags (bit 0 live, bit 1 mark) |
//! | 2 | 2 | parent |
//! | 4 | 2 | first child |
//! | 6 | 2 | next sibling |
//! | 8 | 2 | key offset |
//! | 10 | 2 | key length (`0xFFFF` = no key) |
//! | 12 | 8 | value, interpreted by the type tag |
//!
//! Links hold `0xFFFF` when absent. String values store offset and length in
//! the first four value bytes, using the same length sentinel as keys.

use std::fmt;

use crate::arena::{Arena, Storage};

/// Bytes per node record.
pub const NODE_SIZE: usize = 20;

/// Alignment applied to the start of the usable region.
pub const NODE_ALIGN: usize = 8;

pub(crate) const NO_INDEX: u16 = 0xFFFF;
const NO_LENGTH: u16 = 0xFFFF;

const FLAG_LIVE: u8 = 0b01;
const FLAG_MARK: u8 = 0b10;

const TAG_AT: usize = 0;
const FLAGS_AT: usize = 1;
const KEY_AT: usize = 8;
const VALUE_AT: usize = 12;

/// Dense 16-bit node handle. Index 0 is always the root object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u16);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index)
            .ok()
            .filter(|raw| *raw != NO_INDEX)
            .map(NodeId)
    }

    pub(crate) fn from_raw(raw: u16) -> Option<Self> {
        (raw != NO_INDEX).then_some(NodeId(raw))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn raw(link: Option<NodeId>) -> u16 {
        link.map_or(NO_INDEX, |id| id.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag of a node.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Null = 0,
    Bool = 1,
    Int = 2,
    Double = 3,
    String = 4,
    Object = 5,
    Array = 6,
}

impl NodeType {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => NodeType::Null,
            1 => NodeType::Bool,
            2 => NodeType::Int,
            3 => NodeType::Double,
            4 => NodeType::String,
            5 => NodeType::Object,
            6 => NodeType::Array,
            _ => return None,
        })
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeType::Object | NodeType::Array)
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeType::Null => "null",
            NodeType::Bool => "bool",
            NodeType::Int => "int",
            NodeType::Double => "double",
            NodeType::String => "string",
            NodeType::Object => "object",
            NodeType::Array => "array",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Offset and length of a byte string in the string region.
///
/// An absent string is `None` at every use site; a zero-length string is a
/// valid slot occupying only its terminator byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSlot {
    offset: u16,
    len: u16,
}

impl StringSlot {
    pub(crate) fn new(offset: u16, len: u16) -> Self {
        debug_assert!(len != NO_LENGTH);
        Self { offset, len }
    }

    #[inline]
    pub fn offset(self) -> usize {
        self.offset as usize
    }

    #[inline]
    pub fn len(self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    fn decode(bytes: &[u8], at: usize) -> Option<Self> {
        let offset = read_u16(bytes, at);
        let len = read_u16(bytes, at + 2);
        (len != NO_LENGTH).then_some(Self { offset, len })
    }

    fn encode(slot: Option<Self>, bytes: &mut [u8], at: usize) {
        let (offset, len) = slot.map_or((0, NO_LENGTH), |s| (s.offset, s.len));
        write_u16(bytes, at, offset);
        write_u16(bytes, at + 2, len);
    }
}

/// Node value. The variant is the node's type tag, so a type change always
/// carries its value with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Payload {
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(Option<StringSlot>),
    Object,
    Array,
}

impl Payload {
    pub(crate) fn node_type(&self) -> NodeType {
        match self {
            Payload::Null => NodeType::Null,
            Payload::Bool(_) => NodeType::Bool,
            Payload::Int(_) => NodeType::Int,
            Payload::Double(_) => NodeType::Double,
            Payload::Str(_) => NodeType::String,
            Payload::Object => NodeType::Object,
            Payload::Array => NodeType::Array,
        }
    }
}

/// Link fields of a record, by byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    Parent = 2,
    FirstChild = 4,
    NextSibling = 6,
}

impl Link {
    pub(crate) const ALL: [Link; 3] = [Link::Parent, Link::FirstChild, Link::NextSibling];
}

/// String-bearing fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotField {
    Key,
    Value,
}

/// Decoded node record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NodeRecord {
    pub payload: Payload,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub key: Option<StringSlot>,
    pub live: bool,
    pub mark: bool,
}

impl NodeRecord {
    pub(crate) fn live(payload: Payload, parent: Option<NodeId>) -> Self {
        Self {
            payload,
            parent,
            first_child: None,
            next_sibling: None,
            key: None,
            live: true,
            mark: false,
        }
    }

    pub(crate) fn node_type(&self) -> NodeType {
        self.payload.node_type()
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        let node_type = NodeType::from_tag(bytes[TAG_AT])?;
        let payload = match node_type {
            NodeType::Null => Payload::Null,
            NodeType::Bool => Payload::Bool(bytes[VALUE_AT] != 0),
            NodeType::Int => Payload::Int(i32::from_le_bytes(
                bytes[VALUE_AT..VALUE_AT + 4].try_into().ok()?,
            )),
            NodeType::Double => Payload::Double(f64::from_le_bytes(
                bytes[VALUE_AT..VALUE_AT + 8].try_into().ok()?,
            )),
            NodeType::String => Payload::Str(StringSlot::decode(bytes, VALUE_AT)),
            NodeType::Object => Payload::Object,
            NodeType::Array => Payload::Array,
        };
        let flags = bytes[FLAGS_AT];
        Some(Self {
            payload,
            parent: NodeId::from_raw(read_u16(bytes, Link::Parent as usize)),
            first_child: NodeId::from_raw(read_u16(bytes, Link::FirstChild as usize)),
            next_sibling: NodeId::from_raw(read_u16(bytes, Link::NextSibling as usize)),
            key: StringSlot::decode(bytes, KEY_AT),
            live: flags & FLAG_LIVE != 0,
            mark: flags & FLAG_MARK != 0,
        })
    }

    fn encode(&self, bytes: &mut [u8]) {
        bytes[TAG_AT] = self.node_type() as u8;
        let mut flags = 0;
        if self.live {
            flags |= FLAG_LIVE;
        }
        if self.mark {
            flags |= FLAG_MARK;
        }
        bytes[FLAGS_AT] = flags;
        write_u16(bytes, Link::Parent as usize, NodeId::raw(self.parent));
        write_u16(bytes, Link::FirstChild as usize, NodeId::raw(self.first_child));
        write_u16(bytes, Link::NextSibling as usize, NodeId::raw(self.next_sibling));
        StringSlot::encode(self.key, bytes, KEY_AT);
        let value = &mut bytes[VALUE_AT..VALUE_AT + 8];
        value.fill(0);
        match self.payload {
            Payload::Null | Payload::Object | Payload::Array => {}
            Payload::Bool(b) => value[0] = b as u8,
            Payload::Int(n) => value[..4].copy_from_slice(&n.to_le_bytes()),
            Payload::Double(n) => value.copy_from_slice(&n.to_le_bytes()),
            Payload::Str(slot) => StringSlot::encode(slot, value, 0),
        }
    }
}

#[inline]
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn write_u16(bytes: &mut [u8], at: usize, value: u16) {
    bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

// Node table access. Raw accessors take slot indices so the collector can
// walk and rewrite the table without decoding whole records.
impl<S: Storage> Arena<S> {
    pub(crate) fn node_count(&self) -> usize {
        self.node_top() / NODE_SIZE
    }

    fn record_bytes(&self, index: usize) -> Option<&[u8]> {
        if index >= self.node_count() {
            return None;
        }
        let start = index * NODE_SIZE;
        Some(&self.region()[start..start + NODE_SIZE])
    }

    fn record_bytes_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        if index >= self.node_count() {
            return None;
        }
        let start = index * NODE_SIZE;
        Some(&mut self.region_mut()[start..start + NODE_SIZE])
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<NodeRecord> {
        NodeRecord::decode(self.record_bytes(id.index())?)
    }

    pub(crate) fn store(&mut self, id: NodeId, record: &NodeRecord) -> bool {
        match self.record_bytes_mut(id.index()) {
            Some(bytes) => {
                record.encode(bytes);
                true
            }
            None => false,
        }
    }

    /// Appends a record to the table; `None` when the regions would collide.
    pub(crate) fn push_node(&mut self, record: &NodeRecord) -> Option<NodeId> {
        let id = NodeId::from_index(self.node_count())?;
        let offset = self.bump_node()?;
        record.encode(&mut self.region_mut()[offset..offset + NODE_SIZE]);
        Some(id)
    }

    pub(crate) fn link(&self, index: usize, link: Link) -> Option<usize> {
        let raw = read_u16(self.record_bytes(index)?, link as usize);
        let target = NodeId::from_raw(raw)?.index();
        (target < self.node_count()).then_some(target)
    }

    pub(crate) fn raw_link(&self, index: usize, link: Link) -> u16 {
        self.record_bytes(index)
            .map_or(NO_INDEX, |bytes| read_u16(bytes, link as usize))
    }

    pub(crate) fn set_raw_link(&mut self, index: usize, link: Link, raw: u16) {
        if let Some(bytes) = self.record_bytes_mut(index) {
            write_u16(bytes, link as usize, raw);
        }
    }

    pub(crate) fn is_live(&self, index: usize) -> bool {
        self.record_bytes(index)
            .is_some_and(|bytes| bytes[FLAGS_AT] & FLAG_LIVE != 0)
    }

    pub(crate) fn is_marked(&self, index: usize) -> bool {
        self.record_bytes(index)
            .is_some_and(|bytes| bytes[FLAGS_AT] & FLAG_MARK != 0)
    }

    pub(crate) fn set_mark(&mut self, index: usize, mark: bool) {
        if let Some(bytes) = self.record_bytes_mut(index) {
            if mark {
                bytes[FLAGS_AT] |= FLAG_MARK;
            } else {
                bytes[FLAGS_AT] &= !FLAG_MARK;
            }
        }
    }

    pub(crate) fn string_slot(&self, index: usize, field: SlotField) -> Option<StringSlot> {
        let bytes = self.record_bytes(index)?;
        match field {
            SlotField::Key => StringSlot::decode(bytes, KEY_AT),
            SlotField::Value if bytes[TAG_AT] == NodeType::String as u8 => {
                StringSlot::decode(bytes, VALUE_AT)
            }
            SlotField::Value => None,
        }
    }

    pub(crate) fn set_string_slot(
        &mut self,
        index: usize,
        field: SlotField,
        slot: Option<StringSlot>,
    ) {
        let Some(bytes) = self.record_bytes_mut(index) else {
            return;
        };
        match field {
            SlotField::Key => StringSlot::encode(slot, bytes, KEY_AT),
            SlotField::Value if bytes[TAG_AT] == NodeType::String as u8 => {
                StringSlot::encode(slot, bytes, VALUE_AT)
            }
            SlotField::Value => {}
        }
    }

    /// Copies the record at `from` over the record at `to`.
    pub(crate) fn move_record(&mut self, from: usize, to: usize) {
        let count = self.node_count();
        if from >= count || to >= count {
            return;
        }
        let start = from * NODE_SIZE;
        self.region_mut()
            .copy_within(start..start + NODE_SIZE, to * NODE_SIZE);
    }
}
