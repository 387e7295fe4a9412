//! Pending path segments held inline by a cursor.

use smallvec::SmallVec;

/// Maximum number of unresolved segments a cursor can carry.
pub const MAX_LAZY_SEGMENTS: usize = 16;

/// Maximum total key bytes a cursor can carry before it is resolved.
pub const LAZY_KEY_BYTES: usize = 256;

/// One step of a path, as accepted by [`Cursor::at`](crate::Cursor::at).
///
/// Keys are raw bytes. Signed integers convert to `Index` when non-negative
/// and to `Invalid` otherwise; an `Invalid` step yields a detached cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    Key(&'a [u8]),
    Index(usize),
    Invalid,
}

impl<'a> From<&'a str> for Step<'a> {
    fn from(key: &'a str) -> Self {
        Step::Key(key.as_bytes())
    }
}

impl<'a> From<&'a String> for Step<'a> {
    fn from(key: &'a String) -> Self {
        Step::Key(key.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Step<'a> {
    fn from(key: &'a [u8]) -> Self {
        Step::Key(key)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Step<'a> {
    fn from(key: &'a [u8; N]) -> Self {
        Step::Key(key)
    }
}

macro_rules! step_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Step<'_> {
            fn from(index: $t) -> Self {
                usize::try_from(index).map_or(Step::Invalid, Step::Index)
            }
        }
    )*};
}

step_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Key { offset: u16, len: u16 },
    Index(usize),
}

/// Borrowed view of one pending segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentRef<'a> {
    Key(&'a [u8]),
    Index(usize),
}

type SegmentBuf = SmallVec<[Segment; MAX_LAZY_SEGMENTS]>;

/// Fixed-budget segment list. Never spills: pushes beyond either budget are
/// refused and the caller marks its cursor overflowed.
#[derive(Clone)]
pub(crate) struct PendingPath {
    segments: SegmentBuf,
    keys: [u8; LAZY_KEY_BYTES],
    key_bytes: usize,
}

impl PendingPath {
    pub(crate) fn new() -> Self {
        Self {
            segments: SegmentBuf::new(),
            keys: [0; LAZY_KEY_BYTES],
            key_bytes: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.segments.len()
    }

    pub(crate) fn key_bytes(&self) -> usize {
        self.key_bytes
    }

    pub(crate) fn clear(&mut self) {
        self.segments.clear();
        self.key_bytes = 0;
    }

    #[must_use]
    pub(crate) fn push_key(&mut self, key: &[u8]) -> bool {
        if self.segments.len() == MAX_LAZY_SEGMENTS || key.len() > LAZY_KEY_BYTES - self.key_bytes {
            return false;
        }
        let offset = self.key_bytes;
        self.keys[offset..offset + key.len()].copy_from_slice(key);
        self.key_bytes += key.len();
        self.segments.push(Segment::Key {
            offset: offset as u16,
            len: key.len() as u16,
        });
        true
    }

    #[must_use]
    pub(crate) fn push_index(&mut self, index: usize) -> bool {
        if self.segments.len() == MAX_LAZY_SEGMENTS {
            return false;
        }
        self.segments.push(Segment::Index(index));
        true
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = SegmentRef<'_>> + '_ {
        self.segments.iter().map(move |segment| match *segment {
            Segment::Key { offset, len } => {
                let start = offset as usize;
                SegmentRef::Key(&self.keys[start..start + len as usize])
            }
            Segment::Index(index) => SegmentRef::Index(index),
        })
    }
}

impl std::fmt::Debug for PendingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for segment in self.iter() {
            match segment {
                SegmentRef::Key(key) => list.entry(&String::from_utf8_lossy(key)),
                SegmentRef::Index(index) => list.entry(&index),
            };
        }
        list.finish()
    }
}
