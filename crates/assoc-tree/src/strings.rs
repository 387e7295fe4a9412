//! String pool: object keys and string values interned into the high region.

use crate::arena::{Arena, Storage};
use crate::node::StringSlot;

impl<S: Storage> Arena<S> {
    /// Copies `bytes` into the string region, followed by a zero byte.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> Option<StringSlot> {
        let len = u16::try_from(bytes.len()).ok().filter(|len| *len != u16::MAX)?;
        let offset = self.bump_string(bytes.len())?;
        let region = self.region_mut();
        region[offset..offset + bytes.len()].copy_from_slice(bytes);
        region[offset + bytes.len()] = 0;
        Some(StringSlot::new(offset as u16, len))
    }

    /// Whether the slot, including its terminator, lies inside the region.
    pub(crate) fn is_readable(&self, slot: StringSlot) -> bool {
        slot.offset() + slot.len() < self.capacity()
    }

    pub(crate) fn string(&self, slot: StringSlot) -> Option<&[u8]> {
        if !self.is_readable(slot) {
            return None;
        }
        Some(&self.region()[slot.offset()..slot.offset() + slot.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_bytes_read_back() {
        let mut arena = Arena::new(vec![0u8; 128]);
        let hello = arena.intern(b"hello").unwrap();
        let empty = arena.intern(b"").unwrap();
        assert_eq!(arena.string(hello), Some(&b"hello"[..]));
        assert_eq!(arena.string(empty), Some(&b""[..]));
        assert!(empty.is_empty());
        assert_ne!(hello.offset(), empty.offset());
    }

    #[test]
    fn strings_carry_a_terminator() {
        let mut arena = Arena::new(vec![0xAAu8; 64]);
        let before = arena.free_bytes();
        let slot = arena.intern(b"abc").unwrap();
        assert_eq!(arena.free_bytes(), before - 4);
        assert_eq!(arena.region()[slot.offset() + 3], 0);
    }

    #[test]
    fn oversized_string_is_refused() {
        let mut arena = Arena::new(vec![0u8; 32]);
        let free = arena.free_bytes();
        assert!(arena.intern(&vec![b'x'; free]).is_none());
        assert_eq!(arena.free_bytes(), free);
        assert!(arena.intern(&vec![b'x'; free - 1]).is_some());
        assert_eq!(arena.free_bytes(), 0);
    }
}
