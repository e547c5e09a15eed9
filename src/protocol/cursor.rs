//! Rewindable byte cursor over the connection's receive buffer
//!
//! The chunk decoder frequently discovers mid-parse that it needs more
//! bytes than the transport has delivered. Every read primitive therefore
//! returns `Option` instead of erroring on a short buffer; callers record
//! how much more they need, rewind to the start of the unfinished packet,
//! and retry on the next feed. Once a decode cycle completes, the owner
//! compacts the buffer to drop everything before the read position.

use bytes::{Bytes, BytesMut};

/// A contiguous buffer with a rewindable read position.
#[derive(Debug, Default)]
pub struct ByteCursor {
    buf: BytesMut,
    pos: usize,
    mark: usize,
}

impl ByteCursor {
    /// Create an empty cursor
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            pos: 0,
            mark: 0,
        }
    }

    /// Create a cursor over an existing buffer, positioned at its start
    pub fn from_buf(buf: BytesMut) -> Self {
        Self { buf, pos: 0, mark: 0 }
    }

    /// Create a cursor over a copy of the given bytes
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from_buf(BytesMut::from(bytes))
    }

    /// Append bytes to the end of the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether any unread bytes remain
    pub fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length (the read limit)
    pub fn limit(&self) -> usize {
        self.buf.len()
    }

    /// Move the read position; clamped to the buffer length
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    /// Remember the current position for a later `reset`
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Rewind to the last marked position
    pub fn reset(&mut self) {
        self.pos = self.mark;
    }

    /// Look at the next `n` bytes without consuming them
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        if self.remaining() < n {
            return None;
        }
        Some(&self.buf[self.pos..self.pos + n])
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Some(b)
    }

    pub fn read_u16_be(&mut self) -> Option<u16> {
        let s = self.read_slice(2)?;
        Some(u16::from_be_bytes([s[0], s[1]]))
    }

    /// 24-bit big-endian unsigned ("medium int")
    pub fn read_u24_be(&mut self) -> Option<u32> {
        let s = self.read_slice(3)?;
        Some(((s[0] as u32) << 16) | ((s[1] as u32) << 8) | (s[2] as u32))
    }

    pub fn read_i32_be(&mut self) -> Option<i32> {
        let s = self.read_slice(4)?;
        Some(i32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn read_u32_be(&mut self) -> Option<u32> {
        let s = self.read_slice(4)?;
        Some(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    /// 32-bit little-endian unsigned; RTMP stream ids use this layout
    pub fn read_u32_le(&mut self) -> Option<u32> {
        let s = self.read_slice(4)?;
        Some(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn read_f64_be(&mut self) -> Option<f64> {
        let s = self.read_slice(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(s);
        Some(f64::from_be_bytes(raw))
    }

    /// Consume `n` bytes and return them as a borrowed slice
    pub fn read_slice(&mut self, n: usize) -> Option<&[u8]> {
        if self.remaining() < n {
            return None;
        }
        let start = self.pos;
        self.pos += n;
        Some(&self.buf[start..start + n])
    }

    /// Consume `n` bytes and return an owned copy
    pub fn read_bytes(&mut self, n: usize) -> Option<Bytes> {
        let s = self.read_slice(n)?;
        Some(Bytes::copy_from_slice(s))
    }

    /// Advance the position by `n`; returns false (position unchanged) when
    /// fewer than `n` bytes remain
    pub fn skip(&mut self, n: usize) -> bool {
        if self.remaining() < n {
            return false;
        }
        self.pos += n;
        true
    }

    /// Advance past all unread bytes
    pub fn skip_remaining(&mut self) {
        self.pos = self.buf.len();
    }

    /// Borrow the unread tail
    pub fn remaining_slice(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Owned copy of the unread tail; the position does not move
    pub fn remaining_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.remaining_slice())
    }

    /// Detach the unread tail into a new cursor, leaving this one empty
    /// of unread data. Used to decode an embedded region independently.
    pub fn split_remaining(&mut self) -> ByteCursor {
        let rest = self.buf.split_off(self.pos);
        ByteCursor::from_buf(rest)
    }

    /// Drop all bytes before the current position. Invalidates the mark.
    pub fn compact(&mut self) {
        if self.pos > 0 {
            let _ = self.buf.split_to(self.pos);
            self.pos = 0;
            self.mark = 0;
        }
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
        self.mark = 0;
    }

    /// Hex rendering of the unread tail, for failure diagnostics
    pub fn hex_dump(&self) -> String {
        let mut out = String::with_capacity(self.remaining() * 2);
        for b in self.remaining_slice() {
            out.push_str(&format!("{:02x}", b));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives() {
        let mut cur = ByteCursor::from_slice(&[
            0x01, // u8
            0x00, 0x02, // u16
            0x00, 0x00, 0x03, // u24
            0x00, 0x00, 0x00, 0x04, // u32 be
            0x05, 0x00, 0x00, 0x00, // u32 le
        ]);
        assert_eq!(cur.read_u8(), Some(0x01));
        assert_eq!(cur.read_u16_be(), Some(2));
        assert_eq!(cur.read_u24_be(), Some(3));
        assert_eq!(cur.read_u32_be(), Some(4));
        assert_eq!(cur.read_u32_le(), Some(5));
        assert_eq!(cur.remaining(), 0);
        assert_eq!(cur.read_u8(), None);
    }

    #[test]
    fn test_short_read_leaves_position() {
        let mut cur = ByteCursor::from_slice(&[0xAA, 0xBB]);
        assert_eq!(cur.read_u32_be(), None);
        assert_eq!(cur.position(), 0);
        assert_eq!(cur.read_u16_be(), Some(0xAABB));
    }

    #[test]
    fn test_mark_reset() {
        let mut cur = ByteCursor::from_slice(&[1, 2, 3, 4]);
        cur.read_u8();
        cur.mark();
        cur.read_u16_be();
        cur.reset();
        assert_eq!(cur.position(), 1);
        assert_eq!(cur.read_u8(), Some(2));
    }

    #[test]
    fn test_compact_drops_consumed_prefix() {
        let mut cur = ByteCursor::from_slice(&[1, 2, 3, 4]);
        cur.read_u16_be();
        cur.compact();
        assert_eq!(cur.position(), 0);
        assert_eq!(cur.remaining(), 2);
        assert_eq!(cur.read_u8(), Some(3));
    }

    #[test]
    fn test_extend_then_rewind() {
        let mut cur = ByteCursor::new();
        cur.extend(&[0x00, 0x01]);
        assert_eq!(cur.read_u24_be(), None);
        cur.extend(&[0x02]);
        assert_eq!(cur.read_u24_be(), Some(0x0102));
    }

    #[test]
    fn test_split_remaining() {
        let mut cur = ByteCursor::from_slice(&[9, 8, 7, 6]);
        cur.read_u8();
        let mut tail = cur.split_remaining();
        assert_eq!(cur.remaining(), 0);
        assert_eq!(tail.remaining(), 3);
        assert_eq!(tail.read_u8(), Some(8));
    }

    #[test]
    fn test_hex_dump() {
        let cur = ByteCursor::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(cur.hex_dump(), "deadbeef");
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut cur = ByteCursor::from_slice(&[0x11, 0x22]);
        assert_eq!(cur.peek_u8(), Some(0x11));
        assert_eq!(cur.peek(2), Some(&[0x11u8, 0x22u8][..]));
        assert_eq!(cur.position(), 0);
        cur.skip(1);
        assert_eq!(cur.peek_u8(), Some(0x22));
    }
}
