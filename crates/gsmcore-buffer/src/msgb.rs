use std::fmt;

use bytes::Buf;
use tracing::{trace, warn};

use crate::error::{BufferError, Result};

/// Size of the per-buffer scratch control block.
pub const CB_SIZE: usize = 40;

/// Protocol layer whose header position a buffer can remember.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Data link (LAPDm).
    L2,
    /// Network (RR/MM/CC).
    L3,
    /// Transport / upper layer.
    L4,
}

impl Layer {
    const ALL: [Layer; 3] = [Layer::L2, Layer::L3, Layer::L4];

    #[inline]
    fn index(self) -> usize {
        match self {
            Layer::L2 => 0,
            Layer::L3 => 1,
            Layer::L4 => 2,
        }
    }
}

/// Radio resources a buffer is currently associated with.
///
/// Opaque to this crate: set by the owning layer, cleared on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAssoc {
    pub trx: u8,
    pub lchan: u8,
}

/// Fixed-capacity message buffer.
///
/// ```text
/// 0            data_start        data_end           capacity
/// ├── headroom ──┼──── payload ────┼──── tailroom ────┤
/// ```
///
/// `0 <= data_start <= data_end <= capacity` holds after every operation.
/// The storage is allocated once and never resized.
pub struct MsgBuf {
    name: &'static str,
    storage: Box<[u8]>,
    data_start: usize,
    data_end: usize,
    marks: [Option<usize>; 3],
    cb: [u8; CB_SIZE],
    assoc: Option<ChannelAssoc>,
}

impl MsgBuf {
    /// Allocate a zeroed buffer whose empty payload window starts at offset 0.
    pub fn alloc(capacity: usize, name: &'static str) -> Result<Self> {
        Self::alloc_headroom(capacity, 0, name)
    }

    /// Allocate a buffer and reserve `headroom` bytes in front of the
    /// (empty) payload window for headers pushed later.
    pub fn alloc_headroom(capacity: usize, headroom: usize, name: &'static str) -> Result<Self> {
        if headroom > capacity {
            return Err(BufferError::HeadroomTooLarge { headroom, capacity });
        }

        let mut storage = Vec::new();
        if storage.try_reserve_exact(capacity).is_err() {
            warn!(target: "gsmcore::buffer", name, capacity, "unable to allocate message buffer");
            return Err(BufferError::AllocFailed { name, capacity });
        }
        storage.resize(capacity, 0);

        Ok(Self {
            name,
            storage: storage.into_boxed_slice(),
            data_start: headroom,
            data_end: headroom,
            marks: [None; 3],
            cb: [0; CB_SIZE],
            assoc: None,
        })
    }

    /// Empty the payload, drop all layer marks, zero the control block and
    /// forget the channel association. The storage is kept for reuse.
    pub fn reset(&mut self) {
        self.data_start = 0;
        self.data_end = 0;
        self.marks = [None; 3];
        self.cb = [0; CB_SIZE];
        self.assoc = None;
    }

    /// Destroy the buffer.
    pub fn release(self) {
        trace!(target: "gsmcore::buffer", name = self.name, "releasing message buffer");
    }

    /// Diagnostic name given at allocation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current payload.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.storage[self.data_start..self.data_end]
    }

    /// Current payload, mutable.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.data_start..self.data_end]
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data_end - self.data_start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data_end == self.data_start
    }

    /// Total size of the backing store.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes available in front of the payload.
    #[inline]
    pub fn headroom(&self) -> usize {
        self.data_start
    }

    /// Bytes available after the payload.
    #[inline]
    pub fn tailroom(&self) -> usize {
        self.storage.len() - self.data_end
    }

    /// Offset of the first payload byte in the backing store.
    #[inline]
    pub fn data_start(&self) -> usize {
        self.data_start
    }

    /// Offset one past the last payload byte.
    #[inline]
    pub fn data_end(&self) -> usize {
        self.data_end
    }

    /// Extend the payload at its tail and return the new bytes.
    pub fn put(&mut self, len: usize) -> Result<&mut [u8]> {
        let available = self.tailroom();
        if len > available {
            return Err(BufferError::NoTailroom {
                requested: len,
                available,
            });
        }
        let start = self.data_end;
        self.data_end += len;
        Ok(&mut self.storage[start..self.data_end])
    }

    /// Append `src` to the payload.
    pub fn put_slice(&mut self, src: &[u8]) -> Result<()> {
        self.put(src.len())?.copy_from_slice(src);
        Ok(())
    }

    /// Append one byte to the payload.
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put(1)?[0] = value;
        Ok(())
    }

    /// Extend the payload at its head (prepend a header) and return the new
    /// bytes.
    pub fn push(&mut self, len: usize) -> Result<&mut [u8]> {
        let available = self.headroom();
        if len > available {
            return Err(BufferError::NoHeadroom {
                requested: len,
                available,
            });
        }
        self.data_start -= len;
        Ok(&mut self.storage[self.data_start..self.data_start + len])
    }

    /// Prepend `src` to the payload.
    pub fn push_slice(&mut self, src: &[u8]) -> Result<()> {
        self.push(src.len())?.copy_from_slice(src);
        Ok(())
    }

    /// Strip `len` bytes from the head of the payload and return them.
    ///
    /// The stripped bytes stay in the storage, so marks pointing at them
    /// remain readable.
    pub fn pull(&mut self, len: usize) -> Result<&[u8]> {
        let available = self.len();
        if len > available {
            return Err(BufferError::Underflow {
                requested: len,
                available,
            });
        }
        let start = self.data_start;
        self.data_start += len;
        Ok(&self.storage[start..self.data_start])
    }

    /// Move the empty payload window forward to grow the headroom.
    pub fn reserve(&mut self, len: usize) -> Result<()> {
        if !self.is_empty() {
            return Err(BufferError::NotEmpty { len: self.len() });
        }
        let available = self.tailroom();
        if len > available {
            return Err(BufferError::NoTailroom {
                requested: len,
                available,
            });
        }
        self.data_start += len;
        self.data_end += len;
        Ok(())
    }

    /// Shorten the payload to `len` bytes.
    pub fn trim(&mut self, len: usize) -> Result<()> {
        let available = self.len();
        if len > available {
            return Err(BufferError::Underflow {
                requested: len,
                available,
            });
        }
        self.data_end = self.data_start + len;
        Ok(())
    }

    /// Record that `layer`'s header starts at `offset` in the storage.
    pub fn set_mark(&mut self, layer: Layer, offset: usize) -> Result<()> {
        if offset < self.data_start || offset > self.data_end {
            return Err(BufferError::MarkOutOfWindow {
                layer,
                offset,
                start: self.data_start,
                end: self.data_end,
            });
        }
        self.marks[layer.index()] = Some(offset);
        Ok(())
    }

    /// Record that `layer`'s header starts at the current payload head.
    pub fn mark_here(&mut self, layer: Layer) {
        self.marks[layer.index()] = Some(self.data_start);
    }

    /// Storage offset of `layer`'s header, if marked.
    pub fn mark(&self, layer: Layer) -> Option<usize> {
        self.marks[layer.index()]
    }

    /// Forget `layer`'s mark.
    pub fn clear_mark(&mut self, layer: Layer) {
        self.marks[layer.index()] = None;
    }

    /// Forget the L2, L3 and L4 marks.
    pub fn clear_marks(&mut self) {
        self.marks = [None; 3];
    }

    /// Bytes from `layer`'s mark to the end of the payload.
    pub fn layer_data(&self, layer: Layer) -> Option<&[u8]> {
        self.mark(layer)
            .filter(|offset| *offset <= self.data_end)
            .map(|offset| &self.storage[offset..self.data_end])
    }

    /// Length of the bytes from `layer`'s mark to the end of the payload.
    pub fn layer_len(&self, layer: Layer) -> Option<usize> {
        self.layer_data(layer).map(<[u8]>::len)
    }

    /// Scratch control block, opaque to this crate.
    pub fn cb(&self) -> &[u8; CB_SIZE] {
        &self.cb
    }

    /// Mutable access to the control block.
    pub fn cb_mut(&mut self) -> &mut [u8; CB_SIZE] {
        &mut self.cb
    }

    /// Logical channel the message belongs to, if any.
    pub fn assoc(&self) -> Option<ChannelAssoc> {
        self.assoc
    }

    /// Associate the message with a logical channel, or clear it with `None`.
    pub fn set_assoc(&mut self, assoc: Option<ChannelAssoc>) {
        self.assoc = assoc;
    }
}

impl Buf for MsgBuf {
    fn remaining(&self) -> usize {
        self.len()
    }

    fn chunk(&self) -> &[u8] {
        self.data()
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= self.len(),
            "cannot advance past end of payload ({cnt} > {})",
            self.len()
        );
        self.data_start += cnt;
    }
}

impl fmt::Debug for MsgBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("MsgBuf");
        s.field("name", &self.name)
            .field("capacity", &self.capacity())
            .field("data", &(self.data_start..self.data_end));
        for layer in Layer::ALL {
            if let Some(offset) = self.mark(layer) {
                s.field(
                    match layer {
                        Layer::L2 => "l2",
                        Layer::L3 => "l3",
                        Layer::L4 => "l4",
                    },
                    &offset,
                );
            }
        }
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_window(msg: &MsgBuf) {
        assert!(msg.data_start() <= msg.data_end());
        assert!(msg.data_end() <= msg.capacity());
        assert_eq!(msg.len(), msg.data_end() - msg.data_start());
    }

    #[test]
    fn alloc_is_empty() {
        let msg = MsgBuf::alloc(64, "test").unwrap();
        assert_eq!(msg.len(), 0);
        assert!(msg.is_empty());
        assert_eq!(msg.capacity(), 64);
        assert_eq!(msg.headroom(), 0);
        assert_eq!(msg.tailroom(), 64);
        assert_eq!(msg.name(), "test");
        assert_eq!(msg.cb(), &[0; CB_SIZE]);
        assert_window(&msg);
    }

    #[test]
    fn alloc_headroom_positions_window() {
        let msg = MsgBuf::alloc_headroom(64, 16, "rx").unwrap();
        assert_eq!(msg.headroom(), 16);
        assert_eq!(msg.tailroom(), 48);
        assert!(msg.is_empty());

        let err = MsgBuf::alloc_headroom(8, 9, "rx").unwrap_err();
        assert!(matches!(err, BufferError::HeadroomTooLarge { .. }));
    }

    #[test]
    fn zero_capacity_buffer() {
        let mut msg = MsgBuf::alloc(0, "empty").unwrap();
        assert!(msg.put(1).is_err());
        assert!(msg.data().is_empty());
    }

    #[test]
    fn put_push_pull_layering() {
        let mut msg = MsgBuf::alloc_headroom(32, 8, "l1").unwrap();
        msg.put_slice(b"L3DATA").unwrap();
        msg.mark_here(Layer::L3);

        msg.push_slice(&[0x01, 0x03]).unwrap();
        msg.mark_here(Layer::L2);
        assert_eq!(msg.data(), &[0x01, 0x03, b'L', b'3', b'D', b'A', b'T', b'A']);

        assert_eq!(msg.pull(2).unwrap(), &[0x01, 0x03]);
        assert_eq!(msg.data(), b"L3DATA");
        assert_eq!(msg.layer_data(Layer::L3), Some(&b"L3DATA"[..]));
        assert_eq!(msg.layer_len(Layer::L2), Some(8));
        assert_eq!(msg.mark(Layer::L4), None);
        assert_window(&msg);
    }

    #[test]
    fn bounds_are_checked() {
        let mut msg = MsgBuf::alloc_headroom(8, 2, "bounds").unwrap();
        assert_eq!(
            msg.push(3).unwrap_err(),
            BufferError::NoHeadroom {
                requested: 3,
                available: 2
            }
        );
        assert_eq!(
            msg.put(7).unwrap_err(),
            BufferError::NoTailroom {
                requested: 7,
                available: 6
            }
        );
        assert!(matches!(msg.pull(1), Err(BufferError::Underflow { .. })));

        msg.put_slice(&[1, 2, 3]).unwrap();
        assert!(matches!(msg.trim(4), Err(BufferError::Underflow { .. })));
        msg.trim(1).unwrap();
        assert_eq!(msg.data(), &[1]);
        assert!(matches!(msg.reserve(1), Err(BufferError::NotEmpty { len: 1 })));
        assert_window(&msg);
    }

    #[test]
    fn marks_must_be_inside_window() {
        let mut msg = MsgBuf::alloc_headroom(16, 4, "marks").unwrap();
        msg.put_slice(b"abcd").unwrap();

        msg.set_mark(Layer::L2, 4).unwrap();
        msg.set_mark(Layer::L3, 8).unwrap();
        let err = msg.set_mark(Layer::L4, 9).unwrap_err();
        assert!(matches!(err, BufferError::MarkOutOfWindow { layer: Layer::L4, .. }));
        let err = msg.set_mark(Layer::L4, 3).unwrap_err();
        assert!(matches!(err, BufferError::MarkOutOfWindow { .. }));

        msg.clear_mark(Layer::L3);
        assert_eq!(msg.mark(Layer::L3), None);
        assert_eq!(msg.layer_data(Layer::L2), Some(&b"abcd"[..]));
    }

    #[test]
    fn clear_marks_and_assoc_accessors() {
        let mut msg = MsgBuf::alloc(16, "accessors").unwrap();
        msg.put_slice(b"ab").unwrap();
        msg.mark_here(Layer::L2);
        msg.mark_here(Layer::L4);
        assert_eq!(msg.mark(Layer::L4), Some(0));

        msg.clear_marks();
        assert_eq!(msg.mark(Layer::L2), None);
        assert_eq!(msg.mark(Layer::L4), None);

        let assoc = ChannelAssoc { trx: 1, lchan: 7 };
        msg.set_assoc(Some(assoc));
        assert_eq!(msg.assoc(), Some(assoc));
        msg.set_assoc(None);
        assert_eq!(msg.assoc(), None);
    }

    #[test]
    fn mark_past_trimmed_tail_has_no_data() {
        let mut msg = MsgBuf::alloc(16, "trim").unwrap();
        msg.put_slice(b"abcdef").unwrap();
        msg.set_mark(Layer::L3, 4).unwrap();
        msg.trim(2).unwrap();
        assert_eq!(msg.layer_data(Layer::L3), None);
    }

    #[test]
    fn reset_clears_marks_and_side_channel() {
        let mut msg = MsgBuf::alloc_headroom(32, 4, "reuse").unwrap();
        msg.put_slice(b"payload").unwrap();
        msg.mark_here(Layer::L2);
        msg.mark_here(Layer::L3);
        msg.cb_mut()[0] = 0xAA;
        msg.set_assoc(Some(ChannelAssoc { trx: 0, lchan: 3 }));

        msg.reset();

        assert!(msg.is_empty());
        assert_eq!(msg.headroom(), 0);
        assert_eq!(msg.capacity(), 32);
        assert_eq!(msg.mark(Layer::L2), None);
        assert_eq!(msg.mark(Layer::L3), None);
        assert_eq!(msg.cb(), &[0; CB_SIZE]);
        assert_eq!(msg.assoc(), None);
        assert_window(&msg);
    }

    #[test]
    fn window_invariant_holds_under_random_operations() {
        let mut rng = fastrand::Rng::with_seed(0x6d73_6762);
        let mut msg = MsgBuf::alloc_headroom(128, 32, "fuzz").unwrap();

        for _ in 0..5_000 {
            let n = rng.usize(0..24);
            let _ = match rng.u8(0..8) {
                0 => msg.put(n).map(|_| ()),
                1 => msg.push(n).map(|_| ()),
                2 => msg.pull(n).map(|_| ()),
                3 => msg.trim(n),
                4 => msg.reserve(n),
                5 => {
                    let offset = rng.usize(0..=msg.capacity());
                    msg.set_mark(Layer::L3, offset)
                }
                6 => {
                    msg.mark_here(Layer::L2);
                    Ok(())
                }
                _ => {
                    msg.reset();
                    Ok(())
                }
            };
            assert_window(&msg);
            if let Some(offset) = msg.mark(Layer::L3) {
                assert!(offset <= msg.capacity());
            }
        }
    }

    #[test]
    fn buf_reads_consume_payload() {
        let mut msg = MsgBuf::alloc(8, "buf").unwrap();
        msg.put_slice(&[0x12, 0x34, 0x56]).unwrap();

        assert_eq!(msg.get_u16(), 0x1234);
        assert_eq!(msg.remaining(), 1);
        assert_eq!(msg.get_u8(), 0x56);
        assert!(!msg.has_remaining());
    }

    #[test]
    fn debug_omits_payload() {
        let mut msg = MsgBuf::alloc(8, "dbg").unwrap();
        msg.put_slice(b"secret").unwrap();
        msg.mark_here(Layer::L2);
        let text = format!("{msg:?}");
        assert!(text.contains("dbg"));
        assert!(text.contains("l2"));
        assert!(!text.contains("secret"));
    }
}
