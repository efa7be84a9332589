//! Buffer abstraction used by the writer.

use smallvec::{Array, SmallVec};

/// The operations a [`Writer`](crate::Writer) needs from its target buffer.
///
/// The writer appends encoded fields to a caller-supplied buffer and, when
/// closing a submessage of initially unknown length, patches and compacts
/// bytes it wrote earlier. Any growable byte container that can do the four
/// operations below qualifies; implementations are provided for `Vec<u8>`
/// and [`SmallVec`].
///
/// Buffer growth follows the container's own allocation behaviour. In
/// particular there is no error path for a failed allocation: the standard
/// containers abort the process, and this library performs no
/// catch-and-continue.
pub trait BytesBuffer {
    /// Current length in bytes.
    fn len(&self) -> usize;

    /// Return true if the buffer holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `count` zero bytes.
    ///
    /// The writer reserves length placeholders this way and fills real
    /// payload bytes in through [`tail_mut`](BytesBuffer::tail_mut).
    fn append_zeros(&mut self, count: usize);

    /// Hint that `additional` more bytes are about to be appended.
    ///
    /// Relative to the current length, like `Vec::reserve`, not an absolute
    /// capacity.
    fn reserve_additional(&mut self, additional: usize);

    /// Remove the byte range `[from, to)`, shifting the tail left.
    ///
    /// With `to == len()` this truncates the buffer; the writer uses that
    /// for submessage rollback.
    fn erase_range(&mut self, from: usize, to: usize);

    /// Mutable access to the bytes from offset `pos` to the end.
    fn tail_mut(&mut self, pos: usize) -> &mut [u8];
}

impl BytesBuffer for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn append_zeros(&mut self, count: usize) {
        let new_len = Vec::len(self) + count;
        self.resize(new_len, 0);
    }

    fn reserve_additional(&mut self, additional: usize) {
        self.reserve(additional);
    }

    fn erase_range(&mut self, from: usize, to: usize) {
        self.drain(from..to);
    }

    fn tail_mut(&mut self, pos: usize) -> &mut [u8] {
        &mut self[pos..]
    }
}

impl<A: Array<Item = u8>> BytesBuffer for SmallVec<A> {
    fn len(&self) -> usize {
        SmallVec::len(self)
    }

    fn append_zeros(&mut self, count: usize) {
        let new_len = SmallVec::len(self) + count;
        self.resize(new_len, 0);
    }

    fn reserve_additional(&mut self, additional: usize) {
        self.reserve(additional);
    }

    fn erase_range(&mut self, from: usize, to: usize) {
        self.drain(from..to);
    }

    fn tail_mut(&mut self, pos: usize) -> &mut [u8] {
        &mut self[pos..]
    }
}
