//! Lazy iterators over packed repeated fields.
//!
//! A packed repeated field is a length-delimited payload holding the
//! concatenated encodings of its elements, with no per-element headers. The
//! iterators here decode one element per step and own nothing; they borrow
//! the payload from the buffer the [`Reader`](crate::Reader) was created
//! over, so they remain usable after the reader has moved on.
//!
//! The payload is not validated up front. A truncated final element is
//! reported as [`Error::EndOfBuffer`] at the step that reaches it, after
//! which the iterator is exhausted. The iterators are single-pass; they
//! implement `Clone`, so callers that need two passes (for example to count
//! and then collect) can snapshot them before iterating.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::types::{FixedScalar, VarintScalar, ZigzagScalar};
use crate::varint::decode_varint;

/// Iterator over a packed field of varint-encoded elements.
///
/// Yields `bool`, `i32`, `u32`, `i64` or `u64` elements for the `bool`,
/// `enum`, `int32`, `uint32`, `int64` and `uint64` field types.
#[derive(Clone, Debug)]
pub struct VarintIter<'a, T: VarintScalar> {
    data: &'a [u8],
    element: PhantomData<T>,
}

impl<'a, T: VarintScalar> VarintIter<'a, T> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        VarintIter {
            data,
            element: PhantomData,
        }
    }
}

impl<'a, T: VarintScalar> Iterator for VarintIter<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.data.is_empty() {
            return None;
        }
        match decode_varint(self.data) {
            Ok((value, len)) => {
                self.data = &self.data[len..];
                Some(Ok(T::from_wire(value)))
            }
            Err(err) => {
                self.data = &[];
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.data.is_empty() {
            (0, Some(0))
        } else {
            // Each element occupies between one and ten bytes.
            (self.data.len().div_euclid(10).max(1), Some(self.data.len()))
        }
    }
}

/// Iterator over a packed field of zigzag varint elements (`sint32`,
/// `sint64`).
#[derive(Clone, Debug)]
pub struct SvarintIter<'a, T: ZigzagScalar> {
    data: &'a [u8],
    element: PhantomData<T>,
}

impl<'a, T: ZigzagScalar> SvarintIter<'a, T> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        SvarintIter {
            data,
            element: PhantomData,
        }
    }
}

impl<'a, T: ZigzagScalar> Iterator for SvarintIter<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.data.is_empty() {
            return None;
        }
        match decode_varint(self.data) {
            Ok((value, len)) => {
                self.data = &self.data[len..];
                Some(Ok(T::from_wire(value)))
            }
            Err(err) => {
                self.data = &[];
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.data.is_empty() {
            (0, Some(0))
        } else {
            (self.data.len().div_euclid(10).max(1), Some(self.data.len()))
        }
    }
}

/// Iterator over a packed field of fixed-width elements (`fixed32`,
/// `sfixed32`, `float`, `fixed64`, `sfixed64`, `double`).
#[derive(Clone, Debug)]
pub struct FixedIter<'a, T: FixedScalar> {
    data: &'a [u8],
    element: PhantomData<T>,
}

impl<'a, T: FixedScalar> FixedIter<'a, T> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        FixedIter {
            data,
            element: PhantomData,
        }
    }
}

impl<'a, T: FixedScalar> Iterator for FixedIter<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.data.is_empty() {
            return None;
        }
        if self.data.len() < T::SIZE {
            self.data = &[];
            return Some(Err(Error::EndOfBuffer));
        }
        let value = T::from_le_prefix(self.data);
        self.data = &self.data[T::SIZE..];
        Some(Ok(value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // A trailing partial element still yields one (error) item.
        let len = (self.data.len() + T::SIZE - 1) / T::SIZE;
        (len, Some(len))
    }
}

impl<'a, T: FixedScalar> ExactSizeIterator for FixedIter<'a, T> {}
