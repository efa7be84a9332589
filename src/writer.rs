//! Appending encoder for messages.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use crate::buffer::BytesBuffer;
use crate::types::{valid_tag, FixedScalar, VarintScalar, WireType, ZigzagScalar};
use crate::varint::{encode_varint, MAX_VARINT_LEN};

/// Number of bytes reserved for the length of a submessage opened without a
/// declared size. Lengths are 32-bit, so their varint needs at most five
/// bytes.
const LENGTH_RESERVE: usize = 5;

/// Encoder that appends fields to a caller-supplied buffer.
///
/// The writer borrows its buffer and only ever appends to it (submessage
/// bookkeeping aside), so a message can be written after existing content:
///
/// ```
/// use zeropbf::Writer;
///
/// let mut buffer = Vec::new();
/// let mut writer = Writer::new(&mut buffer);
/// writer.add_uint32(1, 150);
/// writer.add_string(2, "hi");
/// assert_eq!(buffer, [0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i']);
/// ```
///
/// Nested messages with contents of unknown size are written through a
/// [`SubWriter`], see [`sub_writer`](Writer::sub_writer).
///
/// Field tags must be valid (`1..=18999` or `20000..=536870911`); this is a
/// contract with the caller, checked by debug assertions.
pub struct Writer<'buf, B: BytesBuffer> {
    buf: &'buf mut B,
}

impl<'buf, B: BytesBuffer> Writer<'buf, B> {
    /// Create a writer that appends to `buf`.
    ///
    /// The buffer does not have to be empty; existing content is left
    /// untouched.
    pub fn new(buf: &'buf mut B) -> Writer<'buf, B> {
        Writer { buf }
    }

    /// Reserve room for `additional` more bytes in the buffer.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve_additional(additional);
    }

    fn append(&mut self, bytes: &[u8]) {
        let pos = self.buf.len();
        self.buf.append_zeros(bytes.len());
        self.buf.tail_mut(pos).copy_from_slice(bytes);
    }

    fn push_varint(&mut self, value: u64) {
        let mut encoded = [0u8; MAX_VARINT_LEN];
        let len = encode_varint(value, &mut encoded);
        self.append(&encoded[..len]);
    }

    fn push_header(&mut self, tag: u32, wire_type: WireType) {
        debug_assert!(valid_tag(tag), "tag {} out of range", tag);
        self.push_varint(u64::from((tag << 3) | wire_type as u32));
    }

    fn push_length_delimited_header(&mut self, tag: u32, len: usize) {
        debug_assert!(len <= u32::MAX as usize, "length-delimited payload too long");
        self.push_header(tag, WireType::LengthDelimited);
        self.push_varint(len as u64);
    }

    /// Add a `bool` field. A single byte 0 or 1 is written.
    pub fn add_bool(&mut self, tag: u32, value: bool) {
        self.push_header(tag, WireType::Varint);
        self.append(&[value as u8]);
    }

    /// Add a `bytes` field: header, length varint, then the bytes verbatim.
    pub fn add_bytes(&mut self, tag: u32, value: &[u8]) {
        self.push_length_delimited_header(tag, value.len());
        self.append(value);
    }

    /// Add a `string` field.
    pub fn add_string(&mut self, tag: u32, value: &str) {
        self.add_bytes(tag, value.as_bytes());
    }

    /// Add a `message` field. `value` must be a complete encoded message.
    ///
    /// Use [`sub_writer`](Writer::sub_writer) instead to encode the nested
    /// message in place, without assembling it in a separate buffer first.
    pub fn add_message(&mut self, tag: u32, value: &[u8]) {
        self.add_bytes(tag, value);
    }

    /// Open a submessage field whose length is not yet known.
    ///
    /// The field header is written immediately, followed by placeholder
    /// bytes for the length. Fields added through the returned [`SubWriter`]
    /// become the contents of the nested message. When the `SubWriter` is
    /// dropped the real length is patched in; if nothing was added, the
    /// buffer is rolled back to its state from before this call and no
    /// field is written at all.
    ///
    /// While the `SubWriter` is alive it exclusively borrows this writer,
    /// so fields cannot accidentally be added to the outer message half-way
    /// through the nested one.
    pub fn sub_writer(&mut self, tag: u32) -> SubWriter<'_, 'buf, B> {
        let rollback_pos = self.buf.len();
        self.push_header(tag, WireType::LengthDelimited);
        self.buf.append_zeros(LENGTH_RESERVE);
        let data_pos = self.buf.len();
        SubWriter {
            writer: self,
            state: SubState::Open {
                rollback_pos,
                data_pos,
            },
        }
    }

    /// Open a submessage field whose payload length is known to be exactly
    /// `size` bytes.
    ///
    /// The length varint is written at its natural size up front, so
    /// closing the returned [`SubWriter`] has no work to do and rollback is
    /// not available. The caller must add exactly `size` bytes of fields;
    /// this is checked by a debug assertion when the `SubWriter` is
    /// dropped.
    pub fn sub_writer_with_size(&mut self, tag: u32, size: usize) -> SubWriter<'_, 'buf, B> {
        self.push_length_delimited_header(tag, size);
        self.buf.reserve_additional(size);
        let data_pos = self.buf.len();
        SubWriter {
            writer: self,
            state: SubState::SizeCommitted {
                expected_end: data_pos + size,
            },
        }
    }

    /// Open a packed repeated field of varint elements for incremental
    /// writing.
    pub fn packed_varint_field<T: VarintScalar>(
        &mut self,
        tag: u32,
    ) -> PackedVarintField<'_, 'buf, B, T> {
        PackedVarintField {
            sub: self.sub_writer(tag),
            element: PhantomData,
        }
    }

    /// Open a packed repeated field of zigzag varint elements (`sint32`,
    /// `sint64`) for incremental writing.
    pub fn packed_svarint_field<T: ZigzagScalar>(
        &mut self,
        tag: u32,
    ) -> PackedSvarintField<'_, 'buf, B, T> {
        PackedSvarintField {
            sub: self.sub_writer(tag),
            element: PhantomData,
        }
    }

    /// Open a packed repeated field of fixed-width elements for incremental
    /// writing.
    pub fn packed_fixed_field<T: FixedScalar>(
        &mut self,
        tag: u32,
    ) -> PackedFixedField<'_, 'buf, B, T> {
        PackedFixedField {
            sub: self.sub_writer(tag),
            element: PhantomData,
        }
    }

    /// Like [`packed_fixed_field`](Writer::packed_fixed_field), but with the
    /// element count declared up front.
    ///
    /// The payload length is then known (`len` times the element size) and
    /// is committed immediately; no placeholder or rollback is involved.
    /// The caller must add exactly `len` elements.
    pub fn packed_fixed_field_with_len<T: FixedScalar>(
        &mut self,
        tag: u32,
        len: usize,
    ) -> PackedFixedField<'_, 'buf, B, T> {
        PackedFixedField {
            sub: self.sub_writer_with_size(tag, len * T::SIZE),
            element: PhantomData,
        }
    }

    fn add_packed_varints<T, I>(&mut self, tag: u32, values: I)
    where
        T: VarintScalar,
        I: IntoIterator<Item = T>,
    {
        let mut field = self.packed_varint_field::<T>(tag);
        for value in values {
            field.add_element(value);
        }
        // Dropping the field rolls back if no elements were added, so an
        // empty sequence writes nothing.
    }

    fn add_packed_svarints<T, I>(&mut self, tag: u32, values: I)
    where
        T: ZigzagScalar,
        I: IntoIterator<Item = T>,
    {
        let mut field = self.packed_svarint_field::<T>(tag);
        for value in values {
            field.add_element(value);
        }
    }

    fn add_packed_fixeds<T, I>(&mut self, tag: u32, values: I)
    where
        T: FixedScalar,
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = values.into_iter();
        let len = iter.len();
        if len == 0 {
            return;
        }
        // The payload length is known up front, so it is written at its
        // natural size and the elements follow directly.
        self.push_length_delimited_header(tag, len * T::SIZE);
        self.buf.reserve_additional(len * T::SIZE);
        for value in iter {
            self.append(value.le_bytes().as_ref());
        }
    }
}

/// Generate the writer method for one varint-encoded field type.
macro_rules! varint_add {
    ($name:ident, $pbf_type:literal, $type:ty) => {
        #[doc = concat!("Add an `", $pbf_type, "` field.")]
        pub fn $name(&mut self, tag: u32, value: $type) {
            self.push_header(tag, WireType::Varint);
            self.push_varint(<$type as VarintScalar>::to_wire(value));
        }
    };
}

/// Generate the writer method for one zigzag varint field type.
macro_rules! svarint_add {
    ($name:ident, $pbf_type:literal, $type:ty) => {
        #[doc = concat!("Add an `", $pbf_type, "` field.")]
        pub fn $name(&mut self, tag: u32, value: $type) {
            self.push_header(tag, WireType::Varint);
            self.push_varint(<$type as ZigzagScalar>::to_wire(value));
        }
    };
}

/// Generate the writer method for one fixed-width field type.
macro_rules! fixed_add {
    ($name:ident, $pbf_type:literal, $type:ty) => {
        #[doc = concat!("Add a `", $pbf_type, "` field.")]
        pub fn $name(&mut self, tag: u32, value: $type) {
            self.push_header(tag, <$type as FixedScalar>::WIRE_TYPE);
            self.append(value.le_bytes().as_ref());
        }
    };
}

/// Generate the writer method for one packed repeated field type.
macro_rules! packed_add {
    ($name:ident, $pbf_type:literal, $impl:ident, $type:ty) => {
        #[doc = concat!("Add a `repeated packed ", $pbf_type, "` field.")]
        ///
        /// An empty sequence writes nothing; the field is omitted entirely.
        pub fn $name<I>(&mut self, tag: u32, values: I)
        where
            I: IntoIterator<Item = $type>,
        {
            self.$impl(tag, values);
        }
    };
    (exact $name:ident, $pbf_type:literal, $type:ty) => {
        #[doc = concat!("Add a `repeated packed ", $pbf_type, "` field.")]
        ///
        /// An empty sequence writes nothing; the field is omitted entirely.
        /// The iterator must report its exact length so that the payload
        /// size can be computed up front; to write fixed-width elements
        /// from an iterator of unknown length, use
        /// [`packed_fixed_field`](Writer::packed_fixed_field).
        pub fn $name<I>(&mut self, tag: u32, values: I)
        where
            I: IntoIterator<Item = $type>,
            I::IntoIter: ExactSizeIterator,
        {
            self.add_packed_fixeds(tag, values);
        }
    };
}

impl<'buf, B: BytesBuffer> Writer<'buf, B> {
    varint_add!(add_enum, "enum", i32);
    varint_add!(add_int32, "int32", i32);
    varint_add!(add_uint32, "uint32", u32);
    varint_add!(add_int64, "int64", i64);
    varint_add!(add_uint64, "uint64", u64);

    svarint_add!(add_sint32, "sint32", i32);
    svarint_add!(add_sint64, "sint64", i64);

    fixed_add!(add_fixed32, "fixed32", u32);
    fixed_add!(add_sfixed32, "sfixed32", i32);
    fixed_add!(add_fixed64, "fixed64", u64);
    fixed_add!(add_sfixed64, "sfixed64", i64);
    fixed_add!(add_float, "float", f32);
    fixed_add!(add_double, "double", f64);

    packed_add!(add_packed_bool, "bool", add_packed_varints, bool);
    packed_add!(add_packed_enum, "enum", add_packed_varints, i32);
    packed_add!(add_packed_int32, "int32", add_packed_varints, i32);
    packed_add!(add_packed_uint32, "uint32", add_packed_varints, u32);
    packed_add!(add_packed_int64, "int64", add_packed_varints, i64);
    packed_add!(add_packed_uint64, "uint64", add_packed_varints, u64);
    packed_add!(add_packed_sint32, "sint32", add_packed_svarints, i32);
    packed_add!(add_packed_sint64, "sint64", add_packed_svarints, i64);
    packed_add!(exact add_packed_fixed32, "fixed32", u32);
    packed_add!(exact add_packed_sfixed32, "sfixed32", i32);
    packed_add!(exact add_packed_fixed64, "fixed64", u64);
    packed_add!(exact add_packed_sfixed64, "sfixed64", i64);
    packed_add!(exact add_packed_float, "float", f32);
    packed_add!(exact add_packed_double, "double", f64);
}

#[derive(Copy, Clone)]
enum SubState {
    /// Placeholder reserved; the length is patched in on close, or the
    /// whole field is rolled back if no payload was written.
    Open {
        rollback_pos: usize,
        data_pos: usize,
    },
    /// The length was declared up front and has already been written;
    /// closing does nothing and rollback is not possible.
    SizeCommitted { expected_end: usize },
    /// Rolled back explicitly; the drop does nothing.
    Closed,
}

/// Writer for the contents of a nested message field.
///
/// Created by [`Writer::sub_writer`] and [`Writer::sub_writer_with_size`].
/// All `add_*` methods of [`Writer`] can be called on it, including opening
/// a further nested submessage. The submessage is closed when the
/// `SubWriter` is dropped.
pub struct SubWriter<'p, 'buf, B: BytesBuffer> {
    writer: &'p mut Writer<'buf, B>,
    state: SubState,
}

impl<'p, 'buf, B: BytesBuffer> SubWriter<'p, 'buf, B> {
    /// Discard the submessage.
    ///
    /// The buffer is truncated back to its state from before the submessage
    /// was opened, as if it had never existed. This also happens implicitly
    /// when a `SubWriter` is dropped without any payload having been
    /// written.
    ///
    /// Must not be called on a submessage opened with a declared size: its
    /// length has already been committed to the buffer (debug assertion).
    pub fn rollback(mut self) {
        match self.state {
            SubState::Open { rollback_pos, .. } => {
                let len = self.writer.buf.len();
                self.writer.buf.erase_range(rollback_pos, len);
                self.state = SubState::Closed;
            }
            SubState::SizeCommitted { .. } => {
                self.state = SubState::Closed;
                debug_assert!(false, "cannot roll back a submessage with a declared size");
            }
            SubState::Closed => {}
        }
    }

    fn close(&mut self) {
        match self.state {
            SubState::Open {
                rollback_pos,
                data_pos,
            } => {
                let end = self.writer.buf.len();
                if end == data_pos {
                    // No payload was written: drop the header and the
                    // placeholder, restoring the pre-open buffer.
                    self.writer.buf.erase_range(rollback_pos, end);
                } else {
                    let payload_len = end - data_pos;
                    debug_assert!(
                        payload_len <= u32::MAX as usize,
                        "submessage payload too long"
                    );
                    // Patch the placeholder with the real length, then
                    // shift the payload left over the unused placeholder
                    // bytes.
                    let length_pos = data_pos - LENGTH_RESERVE;
                    let mut encoded = [0u8; MAX_VARINT_LEN];
                    let varint_len = encode_varint(payload_len as u64, &mut encoded);
                    self.writer.buf.tail_mut(length_pos)[..varint_len]
                        .copy_from_slice(&encoded[..varint_len]);
                    self.writer.buf.erase_range(length_pos + varint_len, data_pos);
                }
                self.state = SubState::Closed;
            }
            SubState::SizeCommitted { expected_end } => {
                debug_assert!(
                    self.writer.buf.len() == expected_end,
                    "submessage payload does not match its declared size"
                );
            }
            SubState::Closed => {}
        }
    }
}

impl<'p, 'buf, B: BytesBuffer> Drop for SubWriter<'p, 'buf, B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<'p, 'buf, B: BytesBuffer> Deref for SubWriter<'p, 'buf, B> {
    type Target = Writer<'buf, B>;

    fn deref(&self) -> &Writer<'buf, B> {
        self.writer
    }
}

impl<'p, 'buf, B: BytesBuffer> DerefMut for SubWriter<'p, 'buf, B> {
    fn deref_mut(&mut self) -> &mut Writer<'buf, B> {
        self.writer
    }
}

/// Incremental writer for a packed repeated field of varint elements.
///
/// Elements are appended one at a time; dropping the value closes the
/// field, rolling it back to nothing if no elements were added.
///
/// ```
/// use zeropbf::Writer;
///
/// let mut buffer = Vec::new();
/// let mut writer = Writer::new(&mut buffer);
/// let mut field = writer.packed_varint_field::<u32>(1);
/// field.add_element(17);
/// field.add_element(200);
/// drop(field);
/// assert_eq!(buffer, [0x0a, 0x03, 0x11, 0xc8, 0x01]);
/// ```
pub struct PackedVarintField<'p, 'buf, B: BytesBuffer, T: VarintScalar> {
    sub: SubWriter<'p, 'buf, B>,
    element: PhantomData<T>,
}

impl<'p, 'buf, B: BytesBuffer, T: VarintScalar> PackedVarintField<'p, 'buf, B, T> {
    /// Append one element.
    pub fn add_element(&mut self, value: T) {
        self.sub.push_varint(value.to_wire());
    }

    /// Discard the field, restoring the buffer to its state from before
    /// the field was opened.
    pub fn rollback(self) {
        self.sub.rollback();
    }
}

/// Incremental writer for a packed repeated field of zigzag varint
/// elements (`sint32`, `sint64`).
pub struct PackedSvarintField<'p, 'buf, B: BytesBuffer, T: ZigzagScalar> {
    sub: SubWriter<'p, 'buf, B>,
    element: PhantomData<T>,
}

impl<'p, 'buf, B: BytesBuffer, T: ZigzagScalar> PackedSvarintField<'p, 'buf, B, T> {
    /// Append one element.
    pub fn add_element(&mut self, value: T) {
        self.sub.push_varint(value.to_wire());
    }

    /// Discard the field, restoring the buffer to its state from before
    /// the field was opened.
    pub fn rollback(self) {
        self.sub.rollback();
    }
}

/// Incremental writer for a packed repeated field of fixed-width elements.
pub struct PackedFixedField<'p, 'buf, B: BytesBuffer, T: FixedScalar> {
    sub: SubWriter<'p, 'buf, B>,
    element: PhantomData<T>,
}

impl<'p, 'buf, B: BytesBuffer, T: FixedScalar> PackedFixedField<'p, 'buf, B, T> {
    /// Append one element.
    pub fn add_element(&mut self, value: T) {
        self.sub.append(value.le_bytes().as_ref());
    }

    /// Discard the field, restoring the buffer to its state from before
    /// the field was opened.
    ///
    /// Must not be called if the field was opened with a declared length
    /// (debug assertion), as for [`SubWriter::rollback`].
    pub fn rollback(self) {
        self.sub.rollback();
    }
}

#[cfg(test)]
mod tests {
    use smallvec::SmallVec;

    use super::Writer;
    use crate::reader::Reader;
    use crate::varint::encoded_varint_len;

    #[test]
    fn test_scalar_golden_bytes() {
        #[derive(Debug)]
        struct Case {
            name: &'static str,
            write: fn(&mut Writer<'_, Vec<u8>>),
            expected: &'static [u8],
        }
        let cases = [
            Case {
                name: "uint32 zero",
                write: |w| w.add_uint32(1, 0),
                expected: &[0x08, 0x00],
            },
            Case {
                name: "uint32 150",
                write: |w| w.add_uint32(1, 150),
                expected: &[0x08, 0x96, 0x01],
            },
            Case {
                name: "int32 -1 sign extends to ten bytes",
                write: |w| w.add_int32(1, -1),
                expected: &[
                    0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01,
                ],
            },
            Case {
                name: "sint32 -1",
                write: |w| w.add_sint32(1, -1),
                expected: &[0x08, 0x01],
            },
            Case {
                name: "sint32 -17",
                write: |w| w.add_sint32(1, -17),
                expected: &[0x08, 0x21],
            },
            Case {
                name: "bool true",
                write: |w| w.add_bool(1, true),
                expected: &[0x08, 0x01],
            },
            Case {
                name: "bool false",
                write: |w| w.add_bool(1, false),
                expected: &[0x08, 0x00],
            },
            Case {
                name: "fixed32",
                write: |w| w.add_fixed32(1, 12345678),
                expected: &[0x0d, 0x4e, 0x61, 0xbc, 0x00],
            },
            Case {
                name: "sfixed32 -1",
                write: |w| w.add_sfixed32(1, -1),
                expected: &[0x0d, 0xff, 0xff, 0xff, 0xff],
            },
            Case {
                name: "fixed64",
                write: |w| w.add_fixed64(1, 0x0102_0304_0506_0708),
                expected: &[0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01],
            },
            Case {
                name: "float 1.5",
                write: |w| w.add_float(1, 1.5),
                expected: &[0x0d, 0x00, 0x00, 0xc0, 0x3f],
            },
            Case {
                name: "string",
                write: |w| w.add_string(1, "foobar"),
                expected: &[0x0a, 0x06, b'f', b'o', b'o', b'b', b'a', b'r'],
            },
            Case {
                name: "empty string",
                write: |w| w.add_string(1, ""),
                expected: &[0x0a, 0x00],
            },
            Case {
                name: "high tag number",
                write: |w| w.add_uint32(200, 1),
                expected: &[0xc0, 0x0c, 0x01],
            },
        ];
        for Case {
            name,
            write,
            expected,
        } in cases
        {
            let mut buffer = Vec::new();
            write(&mut Writer::new(&mut buffer));
            assert_eq!(buffer, expected, "{}", name);
        }
    }

    #[test]
    fn test_scalar_round_trips() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_bool(1, true);
        writer.add_enum(2, 3);
        writer.add_int32(3, i32::MIN);
        writer.add_sint32(4, -200);
        writer.add_uint32(5, u32::MAX);
        writer.add_int64(6, i64::MIN);
        writer.add_sint64(7, i64::MIN);
        writer.add_uint64(8, u64::MAX);
        writer.add_fixed32(9, u32::MAX);
        writer.add_sfixed32(10, i32::MIN);
        writer.add_fixed64(11, u64::MAX);
        writer.add_sfixed64(12, i64::MIN);
        writer.add_float(13, -0.25);
        writer.add_double(14, 1e300);
        writer.add_bytes(15, &[1, 2, 3]);

        let mut message = Reader::new(&buffer);
        assert!(message.next().unwrap());
        assert!(message.get_bool().unwrap());
        assert!(message.next().unwrap());
        assert_eq!(message.get_enum().unwrap(), 3);
        assert!(message.next().unwrap());
        assert_eq!(message.get_int32().unwrap(), i32::MIN);
        assert!(message.next().unwrap());
        assert_eq!(message.get_sint32().unwrap(), -200);
        assert!(message.next().unwrap());
        assert_eq!(message.get_uint32().unwrap(), u32::MAX);
        assert!(message.next().unwrap());
        assert_eq!(message.get_int64().unwrap(), i64::MIN);
        assert!(message.next().unwrap());
        assert_eq!(message.get_sint64().unwrap(), i64::MIN);
        assert!(message.next().unwrap());
        assert_eq!(message.get_uint64().unwrap(), u64::MAX);
        assert!(message.next().unwrap());
        assert_eq!(message.get_fixed32().unwrap(), u32::MAX);
        assert!(message.next().unwrap());
        assert_eq!(message.get_sfixed32().unwrap(), i32::MIN);
        assert!(message.next().unwrap());
        assert_eq!(message.get_fixed64().unwrap(), u64::MAX);
        assert!(message.next().unwrap());
        assert_eq!(message.get_sfixed64().unwrap(), i64::MIN);
        assert!(message.next().unwrap());
        assert_eq!(message.get_float().unwrap(), -0.25);
        assert!(message.next().unwrap());
        assert_eq!(message.get_double().unwrap(), 1e300);
        assert!(message.next().unwrap());
        assert_eq!(message.get_view().unwrap(), [1, 2, 3]);
        assert!(!message.next().unwrap());
    }

    #[test]
    fn test_canonical_unsigned_value_sets() {
        for value in [0u64, 1, 200, u32::MAX as u64, u64::MAX] {
            let mut buffer = Vec::new();
            let mut writer = Writer::new(&mut buffer);
            if let Ok(narrow) = u32::try_from(value) {
                writer.add_uint32(1, narrow);
                writer.add_fixed32(2, narrow);
            }
            writer.add_uint64(3, value);
            writer.add_fixed64(4, value);

            let mut message = Reader::new(&buffer);
            while message.next().unwrap() {
                match message.tag() {
                    1 => assert_eq!(message.get_uint32().unwrap() as u64, value),
                    2 => assert_eq!(message.get_fixed32().unwrap() as u64, value),
                    3 => assert_eq!(message.get_uint64().unwrap(), value),
                    4 => assert_eq!(message.get_fixed64().unwrap(), value),
                    _ => unreachable!(),
                }
            }
        }
    }

    #[test]
    fn test_canonical_signed_value_sets() {
        let values = [
            0i64,
            1,
            200,
            -1,
            -200,
            i32::MAX as i64,
            i32::MIN as i64,
            i64::MAX,
            i64::MIN,
        ];
        for value in values {
            let mut buffer = Vec::new();
            let mut writer = Writer::new(&mut buffer);
            if let Ok(narrow) = i32::try_from(value) {
                writer.add_int32(1, narrow);
                writer.add_sint32(2, narrow);
                writer.add_sfixed32(3, narrow);
            }
            writer.add_int64(4, value);
            writer.add_sint64(5, value);
            writer.add_sfixed64(6, value);

            let mut message = Reader::new(&buffer);
            while message.next().unwrap() {
                match message.tag() {
                    1 => assert_eq!(message.get_int32().unwrap() as i64, value),
                    2 => assert_eq!(message.get_sint32().unwrap() as i64, value),
                    3 => assert_eq!(message.get_sfixed32().unwrap() as i64, value),
                    4 => assert_eq!(message.get_int64().unwrap(), value),
                    5 => assert_eq!(message.get_sint64().unwrap(), value),
                    6 => assert_eq!(message.get_sfixed64().unwrap(), value),
                    _ => unreachable!(),
                }
            }
        }
    }

    #[test]
    fn test_append_to_existing_content() {
        let mut buffer = vec![0xde, 0xad];
        let mut writer = Writer::new(&mut buffer);
        writer.add_uint32(1, 1);
        assert_eq!(buffer, [0xde, 0xad, 0x08, 0x01]);
    }

    #[test]
    fn test_submessage_commit() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_fixed32(1, 42);
        {
            let mut submessage = writer.sub_writer(5);
            submessage.add_string(1, "foobar");
        }

        assert_eq!(
            buffer,
            [
                0x0d, 0x2a, 0x00, 0x00, 0x00, // fixed32 field 1 = 42
                0x2a, 0x08, // message field 5, length 8
                0x0a, 0x06, b'f', b'o', b'o', b'b', b'a', b'r',
            ]
        );
    }

    #[test]
    fn test_submessage_rollback_on_empty() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_fixed32(1, 42);
        let before = buffer.clone();

        let mut writer = Writer::new(&mut buffer);
        {
            let _submessage = writer.sub_writer(5);
            // Dropped without any payload.
        }
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_submessage_explicit_rollback() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_uint32(1, 7);
        let before = buffer.clone();

        let mut writer = Writer::new(&mut buffer);
        let mut submessage = writer.sub_writer(5);
        submessage.add_string(1, "discarded");
        submessage.add_uint32(2, 99);
        submessage.rollback();
        writer.add_uint32(1, 8);

        let mut expected = before;
        expected.extend_from_slice(&[0x08, 0x08]);
        assert_eq!(buffer, expected);
    }

    #[test]
    fn test_submessage_known_size_matches_unknown_size() {
        let mut patched = Vec::new();
        let mut writer = Writer::new(&mut patched);
        {
            let mut submessage = writer.sub_writer(5);
            submessage.add_string(1, "foobar");
        }

        let mut direct = Vec::new();
        let mut writer = Writer::new(&mut direct);
        {
            let mut submessage = writer.sub_writer_with_size(5, 8);
            submessage.add_string(1, "foobar");
        }

        assert_eq!(patched, direct);
    }

    #[test]
    fn test_submessage_long_payload_length() {
        // A payload over 127 bytes needs a two-byte length varint; the
        // remaining placeholder bytes must be erased.
        let payload = vec![0xabu8; 200];
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        {
            let mut submessage = writer.sub_writer(1);
            submessage.add_bytes(2, &payload);
        }

        let mut message = Reader::new(&buffer);
        assert!(message.next().unwrap());
        let mut submessage = message.get_message().unwrap();
        assert!(submessage.next().unwrap());
        assert_eq!(submessage.get_view().unwrap(), payload.as_slice());
        assert!(!submessage.next().unwrap());
        assert!(!message.next().unwrap());
    }

    #[test]
    fn test_nested_submessages() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        {
            let mut outer = writer.sub_writer(1);
            outer.add_uint32(1, 22);
            {
                let mut inner = outer.sub_writer(2);
                inner.add_string(1, "deep");
            }
            outer.add_uint32(3, 44);
        }

        let mut message = Reader::new(&buffer);
        assert!(message.next().unwrap());
        let mut outer = message.get_message().unwrap();
        assert!(outer.next().unwrap());
        assert_eq!(outer.get_uint32().unwrap(), 22);
        assert!(outer.next().unwrap());
        let mut inner = outer.get_message().unwrap();
        assert!(inner.next().unwrap());
        assert_eq!(inner.get_str().unwrap(), "deep");
        assert!(!inner.next().unwrap());
        assert!(outer.next().unwrap());
        assert_eq!(outer.get_uint32().unwrap(), 44);
        assert!(!outer.next().unwrap());
        assert!(!message.next().unwrap());
    }

    #[test]
    fn test_packed_varint_golden_bytes() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_packed_uint32(1, [17u32]);
        assert_eq!(buffer, [0x0a, 0x01, 0x11]);

        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_packed_sint32(7, [-17, 22]);
        assert_eq!(buffer, [0x3a, 0x02, 0x21, 0x2c]);
    }

    #[test]
    fn test_packed_empty_writes_nothing() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_packed_uint32(1, std::iter::empty());
        writer.add_packed_sint64(2, std::iter::empty());
        writer.add_packed_double(3, std::iter::empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_packed_varint_round_trip() {
        let values = [17u64, 200, 0, 1, u64::MAX];
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_packed_uint64(1, values);

        let mut message = Reader::new(&buffer);
        assert!(message.next().unwrap());
        let decoded: Vec<u64> = message
            .get_packed_uint64()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_packed_fixed_growth() {
        let values = [3.0f64, -1.5, 0.25];
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_packed_double(1, values);

        // header + natural-size length varint + N * 8 payload bytes.
        let payload_len = values.len() * 8;
        assert_eq!(buffer.len(), 1 + encoded_varint_len(payload_len as u64) + payload_len);

        let mut message = Reader::new(&buffer);
        assert!(message.next().unwrap());
        let decoded: Vec<f64> = message
            .get_packed_double()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_packed_field_guard_matches_direct_write() {
        let values = [17i32, 200, 0, 1, i32::MAX, -200, -1, i32::MIN];

        let mut direct = Vec::new();
        let mut writer = Writer::new(&mut direct);
        writer.add_packed_sint32(1, values);

        let mut incremental = Vec::new();
        let mut writer = Writer::new(&mut incremental);
        {
            let mut field = writer.packed_svarint_field::<i32>(1);
            for value in values {
                field.add_element(value);
            }
        }

        assert_eq!(direct, incremental);
    }

    #[test]
    fn test_packed_fixed_field_with_len_matches_unsized() {
        let values = [1u32, 2, 3];

        let mut unsized_bytes = Vec::new();
        let mut writer = Writer::new(&mut unsized_bytes);
        {
            let mut field = writer.packed_fixed_field::<u32>(1);
            for value in values {
                field.add_element(value);
            }
        }

        let mut sized_bytes = Vec::new();
        let mut writer = Writer::new(&mut sized_bytes);
        {
            let mut field = writer.packed_fixed_field_with_len::<u32>(1, values.len());
            for value in values {
                field.add_element(value);
            }
        }

        assert_eq!(unsized_bytes, sized_bytes);
        // And both match the direct ExactSizeIterator strategy.
        let mut direct = Vec::new();
        let mut writer = Writer::new(&mut direct);
        writer.add_packed_fixed32(1, values);
        assert_eq!(direct, sized_bytes);
    }

    #[test]
    fn test_packed_field_guard_rollback() {
        let mut buffer = Vec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_uint32(1, 5);
        let before = buffer.clone();

        let mut writer = Writer::new(&mut buffer);
        {
            let _field = writer.packed_varint_field::<u32>(2);
            // No elements: dropping rolls the field back.
        }
        assert_eq!(buffer, before);

        let mut writer = Writer::new(&mut buffer);
        let mut field = writer.packed_fixed_field::<f32>(2);
        field.add_element(1.0);
        field.rollback();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_smallvec_buffer_writer() {
        let mut buffer: SmallVec<[u8; 32]> = SmallVec::new();
        let mut writer = Writer::new(&mut buffer);
        writer.add_uint32(1, 150);
        {
            let mut submessage = writer.sub_writer(2);
            submessage.add_string(1, "hi");
        }
        assert_eq!(
            buffer.as_slice(),
            [0x08, 0x96, 0x01, 0x12, 0x04, 0x0a, 0x02, b'h', b'i']
        );
    }
}
