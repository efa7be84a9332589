//! Incremental field cursor over an encoded message.

use crate::error::{Error, Result};
use crate::packed::{FixedIter, SvarintIter, VarintIter};
use crate::types::{valid_tag, FixedScalar, VarintScalar, WireType, ZigzagScalar};
use crate::varint::decode_varint;

/// A cursor over the fields of an encoded message.
///
/// A reader borrows a byte buffer holding a complete message and steps
/// through it field by field. It owns nothing and copies nothing: the
/// buffer must outlive the reader and any views obtained from it.
///
/// ```
/// use zeropbf::Reader;
///
/// let buffer = [0x08, 0x96, 0x01]; // field 1, varint 150
/// let mut message = Reader::new(&buffer);
/// while message.next()? {
///     match message.tag() {
///         1 => assert_eq!(message.get_uint32()?, 150),
///         _ => message.skip()?,
///     }
/// }
/// # Ok::<(), zeropbf::Error>(())
/// ```
///
/// Sub-messages are themselves complete messages and are read with a
/// sub-reader obtained from [`get_message`](Reader::get_message):
///
/// ```no_run
/// # use zeropbf::Reader;
/// # let buffer = [];
/// let mut message = Reader::new(&buffer);
/// message.next()?;
/// let mut submessage = message.get_message()?;
/// # Ok::<(), zeropbf::Error>(())
/// ```
///
/// # Failure guarantee
///
/// Every operation that fails leaves the reader observably unchanged, so
/// after handling the error the caller may keep parsing peer fields or
/// query [`tag`](Reader::tag) and [`remaining_len`](Reader::remaining_len)
/// for diagnostics.
///
/// # Preconditions
///
/// The typed `get_*` accessors require a current field (a preceding
/// [`next`](Reader::next) that returned `true`) whose wire type matches the
/// requested type. This is a contract with the caller, checked by debug
/// assertions only; release builds trust the caller and will decode
/// garbage, not corrupt memory, if it is violated.
#[derive(Clone, Debug, Default)]
pub struct Reader<'a> {
    // The unread range of the message, `[cursor, end)`.
    data: &'a [u8],

    // Tag of the current field, 0 if there is none.
    tag: u32,

    // Wire type of the current field, `None` if there is none.
    wire_type: Option<WireType>,
}

impl<'a> Reader<'a> {
    /// Create a reader over a buffer holding a complete encoded message.
    ///
    /// There is no current field until [`next`](Reader::next) is called.
    pub fn new(data: &'a [u8]) -> Reader<'a> {
        Reader {
            data,
            tag: 0,
            wire_type: None,
        }
    }

    /// Return true if there are unread bytes left.
    pub fn has_more(&self) -> bool {
        !self.data.is_empty()
    }

    /// Return the number of unread bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len()
    }

    /// Advance to the next field of the message.
    ///
    /// Returns `Ok(false)` once the buffer is exhausted. On `Ok(true)` the
    /// reader has a current field, whose [`tag`](Reader::tag) and
    /// [`wire_type`](Reader::wire_type) can be inspected and whose value
    /// must be consumed with one of the `get_*` accessors or with
    /// [`skip`](Reader::skip) before calling `next` again.
    ///
    /// Fails with [`Error::UnknownWireType`] if the field header carries
    /// wire type 3, 4, 6 or 7, and with the varint errors if the header
    /// itself is malformed. The cursor does not move on failure.
    pub fn next(&mut self) -> Result<bool> {
        debug_assert!(self.tag == 0, "consume the current field before calling next()");
        if self.data.is_empty() {
            return Ok(false);
        }

        let (header, header_len) = decode_varint(self.data)?;
        let tag = (header >> 3) as u32;

        // Tag 0 and tags 19000 to 19999 are reserved as per
        // https://protobuf.dev/programming-guides/proto3/#assigning.
        debug_assert!(valid_tag(tag), "tag {} out of range", tag);

        let wire_type = WireType::from_raw((header & 0x07) as u8)?;

        self.data = &self.data[header_len..];
        self.tag = tag;
        self.wire_type = Some(wire_type);
        Ok(true)
    }

    /// Advance to the next field with the given tag, skipping the others.
    ///
    /// Returns `Ok(false)` once the buffer is exhausted. Calling this in a
    /// loop visits exactly the fields with tag `tag`, in wire order:
    ///
    /// ```no_run
    /// # use zeropbf::Reader;
    /// # let buffer = [];
    /// # let mut message = Reader::new(&buffer);
    /// while message.next_tag(17)? {
    ///     // handle one occurrence of field 17
    /// #   message.skip()?;
    /// }
    /// # Ok::<(), zeropbf::Error>(())
    /// ```
    pub fn next_tag(&mut self, tag: u32) -> Result<bool> {
        while self.next()? {
            if self.tag == tag {
                return Ok(true);
            }
            self.skip()?;
        }
        Ok(false)
    }

    /// Tag (field number) of the current field, or 0 if there is none.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Wire type of the current field, or `None` if there is none.
    pub fn wire_type(&self) -> Option<WireType> {
        self.wire_type
    }

    /// Return true if there is a current field with the given wire type.
    pub fn has_wire_type(&self, wire_type: WireType) -> bool {
        self.wire_type == Some(wire_type)
    }

    /// Consume the current field without decoding its value.
    ///
    /// After an unknown tag this is the way to move past the field; the
    /// subsequent fields are reached exactly as if the value had been read.
    pub fn skip(&mut self) -> Result<()> {
        debug_assert!(self.tag != 0, "call next() before calling skip()");
        match self.wire_type {
            Some(WireType::Varint) => {
                let (_, len) = decode_varint(self.data)?;
                self.data = &self.data[len..];
            }
            Some(WireType::Fixed64) => self.skip_bytes(8)?,
            Some(WireType::LengthDelimited) => {
                self.length_delimited()?;
                return Ok(());
            }
            Some(WireType::Fixed32) => self.skip_bytes(4)?,
            None => {}
        }
        self.clear_field();
        Ok(())
    }

    fn clear_field(&mut self) {
        self.tag = 0;
        self.wire_type = None;
    }

    fn skip_bytes(&mut self, len: usize) -> Result<()> {
        if len > self.data.len() {
            return Err(Error::EndOfBuffer);
        }
        self.data = &self.data[len..];
        Ok(())
    }

    /// Decode the varint payload of the current field and consume it.
    fn varint(&mut self) -> Result<u64> {
        debug_assert!(self.tag != 0, "call next() before reading a field value");
        debug_assert!(
            self.has_wire_type(WireType::Varint),
            "field {} is not a varint",
            self.tag
        );
        let (value, len) = decode_varint(self.data)?;
        self.data = &self.data[len..];
        self.clear_field();
        Ok(value)
    }

    /// Load the fixed-width payload of the current field and consume it.
    fn fixed<T: FixedScalar>(&mut self) -> Result<T> {
        debug_assert!(self.tag != 0, "call next() before reading a field value");
        debug_assert!(
            self.has_wire_type(T::WIRE_TYPE),
            "field {} is not a fixed-width value",
            self.tag
        );
        if self.data.len() < T::SIZE {
            return Err(Error::EndOfBuffer);
        }
        let value = T::from_le_prefix(self.data);
        self.data = &self.data[T::SIZE..];
        self.clear_field();
        Ok(value)
    }

    /// Bounds-check and consume the length-delimited payload of the current
    /// field.
    ///
    /// The length varint and the payload are validated as a unit before the
    /// cursor moves, so a truncated payload leaves the reader unchanged.
    fn length_delimited(&mut self) -> Result<&'a [u8]> {
        debug_assert!(self.tag != 0, "call next() before reading a field value");
        debug_assert!(
            self.has_wire_type(WireType::LengthDelimited),
            "field {} is not length-delimited",
            self.tag
        );
        let (len, header_len) = decode_varint(self.data)?;
        let len = usize::try_from(len).map_err(|_| Error::EndOfBuffer)?;
        let end = header_len.checked_add(len).ok_or(Error::EndOfBuffer)?;
        if end > self.data.len() {
            return Err(Error::EndOfBuffer);
        }
        let payload = &self.data[header_len..end];
        self.data = &self.data[end..];
        self.clear_field();
        Ok(payload)
    }
}

/// Generate the accessor for one varint-encoded field type.
macro_rules! varint_accessor {
    ($name:ident, $pbf_type:literal, $type:ty) => {
        #[doc = concat!("Consume and return the value of the current `", $pbf_type, "` field.")]
        pub fn $name(&mut self) -> Result<$type> {
            self.varint().map(<$type as VarintScalar>::from_wire)
        }
    };
}

/// Generate the accessor for one zigzag varint field type.
macro_rules! svarint_accessor {
    ($name:ident, $pbf_type:literal, $type:ty) => {
        #[doc = concat!("Consume and return the value of the current `", $pbf_type, "` field.")]
        pub fn $name(&mut self) -> Result<$type> {
            self.varint().map(<$type as ZigzagScalar>::from_wire)
        }
    };
}

/// Generate the accessor for one fixed-width field type.
macro_rules! fixed_accessor {
    ($name:ident, $pbf_type:literal, $type:ty) => {
        #[doc = concat!("Consume and return the value of the current `", $pbf_type, "` field.")]
        pub fn $name(&mut self) -> Result<$type> {
            self.fixed::<$type>()
        }
    };
}

/// Generate the accessor for one packed repeated field type.
macro_rules! packed_accessor {
    ($name:ident, $pbf_type:literal, $iter:ident, $type:ty) => {
        #[doc = concat!(
            "Consume the current `repeated packed ", $pbf_type,
            "` field, returning a lazy iterator over its elements."
        )]
        ///
        /// An empty packed field yields an empty iterator. The elements are
        /// decoded one per step; a truncated payload is reported at the
        /// step that reaches it.
        pub fn $name(&mut self) -> Result<$iter<'a, $type>> {
            self.length_delimited().map($iter::new)
        }
    };
}

impl<'a> Reader<'a> {
    /// Consume and return the value of the current `bool` field.
    ///
    /// The payload varint is fully decoded and the field is `false` iff the
    /// value is zero, so multi-byte encodings of `true` and `false` are
    /// accepted.
    pub fn get_bool(&mut self) -> Result<bool> {
        self.varint().map(bool::from_wire)
    }

    varint_accessor!(get_enum, "enum", i32);
    varint_accessor!(get_int32, "int32", i32);
    varint_accessor!(get_uint32, "uint32", u32);
    varint_accessor!(get_int64, "int64", i64);
    varint_accessor!(get_uint64, "uint64", u64);

    svarint_accessor!(get_sint32, "sint32", i32);
    svarint_accessor!(get_sint64, "sint64", i64);

    fixed_accessor!(get_fixed32, "fixed32", u32);
    fixed_accessor!(get_sfixed32, "sfixed32", i32);
    fixed_accessor!(get_fixed64, "fixed64", u64);
    fixed_accessor!(get_sfixed64, "sfixed64", i64);
    fixed_accessor!(get_float, "float", f32);
    fixed_accessor!(get_double, "double", f64);

    /// Consume the current `bytes`, `string` or `message` field and return
    /// its payload as a borrowed view.
    ///
    /// The view borrows from the buffer the reader was created over, not
    /// from the reader, so it stays valid while the reader moves on.
    pub fn get_view(&mut self) -> Result<&'a [u8]> {
        self.length_delimited()
    }

    /// Consume the current `string` field and return it as a borrowed,
    /// UTF-8 validated `&str`.
    ///
    /// Fails with [`Error::InvalidUtf8`] without consuming the field if the
    /// payload is not valid UTF-8.
    pub fn get_str(&mut self) -> Result<&'a str> {
        let mut probe = self.clone();
        let view = probe.length_delimited()?;
        let value = std::str::from_utf8(view).map_err(|_| Error::InvalidUtf8)?;
        *self = probe;
        Ok(value)
    }

    /// Consume the current `bytes` field and return an owned copy of its
    /// payload.
    pub fn get_bytes(&mut self) -> Result<Vec<u8>> {
        self.length_delimited().map(<[u8]>::to_vec)
    }

    /// Consume the current `string` field and return an owned,
    /// UTF-8 validated copy.
    pub fn get_string(&mut self) -> Result<String> {
        self.get_str().map(str::to_owned)
    }

    /// Consume the current `message` field and return a sub-reader over the
    /// embedded message.
    pub fn get_message(&mut self) -> Result<Reader<'a>> {
        self.length_delimited().map(Reader::new)
    }

    packed_accessor!(get_packed_bool, "bool", VarintIter, bool);
    packed_accessor!(get_packed_enum, "enum", VarintIter, i32);
    packed_accessor!(get_packed_int32, "int32", VarintIter, i32);
    packed_accessor!(get_packed_uint32, "uint32", VarintIter, u32);
    packed_accessor!(get_packed_int64, "int64", VarintIter, i64);
    packed_accessor!(get_packed_uint64, "uint64", VarintIter, u64);
    packed_accessor!(get_packed_sint32, "sint32", SvarintIter, i32);
    packed_accessor!(get_packed_sint64, "sint64", SvarintIter, i64);
    packed_accessor!(get_packed_fixed32, "fixed32", FixedIter, u32);
    packed_accessor!(get_packed_sfixed32, "sfixed32", FixedIter, i32);
    packed_accessor!(get_packed_fixed64, "fixed64", FixedIter, u64);
    packed_accessor!(get_packed_sfixed64, "sfixed64", FixedIter, i64);
    packed_accessor!(get_packed_float, "float", FixedIter, f32);
    packed_accessor!(get_packed_double, "double", FixedIter, f64);
}
