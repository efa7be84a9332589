//! Compile-time field descriptors.
//!
//! The reader and writer are schema-agnostic: the caller passes tags and
//! picks typed accessors by hand, and nothing stops a typo from reading
//! field 7 as `fixed32` in one place and `sint32` in another. The
//! descriptors in this module associate a field's logical type with its tag
//! once, as a type alias, so every access point compiles down to the
//! matching reader/writer call with the right tag:
//!
//! ```
//! use zeropbf::schema::{FieldDef, Fixed32, PackedDef, Sint32, Str};
//! use zeropbf::{Reader, Writer};
//!
//! // message Test {
//! //     fixed32 f = 1;
//! //     string s = 8;
//! //     repeated sint32 d = 7 [packed = true];
//! // }
//! struct Test;
//! impl Test {
//!     const F: u32 = 1;
//!     const S: u32 = 8;
//!     const D: u32 = 7;
//! }
//! type TestF = FieldDef<Fixed32, { Test::F }>;
//! type TestS = FieldDef<Str, { Test::S }>;
//! type TestD = PackedDef<Sint32, { Test::D }>;
//!
//! let mut buffer = Vec::new();
//! let mut writer = Writer::new(&mut buffer);
//! TestF::add(&mut writer, 12345678);
//! TestS::add(&mut writer, "foobar");
//! TestD::add(&mut writer, [-17, 22]);
//!
//! let mut message = Reader::new(&buffer);
//! while message.next()? {
//!     match message.tag() {
//!         TestF::TAG => assert_eq!(TestF::get(&mut message)?, 12345678),
//!         TestS::TAG => assert_eq!(TestS::get(&mut message)?, "foobar"),
//!         TestD::TAG => {
//!             let sum: i32 = TestD::get(&mut message)?.map(|v| v.unwrap()).sum();
//!             assert_eq!(sum, 5);
//!         }
//!         _ => message.skip()?,
//!     }
//! }
//! # Ok::<(), zeropbf::Error>(())
//! ```
//!
//! The descriptors change no runtime semantics and occupy no space; they
//! exist to keep a field's tag and type in one place.

use std::marker::PhantomData;

use crate::buffer::BytesBuffer;
use crate::error::Result;
use crate::packed::{FixedIter, SvarintIter, VarintIter};
use crate::reader::Reader;
use crate::types::WireType;
use crate::writer::Writer;

mod sealed {
    pub trait Sealed {}
}

/// A logical field type: the association between a wire type and the Rust
/// types a field decodes to and encodes from.
///
/// Implemented by the marker types in this module ([`Int32`], [`Str`],
/// [`Msg`], ...); the set is closed.
pub trait FieldType: sealed::Sealed {
    /// Wire type a field of this logical type is encoded with.
    const WIRE_TYPE: WireType;

    /// Value produced when reading a field.
    type Get<'a>;

    /// Value accepted when writing a field.
    type Add<'a>;

    /// Read the current field of `reader` as this type.
    fn get<'a>(reader: &mut Reader<'a>) -> Result<Self::Get<'a>>;

    /// Append a field with this type and the given tag to `writer`.
    fn add<B: BytesBuffer>(writer: &mut Writer<'_, B>, tag: u32, value: Self::Add<'_>);
}

/// A logical element type usable in a packed repeated field.
pub trait PackedType: sealed::Sealed {
    /// Element value type.
    type Elem;

    /// Lazy iterator produced when reading a packed field.
    type Iter<'a>: Iterator<Item = Result<Self::Elem>>;

    /// Read the current field of `reader` as a packed repeated field.
    fn get_packed<'a>(reader: &mut Reader<'a>) -> Result<Self::Iter<'a>>;

    /// Append a packed repeated field with the given tag to `writer`.
    ///
    /// An empty sequence writes nothing.
    fn add_packed<B, I>(writer: &mut Writer<'_, B>, tag: u32, values: I)
    where
        B: BytesBuffer,
        I: IntoIterator<Item = Self::Elem>;
}

macro_rules! scalar_field_type {
    ($marker:ident, $pbf_type:literal, $value:ty, $wire_type:expr, $get:ident, $add:ident) => {
        #[doc = concat!("Marker for `", $pbf_type, "` fields.")]
        pub struct $marker(());

        impl sealed::Sealed for $marker {}

        impl FieldType for $marker {
            const WIRE_TYPE: WireType = $wire_type;
            type Get<'a> = $value;
            type Add<'a> = $value;

            fn get<'a>(reader: &mut Reader<'a>) -> Result<$value> {
                reader.$get()
            }

            fn add<B: BytesBuffer>(writer: &mut Writer<'_, B>, tag: u32, value: $value) {
                writer.$add(tag, value);
            }
        }
    };
}

macro_rules! packed_field_type {
    ($marker:ident, $elem:ty, $iter:ident, $get_packed:ident, $guard:ident) => {
        impl PackedType for $marker {
            type Elem = $elem;
            type Iter<'a> = $iter<'a, $elem>;

            fn get_packed<'a>(reader: &mut Reader<'a>) -> Result<$iter<'a, $elem>> {
                reader.$get_packed()
            }

            fn add_packed<B, I>(writer: &mut Writer<'_, B>, tag: u32, values: I)
            where
                B: BytesBuffer,
                I: IntoIterator<Item = $elem>,
            {
                let mut field = writer.$guard::<$elem>(tag);
                for value in values {
                    field.add_element(value);
                }
            }
        }
    };
}

scalar_field_type!(Bool, "bool", bool, WireType::Varint, get_bool, add_bool);
scalar_field_type!(Enum, "enum", i32, WireType::Varint, get_enum, add_enum);
scalar_field_type!(Int32, "int32", i32, WireType::Varint, get_int32, add_int32);
scalar_field_type!(Sint32, "sint32", i32, WireType::Varint, get_sint32, add_sint32);
scalar_field_type!(Uint32, "uint32", u32, WireType::Varint, get_uint32, add_uint32);
scalar_field_type!(Int64, "int64", i64, WireType::Varint, get_int64, add_int64);
scalar_field_type!(Sint64, "sint64", i64, WireType::Varint, get_sint64, add_sint64);
scalar_field_type!(Uint64, "uint64", u64, WireType::Varint, get_uint64, add_uint64);
scalar_field_type!(
    Fixed32,
    "fixed32",
    u32,
    WireType::Fixed32,
    get_fixed32,
    add_fixed32
);
scalar_field_type!(
    Sfixed32,
    "sfixed32",
    i32,
    WireType::Fixed32,
    get_sfixed32,
    add_sfixed32
);
scalar_field_type!(
    Fixed64,
    "fixed64",
    u64,
    WireType::Fixed64,
    get_fixed64,
    add_fixed64
);
scalar_field_type!(
    Sfixed64,
    "sfixed64",
    i64,
    WireType::Fixed64,
    get_sfixed64,
    add_sfixed64
);
scalar_field_type!(Float, "float", f32, WireType::Fixed32, get_float, add_float);
scalar_field_type!(
    Double,
    "double",
    f64,
    WireType::Fixed64,
    get_double,
    add_double
);

packed_field_type!(Bool, bool, VarintIter, get_packed_bool, packed_varint_field);
packed_field_type!(Enum, i32, VarintIter, get_packed_enum, packed_varint_field);
packed_field_type!(Int32, i32, VarintIter, get_packed_int32, packed_varint_field);
packed_field_type!(Uint32, u32, VarintIter, get_packed_uint32, packed_varint_field);
packed_field_type!(Int64, i64, VarintIter, get_packed_int64, packed_varint_field);
packed_field_type!(Uint64, u64, VarintIter, get_packed_uint64, packed_varint_field);
packed_field_type!(
    Sint32,
    i32,
    SvarintIter,
    get_packed_sint32,
    packed_svarint_field
);
packed_field_type!(
    Sint64,
    i64,
    SvarintIter,
    get_packed_sint64,
    packed_svarint_field
);
packed_field_type!(
    Fixed32,
    u32,
    FixedIter,
    get_packed_fixed32,
    packed_fixed_field
);
packed_field_type!(
    Sfixed32,
    i32,
    FixedIter,
    get_packed_sfixed32,
    packed_fixed_field
);
packed_field_type!(
    Fixed64,
    u64,
    FixedIter,
    get_packed_fixed64,
    packed_fixed_field
);
packed_field_type!(
    Sfixed64,
    i64,
    FixedIter,
    get_packed_sfixed64,
    packed_fixed_field
);
packed_field_type!(Float, f32, FixedIter, get_packed_float, packed_fixed_field);
packed_field_type!(Double, f64, FixedIter, get_packed_double, packed_fixed_field);

/// Marker for `bytes` fields. Reads as a borrowed view.
pub struct Bytes(());

impl sealed::Sealed for Bytes {}

impl FieldType for Bytes {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;
    type Get<'a> = &'a [u8];
    type Add<'a> = &'a [u8];

    fn get<'a>(reader: &mut Reader<'a>) -> Result<&'a [u8]> {
        reader.get_view()
    }

    fn add<B: BytesBuffer>(writer: &mut Writer<'_, B>, tag: u32, value: &[u8]) {
        writer.add_bytes(tag, value);
    }
}

/// Marker for `string` fields. Reads as a borrowed, UTF-8 validated `&str`.
pub struct Str(());

impl sealed::Sealed for Str {}

impl FieldType for Str {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;
    type Get<'a> = &'a str;
    type Add<'a> = &'a str;

    fn get<'a>(reader: &mut Reader<'a>) -> Result<&'a str> {
        reader.get_str()
    }

    fn add<B: BytesBuffer>(writer: &mut Writer<'_, B>, tag: u32, value: &str) {
        writer.add_string(tag, value);
    }
}

/// Marker for embedded `message` fields.
///
/// Reads as a sub-[`Reader`] over the nested message; writes take a
/// complete pre-encoded message. To encode a nested message in place, use
/// [`Writer::sub_writer`] with the descriptor's [`TAG`](FieldDef::TAG).
pub struct Msg(());

impl sealed::Sealed for Msg {}

impl FieldType for Msg {
    const WIRE_TYPE: WireType = WireType::LengthDelimited;
    type Get<'a> = Reader<'a>;
    type Add<'a> = &'a [u8];

    fn get<'a>(reader: &mut Reader<'a>) -> Result<Reader<'a>> {
        reader.get_message()
    }

    fn add<B: BytesBuffer>(writer: &mut Writer<'_, B>, tag: u32, value: &[u8]) {
        writer.add_message(tag, value);
    }
}

/// Descriptor tying a scalar field's logical type to its tag.
///
/// Declared once per field as a type alias; see the [module
/// docs](self) for usage.
pub struct FieldDef<T: FieldType, const N: u32>(PhantomData<T>);

impl<T: FieldType, const N: u32> FieldDef<T, N> {
    /// Tag (field number) of this field.
    ///
    /// Usable in `match` patterns against [`Reader::tag`].
    pub const TAG: u32 = N;

    /// Read the current field of `reader`, which must have this
    /// descriptor's tag and wire type.
    pub fn get<'a>(reader: &mut Reader<'a>) -> Result<T::Get<'a>> {
        debug_assert!(reader.tag() == N, "current field does not have tag {}", N);
        T::get(reader)
    }

    /// Append a field with this descriptor's tag to `writer`.
    pub fn add<B: BytesBuffer>(writer: &mut Writer<'_, B>, value: T::Add<'_>) {
        T::add(writer, N, value);
    }
}

/// Descriptor tying a packed repeated field's element type to its tag.
pub struct PackedDef<T: PackedType, const N: u32>(PhantomData<T>);

impl<T: PackedType, const N: u32> PackedDef<T, N> {
    /// Tag (field number) of this field.
    pub const TAG: u32 = N;

    /// Read the current field of `reader` as a packed repeated field.
    pub fn get<'a>(reader: &mut Reader<'a>) -> Result<T::Iter<'a>> {
        debug_assert!(reader.tag() == N, "current field does not have tag {}", N);
        T::get_packed(reader)
    }

    /// Append a packed repeated field with this descriptor's tag to
    /// `writer`. An empty sequence writes nothing.
    pub fn add<B, I>(writer: &mut Writer<'_, B>, values: I)
    where
        B: BytesBuffer,
        I: IntoIterator<Item = T::Elem>,
    {
        T::add_packed(writer, N, values);
    }
}
