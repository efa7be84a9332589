//! Low-level wire format types.

use crate::error::{Error, Result};
use crate::varint::{decode_zigzag64, encode_zigzag64};

/// Payload encoding of a field, from the low three bits of the field header.
///
/// Protocol Buffers defines six wire types but uses 3 bits to encode them.
/// The deprecated group markers (3 and 4) and the two unassigned values (6
/// and 7) are rejected when reading.
///
/// See <https://protobuf.dev/programming-guides/encoding/#structure>.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WireType {
    /// Integer encoded as a varint: int32/64, uint32/64, sint32/64, bool,
    /// enum.
    Varint = 0,
    /// 64-bit little-endian value: fixed64, sfixed64, double.
    Fixed64 = 1,
    /// Varint length followed by that many bytes: string, bytes, embedded
    /// messages, packed repeated fields.
    LengthDelimited = 2,
    /// 32-bit little-endian value: fixed32, sfixed32, float.
    Fixed32 = 5,
}

impl WireType {
    /// Decode the low three bits of a field header.
    pub fn from_raw(raw: u8) -> Result<WireType> {
        match raw {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            _ => Err(Error::UnknownWireType),
        }
    }
}

/// Largest valid field tag: 2^29 - 1.
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// Return true if `tag` may appear in a field header.
///
/// Tag zero and the block `19000..=19999` are reserved by the Protocol
/// Buffers specification.
pub fn valid_tag(tag: u32) -> bool {
    matches!(tag, 1..=18999 | 20000..=MAX_TAG)
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for i64 {}
    impl Sealed for u64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Element type of a varint-encoded field.
///
/// Conversion between the value and the `u64` wire payload uses
/// sign extension on encode and two's-complement truncation on decode, as
/// the format requires for the `int32`/`int64`/`uint32`/`uint64`/`bool`
/// field types.
pub trait VarintScalar: sealed::Sealed + Copy {
    fn from_wire(value: u64) -> Self;
    fn to_wire(self) -> u64;
}

impl VarintScalar for bool {
    fn from_wire(value: u64) -> bool {
        value != 0
    }

    fn to_wire(self) -> u64 {
        self as u64
    }
}

impl VarintScalar for i32 {
    fn from_wire(value: u64) -> i32 {
        value as i32
    }

    fn to_wire(self) -> u64 {
        // Sign extend so that negative values occupy the full ten bytes,
        // matching the canonical int32 encoding.
        self as i64 as u64
    }
}

impl VarintScalar for u32 {
    fn from_wire(value: u64) -> u32 {
        value as u32
    }

    fn to_wire(self) -> u64 {
        self as u64
    }
}

impl VarintScalar for i64 {
    fn from_wire(value: u64) -> i64 {
        value as i64
    }

    fn to_wire(self) -> u64 {
        self as u64
    }
}

impl VarintScalar for u64 {
    fn from_wire(value: u64) -> u64 {
        value
    }

    fn to_wire(self) -> u64 {
        self
    }
}

/// Element type of a zigzag varint field (`sint32`, `sint64`).
///
/// Both widths travel through the 64-bit zigzag mapping; 32-bit values are
/// sign extended first.
pub trait ZigzagScalar: sealed::Sealed + Copy {
    fn from_wire(value: u64) -> Self;
    fn to_wire(self) -> u64;
}

impl ZigzagScalar for i32 {
    fn from_wire(value: u64) -> i32 {
        decode_zigzag64(value) as i32
    }

    fn to_wire(self) -> u64 {
        encode_zigzag64(self as i64)
    }
}

impl ZigzagScalar for i64 {
    fn from_wire(value: u64) -> i64 {
        decode_zigzag64(value)
    }

    fn to_wire(self) -> u64 {
        encode_zigzag64(self)
    }
}

/// Element type of a fixed-width field.
///
/// Values are stored little-endian on the wire; `from_le_prefix` and
/// `to_le_bytes` byte-swap on big-endian hosts.
pub trait FixedScalar: sealed::Sealed + Copy {
    /// Encoded size in bytes (4 or 8).
    const SIZE: usize;

    /// Wire type of a non-packed field holding this element.
    const WIRE_TYPE: WireType;

    /// Little-endian encoding of a value (`[u8; 4]` or `[u8; 8]`).
    type Bytes: AsRef<[u8]>;

    /// Load a value from the first `SIZE` bytes of `data`.
    ///
    /// Panics if `data` is shorter than `SIZE`; callers bounds-check first.
    fn from_le_prefix(data: &[u8]) -> Self;

    /// Return the little-endian encoding of `self`.
    fn le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_fixed_scalar {
    ($type:ty, $size:expr, $wire_type:expr) => {
        impl FixedScalar for $type {
            const SIZE: usize = $size;
            const WIRE_TYPE: WireType = $wire_type;
            type Bytes = [u8; $size];

            fn from_le_prefix(data: &[u8]) -> $type {
                let mut bytes = [0u8; $size];
                bytes.copy_from_slice(&data[..$size]);
                <$type>::from_le_bytes(bytes)
            }

            fn le_bytes(self) -> [u8; $size] {
                self.to_le_bytes()
            }
        }
    };
}

impl_fixed_scalar!(u32, 4, WireType::Fixed32);
impl_fixed_scalar!(i32, 4, WireType::Fixed32);
impl_fixed_scalar!(f32, 4, WireType::Fixed32);
impl_fixed_scalar!(u64, 8, WireType::Fixed64);
impl_fixed_scalar!(i64, 8, WireType::Fixed64);
impl_fixed_scalar!(f64, 8, WireType::Fixed64);

#[cfg(test)]
mod tests {
    use super::{valid_tag, Error, WireType, MAX_TAG};

    #[test]
    fn test_wire_type_from_raw() {
        assert_eq!(WireType::from_raw(0), Ok(WireType::Varint));
        assert_eq!(WireType::from_raw(1), Ok(WireType::Fixed64));
        assert_eq!(WireType::from_raw(2), Ok(WireType::LengthDelimited));
        assert_eq!(WireType::from_raw(5), Ok(WireType::Fixed32));
        for raw in [3, 4, 6, 7] {
            assert_eq!(WireType::from_raw(raw), Err(Error::UnknownWireType));
        }
    }

    #[test]
    fn test_valid_tag() {
        assert!(!valid_tag(0));
        assert!(valid_tag(1));
        assert!(valid_tag(18999));
        assert!(!valid_tag(19000));
        assert!(!valid_tag(19999));
        assert!(valid_tag(20000));
        assert!(valid_tag(MAX_TAG));
        assert!(!valid_tag(MAX_TAG + 1));
    }
}
