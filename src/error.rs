use std::error::Error as StdError;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Errors reading or writing messages in the Protocol Buffers wire format.
///
/// Tags outside the valid range (zero, or within the reserved block
/// `19000..=19999`) are a programming error rather than a data error. They
/// are caught by debug assertions on the read and write paths and have no
/// variant here.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A decode would have read past the end of the buffer.
    ///
    /// This is reported both for truncated values and for a field header
    /// requested after the buffer is exhausted mid-varint. The operation
    /// that reported it left the reader unchanged, so the caller may still
    /// query the reader for diagnostics.
    EndOfBuffer,

    /// A varint's tenth byte has its continuation bit set.
    ///
    /// Varints encode 64-bit values and are therefore at most ten bytes
    /// long. Value bits beyond the 64th are not otherwise validated; the
    /// decoded value wraps modulo 2^64.
    VarintTooLong,

    /// A field header carried wire type 3, 4, 6 or 7.
    ///
    /// Wire types 3 and 4 are the deprecated group markers, which this
    /// library does not support. 6 and 7 are unassigned.
    UnknownWireType,

    /// A string field did not contain valid UTF-8.
    InvalidUtf8,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::EndOfBuffer => write!(f, "unexpected end of buffer"),
            Error::VarintTooLong => write!(f, "varint exceeds 10 bytes"),
            Error::UnknownWireType => write!(f, "unknown wire type"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 in string field"),
        }
    }
}

impl StdError for Error {}

/// Result type used by all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
