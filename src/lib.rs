//! Zero-copy reader and writer for the Protocol Buffers wire format.
//!
//! This crate provides a low-level API for decoding and encoding messages
//! in the [Protocol Buffers][protobuf] binary wire format, with a focus on
//! minimizing dependencies, allocations and copies. It is schema-agnostic
//! at runtime: there is no code generation and no reflective message tree.
//! Instead the caller drives a cursor field by field, knows which tag maps
//! to which logical field, and asks for the correspondingly typed value.
//! Unlike with runtimes based on generated code, only the fields a caller
//! actually touches are ever decoded.
//!
//! # Prerequisites
//!
//! To use this library, it is helpful to have an understanding of how
//! Protocol Buffers messages are encoded. See
//! <https://protobuf.dev/programming-guides/encoding/> for a guide.
//!
//! # Reading
//!
//! A [`Reader`] borrows a byte buffer holding a complete message and steps
//! through its fields. Scalar values are decoded in place; strings, bytes
//! and nested messages come back as views borrowing from the input buffer,
//! so no payload bytes are copied unless the caller asks for an owned copy.
//!
//! ```
//! use zeropbf::Reader;
//!
//! let buffer = [0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i'];
//! let mut message = Reader::new(&buffer);
//! while message.next()? {
//!     match message.tag() {
//!         1 => println!("a = {}", message.get_uint32()?),
//!         2 => println!("b = {}", message.get_str()?),
//!         _ => message.skip()?,
//!     }
//! }
//! # Ok::<(), zeropbf::Error>(())
//! ```
//!
//! # Writing
//!
//! A [`Writer`] appends encoded fields to a caller-supplied buffer (any
//! container implementing [`BytesBuffer`]). Nested messages of unknown
//! length are written in a single pass through a [`SubWriter`], which
//! patches the length in when it is closed and removes the field entirely
//! if nothing was written (see [`Writer::sub_writer`]).
//!
//! ```
//! use zeropbf::{Reader, Writer};
//!
//! let mut buffer = Vec::new();
//! let mut writer = Writer::new(&mut buffer);
//! writer.add_uint32(1, 150);
//! {
//!     let mut position = writer.sub_writer(2);
//!     position.add_double(1, 48.137);
//!     position.add_double(2, 11.575);
//! }
//!
//! let mut message = Reader::new(&buffer);
//! assert!(message.next()?);
//! assert_eq!(message.get_uint32()?, 150);
//! # Ok::<(), zeropbf::Error>(())
//! ```
//!
//! # Typed field definitions
//!
//! The [`schema`] module provides optional zero-cost field descriptors
//! which tie a field's tag and logical type together at compile time, so a
//! tag cannot be read with one type and written with another.
//!
//! # Scope
//!
//! The full wire format is supported except for the deprecated group wire
//! types (3 and 4), which are rejected when reading. The library performs
//! no I/O and imposes no message size limits of its own; callers parsing
//! untrusted input should bound buffer sizes themselves.
//!
//! [protobuf]: https://protobuf.dev/

#![forbid(unsafe_code)]

mod buffer;
mod error;
mod packed;
mod reader;
pub mod schema;
mod types;
pub mod varint;
mod writer;

pub use buffer::BytesBuffer;
pub use error::{Error, Result};
pub use packed::{FixedIter, SvarintIter, VarintIter};
pub use reader::Reader;
pub use types::{valid_tag, FixedScalar, VarintScalar, WireType, ZigzagScalar, MAX_TAG};
pub use writer::{PackedFixedField, PackedSvarintField, PackedVarintField, SubWriter, Writer};
