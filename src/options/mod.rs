//! Option schemas, value parsers and parsed option values.
//!
//! A command declares its recognised flags as a [`CommandSchema`]. The schema
//! turns a [`RawArgs`] list into [`ParsedOptions`] or fails with an
//! [`ArgumentError`] naming the offending flag. Relationships between flags
//! beyond exclusive and required-together groups are left to
//! [`crate::validate`].

mod error;
pub mod parsers;
mod schema;
mod values;

pub use error::{ArgumentError, flag_name};
pub use parsers::{
    ArgList, BinarySize, ByteSize, Case, ChoiceSet, DictKey, DictScalar, DictSpec, DictValue,
    KeyParser, SizeUnit,
};
pub use schema::{CommandSchema, OptionKind, OptionSpec, RawArgs};
pub use values::{OptionValue, ParsedOptions};
