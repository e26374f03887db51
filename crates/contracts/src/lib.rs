//! Solidity interface bindings for the stakewire contract surface and the shared
//! call helper. Selector names are the wire protocol and must not be renamed.

pub mod bindings;
pub mod call;
pub mod convert;

pub use call::{call_and_decode, call_and_decode_at};
