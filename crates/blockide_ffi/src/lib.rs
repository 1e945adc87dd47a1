//! FFI surface for the BlockIDE UI process.

pub mod api;
