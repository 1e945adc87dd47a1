//! Request dispatch between the UI process and the project utilities.
//!
//! # Responsibility
//! - Define the named request/reply messages exchanged with the UI process.
//! - Route each request to exactly one session or update operation.
//!
//! # Invariants
//! - A request yields zero or one reply.
//! - Every failure is reported in `Handled::error`, whether or not the wire
//!   reply carries it.
//!
//! The transport itself lives outside this crate (`blockide_ffi`).

pub mod dispatcher;
pub mod message;

pub use dispatcher::{Dispatcher, Handled};
pub use message::{Channel, Payload, Reply, Request};
