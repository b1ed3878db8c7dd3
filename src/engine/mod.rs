// src/engine/mod.rs

//! Event reading and demultiplexing.
//!
//! - [`record`] decodes the kernel's variable-length records.
//! - [`demux`] applies each record to the watch tree and correlates the two
//!   halves of a rename.
//! - [`event_loop`] is the facade callers use: it owns the descriptor, the
//!   read buffer, the registry and the demultiplexer.

pub mod demux;
pub mod event_loop;
pub mod record;

pub use demux::{Demultiplexer, PendingRename};
pub use event_loop::{EventLoop, EventLoopOptions, LoopState};
pub use record::Event;
