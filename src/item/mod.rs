//! # Item Collaborators
//!
//! The three pluggable contracts the chunk orchestrator drives: an
//! [`ItemSource`] produces items lazily, an [`ItemProcessor`] transforms or
//! validates one item at a time, and an [`ItemWriter`] persists a whole chunk
//! atomically. All three are async traits so implementations can sit in front
//! of real I/O without changing the orchestration loop.

pub mod processor;
pub mod source;
pub mod writer;

pub use processor::{ItemProcessor, PassthroughProcessor};
pub use source::{ItemSource, VecSource};
pub use writer::ItemWriter;
