//! Background preview extraction for video tracks.
//!
//! A fixed pool of worker threads pulls extraction tasks off a channel,
//! writes each result into the track's own slot and reports back over a
//! second channel. The control thread drains that channel and coalesces a
//! burst of completions into one "refresh now" signal.

mod debounce;
mod extract;
mod pipeline;
mod pool;

pub use debounce::Debouncer;
pub use extract::*;
pub use pipeline::*;
pub use pool::{MAX_WORKERS, MIN_WORKERS, WorkerPool, pool_size};
