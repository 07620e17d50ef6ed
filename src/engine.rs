//! Playback engine: the transport state machine over the negotiated
//! backend, plus the position ticker that samples it.

mod player;
mod ticker;
mod types;

pub use player::PlaybackEngine;
pub use ticker::*;
pub use types::*;
