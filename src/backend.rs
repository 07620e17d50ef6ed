//! Rendering backends and the negotiator that picks one at startup.
//!
//! Everything past negotiation talks to a `Box<dyn RenderingBackend>` and
//! never asks which profile it got, except to decide whether a stream flag
//! can change live.

#[cfg(any(feature = "ffmpeg", test))]
mod clock;
mod disabled;
mod negotiator;
mod rodio_out;
#[cfg(feature = "ffmpeg")]
mod surface;
mod types;
#[cfg(feature = "ffmpeg")]
pub(crate) mod video_feed;

#[cfg(test)]
pub(crate) mod scripted;

pub use disabled::DisabledBackend;
pub use negotiator::{BackendNegotiator, Candidate, Probe};
pub use types::*;
