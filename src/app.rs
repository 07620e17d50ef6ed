//! Control hub: turns user commands into engine/navigator calls and reports
//! everything that happened as `PlayerEvent`s.
//!
//! `App` lives on the control thread. The only thing it shares with other
//! threads is the thumbnail pipeline's completion channel, which it drains
//! in [`App::tick`].

mod events;
mod model;

pub use events::*;
pub use model::*;

#[cfg(test)]
mod tests;
