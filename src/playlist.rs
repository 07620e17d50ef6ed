//! Playlist navigation: the master track list, its search-filtered view
//! and the session that decides what plays next.

mod navigator;
mod session;
mod view;

pub use navigator::*;
pub use session::PlaybackSession;

#[cfg(test)]
mod tests;
