//! Concurrent media acquisition and assembly.
//!
//! Resolve a page URL into a stream catalogue, pick the best video and audio
//! streams, download them with resumable transfers, and hand them to an
//! external encoder. Playlists run through a bounded worker pool.

pub mod config;
pub mod logging;

pub mod assemble;
pub mod control;
pub mod job;
pub mod model;
pub mod naming;
pub mod pool;
pub mod resolver;
pub mod retry;
pub mod select;
pub mod transfer;
