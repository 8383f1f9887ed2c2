//! Authoritative server for a massively-multiplayer snake arena.
//!
//! One tick task owns all world state; per-connection reader/writer
//! tasks talk to it exclusively over bounded channels. State goes out
//! as viewport-culled binary frames with a per-client metadata cache.

pub mod config;
pub mod error;
pub mod game;
pub mod protocol;
pub mod server;
