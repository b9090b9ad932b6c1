#![deny(clippy::uninlined_format_args)]
#![deny(clippy::to_string_in_format_args)]
//! In-memory sorted set: unique string members ordered by `f64` score, with
//! logarithmic insert, delete, rank lookup and rank/score windows.

pub mod config;
pub mod error;
pub mod format;
pub mod level;
pub mod skiplist;
mod table;
mod zset;

pub use config::Config;
pub use error::ConfigError;
pub use level::{LevelGenerator, MAX_LEVEL};
pub use skiplist::{Direction, NodeId, SkipList, Walk};
pub use zset::{AddOutcome, ZSet};
