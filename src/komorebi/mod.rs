//! komorebi-specific implementations.
//!
//! This module provides the concrete [`StateSource`](crate::traits::StateSource)
//! backend, powered by the `komorebic` command-line client.
//!
//! Nothing outside this module should reference komorebi's JSON layout or
//! command names directly.

mod exec;
mod schema;
pub mod source;

pub use source::{KomorebicSource, Query, SourceError};
