//! Seating for a single table.
//!
//! This module provides:
//! - `Table`: fixed-capacity seat map with circular `before`/`after` lookups
//! - `TableConfig`: seat count, readiness threshold, and deal delay
//!
//! Positions are stable once assigned. Removing a player leaves a hole
//! instead of shifting the remaining seats, so the clockwise order used for
//! turns and for passing the deck never changes mid-hand.

pub mod config;
pub mod seats;

pub use config::{DEFAULT_DEAL_DELAY, DEFAULT_MAX_SEATS, DEFAULT_MIN_PLAYERS, TableConfig};
pub use seats::{Seat, Table};
