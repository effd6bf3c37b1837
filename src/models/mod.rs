//! Data models for the restaurant listing.
//!
//! The restaurant record is the sole entity this layer deals in: created by
//! a successful API fetch, overwritten by the next one, never deleted.

pub mod restaurant;

pub use restaurant::{LatLng, Restaurant};
