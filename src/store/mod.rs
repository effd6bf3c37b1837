//! Durable local persistence for restaurant records.
//!
//! This module provides the `RecordStore`, a keyed JSON snapshot on disk
//! that survives restarts. A missing persistence capability is silent
//! degradation: `open` yields `None` and the data layer runs network-only.

pub mod record_store;

pub use record_store::{RecordStore, StoreError};
