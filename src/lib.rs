//! platecache - offline-first data layer for a restaurant listing page.
//!
//! Restaurant records are fetched from a remote API and mirrored into a
//! local persistent store; when the network is unavailable the store
//! answers instead. A background worker caches a fixed manifest of page
//! assets and serves them on intercepted fetches.
//!
//! The pieces, wired by the presentation code:
//!
//! - [`store::RecordStore`]: durable keyed persistence for records.
//! - [`api::ApiClient`]: the restaurant listing endpoint.
//! - [`service::DataService`]: cache-vs-network arbitration and every
//!   query the page issues.
//! - [`worker`]: the asset cache worker lifecycle and interception loop.

pub mod api;
pub mod config;
pub mod models;
pub mod service;
pub mod store;
pub mod worker;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use models::{LatLng, Restaurant};
pub use service::{DataError, DataService, FILTER_ALL};
pub use store::{RecordStore, StoreError};
pub use worker::{register, AssetCacheWorker, ControlMessage, WorkerHandle, WorkerState};
