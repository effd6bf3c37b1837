//! REST API client for the restaurant listing service.
//!
//! This module provides the `ApiClient` for fetching the restaurant
//! listing. The endpoint is unauthenticated and unpaginated; a single GET
//! returns the full JSON array of records.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
