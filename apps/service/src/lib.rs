//! Site reachability monitoring.
//!
//! A [`SiteCoordinator`] owns the list of monitored sites, probes them
//! through an injectable [`Fetcher`] and keeps a JSON document on disk in
//! step with memory via a debounced writer.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod monitoring;
pub mod store;
pub mod validation;

pub use coordinator::SiteCoordinator;
pub use error::{CoordinatorError, StoreError, ValidationError};
pub use models::{Site, SiteStatus};
pub use monitoring::{FetchResponse, Fetcher, HttpFetcher, MonitoringScheduler};
pub use store::{JsonFileStore, SiteStore};
