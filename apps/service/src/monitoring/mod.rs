/// Monitoring engine module - reachability checks for sites
///
/// This module is responsible for:
/// - The fetch capability used to reach an endpoint
/// - Probing a single site and stamping the outcome
/// - Scheduling probes by each site's frequency
pub mod checker;
pub mod probe;
pub mod scheduler;

pub use checker::{FetchResponse, Fetcher, HttpFetcher};
pub use probe::probe;
pub use scheduler::MonitoringScheduler;
