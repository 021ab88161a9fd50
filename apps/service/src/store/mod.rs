/// Persistence layer
///
/// The whole site collection is stored as one JSON document. Loads never
/// fail from the caller's point of view and saves replace the document
/// atomically; problems are reported through tracing.

pub mod repository;

pub use repository::{JsonFileStore, SiteStore};
