//! Scan planning and identifier resolution for activity imports.
//!
//! - [`scan`] splits a date range into windows the activity API accepts.
//! - [`lookup_ids`] caches database ids of lookup records per record kind.
//! - [`resource_cache`] memoizes external lookups per key, single-flight.
//! - [`resolver`] turns document context ids, meetings and users into Graph
//!   resources through those caches.

pub mod context_id;
pub mod error;
pub mod lookup_ids;
pub mod resolver;
pub mod resource_cache;
pub mod scan;

pub use error::ResolveError;
pub use lookup_ids::{LookupKind, TypedKeyCache};
pub use resolver::{
    CacheStats, ListItemKey, MeetingKey, ResolutionContext, ResolvedFileInfo, ResolvedMeeting,
    ResourceResolver,
};
pub use resource_cache::{CacheError, ResourceCache};
pub use scan::{
    generate_scan_windows, generate_scan_windows_with_chunk, scan_range_ending_at, TimeWindow,
    MAX_SCAN_CHUNK_HOURS,
};
