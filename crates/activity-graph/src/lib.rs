//! Microsoft Graph adapter for activity resolution.
//!
//! Provides the REST client, the resource types it returns and the
//! `GraphLookup` capability the resolver consumes.

pub mod client;
pub mod error;
pub mod lookup;
pub mod types;

pub use client::GraphClient;
pub use error::GraphError;
pub use lookup::GraphLookup;
pub use types::{Drive, ListItem, OnlineMeeting, SharePointIds, Site, User};
