//! The lookups resolution is built on, as a capability the resolver can be handed.

use async_trait::async_trait;

use crate::client::GraphClient;
use crate::error::GraphError;
use crate::types::{Drive, ListItem, OnlineMeeting, Site, User};

/// External fetch functions used during identifier resolution.
///
/// `GraphError::NotFound` means the resource does not exist; every other
/// error is treated as transient by callers.
#[async_trait]
pub trait GraphLookup: Send + Sync {
    /// Default drive of a site (`host:/sites/x` address or site id).
    async fn fetch_site_drive(&self, site_address: &str) -> Result<Drive, GraphError>;

    /// The site itself (`host:/sites/x` address or site id).
    async fn fetch_site(&self, site_address: &str) -> Result<Site, GraphError>;

    /// OneDrive of a user.
    async fn fetch_user_drive(&self, user_principal_name: &str) -> Result<Drive, GraphError>;

    async fn fetch_list_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
    ) -> Result<ListItem, GraphError>;

    async fn fetch_user(&self, user_principal_name: &str) -> Result<User, GraphError>;

    async fn fetch_meeting(
        &self,
        organizer_id: &str,
        meeting_id: &str,
    ) -> Result<OnlineMeeting, GraphError>;
}

#[async_trait]
impl GraphLookup for GraphClient {
    async fn fetch_site_drive(&self, site_address: &str) -> Result<Drive, GraphError> {
        self.get_site_drive(site_address).await
    }

    async fn fetch_site(&self, site_address: &str) -> Result<Site, GraphError> {
        self.get_site(site_address).await
    }

    async fn fetch_user_drive(&self, user_principal_name: &str) -> Result<Drive, GraphError> {
        self.get_user_drive(user_principal_name).await
    }

    async fn fetch_list_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
    ) -> Result<ListItem, GraphError> {
        self.get_list_item(site_id, list_id, item_id).await
    }

    async fn fetch_user(&self, user_principal_name: &str) -> Result<User, GraphError> {
        self.get_user(user_principal_name).await
    }

    async fn fetch_meeting(
        &self,
        organizer_id: &str,
        meeting_id: &str,
    ) -> Result<OnlineMeeting, GraphError> {
        self.get_online_meeting(organizer_id, meeting_id).await
    }
}
