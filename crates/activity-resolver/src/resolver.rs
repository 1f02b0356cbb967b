//! Resolution of activity identifiers into Graph resources.

use activity_graph::{Drive, GraphError, GraphLookup, ListItem, OnlineMeeting, Site, User};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::context_id;
use crate::error::ResolveError;
use crate::lookup_ids::TypedKeyCache;
use crate::resource_cache::{CacheError, ResourceCache};

/// Key for a list item lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListItemKey {
    pub site_id: String,
    pub list_id: String,
    pub item_id: String,
}

impl fmt::Display for ListItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.site_id, self.list_id, self.item_id)
    }
}

/// Key for a meeting lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeetingKey {
    pub organizer_id: String,
    pub meeting_id: String,
}

impl fmt::Display for MeetingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organizer_id, self.meeting_id)
    }
}

/// Caches for one scan run, shared by every resolver working on that run.
pub struct ResolutionContext {
    lookup_ids: TypedKeyCache,
    sites: ResourceCache<String, Site>,
    site_drives: ResourceCache<String, Drive>,
    user_drives: ResourceCache<String, Drive>,
    list_items: ResourceCache<ListItemKey, ListItem>,
    users: ResourceCache<String, User>,
    meetings: ResourceCache<MeetingKey, OnlineMeeting>,
}

/// Settled entry counts per cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub sites: usize,
    pub site_drives: usize,
    pub user_drives: usize,
    pub list_items: usize,
    pub users: usize,
    pub meetings: usize,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self {
            lookup_ids: TypedKeyCache::new(),
            sites: ResourceCache::new("sites"),
            site_drives: ResourceCache::new("site drives"),
            user_drives: ResourceCache::new("user drives"),
            list_items: ResourceCache::new("list items"),
            users: ResourceCache::new("users"),
            meetings: ResourceCache::new("meetings"),
        }
    }

    /// Database ids of lookup records, for the import engine.
    pub fn lookup_ids(&self) -> &TypedKeyCache {
        &self.lookup_ids
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            sites: self.sites.len(),
            site_drives: self.site_drives.len(),
            user_drives: self.user_drives.len(),
            list_items: self.list_items.len(),
            users: self.users.len(),
            meetings: self.meetings.len(),
        }
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A document resolved from a context id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFileInfo {
    /// Drive item GUID taken from the context id
    pub drive_item_id: String,
    /// List item id as reported by Graph
    pub list_item_id: Option<String>,
    pub web_url: Option<String>,
    pub file_name: Option<String>,
    pub extension: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub drive_id: Option<String>,
    pub site_id: String,
    pub list_id: String,
    pub site_url: Option<String>,
    pub site_title: Option<String>,
}

impl ResolvedFileInfo {
    fn new(
        drive: &Drive,
        site_id: &str,
        list_id: &str,
        item_id: &str,
        item: ListItem,
        site: Option<Site>,
    ) -> Self {
        let file_name = item.field_str("FileLeafRef").map(str::to_string);
        let extension = file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());

        let (site_url, site_title) = match site {
            Some(site) => (site.web_url, site.display_name.or(site.name)),
            None => (None, None),
        };

        Self {
            drive_item_id: item_id.to_string(),
            list_item_id: item.id,
            web_url: item.web_url,
            file_name,
            extension,
            last_modified: item.last_modified_date_time,
            drive_id: drive.id.clone(),
            site_id: site_id.to_string(),
            list_id: list_id.to_string(),
            site_url,
            site_title,
        }
    }
}

/// Meeting metadata as seen by its organizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMeeting {
    pub meeting_id: String,
    pub organizer_id: String,
    pub subject: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub join_url: Option<String>,
}

impl ResolvedMeeting {
    fn new(key: &MeetingKey, meeting: OnlineMeeting) -> Self {
        Self {
            meeting_id: meeting.id.unwrap_or_else(|| key.meeting_id.clone()),
            organizer_id: key.organizer_id.clone(),
            subject: meeting.subject,
            start: meeting.start_date_time,
            end: meeting.end_date_time,
            join_url: meeting.join_web_url,
        }
    }
}

/// `NotFound` becomes a confirmed absence; other errors stay errors.
fn absent_if_not_found<T>(result: Result<T, GraphError>) -> Result<Option<T>, GraphError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolves identifiers from activity events, consulting the run's caches first.
pub struct ResourceResolver<L: GraphLookup + ?Sized> {
    graph: Arc<L>,
    context: Arc<ResolutionContext>,
}

impl<L: GraphLookup + ?Sized> ResourceResolver<L> {
    pub fn new(graph: Arc<L>, context: Arc<ResolutionContext>) -> Self {
        Self { graph, context }
    }

    pub fn context(&self) -> &Arc<ResolutionContext> {
        &self.context
    }

    /// Resolve a document context id to its list item.
    ///
    /// `fallback_upn` is the user of the event; personal-site documents are
    /// looked up through that user's drive.
    ///
    /// Returns `Ok(None)` when the document cannot be located.
    ///
    /// # Errors
    /// `ContractViolation` if the resolved drive lacks its site or list id,
    /// `Transient` if the site or list item lookup failed for reasons other
    /// than absence.
    pub async fn resolve_document_context(
        &self,
        context_id: &str,
        fallback_upn: &str,
    ) -> Result<Option<ResolvedFileInfo>, ResolveError> {
        let Some(site_url) = context_id::site_url(context_id) else {
            tracing::warn!(context_id, "No site URL found in context id");
            return Ok(None);
        };

        let drive = if context_id::is_my_site_url(&site_url) {
            self.user_drive(fallback_upn).await
        } else {
            self.team_site_drive(&site_url).await
        };
        let Some(drive) = drive else {
            return Ok(None);
        };

        let site_id = drive.site_id().ok_or_else(|| {
            tracing::error!(%site_url, drive_id = ?drive.id, "Drive has no sharePointIds.siteId");
            ResolveError::contract_violation(format!(
                "drive for {} has no sharePointIds.siteId",
                site_url
            ))
        })?;
        let list_id = drive.list_id().ok_or_else(|| {
            tracing::error!(%site_url, drive_id = ?drive.id, "Drive has no sharePointIds.listId");
            ResolveError::contract_violation(format!(
                "drive for {} has no sharePointIds.listId",
                site_url
            ))
        })?;

        let Some(item_id) = context_id::drive_item_id(context_id) else {
            tracing::warn!(context_id, "No drive item id found in context id");
            return Ok(None);
        };

        let site_key = site_id.to_string();
        let site = self
            .context
            .sites
            .get_or_fetch_or_none(&site_key, || async {
                absent_if_not_found(self.graph.fetch_site(site_id).await)
            })
            .await
            .map_err(|e| {
                tracing::warn!(site_id, error = %e, "Error getting site info");
                ResolveError::transient(format!("site {}", site_id), e)
            })?;

        let item_key = ListItemKey {
            site_id: site_id.to_string(),
            list_id: list_id.to_string(),
            item_id: item_id.clone(),
        };
        let item = self
            .context
            .list_items
            .get_or_fetch_or_none(&item_key, || async {
                absent_if_not_found(self.graph.fetch_list_item(site_id, list_id, &item_id).await)
            })
            .await
            .map_err(|e| {
                tracing::warn!(item = %item_key, error = %e, "Error getting list item");
                ResolveError::transient(format!("list item {}", item_key), e)
            })?;

        let Some(item) = item else {
            tracing::warn!(drive_item_id = %item_id, "No item found for drive item id");
            return Ok(None);
        };

        Ok(Some(ResolvedFileInfo::new(
            &drive, site_id, list_id, &item_id, item, site,
        )))
    }

    /// OneDrive of the event's user. Any failure yields `None`.
    async fn user_drive(&self, upn: &str) -> Option<Drive> {
        if upn.trim().is_empty() {
            tracing::warn!("Personal site document without a user to look up the drive");
            return None;
        }

        let key = upn.to_string();
        let result = self
            .context
            .user_drives
            .get_or_fetch_or_none(&key, || async {
                absent_if_not_found(self.graph.fetch_user_drive(upn).await)
            })
            .await;

        match result {
            Ok(Some(drive)) => Some(drive),
            Ok(None) => {
                tracing::warn!(upn, "No drive found for user");
                None
            }
            Err(e) => {
                tracing::warn!(upn, error = %e, "Error getting drive info for user");
                None
            }
        }
    }

    /// Default drive of a team site, checking whether the site exists when there is none.
    async fn team_site_drive(&self, site_url: &str) -> Option<Drive> {
        let Some(address) = context_id::host_and_site_relative_url(site_url) else {
            // Possibly a Teams reference
            tracing::warn!(site_url, "Not a SharePoint site URL");
            return None;
        };

        let drive = self
            .context
            .site_drives
            .get_or_fetch_or_none(&address, || async {
                absent_if_not_found(self.graph.fetch_site_drive(&address).await)
            })
            .await;

        match drive {
            Ok(Some(drive)) => return Some(drive),
            Ok(None) => tracing::warn!(site_url, "No drive returned for site"),
            Err(e) => tracing::warn!(site_url, error = %e, "Error getting drive info for site"),
        }

        let site = self
            .context
            .sites
            .get_or_fetch_or_none(&address, || async {
                absent_if_not_found(self.graph.fetch_site(&address).await)
            })
            .await;

        match site {
            Ok(Some(_)) => {
                tracing::warn!(site_url, "Site found but no drive found for site");
            }
            Ok(None) => {
                tracing::error!(site_url, %address, "No site found for site URL; context id parsing may be wrong");
            }
            Err(e) => {
                tracing::warn!(site_url, error = %e, "Error getting site info for site");
            }
        }
        None
    }

    /// Meeting metadata for `(organizer_id, meeting_id)`.
    ///
    /// Failures are logged and yield `None`; callers must cope with missing
    /// meeting metadata.
    pub async fn resolve_meeting(
        &self,
        meeting_id: &str,
        organizer_id: &str,
    ) -> Option<ResolvedMeeting> {
        if meeting_id.trim().is_empty() || organizer_id.trim().is_empty() {
            tracing::warn!(meeting_id, organizer_id, "Meeting lookup without ids");
            return None;
        }

        let key = MeetingKey {
            organizer_id: organizer_id.to_string(),
            meeting_id: meeting_id.to_string(),
        };
        let result = self
            .context
            .meetings
            .get_or_fetch_or_none(&key, || async {
                absent_if_not_found(self.graph.fetch_meeting(organizer_id, meeting_id).await)
            })
            .await;

        match result {
            Ok(Some(meeting)) => Some(ResolvedMeeting::new(&key, meeting)),
            Ok(None) => {
                tracing::warn!(meeting_id, organizer_id, "Meeting not found");
                None
            }
            Err(e) => {
                tracing::warn!(meeting_id, organizer_id, error = %e, "Error getting meeting info");
                None
            }
        }
    }

    /// Graph object id of a user.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty name, `NotFound` if no such user,
    /// `Transient` if the lookup failed, `ContractViolation` if the user
    /// record has no id.
    pub async fn resolve_user_id(&self, user_principal_name: &str) -> Result<String, ResolveError> {
        if user_principal_name.trim().is_empty() {
            return Err(ResolveError::InvalidArgument(
                "empty user principal name".to_string(),
            ));
        }

        let key = user_principal_name.to_string();
        let user = self
            .context
            .users
            .get_or_fetch(&key, || async {
                absent_if_not_found(self.graph.fetch_user(user_principal_name).await)
            })
            .await
            .map_err(|e| match e {
                CacheError::Absent { .. } => {
                    tracing::warn!(upn = user_principal_name, "User not found");
                    ResolveError::NotFound(format!("user {}", user_principal_name))
                }
                CacheError::Fetch(e) => {
                    tracing::warn!(upn = user_principal_name, error = %e, "Error getting user");
                    ResolveError::transient(format!("user {}", user_principal_name), e)
                }
            })?;

        match user.id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(id),
            None => {
                tracing::error!(upn = user_principal_name, "User found without an id");
                Err(ResolveError::contract_violation(format!(
                    "no user id on user found by upn {}",
                    user_principal_name
                )))
            }
        }
    }
}
