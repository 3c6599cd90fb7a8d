//! Activity notifications.
//!
//! Deployments without a `notifications` collection get a file-backed store
//! instead. Which one is used is decided by a single request at startup.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{decode_entry, decode_list, ApiClient, ApiError};
use crate::models::Field;

const COLLECTION: &str = "notifications";
const LIST_PAGE_SIZE: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("notification store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("notification store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewUser,
    NewBatchmate,
    Update,
    System,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batchmate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NotificationMetadata>,
}

impl Notification {
    pub fn key(&self) -> &str {
        self.document_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.id)
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<NotificationMetadata>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            read: false,
            action_url: None,
            metadata: None,
        }
    }

    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, metadata: NotificationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn into_notification(self, id: String, created_at: DateTime<Utc>) -> Notification {
        Notification {
            document_id: Some(id.clone()),
            id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            read: self.read,
            action_url: self.action_url,
            created_at,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalState {
    #[serde(default)]
    created: Vec<Notification>,
    #[serde(default)]
    read_ids: BTreeSet<String>,
    #[serde(default)]
    deleted_ids: BTreeSet<String>,
}

/// File-backed notifications layered over a fixed seed list.
#[derive(Debug, Clone)]
pub struct LocalNotifications {
    path: PathBuf,
    seed: Vec<Notification>,
}

impl LocalNotifications {
    pub fn new(path: impl Into<PathBuf>, seed: Vec<Notification>) -> Self {
        Self {
            path: path.into(),
            seed,
        }
    }

    /// Store seeded with a single welcome entry.
    pub fn with_default_seed(path: impl Into<PathBuf>) -> Self {
        let welcome = NewNotification::new(
            NotificationKind::System,
            "Notifications are local",
            "The server has no notifications collection, so activity is recorded on this machine.",
        )
        .into_notification("local-welcome".to_string(), DateTime::<Utc>::UNIX_EPOCH);
        Self::new(path, vec![welcome])
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<LocalState, NotifyError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(LocalState::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(LocalState::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, state: &LocalState) -> Result<(), NotifyError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Notification>, NotifyError> {
        let state = self.load().await?;
        let mut all: Vec<Notification> = state
            .created
            .iter()
            .chain(self.seed.iter())
            .filter(|item| !state.deleted_ids.contains(&item.id))
            .filter(|item| {
                item.document_id
                    .as_ref()
                    .map_or(true, |id| !state.deleted_ids.contains(id))
            })
            .cloned()
            .map(|mut item| {
                item.read = item.read
                    || state.read_ids.contains(&item.id)
                    || item
                        .document_id
                        .as_ref()
                        .is_some_and(|id| state.read_ids.contains(id));
                item
            })
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), NotifyError> {
        let mut state = self.load().await?;
        if state.read_ids.insert(id.to_string()) {
            self.save(&state).await?;
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), NotifyError> {
        let mut state = self.load().await?;
        if state.deleted_ids.insert(id.to_string()) {
            self.save(&state).await?;
        }
        Ok(())
    }

    pub async fn create(&self, new: NewNotification) -> Result<Notification, NotifyError> {
        let mut state = self.load().await?;
        let notification = new.into_notification(format!("created-{}", Uuid::new_v4()), Utc::now());
        state.created.insert(0, notification.clone());
        self.save(&state).await?;
        Ok(notification)
    }
}

#[derive(Debug, Clone)]
pub enum NotificationCenter {
    RemoteBacked(ApiClient),
    LocalFallback(LocalNotifications),
}

impl NotificationCenter {
    /// Checks the notifications collection once and fixes the backing for the
    /// rest of the process.
    pub async fn select(api: ApiClient, local: LocalNotifications) -> Self {
        let query = [("pagination[pageSize]".to_string(), "1".to_string())];
        match api.status_of(COLLECTION, &query).await {
            Ok(status)
                if status == StatusCode::NOT_FOUND
                    || status == StatusCode::FORBIDDEN
                    || status.is_server_error() =>
            {
                info!(%status, path = %local.path().display(), "notifications endpoint unavailable, using local store");
                NotificationCenter::LocalFallback(local)
            }
            Ok(_) => NotificationCenter::RemoteBacked(api),
            Err(err) => {
                info!(error = %err, path = %local.path().display(), "notifications endpoint unreachable, using local store");
                NotificationCenter::LocalFallback(local)
            }
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, NotificationCenter::LocalFallback(_))
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<Notification>, NotifyError> {
        match self {
            NotificationCenter::RemoteBacked(api) => {
                let query = [
                    ("sort".to_string(), "createdAt:desc".to_string()),
                    ("pagination[pageSize]".to_string(), LIST_PAGE_SIZE.to_string()),
                ];
                let envelope = api.get_envelope(COLLECTION, &query).await?;
                Ok(decode_list(envelope.data)?)
            }
            NotificationCenter::LocalFallback(local) => local.list().await,
        }
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), NotifyError> {
        match self {
            NotificationCenter::RemoteBacked(api) => {
                api.send_data(Method::PUT, &format!("{COLLECTION}/{id}"), &json!({ "read": true }))
                    .await?;
                Ok(())
            }
            NotificationCenter::LocalFallback(local) => local.mark_read(id).await,
        }
    }

    /// Returns how many notifications were marked.
    pub async fn mark_all_read(&self) -> Result<usize, NotifyError> {
        let unread: Vec<String> = self
            .list()
            .await?
            .into_iter()
            .filter(|item| !item.read)
            .map(|item| item.key().to_string())
            .collect();
        for id in &unread {
            self.mark_read(id).await?;
        }
        Ok(unread.len())
    }

    pub async fn delete(&self, id: &str) -> Result<(), NotifyError> {
        match self {
            NotificationCenter::RemoteBacked(api) => Ok(api.delete(&format!("{COLLECTION}/{id}")).await?),
            NotificationCenter::LocalFallback(local) => local.delete(id).await,
        }
    }

    pub async fn create(&self, new: NewNotification) -> Result<Notification, NotifyError> {
        match self {
            NotificationCenter::RemoteBacked(api) => {
                let envelope = api.send_data(Method::POST, COLLECTION, &new).await?;
                Ok(decode_entry(envelope.data)?)
            }
            NotificationCenter::LocalFallback(local) => local.create(new).await,
        }
    }

    pub async fn unread_count(&self) -> Result<usize, NotifyError> {
        match self {
            NotificationCenter::RemoteBacked(api) => {
                let query = [
                    ("filters[read][$eq]".to_string(), "false".to_string()),
                    ("pagination[pageSize]".to_string(), "1".to_string()),
                ];
                let envelope = api.get_envelope(COLLECTION, &query).await?;
                Ok(envelope.total().unwrap_or(0) as usize)
            }
            NotificationCenter::LocalFallback(local) => {
                Ok(local.list().await?.iter().filter(|item| !item.read).count())
            }
        }
    }
}

async fn deliver(center: &NotificationCenter, new: NewNotification) {
    if let Err(err) = center.create(new).await {
        warn!(error = %err, "failed to create notification");
    }
}

pub async fn notify_new_user(center: &NotificationCenter, username: &str, role: &str, field: Option<&str>) {
    let suffix = field.map(|field| format!(" for {field}")).unwrap_or_default();
    let new = NewNotification::new(
        NotificationKind::NewUser,
        "New User Registered",
        format!("{username} has been added as {role}{suffix}"),
    )
    .with_action_url("/dashboard/users")
    .with_metadata(NotificationMetadata {
        user_role: Some(role.to_string()),
        field: field.map(str::to_string),
        ..NotificationMetadata::default()
    });
    deliver(center, new).await;
}

pub async fn notify_new_batchmate(center: &NotificationCenter, full_name: &str, field: Field) {
    let new = NewNotification::new(
        NotificationKind::NewBatchmate,
        "New Alumni Added",
        format!("{full_name} from {field} has been added to the network"),
    )
    .with_action_url("/dashboard/batchmates")
    .with_metadata(NotificationMetadata {
        field: Some(field.label().to_string()),
        ..NotificationMetadata::default()
    });
    deliver(center, new).await;
}

pub async fn notify_batchmate_update(center: &NotificationCenter, full_name: &str) {
    let new = NewNotification::new(
        NotificationKind::Update,
        "Profile Updated",
        format!("{full_name} updated their profile information"),
    )
    .with_action_url("/dashboard/batchmates");
    deliver(center, new).await;
}

pub async fn notify_system(center: &NotificationCenter, title: &str, message: &str) {
    deliver(center, NewNotification::new(NotificationKind::System, title, message)).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::test_server::{serve, Reply};

    fn local_center(dir: &tempfile::TempDir) -> NotificationCenter {
        NotificationCenter::LocalFallback(LocalNotifications::with_default_seed(
            dir.path().join("notifications.json"),
        ))
    }

    #[tokio::test]
    async fn created_notifications_come_first_and_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = local_center(&dir);

        notify_new_batchmate(&center, "Kasun Silva", Field::Computer).await;
        notify_system(&center, "Import finished", "3 imported").await;

        let items = center.list().await.expect("list");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Import finished");
        assert_eq!(
            items[1].message,
            "Kasun Silva from Computer Engineering has been added to the network"
        );
        assert_eq!(items[2].id, "local-welcome");
        assert!(items[0].id.starts_with("created-"));

        let reopened = local_center(&dir);
        assert_eq!(reopened.list().await.expect("list"), items);
    }

    #[tokio::test]
    async fn read_and_delete_are_overlaid_on_the_seed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = local_center(&dir);
        notify_batchmate_update(&center, "Amali Fernando").await;
        assert_eq!(center.unread_count().await.expect("count"), 2);

        center.mark_read("local-welcome").await.expect("mark");
        assert_eq!(center.unread_count().await.expect("count"), 1);

        assert_eq!(center.mark_all_read().await.expect("mark all"), 1);
        assert_eq!(center.unread_count().await.expect("count"), 0);

        center.delete("local-welcome").await.expect("delete");
        let items = center.list().await.expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, NotificationKind::Update);
        assert!(items[0].read);
    }

    #[tokio::test]
    async fn unreachable_server_selects_the_local_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = ApiClient::new("http://127.0.0.1:9/api", None, Duration::from_secs(2)).expect("client");
        let local = LocalNotifications::with_default_seed(dir.path().join("n.json"));
        let center = NotificationCenter::select(api, local).await;
        assert!(center.is_local());
    }

    #[tokio::test]
    async fn server_errors_select_the_local_store() {
        let server = serve(|_| Reply::json(500, json!({ "error": { "message": "Internal Server Error" } }))).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let local = LocalNotifications::with_default_seed(dir.path().join("n.json"));

        let center = NotificationCenter::select(server.client(), local).await;
        assert!(center.is_local());
        assert_eq!(center.list().await.expect("list")[0].id, "local-welcome");
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn forbidden_endpoint_selects_the_local_store() {
        let server = serve(|_| Reply::json(403, json!({ "error": { "message": "Forbidden" } }))).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let local = LocalNotifications::with_default_seed(dir.path().join("n.json"));
        assert!(NotificationCenter::select(server.client(), local).await.is_local());
    }

    #[tokio::test]
    async fn available_endpoint_is_used_for_every_call() {
        let server = serve(|request| match (request.method.as_str(), request.path()) {
            ("GET", _) if request.query("filters[read][$eq]").is_some() => Reply::json(
                200,
                json!({ "data": [], "meta": { "pagination": { "total": 4 } } }),
            ),
            ("GET", _) => Reply::json(
                200,
                json!({
                    "data": [{
                        "id": 12,
                        "documentId": "n12",
                        "type": "new_user",
                        "title": "New User Registered",
                        "message": "kumari has been added as field_admin",
                        "read": false,
                        "createdAt": "2026-10-17T09:00:00.000Z"
                    }],
                    "meta": {}
                }),
            ),
            ("POST", _) => {
                let mut created = request.json()["data"].clone();
                created["id"] = json!(13);
                created["createdAt"] = json!("2026-10-18T10:00:00.000Z");
                Reply::json(200, json!({ "data": created }))
            }
            _ => Reply::json(200, json!({ "data": null })),
        })
        .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let local = LocalNotifications::with_default_seed(dir.path().join("n.json"));

        let center = NotificationCenter::select(server.client(), local).await;
        assert!(!center.is_local());

        let items = center.list().await.expect("list");
        assert_eq!(items[0].key(), "n12");
        assert_eq!(items[0].kind, NotificationKind::NewUser);
        assert_eq!(center.unread_count().await.expect("count"), 4);

        notify_new_user(&center, "kumari", "field_admin", Some("Electrical Engineering")).await;
        center.mark_read("n12").await.expect("mark");

        let requests = server.requests();
        let created = requests
            .iter()
            .find(|request| request.method == "POST")
            .expect("create request");
        assert_eq!(
            created.json()["data"],
            json!({
                "type": "new_user",
                "title": "New User Registered",
                "message": "kumari has been added as field_admin for Electrical Engineering",
                "read": false,
                "actionUrl": "/dashboard/users",
                "metadata": { "userRole": "field_admin", "field": "Electrical Engineering" }
            })
        );
        let marked = requests.last().expect("mark request");
        assert_eq!(marked.method, "PUT");
        assert_eq!(marked.path(), "/api/notifications/n12");
        assert_eq!(marked.json(), json!({ "data": { "read": true } }));
        assert!(!dir.path().join("n.json").exists());
    }

    #[tokio::test]
    async fn new_user_message_omits_a_missing_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let center = local_center(&dir);
        notify_new_user(&center, "sunil", "super_admin", None).await;

        let items = center.list().await.expect("list");
        assert_eq!(items[0].message, "sunil has been added as super_admin");
        assert_eq!(items[0].action_url.as_deref(), Some("/dashboard/users"));
        assert_eq!(
            items[0].metadata,
            Some(NotificationMetadata {
                user_role: Some("super_admin".to_string()),
                ..NotificationMetadata::default()
            })
        );
    }

    #[test]
    fn remote_entries_decode_with_numeric_ids() {
        let entry = json!({
            "id": 7,
            "attributes": {
                "type": "new_batchmate",
                "title": "New Alumni Added",
                "message": "x",
                "read": false,
                "createdAt": "2026-10-01T08:30:00.000Z"
            }
        });
        let notification: Notification = decode_entry(entry).expect("decode");
        assert_eq!(notification.id, "7");
        assert_eq!(notification.key(), "7");
        assert_eq!(notification.kind, NotificationKind::NewBatchmate);
    }

    #[test]
    fn new_notifications_serialize_with_type_and_unread_flag() {
        let body = serde_json::to_value(NewNotification::new(
            NotificationKind::System,
            "Maintenance",
            "Tonight",
        ))
        .expect("serialize");
        assert_eq!(
            body,
            json!({ "type": "system", "title": "Maintenance", "message": "Tonight", "read": false })
        );
    }
}
