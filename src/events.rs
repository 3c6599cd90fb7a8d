//! Events and the attendance taken at them.
//!
//! Collection routes answer in the usual envelope. The custom action routes
//! (`statistics`, `generate-qr` and the attendance actions) answer with a bare
//! JSON object, so replies are read raw and unwrapped where needed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::api::{decode_entry, decode_list, unwrap_data, ApiClient, ApiError};

const EVENTS: &str = "events";
const ATTENDANCES: &str = "event-attendances";

pub const DEFAULT_EVENT_TYPE: &str = "Alumni Party";
pub const DEFAULT_EVENT_STATUS: &str = "Upcoming";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    #[serde(default)]
    pub document_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub qr_code_url: Option<String>,
}

impl Event {
    pub fn key(&self) -> String {
        match self.document_id.as_deref() {
            Some(document_id) if !document_id.is_empty() => document_id.to_string(),
            _ => self.id.to_string(),
        }
    }
}

/// Create and update payload; unset members are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventStatistics {
    pub event: EventSummary,
    pub statistics: AttendanceTotals,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub name: String,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceTotals {
    pub total: u64,
    pub present: u64,
    pub absent: u64,
    pub pending: u64,
    pub qr_scanned: u64,
    pub manual: u64,
    pub not_marked: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceMethod {
    QrScan,
    Manual,
    NotMarked,
}

impl fmt::Display for AttendanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttendanceMethod::QrScan => "QR scan",
            AttendanceMethod::Manual => "Manual",
            AttendanceMethod::NotMarked => "Not marked",
        })
    }
}

impl FromStr for AttendanceMethod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "qr_scan" | "qr" => Ok(AttendanceMethod::QrScan),
            "manual" => Ok(AttendanceMethod::Manual),
            "not_marked" => Ok(AttendanceMethod::NotMarked),
            other => Err(format!("unknown attendance method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "present")]
    Present,
    #[serde(alias = "absent")]
    Absent,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttendanceStatus::Pending => "Pending",
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        })
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AttendanceStatus::Pending),
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(format!("unknown attendance status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendance {
    pub id: i64,
    pub attendance_method: AttendanceMethod,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub marked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub batchmate: Option<Value>,
}

impl EventAttendance {
    /// Full name of the linked batchmate, or the calling name when that is blank.
    pub fn batchmate_name(&self) -> Option<&str> {
        self.batchmate_text("fullName")
            .or_else(|| self.batchmate_text("callingName"))
    }

    fn batchmate_text(&self, key: &str) -> Option<&str> {
        let mut value = self.batchmate.as_ref()?;
        if let Some(inner) = value.get("data").filter(|inner| inner.is_object()) {
            value = inner;
        }
        if let Some(attributes) = value.get("attributes").filter(|inner| inner.is_object()) {
            value = attributes;
        }
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceFilter {
    pub term: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub method: Option<AttendanceMethod>,
}

pub fn filter_attendances(items: &[EventAttendance], filter: &AttendanceFilter) -> Vec<EventAttendance> {
    let term = filter
        .term
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    items
        .iter()
        .filter(|item| {
            term.as_deref().map_or(true, |term| {
                item.batchmate_name()
                    .is_some_and(|name| name.to_lowercase().contains(term))
            })
        })
        .filter(|item| filter.status.map_or(true, |status| item.status == status))
        .filter(|item| filter.method.map_or(true, |method| item.attendance_method == method))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MobileCheck {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Details a guest submits when scanning an event QR code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationData {
    pub name: String,
    pub full_name: String,
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmail: Option<String>,
}

/// One row of a bulk marking, read from CSV with `batchmateId,status,notes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEntry {
    pub batchmate_id: i64,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

pub fn read_bulk_entries(bytes: &[u8]) -> Result<Vec<BulkEntry>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    reader.deserialize().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

/// Reply of `generate-qr`: the image as a data URL and the registration link.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub qr_code_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EventsClient {
    api: ApiClient,
}

impl EventsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
        let events: Vec<Event> = decode_list(unwrap_data(self.api.get_value(EVENTS, &[]).await?))?;
        debug!(count = events.len(), "fetched events");
        Ok(events)
    }

    pub async fn get_event(&self, id: &str) -> Result<Event, ApiError> {
        let value = self.api.get_value(&format!("{EVENTS}/{id}"), &[]).await?;
        decode_entry(unwrap_data(value))
    }

    pub async fn create_event(&self, fields: &EventFields) -> Result<Event, ApiError> {
        let body = json!({ "data": fields });
        let value = self.api.send_value(Method::POST, EVENTS, Some(&body)).await?;
        let event: Event = decode_entry(unwrap_data(value))?;
        info!(id = %event.key(), name = %event.name, "event created");
        Ok(event)
    }

    pub async fn update_event(&self, id: &str, fields: &EventFields) -> Result<Event, ApiError> {
        let body = json!({ "data": fields });
        let value = self
            .api
            .send_value(Method::PUT, &format!("{EVENTS}/{id}"), Some(&body))
            .await?;
        decode_entry(unwrap_data(value))
    }

    pub async fn delete_event(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&format!("{EVENTS}/{id}")).await
    }

    pub async fn statistics(&self, id: &str) -> Result<EventStatistics, ApiError> {
        decode_raw(self.api.get_value(&format!("{EVENTS}/{id}/statistics"), &[]).await?)
    }

    pub async fn generate_qr(&self, id: &str) -> Result<QrCode, ApiError> {
        let value = self
            .api
            .send_value(Method::POST, &format!("{EVENTS}/{id}/generate-qr"), None)
            .await?;
        decode_raw(value)
    }

    pub async fn event_attendances(&self, event_id: &str) -> Result<Vec<EventAttendance>, ApiError> {
        let value = self
            .api
            .get_value(&format!("{EVENTS}/{event_id}/attendances"), &[])
            .await?;
        decode_list(unwrap_data(value))
    }

    pub async fn check_mobile(&self, mobile: &str) -> Result<MobileCheck, ApiError> {
        let body = json!({ "mobile": mobile });
        let value = self
            .api
            .send_value(Method::POST, &format!("{ATTENDANCES}/check-mobile"), Some(&body))
            .await?;
        decode_raw(value)
    }

    pub async fn register_qr(
        &self,
        event_id: &str,
        mobile: &str,
        data: &RegistrationData,
    ) -> Result<ActionResult<Value>, ApiError> {
        let body = json!({ "eventId": id_value(event_id), "mobile": mobile, "data": data });
        let value = self
            .api
            .send_value(Method::POST, &format!("{ATTENDANCES}/register-qr"), Some(&body))
            .await?;
        action_result(value, Ok)
    }

    pub async fn mark_manual(
        &self,
        event_id: i64,
        batchmate_id: i64,
        status: AttendanceStatus,
        notes: Option<&str>,
    ) -> Result<ActionResult<EventAttendance>, ApiError> {
        let body = json!({
            "eventId": event_id,
            "batchmateId": batchmate_id,
            "status": status,
            "notes": notes,
        });
        let value = self
            .api
            .send_value(Method::POST, &format!("{ATTENDANCES}/mark-manual"), Some(&body))
            .await?;
        action_result(value, decode_entry)
    }

    pub async fn bulk_mark(
        &self,
        event_id: i64,
        entries: &[BulkEntry],
    ) -> Result<ActionResult<Vec<EventAttendance>>, ApiError> {
        let body = json!({ "eventId": event_id, "attendances": entries });
        let value = self
            .api
            .send_value(Method::POST, &format!("{ATTENDANCES}/bulk-mark"), Some(&body))
            .await?;
        let result = action_result(value, decode_list)?;
        info!(event_id, marked = result.data.len(), "bulk attendance marked");
        Ok(result)
    }
}

fn decode_raw<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

fn action_result<T>(
    value: Value,
    decode: impl FnOnce(Value) -> Result<T, ApiError>,
) -> Result<ActionResult<T>, ApiError> {
    let success = value.get("success").and_then(Value::as_bool).unwrap_or(false);
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let data = decode(value.get("data").cloned().unwrap_or(Value::Null))?;
    Ok(ActionResult {
        success,
        message,
        data,
    })
}

/// Numeric ids travel as numbers, document ids as strings.
fn id_value(id: &str) -> Value {
    id.parse::<i64>().map_or_else(|_| json!(id), |number| json!(number))
}
