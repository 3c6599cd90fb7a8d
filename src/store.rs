use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info};

use crate::api::{decode_entry, decode_list, ApiClient, ApiError};
use crate::models::{Field, Record, RecordDraft, RecordPatch};

const COLLECTION: &str = "batchmates";

pub type StoreResult<T> = Result<T, ApiError>;

/// Server-side narrowing applied by the backend before records are returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteFilters {
    pub calling_name: Option<String>,
    pub full_name: Option<String>,
    pub nick_name: Option<String>,
    pub country: Option<String>,
    pub working_place: Option<String>,
    pub field: Option<Field>,
    pub whatsapp_mobile: Option<String>,
    pub mobile: Option<String>,
}

impl RemoteFilters {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let mut push = |name: &str, operator: &str, value: Option<&str>| {
            if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
                params.push((format!("filters[{name}][{operator}]"), value.to_string()));
            }
        };

        push("callingName", "$containsi", self.calling_name.as_deref());
        push("fullName", "$containsi", self.full_name.as_deref());
        push("nickName", "$containsi", self.nick_name.as_deref());
        push("country", "$eq", self.country.as_deref());
        push("workingPlace", "$containsi", self.working_place.as_deref());
        push("field", "$eq", self.field.map(Field::label));
        push("whatsappMobile", "$contains", self.whatsapp_mobile.as_deref());
        push("mobile", "$contains", self.mobile.as_deref());
        params
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, filters: &RemoteFilters) -> StoreResult<Vec<Record>>;

    async fn get(&self, id: &str) -> StoreResult<Record>;

    async fn create(&self, draft: &RecordDraft) -> StoreResult<Record>;

    async fn update(&self, id: &str, patch: &RecordPatch) -> StoreResult<Record>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

pub struct HttpRecordStore {
    api: ApiClient,
    page_size: usize,
}

impl HttpRecordStore {
    pub fn new(api: ApiClient, page_size: usize) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
        }
    }

    fn entry_path(id: &str) -> String {
        format!("{COLLECTION}/{id}")
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list(&self, filters: &RemoteFilters) -> StoreResult<Vec<Record>> {
        let mut records = Vec::new();
        let mut page = 1u64;

        loop {
            let mut query = filters.to_query();
            query.push(("pagination[page]".to_string(), page.to_string()));
            query.push(("pagination[pageSize]".to_string(), self.page_size.to_string()));

            let envelope = self.api.get_envelope(COLLECTION, &query).await?;
            let page_count = envelope.page_count();
            let batch: Vec<Record> = decode_list(envelope.data)?;
            debug!(page, fetched = batch.len(), "fetched record page");
            let exhausted = batch.is_empty();
            records.extend(batch);

            match page_count {
                Some(count) if page < count && !exhausted => page += 1,
                _ => break,
            }
        }

        info!(count = records.len(), "loaded records");
        Ok(records)
    }

    async fn get(&self, id: &str) -> StoreResult<Record> {
        let envelope = self.api.get_envelope(&Self::entry_path(id), &[]).await?;
        decode_entry(envelope.data)
    }

    async fn create(&self, draft: &RecordDraft) -> StoreResult<Record> {
        let envelope = self.api.send_data(Method::POST, COLLECTION, draft).await?;
        decode_entry(envelope.data)
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> StoreResult<Record> {
        let envelope = self
            .api
            .send_data(Method::PUT, &Self::entry_path(id), patch)
            .await?;
        decode_entry(envelope.data)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.api.delete(&Self::entry_path(id)).await
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-process stand-in for the backend. Full names are unique, as the
    /// backend enforces for imports.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        records: Mutex<Vec<Record>>,
        pub(crate) created: Mutex<Vec<RecordDraft>>,
        pub(crate) fail_with: Mutex<Option<String>>,
    }

    impl MemoryStore {
        pub(crate) fn with_records(records: Vec<Record>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Self::default()
            }
        }

        pub(crate) fn snapshot(&self) -> Vec<Record> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn list(&self, filters: &RemoteFilters) -> StoreResult<Vec<Record>> {
            Ok(self
                .snapshot()
                .into_iter()
                .filter(|record| filters.field.map_or(true, |field| record.field == field))
                .collect())
        }

        async fn get(&self, id: &str) -> StoreResult<Record> {
            self.snapshot()
                .into_iter()
                .find(|record| record.key() == id)
                .ok_or_else(|| ApiError::Rejected {
                    status: 404,
                    message: "Not Found".to_string(),
                })
        }

        async fn create(&self, draft: &RecordDraft) -> StoreResult<Record> {
            if let Some(message) = self.fail_with.lock().unwrap().clone() {
                return Err(ApiError::Rejected {
                    status: 500,
                    message,
                });
            }
            let mut records = self.records.lock().unwrap();
            if records.iter().any(|record| record.full_name == draft.full_name) {
                return Err(ApiError::Rejected {
                    status: 400,
                    message: "This attribute must be unique".to_string(),
                });
            }
            let record = Record {
                id: records.len() as i64 + 1,
                document_id: None,
                calling_name: draft.calling_name.clone(),
                full_name: draft.full_name.clone(),
                nick_name: draft.nick_name.clone(),
                email: draft.email.clone(),
                whatsapp_mobile: draft.whatsapp_mobile.clone(),
                mobile: draft.mobile.clone(),
                field: draft.field,
                country: draft.country.clone(),
                address: draft.address.clone(),
                working_place: draft.working_place.clone(),
                phone_confirmation: None,
                attendance: None,
            };
            records.push(record.clone());
            self.created.lock().unwrap().push(draft.clone());
            Ok(record)
        }

        async fn update(&self, id: &str, patch: &RecordPatch) -> StoreResult<Record> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|record| record.key() == id)
                .ok_or_else(|| ApiError::Rejected {
                    status: 404,
                    message: "Not Found".to_string(),
                })?;
            apply_patch(record, patch);
            Ok(record.clone())
        }

        async fn delete(&self, id: &str) -> StoreResult<()> {
            self.records.lock().unwrap().retain(|record| record.key() != id);
            Ok(())
        }
    }

    /// Overlays the populated members of `patch`, as the backend does for a PUT.
    fn apply_patch(record: &mut Record, patch: &RecordPatch) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        fn set_optional<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut record.calling_name, &patch.calling_name);
        set(&mut record.full_name, &patch.full_name);
        set(&mut record.email, &patch.email);
        set(&mut record.whatsapp_mobile, &patch.whatsapp_mobile);
        set(&mut record.field, &patch.field);
        set_optional(&mut record.nick_name, &patch.nick_name);
        set_optional(&mut record.mobile, &patch.mobile);
        set_optional(&mut record.country, &patch.country);
        set_optional(&mut record.address, &patch.address);
        set_optional(&mut record.working_place, &patch.working_place);
        set_optional(&mut record.phone_confirmation, &patch.phone_confirmation);
        set_optional(&mut record.attendance, &patch.attendance);
    }
}
