//! The working set of records an actor can see and edit.

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{self, CountryOrder, FieldCounts, StatusBreakdown};
use crate::api::ApiError;
use crate::filter::filter_records;
use crate::models::{
    Attendance, Bucket, FilterCriteria, PhoneConfirmation, Record, RecordDraft, RecordPatch, Scope,
};
use crate::store::{RecordStore, RemoteFilters};

const TOP_COUNTRIES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("record {0} is outside the assigned field")]
    OutOfScope(String),
    #[error("no record with id {0}")]
    UnknownRecord(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterStats {
    pub total: usize,
    pub by_field: Vec<Bucket>,
    pub top_countries: Vec<Bucket>,
    pub status: StatusBreakdown,
}

#[derive(Debug, Clone)]
pub struct Roster {
    scope: Scope,
    records: Vec<Record>,
}

impl Roster {
    pub async fn load<S: RecordStore + ?Sized>(store: &S, scope: Scope) -> Result<Self, RosterError> {
        let filters = RemoteFilters {
            field: match scope {
                Scope::Field(field) => Some(field),
                Scope::Unrestricted => None,
            },
            ..RemoteFilters::default()
        };
        let mut records = store.list(&filters).await?;
        records.retain(|record| scope.permits(record));
        info!(count = records.len(), scope = %scope.label(), "roster loaded");
        Ok(Self { scope, records })
    }

    pub fn from_records(scope: Scope, records: Vec<Record>) -> Self {
        let records = records.into_iter().filter(|record| scope.permits(record)).collect();
        Self { scope, records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn view(&self, criteria: &FilterCriteria) -> Vec<Record> {
        filter_records(&self.records, &self.scope, criteria)
    }

    pub fn stats(&self, criteria: &FilterCriteria) -> RosterStats {
        let visible = self.view(criteria);
        RosterStats {
            total: visible.len(),
            by_field: aggregate::count_by_field(&visible, FieldCounts::NonEmpty),
            top_countries: aggregate::count_by_country(
                &visible,
                CountryOrder::ByCount {
                    limit: TOP_COUNTRIES,
                },
            ),
            status: aggregate::status_breakdown(&visible),
        }
    }

    pub async fn set_attendance<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
        attendance: Attendance,
    ) -> Result<Record, RosterError> {
        let patch = RecordPatch {
            attendance: Some(attendance),
            ..RecordPatch::default()
        };
        self.apply(store, key, &patch).await
    }

    pub async fn set_phone_confirmation<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
        confirmation: PhoneConfirmation,
    ) -> Result<Record, RosterError> {
        let patch = RecordPatch {
            phone_confirmation: Some(confirmation),
            ..RecordPatch::default()
        };
        self.apply(store, key, &patch).await
    }

    /// Sends a partial edit. Field admins cannot move a record into another
    /// field; an empty patch leaves the record untouched.
    pub async fn edit<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
        patch: &RecordPatch,
    ) -> Result<Record, RosterError> {
        if let (Scope::Field(assigned), Some(requested)) = (self.scope, patch.field) {
            if requested != assigned {
                return Err(RosterError::OutOfScope(key.to_string()));
            }
        }
        if patch.is_empty() {
            return self.resolve(store, key).await;
        }
        self.apply(store, key, patch).await
    }

    /// Field admins can only add to their own field.
    pub async fn add<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        mut draft: RecordDraft,
    ) -> Result<Record, RosterError> {
        if let Scope::Field(field) = self.scope {
            if draft.field != field {
                debug!(requested = %draft.field, assigned = %field, "forcing field for new record");
                draft.field = field;
            }
        }
        let created = store.create(&draft).await?;
        self.records.push(created.clone());
        Ok(created)
    }

    pub async fn remove<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
    ) -> Result<Record, RosterError> {
        let record = self.resolve(store, key).await?;
        store.delete(key).await?;
        self.records = self
            .records
            .iter()
            .filter(|existing| existing.key() != key)
            .cloned()
            .collect();
        Ok(record)
    }

    async fn apply<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        key: &str,
        patch: &RecordPatch,
    ) -> Result<Record, RosterError> {
        self.resolve(store, key).await?;
        let updated = store.update(key, patch).await?;

        let mut replaced = false;
        let mut next: Vec<Record> = self
            .records
            .iter()
            .map(|existing| {
                if existing.key() == key {
                    replaced = true;
                    updated.clone()
                } else {
                    existing.clone()
                }
            })
            .collect();
        if !replaced {
            next.push(updated.clone());
        }
        self.records = next;
        Ok(updated)
    }

    /// Finds the record locally, falling back to the store for entries created
    /// since the roster was loaded.
    async fn resolve<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        key: &str,
    ) -> Result<Record, RosterError> {
        if let Some(record) = self.records.iter().find(|record| record.key() == key) {
            return Ok(record.clone());
        }
        match store.get(key).await {
            Ok(record) if self.scope.permits(&record) => Ok(record),
            Ok(_) => Err(RosterError::OutOfScope(key.to_string())),
            Err(err) if err.status() == Some(404) => Err(RosterError::UnknownRecord(key.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_record, Field, StatusFilter};
    use crate::store::memory::MemoryStore;

    fn store() -> MemoryStore {
        let mut confirmed = sample_record(3, "Amali Fernando", Field::Civil);
        confirmed.phone_confirmation = Some(PhoneConfirmation::Yes);
        confirmed.country = Some("Canada".to_string());
        MemoryStore::with_records(vec![
            sample_record(1, "Nimal Perera", Field::Civil),
            sample_record(2, "Kasun Silva", Field::Computer),
            confirmed,
        ])
    }

    fn draft(full_name: &str, field: Field) -> RecordDraft {
        RecordDraft {
            calling_name: full_name.to_string(),
            full_name: full_name.to_string(),
            nick_name: None,
            address: None,
            country: Some("Sri Lanka".to_string()),
            working_place: None,
            mobile: None,
            whatsapp_mobile: "+94771234567".to_string(),
            email: "new@example.com".to_string(),
            field,
        }
    }

    #[tokio::test]
    async fn field_admins_only_load_their_field() {
        let store = store();
        let roster = Roster::load(&store, Scope::Field(Field::Civil)).await.expect("load");
        assert_eq!(roster.records().len(), 2);
        assert!(roster.records().iter().all(|record| record.field == Field::Civil));
    }

    #[tokio::test]
    async fn updates_replace_the_held_record() {
        let store = store();
        let mut roster = Roster::load(&store, Scope::Unrestricted).await.expect("load");

        let updated = roster
            .set_attendance(&store, "1", Attendance::Present)
            .await
            .expect("update");
        assert_eq!(updated.attendance, Some(Attendance::Present));
        assert_eq!(roster.records()[0].attendance, Some(Attendance::Present));
        assert_eq!(roster.records().len(), 3);

        roster
            .set_phone_confirmation(&store, "2", PhoneConfirmation::No)
            .await
            .expect("update");
        let unset = FilterCriteria {
            phone_confirmation: StatusFilter::Unset,
            ..FilterCriteria::default()
        };
        assert_eq!(roster.view(&unset).len(), 1);
    }

    #[tokio::test]
    async fn out_of_scope_and_unknown_keys_are_rejected() {
        let store = store();
        let mut roster = Roster::load(&store, Scope::Field(Field::Civil)).await.expect("load");

        let err = roster
            .set_attendance(&store, "2", Attendance::Absent)
            .await
            .expect_err("out of scope");
        assert!(matches!(err, RosterError::OutOfScope(key) if key == "2"));

        let err = roster
            .set_attendance(&store, "99", Attendance::Absent)
            .await
            .expect_err("unknown");
        assert!(matches!(err, RosterError::UnknownRecord(_)));
        assert_eq!(store.snapshot()[1].attendance, None);
    }

    #[tokio::test]
    async fn field_admin_additions_are_forced_into_their_field() {
        let store = store();
        let mut roster = Roster::load(&store, Scope::Field(Field::Civil)).await.expect("load");
        let created = roster
            .add(&store, draft("Tharindu Bandara", Field::Mining))
            .await
            .expect("add");
        assert_eq!(created.field, Field::Civil);
        assert_eq!(roster.records().len(), 3);

        let removed = roster.remove(&store, &created.key()).await.expect("remove");
        assert_eq!(removed.full_name, "Tharindu Bandara");
        assert_eq!(roster.records().len(), 2);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn edits_send_any_field_and_keep_the_rest() {
        let store = store();
        let mut roster = Roster::load(&store, Scope::Unrestricted).await.expect("load");
        let patch = RecordPatch {
            working_place: Some("Road Development Authority".to_string()),
            country: Some("New Zealand".to_string()),
            ..RecordPatch::default()
        };
        let updated = roster.edit(&store, "1", &patch).await.expect("edit");
        assert_eq!(updated.working_place.as_deref(), Some("Road Development Authority"));
        assert_eq!(updated.country.as_deref(), Some("New Zealand"));
        assert_eq!(updated.full_name, "Nimal Perera");
        assert_eq!(roster.records()[0], updated);
        assert_eq!(store.snapshot()[0], updated);
    }

    #[tokio::test]
    async fn field_admins_cannot_move_records_out_of_their_field() {
        let store = store();
        let mut roster = Roster::load(&store, Scope::Field(Field::Civil)).await.expect("load");
        let patch = RecordPatch {
            field: Some(Field::Mining),
            ..RecordPatch::default()
        };
        let err = roster.edit(&store, "1", &patch).await.expect_err("moved");
        assert!(matches!(err, RosterError::OutOfScope(_)));
        assert_eq!(store.snapshot()[0].field, Field::Civil);

        let unchanged = roster
            .edit(&store, "1", &RecordPatch::default())
            .await
            .expect("empty edit");
        assert_eq!(unchanged.full_name, "Nimal Perera");
    }

    #[test]
    fn stats_follow_the_filtered_view() {
        let mut records = vec![
            sample_record(1, "Nimal Perera", Field::Civil),
            sample_record(2, "Kasun Silva", Field::Computer),
            sample_record(3, "Amali Fernando", Field::Civil),
        ];
        records[2].country = Some("Canada".to_string());
        let roster = Roster::from_records(Scope::Unrestricted, records);

        let criteria = FilterCriteria {
            field: Some(Field::Civil),
            ..FilterCriteria::default()
        };
        let stats = roster.stats(&criteria);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_field, vec![Bucket::new("Civil Engineering", 2)]);
        assert_eq!(
            stats.top_countries,
            vec![Bucket::new("Canada", 1), Bucket::new("Sri Lanka", 1)]
        );
        assert_eq!(stats.status.phone_unset, 2);
    }
}
