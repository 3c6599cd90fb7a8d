use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Attendance, Bucket, Field, PhoneConfirmation, Record};

pub const UNSPECIFIED_COUNTRY: &str = "Not specified";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCounts {
    All,
    NonEmpty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryOrder {
    /// Most populated first, truncated; records without a country are left out.
    ByCount { limit: usize },
    /// Every country alphabetically, with an unspecified bucket last.
    Alphabetical,
}

/// Groups records by key, keeping buckets in first-seen order.
pub fn count_by<K, F>(records: &[Record], key: F) -> Vec<Bucket>
where
    F: Fn(&Record) -> K,
    K: Into<String>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for record in records {
        let label = key(record).into();
        match positions.get(&label) {
            Some(&index) => buckets[index].count += 1,
            None => {
                positions.insert(label.clone(), buckets.len());
                buckets.push(Bucket::new(label, 1));
            }
        }
    }

    buckets
}

pub fn count_by_field(records: &[Record], mode: FieldCounts) -> Vec<Bucket> {
    Field::ALL
        .into_iter()
        .map(|field| {
            let count = records.iter().filter(|record| record.field == field).count();
            Bucket::new(field.label(), count)
        })
        .filter(|bucket| mode == FieldCounts::All || bucket.count > 0)
        .collect()
}

pub fn count_by_country(records: &[Record], order: CountryOrder) -> Vec<Bucket> {
    let mut buckets = count_by(records, |record| {
        record
            .country_label()
            .unwrap_or(UNSPECIFIED_COUNTRY)
            .to_string()
    });

    match order {
        CountryOrder::ByCount { limit } => {
            buckets.retain(|bucket| bucket.label != UNSPECIFIED_COUNTRY);
            buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
            buckets.truncate(limit);
        }
        CountryOrder::Alphabetical => {
            buckets.sort_by(|a, b| {
                (a.label == UNSPECIFIED_COUNTRY)
                    .cmp(&(b.label == UNSPECIFIED_COUNTRY))
                    .then_with(|| a.label.cmp(&b.label))
            });
        }
    }

    buckets
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub total: usize,
    pub phone_yes: usize,
    pub phone_no: usize,
    pub phone_unset: usize,
    pub present: usize,
    pub absent: usize,
    pub attendance_unset: usize,
}

impl StatusBreakdown {
    pub fn phone_buckets(&self) -> Vec<Bucket> {
        vec![
            Bucket::new("Confirmed (Yes)", self.phone_yes),
            Bucket::new("Declined (No)", self.phone_no),
            Bucket::new("Not marked", self.phone_unset),
        ]
    }

    pub fn attendance_buckets(&self) -> Vec<Bucket> {
        vec![
            Bucket::new("Present", self.present),
            Bucket::new("Absent", self.absent),
            Bucket::new("Not marked", self.attendance_unset),
        ]
    }
}

pub fn status_breakdown(records: &[Record]) -> StatusBreakdown {
    records
        .iter()
        .fold(StatusBreakdown::default(), |mut stats, record| {
            stats.total += 1;
            match record.phone_confirmation {
                Some(PhoneConfirmation::Yes) => stats.phone_yes += 1,
                Some(PhoneConfirmation::No) => stats.phone_no += 1,
                None => stats.phone_unset += 1,
            }
            match record.attendance {
                Some(Attendance::Present) => stats.present += 1,
                Some(Attendance::Absent) => stats.absent += 1,
                None => stats.attendance_unset += 1,
            }
            stats
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_record;

    fn sample() -> Vec<Record> {
        let mut records = vec![
            sample_record(1, "Nimal Perera", Field::Civil),
            sample_record(2, "Kasun Silva", Field::Computer),
            sample_record(3, "Amali Fernando", Field::Civil),
            sample_record(4, "Ruwan Jayasinghe", Field::Mining),
            sample_record(5, "Dilani Wickrama", Field::Civil),
        ];
        records[1].country = Some("Australia".to_string());
        records[2].country = Some("Canada".to_string());
        records[3].country = Some("  ".to_string());
        records[4].country = Some("Australia".to_string());
        records[0].attendance = Some(Attendance::Present);
        records[1].attendance = Some(Attendance::Absent);
        records[2].phone_confirmation = Some(PhoneConfirmation::Yes);
        records[3].phone_confirmation = Some(PhoneConfirmation::No);
        records
    }

    fn total(buckets: &[Bucket]) -> usize {
        buckets.iter().map(|bucket| bucket.count).sum()
    }

    #[test]
    fn count_by_keeps_first_seen_order_and_is_complete() {
        let records = sample();
        let buckets = count_by(&records, |record| record.field.label());
        assert_eq!(
            buckets,
            vec![
                Bucket::new("Civil Engineering", 3),
                Bucket::new("Computer Engineering", 1),
                Bucket::new("Mining Engineering", 1),
            ]
        );
        assert_eq!(total(&buckets), records.len());
    }

    #[test]
    fn field_counts_follow_enumeration_order() {
        let records = sample();
        let all = count_by_field(&records, FieldCounts::All);
        assert_eq!(all.len(), Field::ALL.len());
        assert_eq!(total(&all), records.len());

        let labels: Vec<_> = count_by_field(&records, FieldCounts::NonEmpty)
            .into_iter()
            .map(|bucket| bucket.label)
            .collect();
        assert_eq!(
            labels,
            vec!["Civil Engineering", "Computer Engineering", "Mining Engineering"]
        );
    }

    #[test]
    fn country_rankings_and_listings() {
        let records = sample();
        let top = count_by_country(&records, CountryOrder::ByCount { limit: 2 });
        assert_eq!(
            top,
            vec![Bucket::new("Australia", 2), Bucket::new("Canada", 1)]
        );

        let listing = count_by_country(&records, CountryOrder::Alphabetical);
        assert_eq!(
            listing,
            vec![
                Bucket::new("Australia", 2),
                Bucket::new("Canada", 1),
                Bucket::new("Sri Lanka", 1),
                Bucket::new(UNSPECIFIED_COUNTRY, 1),
            ]
        );
        assert_eq!(total(&listing), records.len());
    }

    #[test]
    fn unset_statuses_get_their_own_bucket() {
        let records = sample();
        let stats = status_breakdown(&records);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.absent, 1);
        assert_eq!(stats.attendance_unset, 3);
        assert_eq!(stats.phone_yes, 1);
        assert_eq!(stats.phone_no, 1);
        assert_eq!(stats.phone_unset, 3);
        assert_eq!(total(&stats.phone_buckets()), records.len());
        assert_eq!(total(&stats.attendance_buckets()), records.len());
    }

    #[test]
    fn empty_input_yields_zeroes() {
        assert!(count_by(&[], |record| record.email.clone()).is_empty());
        assert_eq!(status_breakdown(&[]), StatusBreakdown::default());
        assert!(count_by_field(&[], FieldCounts::NonEmpty).is_empty());
    }
}
