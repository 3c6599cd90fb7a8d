use std::collections::BTreeSet;

use crate::models::{FilterCriteria, PhoneConfirmation, Record, Scope};

/// Applies the actor's scope, then the user criteria, and orders phone-confirmed
/// records first. The input slice is left untouched.
pub fn filter_records(records: &[Record], scope: &Scope, criteria: &FilterCriteria) -> Vec<Record> {
    let term = criteria
        .term
        .as_deref()
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    let mut result: Vec<Record> = records
        .iter()
        .filter(|record| scope.permits(record))
        .filter(|record| term.as_deref().map_or(true, |term| matches_term(record, term)))
        .filter(|record| matches_criteria(record, criteria))
        .cloned()
        .collect();

    sort_confirmed_first(&mut result);
    result
}

/// Stable: records keep their relative order within each group.
pub fn sort_confirmed_first(records: &mut [Record]) {
    records.sort_by_key(|record| record.phone_confirmation != Some(PhoneConfirmation::Yes));
}

/// Distinct non-blank countries, alphabetical, for pick-lists.
pub fn available_countries(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(Record::country_label)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn matches_term(record: &Record, term: &str) -> bool {
    contains_folded(&record.calling_name, term)
        || contains_folded(&record.full_name, term)
        || contains_folded(&record.email, term)
        || record
            .nick_name
            .as_deref()
            .is_some_and(|nick| contains_folded(nick, term))
}

fn matches_criteria(record: &Record, criteria: &FilterCriteria) -> bool {
    if let Some(field) = criteria.field {
        if record.field != field {
            return false;
        }
    }

    if let Some(country) = active(&criteria.country) {
        if record.country_label() != Some(country.trim()) {
            return false;
        }
    }

    criteria.phone_confirmation.matches(record.phone_confirmation)
        && criteria.attendance.matches(record.attendance)
        && substring(record.working_place.as_deref(), &criteria.working_place)
        && substring(record.nick_name.as_deref(), &criteria.nick_name)
        && substring(Some(&record.calling_name), &criteria.calling_name)
        && substring(Some(&record.full_name), &criteria.full_name)
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn substring(value: Option<&str>, wanted: &Option<String>) -> bool {
    match active(wanted) {
        None => true,
        Some(wanted) => value.is_some_and(|value| contains_folded(value, &wanted.to_lowercase())),
    }
}

fn contains_folded(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}
