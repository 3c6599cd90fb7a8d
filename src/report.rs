use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregate::{self, CountryOrder, FieldCounts};
use crate::models::{Bucket, PhoneConfirmation, Record};

fn write_buckets(output: &mut String, buckets: &[Bucket], empty: &str) {
    if buckets.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for bucket in buckets {
        let _ = writeln!(output, "- {}: {}", bucket.label, bucket.count);
    }
}

pub fn build_report(
    scope_label: &str,
    generated_on: NaiveDate,
    records: &[Record],
    top_countries: usize,
) -> String {
    let stats = aggregate::status_breakdown(records);
    let by_field = aggregate::count_by_field(records, FieldCounts::NonEmpty);
    let countries = aggregate::count_by_country(
        records,
        CountryOrder::ByCount {
            limit: top_countries,
        },
    );

    let mut output = String::new();

    let _ = writeln!(output, "# Batchmates Summary");
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} records)",
        scope_label, generated_on, stats.total
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## By Field");
    write_buckets(&mut output, &by_field, "No records in this selection.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Countries");
    write_buckets(&mut output, &countries, "No countries recorded.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Phone Confirmation");
    write_buckets(&mut output, &stats.phone_buckets(), "");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance");
    write_buckets(&mut output, &stats.attendance_buckets(), "");

    let mut confirmed: Vec<Record> = records
        .iter()
        .filter(|record| record.phone_confirmation == Some(PhoneConfirmation::Yes))
        .cloned()
        .collect();
    confirmed.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Confirmed by Phone");

    if confirmed.is_empty() {
        let _ = writeln!(output, "Nobody has confirmed yet.");
    } else {
        for record in &confirmed {
            let _ = writeln!(
                output,
                "- {} ({}, {})",
                record.full_name,
                record.field,
                record.country_label().unwrap_or(aggregate::UNSPECIFIED_COUNTRY)
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_record, Attendance, Field};

    #[test]
    fn report_lists_every_section() {
        let mut records = vec![
            sample_record(1, "Nimal Perera", Field::Civil),
            sample_record(2, "Kasun Silva", Field::Computer),
        ];
        records[1].phone_confirmation = Some(PhoneConfirmation::Yes);
        records[1].country = None;
        records[0].attendance = Some(Attendance::Present);

        let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        let report = build_report("all fields", date, &records, 5);

        assert!(report.starts_with("# Batchmates Summary\nGenerated for all fields on 2026-10-18 (2 records)"));
        assert!(report.contains("- Civil Engineering: 1\n- Computer Engineering: 1\n"));
        assert!(report.contains("## Top Countries\n- Sri Lanka: 1\n"));
        assert!(report.contains("- Confirmed (Yes): 1\n- Declined (No): 0\n- Not marked: 1\n"));
        assert!(report.contains("- Present: 1\n- Absent: 0\n- Not marked: 1\n"));
        assert!(report.contains("- Kasun Silva (Computer Engineering, Not specified)"));
        assert!(!report.contains("- Nimal Perera ("));
    }

    #[test]
    fn empty_selection_still_renders() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).expect("date");
        let report = build_report("Mining Engineering", date, &[], 5);
        assert!(report.contains("(0 records)"));
        assert!(report.contains("No records in this selection."));
        assert!(report.contains("No countries recorded."));
        assert!(report.contains("Nobody has confirmed yet."));
    }
}
