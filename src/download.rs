//! Exports rendered by the backend and saved as-is.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::api::ApiClient;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SpecialExport {
    /// One sheet per field, names sorted alphabetically.
    Fieldwise,
    /// Single bordered column of names for printing and cutting.
    RaffleCutSheet,
}

impl SpecialExport {
    pub fn path(self) -> &'static str {
        match self {
            SpecialExport::Fieldwise => "batchmates/export/fieldwise",
            SpecialExport::RaffleCutSheet => "batchmates/export/raffle-cut-sheet",
        }
    }

    pub fn default_file_name(self, date: NaiveDate) -> String {
        let stem = match self {
            SpecialExport::Fieldwise => "Fieldwise_Name_Lists",
            SpecialExport::RaffleCutSheet => "Raffle_Cut_Sheet",
        };
        format!("{stem}_{}.xlsx", date.format("%Y-%m-%d"))
    }
}

/// Extracts a bare file name from a `Content-Disposition` header value.
pub fn disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let value = value.trim();
                let encoded = value.rsplit("''").next().unwrap_or(value);
                extended = Some(percent_decode(encoded));
            }
            "filename" => plain = Some(value.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    extended
        .or(plain)
        .and_then(|name| {
            Path::new(&name.replace('\\', "/"))
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
        })
        .filter(|name| !name.is_empty())
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[index + 1..index + 3]).unwrap_or("");
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                decoded.push(byte);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Downloads a server-rendered export into `out_dir`, streaming the body to disk.
pub async fn download_special(
    api: &ApiClient,
    export: SpecialExport,
    out_dir: &Path,
    today: NaiveDate,
) -> anyhow::Result<PathBuf> {
    let mut response = api
        .open_download(export.path(), XLSX_MIME)
        .await
        .with_context(|| format!("failed to request {}", export.path()))?;

    let file_name = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(disposition_file_name)
        .unwrap_or_else(|| export.default_file_name(today));
    let target = out_dir.join(file_name);

    let mut file = tokio::fs::File::create(&target)
        .await
        .with_context(|| format!("failed to create {}", target.display()))?;
    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await.context("download interrupted")? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    info!(path = %target.display(), bytes = written, "saved server export");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{serve, Reply};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).expect("date")
    }

    #[tokio::test]
    async fn download_uses_the_server_file_name() {
        let workbook: Vec<u8> = (0..=255u8).cycle().take(40_000).collect();
        let body = workbook.clone();
        let server = serve(move |_| {
            Reply::bytes(200, body.clone())
                .with_header("Content-Type", XLSX_MIME)
                .with_header(
                    "Content-Disposition",
                    r#"attachment; filename="Fieldwise_Name_Lists_2026-10-01.xlsx""#,
                )
        })
        .await;
        let dir = tempfile::tempdir().expect("tempdir");

        let target = download_special(&server.client(), SpecialExport::Fieldwise, dir.path(), today())
            .await
            .expect("download");

        assert_eq!(target, dir.path().join("Fieldwise_Name_Lists_2026-10-01.xlsx"));
        assert_eq!(std::fs::read(&target).expect("saved file"), workbook);
        assert_eq!(server.requests()[0].path(), "/api/batchmates/export/fieldwise");
    }

    #[tokio::test]
    async fn download_without_disposition_falls_back_to_a_dated_name() {
        let server = serve(|_| Reply::bytes(200, b"PK\x03\x04".to_vec())).await;
        let dir = tempfile::tempdir().expect("tempdir");

        let target = download_special(
            &server.client(),
            SpecialExport::RaffleCutSheet,
            dir.path(),
            today(),
        )
        .await
        .expect("download");

        assert_eq!(target, dir.path().join("Raffle_Cut_Sheet_2026-10-18.xlsx"));
        assert_eq!(std::fs::read(&target).expect("saved file"), b"PK\x03\x04");
    }

    #[tokio::test]
    async fn rejected_download_leaves_no_file() {
        let server = serve(|_| Reply::json(403, serde_json::json!({ "error": { "message": "Forbidden" } }))).await;
        let dir = tempfile::tempdir().expect("tempdir");

        let err = download_special(&server.client(), SpecialExport::Fieldwise, dir.path(), today())
            .await
            .expect_err("forbidden");
        assert!(format!("{err:#}").contains("Forbidden"));
        assert_eq!(std::fs::read_dir(dir.path()).expect("dir").count(), 0);
    }

    #[test]
    fn file_name_comes_from_quoted_or_bare_values() {
        assert_eq!(
            disposition_file_name(r#"attachment; filename="Fieldwise_2026-10-01.xlsx""#),
            Some("Fieldwise_2026-10-01.xlsx".to_string())
        );
        assert_eq!(
            disposition_file_name("attachment; filename=cut.xlsx; size=2048"),
            Some("cut.xlsx".to_string())
        );
    }

    #[test]
    fn extended_file_name_wins_and_is_decoded() {
        assert_eq!(
            disposition_file_name(
                "attachment; filename=\"fallback.xlsx\"; filename*=UTF-8''Name%20Lists.xlsx"
            ),
            Some("Name Lists.xlsx".to_string())
        );
    }

    #[test]
    fn path_components_are_stripped() {
        assert_eq!(
            disposition_file_name(r#"attachment; filename="../../etc/passwd""#),
            Some("passwd".to_string())
        );
        assert_eq!(disposition_file_name("attachment"), None);
        assert_eq!(disposition_file_name(r#"attachment; filename="""#), None);
    }

    #[test]
    fn default_names_carry_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        assert_eq!(
            SpecialExport::Fieldwise.default_file_name(date),
            "Fieldwise_Name_Lists_2026-10-18.xlsx"
        );
        assert_eq!(
            SpecialExport::RaffleCutSheet.default_file_name(date),
            "Raffle_Cut_Sheet_2026-10-18.xlsx"
        );
        assert_eq!(
            SpecialExport::RaffleCutSheet.path(),
            "batchmates/export/raffle-cut-sheet"
        );
    }
}
