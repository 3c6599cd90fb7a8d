//! Bulk import of batchmates from a spreadsheet.
//!
//! One sheet is chosen per run (by target field), its rows are mapped onto
//! record drafts through a fixed alias table, and drafts are created one at a
//! time. Row-level problems land in the [`ImportReport`]; only an unreadable
//! file aborts the run.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{Field, RecordDraft};
use crate::store::RecordStore;

pub const PLACEHOLDER_DOMAIN: &str = "noemail.com";
pub const PLACEHOLDER_LOCAL_PART: &str = "user";

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read spreadsheet: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    FullName,
    CallingName,
    NickName,
    Address,
    Country,
    WorkingPlace,
    Mobile,
    WhatsappMobile,
    Email,
}

/// Accepted header spellings per column, in lookup priority order.
pub const COLUMN_ALIASES: [(Column, &[&str]); 9] = [
    (Column::FullName, &["Full Name", "Name", "Calling Name"]),
    (Column::CallingName, &["Calling Name", "Name", "Full Name"]),
    (Column::NickName, &["Nick Name", "Nick"]),
    (Column::Address, &["Address (Residence)", "Address"]),
    (Column::Country, &["Country (Residence)", "Country"]),
    (Column::WorkingPlace, &["Working Place", "Work Place"]),
    (Column::Mobile, &["Phone/Mobile", "Mobile", "Phone"]),
    (
        Column::WhatsappMobile,
        &[
            "Mobile (Whatsapp)",
            "Mobile (WhatsApp)",
            "Whatsapp",
            "WhatsApp",
            "Mobile(WhatsApp)",
        ],
    ),
    (Column::Email, &["E Mail", "Email", "Gmail", "E-Mail"]),
];

pub fn aliases(column: Column) -> &'static [&'static str] {
    COLUMN_ALIASES
        .iter()
        .find(|(candidate, _)| *candidate == column)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

#[derive(Debug, Clone)]
pub struct ImportSource {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImportSource {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }

    fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
    }

    fn stem(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(OsStr::to_str)
            .unwrap_or("Sheet1")
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportStage {
    #[default]
    Idle,
    FileSelected,
    Parsing,
    RowProcessing(usize),
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub stage: ImportStage,
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    fn at(stage: ImportStage, processed: usize, total: usize) -> Self {
        Self {
            stage,
            processed,
            total,
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return if self.stage == ImportStage::Completed { 1.0 } else { 0.0 };
        }
        self.processed as f64 / self.total as f64
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowResult {
    Imported,
    SkippedDuplicate,
    FailedValidation(String),
    FailedSubmission(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    pub line: usize,
    pub full_name: String,
    pub result: RowResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub sheet_name: String,
    pub warnings: Vec<String>,
    pub success_count: usize,
    pub failure_count: usize,
    pub blank_rows: usize,
    pub errors: Vec<String>,
    pub outcomes: Vec<RowOutcome>,
}

/// One decoded row, addressable by header text.
#[derive(Debug, Clone)]
pub struct SheetRow {
    pub line: usize,
    cells: HashMap<String, String>,
}

impl SheetRow {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .get(&normalize_header(header))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    /// The first non-empty row is the header; fully empty rows are dropped.
    fn from_lines(name: String, lines: Vec<(usize, Vec<String>)>) -> Self {
        let mut lines = lines
            .into_iter()
            .filter(|(_, cells)| cells.iter().any(|cell| !cell.trim().is_empty()));

        let headers: Vec<String> = match lines.next() {
            Some((_, cells)) => cells.into_iter().map(|cell| cell.trim().to_string()).collect(),
            None => Vec::new(),
        };

        let rows = lines
            .map(|(line, cells)| {
                let mut map = HashMap::new();
                for (header, value) in headers.iter().zip(cells) {
                    if header.is_empty() {
                        continue;
                    }
                    map.entry(normalize_header(header)).or_insert(value);
                }
                SheetRow { line, cells: map }
            })
            .collect();

        Self {
            name,
            headers,
            rows,
        }
    }

    /// Header cells that match no known column alias.
    pub fn unrecognised_headers(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|header| !header.is_empty())
            .filter(|header| {
                let normalized = normalize_header(header);
                !COLUMN_ALIASES
                    .iter()
                    .flat_map(|(_, aliases)| aliases.iter())
                    .any(|alias| normalize_header(alias) == normalized)
            })
            .cloned()
            .collect()
    }
}

enum Container {
    Spreadsheet(Sheets<Cursor<Vec<u8>>>),
    Csv { name: String, bytes: Vec<u8> },
}

pub struct Workbook {
    container: Container,
}

impl Workbook {
    pub fn open(source: &ImportSource) -> Result<Self, ImportError> {
        let container = match source.extension().as_deref() {
            Some("csv") => Container::Csv {
                name: source.stem(),
                bytes: source.bytes.clone(),
            },
            Some(ext) if !SPREADSHEET_EXTENSIONS.contains(&ext) => {
                return Err(ImportError::Parse(format!(
                    "unsupported file type '.{ext}', expected .xlsx, .xls or .csv"
                )));
            }
            _ => {
                let sheets = open_workbook_auto_from_rs(Cursor::new(source.bytes.clone()))
                    .map_err(|err| ImportError::Parse(err.to_string()))?;
                Container::Spreadsheet(sheets)
            }
        };
        Ok(Self { container })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        match &self.container {
            Container::Spreadsheet(sheets) => sheets.sheet_names(),
            Container::Csv { name, .. } => vec![name.clone()],
        }
    }

    pub fn read_sheet(&mut self, name: &str) -> Result<Sheet, ImportError> {
        let lines = match &mut self.container {
            Container::Spreadsheet(sheets) => {
                let range = sheets
                    .worksheet_range(name)
                    .map_err(|err| ImportError::Parse(err.to_string()))?;
                let first_line = range.start().map_or(1, |(row, _)| row as usize + 1);
                range
                    .rows()
                    .enumerate()
                    .map(|(index, row)| (first_line + index, row.iter().map(cell_text).collect()))
                    .collect()
            }
            Container::Csv { bytes, .. } => csv_lines(bytes)?,
        };
        Ok(Sheet::from_lines(name.to_string(), lines))
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        other => other.to_string(),
    }
}

fn csv_lines(bytes: &[u8]) -> Result<Vec<(usize, Vec<String>)>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut lines = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|err| ImportError::Parse(err.to_string()))?;
        let line = record
            .position()
            .map_or(index + 1, |position| position.line() as usize);
        lines.push((line, record.iter().map(|cell| cell.trim().to_string()).collect()));
    }
    Ok(lines)
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetChoice {
    pub name: String,
    pub matched: bool,
}

/// Picks the first sheet whose name equals or contains the field's fragment,
/// case-insensitively, falling back to the first sheet.
pub fn resolve_sheet(names: &[String], field: Field) -> Option<SheetChoice> {
    let fragment = field.sheet_fragment().to_lowercase();

    let matched = names.iter().position(|name| {
        let name = name.trim().to_lowercase();
        name == fragment || name.contains(&fragment)
    });

    match matched {
        Some(index) => Some(SheetChoice {
            name: names[index].clone(),
            matched: true,
        }),
        None => names.first().map(|name| SheetChoice {
            name: name.clone(),
            matched: false,
        }),
    }
}

fn resolve(row: &SheetRow, column: Column) -> Option<String> {
    aliases(column)
        .iter()
        .find_map(|alias| row.get(alias))
        .map(str::to_string)
}

pub fn map_row(row: &SheetRow, field: Field) -> RecordDraft {
    let full_name = resolve(row, Column::FullName).unwrap_or_default();
    let email = resolve(row, Column::Email).unwrap_or_else(|| placeholder_email(&full_name));

    RecordDraft {
        calling_name: resolve(row, Column::CallingName).unwrap_or_default(),
        nick_name: resolve(row, Column::NickName),
        address: resolve(row, Column::Address),
        country: resolve(row, Column::Country),
        working_place: resolve(row, Column::WorkingPlace),
        mobile: resolve(row, Column::Mobile),
        whatsapp_mobile: resolve(row, Column::WhatsappMobile).unwrap_or_default(),
        full_name,
        email,
        field,
    }
}

pub fn validate(draft: &RecordDraft) -> Result<(), ValidationError> {
    if draft.full_name.trim().is_empty() {
        return Err(ValidationError("Full Name is required".to_string()));
    }
    Ok(())
}

/// Builds a stand-in address from a name: "Jane Q. Doe!!" becomes
/// `jane.q.doe@noemail.com`.
pub fn placeholder_email(full_name: &str) -> String {
    let kept: String = full_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    let local = kept.split_whitespace().collect::<Vec<_>>().join(".");
    let local = if local.is_empty() {
        PLACEHOLDER_LOCAL_PART
    } else {
        local.as_str()
    };
    format!("{local}@{PLACEHOLDER_DOMAIN}")
}

fn load_sheet(source: &ImportSource, field: Field) -> Result<(Sheet, Vec<String>), ImportError> {
    let mut workbook = Workbook::open(source)?;
    let names = workbook.sheet_names();
    debug!(?names, "workbook sheets");

    let choice = resolve_sheet(&names, field)
        .ok_or_else(|| ImportError::Parse("workbook contains no sheets".to_string()))?;

    let mut warnings = Vec::new();
    if choice.matched {
        info!(sheet = %choice.name, %field, "found matching sheet");
    } else {
        let message = format!(
            "No sheet named after '{}' found; using sheet '{}' for {}",
            field.sheet_fragment(),
            choice.name,
            field
        );
        warn!("{message}");
        warnings.push(message);
    }

    let sheet = workbook.read_sheet(&choice.name)?;
    let ignored = sheet.unrecognised_headers();
    if !ignored.is_empty() {
        debug!(?ignored, sheet = %sheet.name, "ignoring unrecognised columns");
    }
    if sheet.rows.is_empty() {
        return Err(ImportError::Parse(format!(
            "no data rows found in sheet '{}'",
            sheet.name
        )));
    }
    Ok((sheet, warnings))
}

/// Runs one import to completion. Creates are issued strictly one after another.
pub async fn import_file<S, P>(
    store: &S,
    source: &ImportSource,
    field: Field,
    mut on_progress: P,
) -> Result<ImportReport, ImportError>
where
    S: RecordStore + ?Sized,
    P: FnMut(Progress),
{
    on_progress(Progress::at(ImportStage::FileSelected, 0, 0));
    on_progress(Progress::at(ImportStage::Parsing, 0, 0));

    let (sheet, warnings) = match load_sheet(source, field) {
        Ok(loaded) => loaded,
        Err(err) => {
            on_progress(Progress::at(ImportStage::Aborted, 0, 0));
            return Err(err);
        }
    };
    info!(sheet = %sheet.name, rows = sheet.rows.len(), "importing sheet");

    let mut report = ImportReport {
        sheet_name: sheet.name.clone(),
        warnings,
        ..ImportReport::default()
    };

    let mut pending = Vec::new();
    for row in &sheet.rows {
        let draft = map_row(row, field);
        if draft.full_name.is_empty() {
            debug!(line = row.line, "skipping blank row");
            report.blank_rows += 1;
            continue;
        }
        pending.push((row.line, draft));
    }

    let total = pending.len();
    for (index, (line, draft)) in pending.into_iter().enumerate() {
        let result = match validate(&draft) {
            Err(err) => {
                report.errors.push(format!("Row {line}: {err}"));
                RowResult::FailedValidation(err.to_string())
            }
            Ok(()) => match store.create(&draft).await {
                Ok(_) => {
                    debug!(line, name = %draft.full_name, "imported");
                    RowResult::Imported
                }
                Err(err) if err.is_duplicate_conflict() => {
                    debug!(line, name = %draft.full_name, "already present, skipping");
                    RowResult::SkippedDuplicate
                }
                Err(err) => {
                    warn!(line, name = %draft.full_name, error = %err, "create failed");
                    report
                        .errors
                        .push(format!("Row {line} ({}): {err}", draft.full_name));
                    RowResult::FailedSubmission(err.to_string())
                }
            },
        };

        match result {
            RowResult::Imported | RowResult::SkippedDuplicate => report.success_count += 1,
            RowResult::FailedValidation(_) | RowResult::FailedSubmission(_) => {
                report.failure_count += 1
            }
        }
        report.outcomes.push(RowOutcome {
            line,
            full_name: draft.full_name,
            result,
        });

        on_progress(Progress::at(ImportStage::RowProcessing(index), index + 1, total));
    }

    on_progress(Progress::at(ImportStage::Completed, total, total));
    info!(
        imported = report.success_count,
        failed = report.failure_count,
        blank = report.blank_rows,
        "import finished"
    );
    Ok(report)
}
