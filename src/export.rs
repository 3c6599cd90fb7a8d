//! Spreadsheet and PDF renderings of a record list.

use chrono::NaiveDate;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Rect, Rgb,
};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::models::{Field, Record};

pub const SHEET_NAME: &str = "Batchmates";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("spreadsheet encoding failed: {0}")]
    Spreadsheet(#[from] XlsxError),
    #[error("pdf encoding failed: {0}")]
    Pdf(#[from] printpdf::Error),
}

struct Column {
    label: &'static str,
    width: f64,
    value: fn(&Record) -> String,
}

fn text(value: &str) -> String {
    value.to_string()
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn status<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

const SPREADSHEET_COLUMNS: [Column; 12] = [
    Column { label: "Full Name", width: 30.0, value: |r| text(&r.full_name) },
    Column { label: "Calling Name", width: 20.0, value: |r| text(&r.calling_name) },
    Column { label: "Nick Name", width: 15.0, value: |r| optional(&r.nick_name) },
    Column { label: "Email", width: 30.0, value: |r| text(&r.email) },
    Column { label: "WhatsApp Mobile", width: 18.0, value: |r| text(&r.whatsapp_mobile) },
    Column { label: "Mobile", width: 18.0, value: |r| optional(&r.mobile) },
    Column { label: "Field", width: 25.0, value: |r| r.field.label().to_string() },
    Column { label: "Country", width: 20.0, value: |r| optional(&r.country) },
    Column { label: "Address", width: 35.0, value: |r| optional(&r.address) },
    Column { label: "Working Place", width: 30.0, value: |r| optional(&r.working_place) },
    Column { label: "Phone Confirmation", width: 18.0, value: |r| status(r.phone_confirmation) },
    Column { label: "Attendance", width: 15.0, value: |r| status(r.attendance) },
];

/// PDF columns; widths are millimetres and fill a landscape A4 page inside the margins.
const PDF_COLUMNS: [Column; 9] = [
    Column { label: "Full Name", width: 45.0, value: |r| text(&r.full_name) },
    Column { label: "Calling Name", width: 28.0, value: |r| text(&r.calling_name) },
    Column { label: "Email", width: 48.0, value: |r| text(&r.email) },
    Column { label: "WhatsApp", width: 26.0, value: |r| text(&r.whatsapp_mobile) },
    Column { label: "Field", width: 36.0, value: |r| r.field.label().to_string() },
    Column { label: "Country", width: 22.0, value: |r| optional(&r.country) },
    Column { label: "Workplace", width: 32.0, value: |r| optional(&r.working_place) },
    Column { label: "Phone Conf.", width: 16.0, value: |r| status(r.phone_confirmation) },
    Column { label: "Attendance", width: 16.0, value: |r| status(r.attendance) },
];

pub fn to_spreadsheet(records: &[Record]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, column) in SPREADSHEET_COLUMNS.iter().enumerate() {
            let col = col as u16;
            sheet.set_column_width(col, column.width)?;
            sheet.write_string_with_format(0, col, column.label, &header)?;
        }

        for (index, record) in records.iter().enumerate() {
            let row = index as u32 + 1;
            for (col, column) in SPREADSHEET_COLUMNS.iter().enumerate() {
                sheet.write_string(row, col as u16, (column.value)(record))?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub title: String,
    pub subtitle: String,
    pub generated_on: NaiveDate,
}

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 14.0;
const FIRST_TABLE_TOP: f32 = 48.0;
const ROW_HEIGHT: f32 = 7.0;
const CELL_PADDING: f32 = 2.0;
const BODY_FONT_SIZE: f32 = 8.0;
/// Average Helvetica glyph width at 8pt, used to clip cell text.
const GLYPH_WIDTH: f32 = 1.55;

const HEADER_FILL: (f32, f32, f32) = (41.0, 128.0, 185.0);
const STRIPE_FILL: (f32, f32, f32) = (245.0, 245.0, 245.0);

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

pub fn to_pdf(records: &[Record], options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(options.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
    };

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    draw_title_block(&layer, &fonts, options, records.len());

    let mut top = FIRST_TABLE_TOP;
    draw_header_row(&layer, &fonts, top);
    top += ROW_HEIGHT;

    for (index, record) in records.iter().enumerate() {
        if top + ROW_HEIGHT > PAGE_HEIGHT - MARGIN {
            layer = add_page(&doc);
            top = MARGIN;
            draw_header_row(&layer, &fonts, top);
            top += ROW_HEIGHT;
        }
        if index % 2 == 1 {
            fill_row(&layer, top, STRIPE_FILL);
        }
        let cells: Vec<String> = PDF_COLUMNS.iter().map(|column| (column.value)(record)).collect();
        draw_cells(&layer, &fonts.regular, top, &cells);
        top += ROW_HEIGHT;
    }

    Ok(doc.save_to_bytes()?)
}

fn add_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Table");
    doc.get_page(page).get_layer(layer)
}

fn draw_title_block(layer: &PdfLayerReference, fonts: &Fonts, options: &PdfOptions, count: usize) {
    set_fill(layer, (0.0, 0.0, 0.0));
    layer.use_text(options.title.clone(), 18.0, Mm(MARGIN), baseline(22.0), &fonts.bold);
    layer.use_text(options.subtitle.clone(), 12.0, Mm(MARGIN), baseline(30.0), &fonts.regular);
    layer.use_text(
        format!("Generated on: {}", options.generated_on.format("%Y-%m-%d")),
        10.0,
        Mm(MARGIN),
        baseline(36.0),
        &fonts.regular,
    );
    layer.use_text(
        format!("Total Records: {count}"),
        10.0,
        Mm(MARGIN),
        baseline(42.0),
        &fonts.regular,
    );
}

fn draw_header_row(layer: &PdfLayerReference, fonts: &Fonts, top: f32) {
    fill_row(layer, top, HEADER_FILL);
    set_fill(layer, (255.0, 255.0, 255.0));
    let labels: Vec<String> = PDF_COLUMNS.iter().map(|column| column.label.to_string()).collect();
    draw_text_row(layer, &fonts.bold, top, &labels);
}

fn draw_cells(layer: &PdfLayerReference, font: &IndirectFontRef, top: f32, cells: &[String]) {
    set_fill(layer, (0.0, 0.0, 0.0));
    draw_text_row(layer, font, top, cells);
}

fn draw_text_row(layer: &PdfLayerReference, font: &IndirectFontRef, top: f32, cells: &[String]) {
    let mut left = MARGIN;
    for (column, value) in PDF_COLUMNS.iter().zip(cells) {
        let width = column.width as f32;
        let clipped = clip(value, width - 2.0 * CELL_PADDING);
        if !clipped.is_empty() {
            layer.use_text(
                clipped,
                BODY_FONT_SIZE,
                Mm(left + CELL_PADDING),
                baseline(top + ROW_HEIGHT - CELL_PADDING - 0.5),
                font,
            );
        }
        left += width;
    }
}

fn fill_row(layer: &PdfLayerReference, top: f32, rgb: (f32, f32, f32)) {
    let table_width: f32 = PDF_COLUMNS.iter().map(|column| column.width as f32).sum();
    set_fill(layer, rgb);
    let rect = Rect::new(
        Mm(MARGIN),
        baseline(top + ROW_HEIGHT),
        Mm(MARGIN + table_width),
        baseline(top),
    )
    .with_mode(PaintMode::Fill);
    layer.add_rect(rect);
}

fn set_fill(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb::new(r / 255.0, g / 255.0, b / 255.0, None)));
}

/// Converts a distance from the top edge into PDF's bottom-up y coordinate.
fn baseline(from_top: f32) -> Mm {
    Mm(PAGE_HEIGHT - from_top)
}

fn clip(value: &str, width_mm: f32) -> String {
    let max_chars = (width_mm / GLYPH_WIDTH).floor().max(0.0) as usize;
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// `{stem}_{YYYY-MM-DD}.{extension}`
pub fn export_file_name(stem: &str, date: NaiveDate, extension: &str) -> String {
    format!("{stem}_{}.{extension}", date.format("%Y-%m-%d"))
}

/// File stem describing a report selection, e.g. `batch-report-civil-engineering`.
pub fn report_file_stem(fields: &[Field], country: Option<&str>) -> String {
    let mut stem = String::from("batch-report");
    let selection = if !fields.is_empty() {
        fields
            .iter()
            .map(|field| field.label())
            .collect::<Vec<_>>()
            .join("-")
    } else {
        country.unwrap_or_default().to_string()
    };
    let slug = slugify(&selection);
    if !slug.is_empty() {
        stem.push('-');
        stem.push_str(&slug);
    }
    stem
}

fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use calamine::{Reader, Xlsx};
    use std::io::Cursor;

    use super::*;
    use crate::models::{sample_record, Attendance, PhoneConfirmation};

    fn options() -> PdfOptions {
        PdfOptions {
            title: "Batch of 93/94".to_string(),
            subtitle: "Batchmates Report".to_string(),
            generated_on: NaiveDate::from_ymd_opt(2026, 10, 18).expect("date"),
        }
    }

    fn read_back(bytes: Vec<u8>) -> Vec<Vec<String>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).expect("valid xlsx");
        let range = workbook.worksheet_range(SHEET_NAME).expect("sheet");
        range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn empty_spreadsheet_has_header_only() {
        let rows = read_back(to_spreadsheet(&[]).expect("xlsx"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "Full Name");
        assert_eq!(rows[0].len(), SPREADSHEET_COLUMNS.len());
    }

    #[test]
    fn spreadsheet_rows_follow_column_order() {
        let mut record = sample_record(1, "Nimal Perera", Field::Civil);
        record.phone_confirmation = Some(PhoneConfirmation::Yes);
        record.attendance = Some(Attendance::Present);
        let rows = read_back(to_spreadsheet(&[record]).expect("xlsx"));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "Nimal Perera");
        assert_eq!(rows[1][6], "Civil Engineering");
        assert_eq!(rows[1][10], "Yes");
        assert_eq!(rows[1][11], "Present");
    }

    #[test]
    fn pdf_handles_empty_and_multi_page_lists() {
        let empty = to_pdf(&[], &options()).expect("pdf");
        assert!(empty.starts_with(b"%PDF"));

        let records: Vec<Record> = (0..80)
            .map(|id| sample_record(id, &format!("Batchmate Number {id}"), Field::Mining))
            .collect();
        let long = to_pdf(&records, &options()).expect("pdf");
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > empty.len());
    }

    #[test]
    fn pdf_columns_fit_the_page() {
        let width: f64 = PDF_COLUMNS.iter().map(|column| column.width).sum();
        assert!(width as f32 <= PAGE_WIDTH - 2.0 * MARGIN);
        assert!(PDF_COLUMNS.iter().all(|column| column.label != "Address"));
    }

    #[test]
    fn long_cells_are_clipped() {
        assert_eq!(clip("short", 20.0), "short");
        let clipped = clip("a very long working place name indeed", 12.0);
        assert!(clipped.ends_with("..."));
        assert!(clipped.chars().count() <= 7);
    }

    #[test]
    fn file_names_carry_the_date_and_selection() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).expect("date");
        assert_eq!(
            export_file_name("batch-report", date, "xlsx"),
            "batch-report_2026-03-09.xlsx"
        );
        assert_eq!(
            report_file_stem(&[Field::Civil, Field::DataScience], None),
            "batch-report-civil-engineering-data-science"
        );
        assert_eq!(
            report_file_stem(&[], Some("New Zealand")),
            "batch-report-new-zealand"
        );
        assert_eq!(report_file_stem(&[], None), "batch-report");
    }
}
