//! Spreadsheet backend.
//!
//! Rendering happens in two steps: [`workbook_layout`] decides what goes in
//! which cell, [`encode`] turns that layout into XLSX bytes. The layout is
//! plain data so the table contract can be checked without opening a file.

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};
use serde_json::Value;

use super::{Payload, TimeseriesTable, metadata_pairs, pretty_body};
use crate::error::RenderError;
use crate::model::NormalizedResponse;

const MAIN_SHEET: &str = "Response Data";
const UNITS_SHEET: &str = "Units";
/// Rows the JSON blob cell is merged over.
const BLOB_ROWS: u32 = 20;
/// Excel refuses strings longer than this in a single cell.
const MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Title,
    Section,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => CellValue::Empty,
            Some(Value::Number(n)) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
            Some(other) => CellValue::Text(super::display_value(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetRow {
    /// Merged across the first two columns.
    Banner { text: String, style: Banner },
    /// Bold key in A, value in B.
    Pair { key: String, value: String },
    /// Styled column headers.
    Header(Vec<String>),
    Values(Vec<CellValue>),
    /// Wrapped text merged over a block of rows.
    Blob(String),
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub name: String,
    pub rows: Vec<SheetRow>,
    pub column_widths: Vec<f64>,
}

impl SheetLayout {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            column_widths: Vec::new(),
        }
    }

    /// The first header row, if the sheet has a table.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.iter().find_map(|row| match row {
            SheetRow::Header(cells) => Some(cells.as_slice()),
            _ => None,
        })
    }

    /// All `Values` rows, in order.
    pub fn value_rows(&self) -> Vec<&[CellValue]> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                SheetRow::Values(cells) => Some(cells.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn has_blob(&self) -> bool {
        self.rows.iter().any(|row| matches!(row, SheetRow::Blob(_)))
    }

    pub fn banners(&self) -> Vec<(&str, Banner)> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                SheetRow::Banner { text, style } => Some((text.as_str(), *style)),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookLayout {
    pub sheets: Vec<SheetLayout>,
}

/// XLSX workbook bytes for a response.
pub fn to_xlsx(resp: &NormalizedResponse, title: &str) -> Result<Vec<u8>, RenderError> {
    encode(&workbook_layout(resp, title))
}

/// Decide the cell contents of every sheet.
pub fn workbook_layout(resp: &NormalizedResponse, title: &str) -> WorkbookLayout {
    let mut main = SheetLayout::new(MAIN_SHEET);
    main.rows.push(SheetRow::Banner {
        text: title.to_string(),
        style: Banner::Title,
    });
    main.rows.push(SheetRow::Blank);

    if let Some(pairs) = metadata_pairs(resp) {
        main.rows.push(SheetRow::Banner {
            text: "Metadata".to_string(),
            style: Banner::Section,
        });
        main.rows
            .extend(pairs.into_iter().map(|(key, value)| SheetRow::Pair { key, value }));
        main.rows.push(SheetRow::Blank);
    }

    if let Some(error) = resp.error() {
        main.rows.push(SheetRow::Banner {
            text: "Error".to_string(),
            style: Banner::Error,
        });
        main.rows.push(SheetRow::Pair {
            key: "Error Message".to_string(),
            value: error.into_owned(),
        });
        main.rows.push(SheetRow::Blank);
    }

    let mut sheets = Vec::new();
    match Payload::classify(resp) {
        Payload::Timeseries(table) => {
            push_table(&mut main, &table);
            sheets.push(main);
            if !table.units.is_empty() {
                sheets.push(units_sheet(&table));
            }
        }
        Payload::Generic => {
            main.rows.push(SheetRow::Banner {
                text: "Full Response (JSON)".to_string(),
                style: Banner::Section,
            });
            main.rows.push(SheetRow::Blob(pretty_body(resp)));
            main.column_widths = vec![30.0, 60.0];
            sheets.push(main);
        }
    }

    WorkbookLayout { sheets }
}

fn push_table(sheet: &mut SheetLayout, table: &TimeseriesTable) {
    sheet.rows.push(SheetRow::Banner {
        text: "Timeseries Data".to_string(),
        style: Banner::Section,
    });
    if let Some(location) = &table.location {
        sheet.rows.push(SheetRow::Pair {
            key: "Location".to_string(),
            value: location.clone(),
        });
    }
    sheet.rows.push(SheetRow::Blank);

    sheet.rows.push(SheetRow::Header(table.headers()));

    let columns = table.detail_columns();
    let symbol = table.has_symbol_column();
    let precip = table.has_precip_column();

    for entry in &table.entries {
        let mut cells = Vec::with_capacity(columns.len() + 3);
        cells.push(entry.time.clone().map_or(CellValue::Empty, CellValue::Text));
        cells.extend(columns.iter().map(|c| CellValue::from_json(entry.details.get(c))));

        let next = entry.next_1_hours.as_ref();
        if symbol {
            cells.push(
                next.and_then(|n| n.symbol_code.clone())
                    .map_or(CellValue::Empty, CellValue::Text),
            );
        }
        if precip {
            cells.push(
                next.and_then(|n| n.precipitation_amount)
                    .map_or(CellValue::Empty, CellValue::Number),
            );
        }
        sheet.rows.push(SheetRow::Values(cells));
    }

    // key/value rows above the table need column B even for a Time-only table
    let mut widths = vec![28.0];
    widths.resize(table.headers().len().max(2), 18.0);
    sheet.column_widths = widths;
}

fn units_sheet(table: &TimeseriesTable) -> SheetLayout {
    let mut sheet = SheetLayout::new(UNITS_SHEET);
    sheet
        .rows
        .push(SheetRow::Header(vec!["Parameter".to_string(), "Unit".to_string()]));
    sheet.rows.extend(table.units.iter().map(|(param, unit)| {
        SheetRow::Values(vec![
            CellValue::Text(param.clone()),
            CellValue::Text(unit.clone()),
        ])
    }));
    sheet.column_widths = vec![40.0, 20.0];
    sheet
}

struct Styles {
    title: Format,
    section: Format,
    error: Format,
    key: Format,
    header: Format,
    blob: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(16)
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0x3498DB)),
            section: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_background_color(Color::RGB(0xECF0F1)),
            error: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0xE74C3C)),
            key: Format::new().set_bold(),
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0x2C3E50)),
            blob: Format::new().set_text_wrap().set_align(FormatAlign::Top),
        }
    }
}

/// Write a layout out as an XLSX workbook.
pub fn encode(layout: &WorkbookLayout) -> Result<Vec<u8>, RenderError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();

    for sheet in &layout.sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&sheet.name)?;
        write_rows(&mut worksheet, sheet, &styles)?;
        for (col, width) in sheet.column_widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }
        workbook.push_worksheet(worksheet);
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_rows(ws: &mut Worksheet, sheet: &SheetLayout, styles: &Styles) -> Result<(), RenderError> {
    let mut row: u32 = 0;

    for item in &sheet.rows {
        match item {
            SheetRow::Banner { text, style } => {
                let format = match style {
                    Banner::Title => &styles.title,
                    Banner::Section => &styles.section,
                    Banner::Error => &styles.error,
                };
                ws.merge_range(row, 0, row, 1, text, format)?;
            }
            SheetRow::Pair { key, value } => {
                ws.write_string_with_format(row, 0, key, &styles.key)?;
                ws.write_string(row, 1, clip(value))?;
            }
            SheetRow::Header(cells) => {
                for (col, text) in cells.iter().enumerate() {
                    ws.write_string_with_format(row, col as u16, text, &styles.header)?;
                }
            }
            SheetRow::Values(cells) => {
                for (col, cell) in cells.iter().enumerate() {
                    match cell {
                        CellValue::Empty => {}
                        CellValue::Text(text) => {
                            ws.write_string(row, col as u16, text)?;
                        }
                        CellValue::Number(n) => {
                            ws.write_number(row, col as u16, *n)?;
                        }
                    }
                }
            }
            SheetRow::Blob(text) => {
                ws.merge_range(row, 0, row + BLOB_ROWS, 1, &clip(text), &styles.blob)?;
                row += BLOB_ROWS;
            }
            SheetRow::Blank => {}
        }
        row += 1;
    }

    Ok(())
}

fn clip(text: &str) -> String {
    const MARKER: &str = "\n... (truncated)";
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let keep = MAX_CELL_CHARS - MARKER.chars().count();
    let mut clipped: String = text.chars().take(keep).collect();
    clipped.push_str(MARKER);
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast() -> NormalizedResponse {
        NormalizedResponse::from_payload(json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [5.0, 60.0, 0] },
            "properties": {
                "meta": {
                    "updated_at": "2024-06-01T10:00:00Z",
                    "units": { "wind_speed": "m/s", "air_temperature": "celsius" }
                },
                "timeseries": [
                    { "time": "2024-06-01T12:00:00Z", "data": {
                        "instant": { "details": { "air_temperature": 12.5, "wind_speed": 5.2 } },
                        "next_1_hours": {
                            "summary": { "symbol_code": "cloudy" },
                            "details": { "precipitation_amount": 0.0 }
                        }
                    } },
                    { "time": "2024-06-01T11:00:00Z", "data": {
                        "instant": { "details": { "air_pressure_at_sea_level": 1013.2 } }
                    } }
                ]
            },
            "_metadata": { "api": "Locationforecast 2.0" }
        }))
    }

    #[test]
    fn entry_without_time_keeps_its_row_with_an_empty_time_cell() {
        let resp = NormalizedResponse::from_payload(json!({
            "properties": { "timeseries": [
                { "time": "t0", "data": { "instant": { "details": { "a": 1 } } } },
                { "data": { "instant": { "details": { "b": 2 } } } }
            ] }
        }));

        let layout = workbook_layout(&resp, "Gaps");
        let main = &layout.sheets[0];
        assert_eq!(main.header().unwrap(), ["Time", "a", "b"]);

        let rows = main.value_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            [CellValue::Empty, CellValue::Empty, CellValue::Number(2.0)]
        );
    }

    #[test]
    fn timeseries_switches_to_tabular_mode() {
        let layout = workbook_layout(&forecast(), "Locationforecast");
        let main = &layout.sheets[0];

        assert!(!main.has_blob());
        assert_eq!(
            main.header().unwrap(),
            [
                "Time",
                "air_pressure_at_sea_level",
                "air_temperature",
                "wind_speed",
                "Next 1hr Symbol",
                "Next 1hr Precip (mm)",
            ]
        );
    }

    #[test]
    fn rows_keep_input_order_and_leave_gaps_empty() {
        let layout = workbook_layout(&forecast(), "Locationforecast");
        let rows = layout.sheets[0].value_rows();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            [
                CellValue::Text("2024-06-01T12:00:00Z".into()),
                CellValue::Empty,
                CellValue::Number(12.5),
                CellValue::Number(5.2),
                CellValue::Text("cloudy".into()),
                CellValue::Number(0.0),
            ]
        );
        assert_eq!(
            rows[1],
            [
                CellValue::Text("2024-06-01T11:00:00Z".into()),
                CellValue::Number(1013.2),
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Empty,
            ]
        );
    }

    #[test]
    fn location_row_is_lat_then_lon() {
        let layout = workbook_layout(&forecast(), "Locationforecast");
        let location = layout.sheets[0].rows.iter().find_map(|row| match row {
            SheetRow::Pair { key, value } if key == "Location" => Some(value.clone()),
            _ => None,
        });
        assert_eq!(location.as_deref(), Some("60.0, 5.0"));
    }

    #[test]
    fn units_sheet_is_sorted_by_parameter() {
        let layout = workbook_layout(&forecast(), "Locationforecast");
        assert_eq!(layout.sheets.len(), 2);

        let units = &layout.sheets[1];
        assert_eq!(units.name, "Units");
        assert_eq!(units.header().unwrap(), ["Parameter", "Unit"]);
        assert_eq!(
            units.value_rows()[0],
            [
                CellValue::Text("air_temperature".into()),
                CellValue::Text("celsius".into())
            ]
        );
    }

    #[test]
    fn empty_units_mean_no_units_sheet() {
        let resp = NormalizedResponse::from_payload(json!({
            "properties": { "meta": { "units": {} }, "timeseries": [] }
        }));
        let layout = workbook_layout(&resp, "Empty");
        assert_eq!(layout.sheets.len(), 1);
        assert_eq!(layout.sheets[0].header().unwrap(), ["Time"]);
    }

    #[test]
    fn generic_response_falls_back_to_blob() {
        let resp = NormalizedResponse::from_payload(json!({
            "query": "Bergen, Norway",
            "results": [{ "display_name": "Bergen" }],
            "_metadata": { "api": "Nominatim Geocoding", "result_count": 1 }
        }));
        let layout = workbook_layout(&resp, "Nominatim Search");

        assert_eq!(layout.sheets.len(), 1);
        let main = &layout.sheets[0];
        assert!(main.has_blob());
        assert!(main.header().is_none());
        assert!(main.value_rows().is_empty());
    }

    #[test]
    fn error_banner_does_not_suppress_metadata() {
        let resp = NormalizedResponse::from_payload(json!({
            "error": "timeout",
            "_metadata": { "api": "Nowcast 2.0" }
        }));
        let layout = workbook_layout(&resp, "Nowcast");
        let banners = layout.sheets[0].banners();

        assert!(banners.contains(&("Metadata", Banner::Section)));
        assert!(banners.contains(&("Error", Banner::Error)));
        assert!(layout.sheets[0].rows.contains(&SheetRow::Pair {
            key: "Error Message".into(),
            value: "timeout".into()
        }));
    }

    #[test]
    fn oversized_cell_text_is_clipped() {
        let long = "x".repeat(MAX_CELL_CHARS + 10);
        let clipped = clip(&long);
        assert_eq!(clipped.chars().count(), MAX_CELL_CHARS);
        assert!(clipped.ends_with("(truncated)"));
        assert_eq!(clip("short"), "short");
    }

    #[test]
    fn encoded_workbook_is_a_zip_container() {
        let bytes = to_xlsx(&forecast(), "Locationforecast").unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let bytes = to_xlsx(&NormalizedResponse::new(), "Empty").unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
