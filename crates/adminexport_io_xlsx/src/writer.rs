//! Single-sheet export workbook buffered in memory and serialized through a temp file.

use std::fs;
use std::io::Write;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use tempfile::{Builder, NamedTempFile};

use crate::conf::C_TEMP_SUFFIX;
use crate::spec::{EnumCellValue, ExportResult, SpecCellRange, SpecXlsxExportOptions};
use crate::util::{cast_col_num, cast_row_num, validate_sheet_title};

/// One-sheet workbook: headers, rows, optional auto-filter and a title.
///
/// Cells are kept in memory until [`Self::write_to_file`], which consumes the
/// workbook.
#[derive(Debug, Clone, Default)]
pub struct ExportWorkBook {
    title: Option<String>,
    rows: Vec<Vec<EnumCellValue>>,
    autofilter: Option<SpecCellRange>,
    options: SpecXlsxExportOptions,
}

impl ExportWorkBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SpecXlsxExportOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Sheet title, `None` until [`Self::set_title`] succeeded.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// All sheet rows, header row included.
    pub fn rows(&self) -> &[Vec<EnumCellValue>] {
        &self.rows
    }

    pub fn autofilter(&self) -> Option<SpecCellRange> {
        self.autofilter
    }

    pub fn options(&self) -> &SpecXlsxExportOptions {
        &self.options
    }

    /// Set the sheet title.
    ///
    /// Fails with [`TitleTooLong`](crate::spec::ExportError::TitleTooLong)
    /// when the title has 32 or more characters, and with
    /// [`InvalidTitle`](crate::spec::ExportError::InvalidTitle) for titles the
    /// format rejects otherwise. The current title is kept on failure.
    pub fn set_title(&mut self, title: impl ToString) -> ExportResult<()> {
        let c_title = title.to_string();
        validate_sheet_title(&c_title)?;
        self.title = Some(c_title);
        Ok(())
    }

    /// Append an optional header row, then every data row in order.
    ///
    /// When a non-empty header row is given, the auto-filter covers the used
    /// range from `A1` to the last populated row and column.
    pub fn fill<I>(&mut self, rows: I, headers: Option<&[String]>)
    where
        I: IntoIterator<Item = Vec<EnumCellValue>>,
    {
        let headers = headers.filter(|l_headers| !l_headers.is_empty());

        if let Some(l_headers) = headers {
            self.rows.push(
                l_headers
                    .iter()
                    .map(|header| EnumCellValue::String(header.clone()))
                    .collect(),
            );
        }

        let n_rows_before = self.rows.len();
        self.rows.extend(rows);
        log::trace!(
            "appended {} data rows (headers: {})",
            self.rows.len() - n_rows_before,
            headers.is_some()
        );

        if headers.is_some() && self.options.if_autofilter {
            self.autofilter = self.derive_used_range();
        }
    }

    /// Serialize into `f` through a temporary file, returning the byte count.
    ///
    /// The temporary file is removed when this returns, whether it succeeds or
    /// fails. `f` may be left partially written on error.
    pub fn write_to_file<W>(self, f: &mut W) -> ExportResult<usize>
    where
        W: Write + ?Sized,
    {
        let file_tmp = self.create_temp_file()?;
        log::debug!(
            "serializing sheet {:?} ({} rows) via {}",
            self.title.as_deref().unwrap_or_default(),
            self.rows.len(),
            file_tmp.path().display()
        );

        let mut workbook = self.derive_xlsx_workbook()?;
        workbook.save(file_tmp.path())?;

        let v_bytes = fs::read(file_tmp.path())?;
        f.write_all(&v_bytes)?;
        log::debug!("wrote {} bytes", v_bytes.len());

        Ok(v_bytes.len())
    }

    fn create_temp_file(&self) -> ExportResult<NamedTempFile> {
        let mut builder = Builder::new();
        builder
            .prefix(&self.options.temp_prefix)
            .suffix(C_TEMP_SUFFIX);

        let file_tmp = match &self.options.dir_temp {
            Some(dir_temp) => builder.tempfile_in(dir_temp)?,
            None => builder.tempfile()?,
        };
        Ok(file_tmp)
    }

    /// `A1` to the last populated row and column; empty text does not count.
    fn derive_used_range(&self) -> Option<SpecCellRange> {
        let mut range: Option<SpecCellRange> = None;
        for (row_idx, row) in self.rows.iter().enumerate() {
            let Some(col_idx) = row.iter().rposition(is_cell_populated) else {
                continue;
            };
            range = Some(SpecCellRange {
                row_first: 0,
                col_first: 0,
                row_last: row_idx,
                col_last: range.map_or(col_idx, |r| r.col_last.max(col_idx)),
            });
        }
        range
    }

    fn derive_xlsx_workbook(&self) -> ExportResult<Workbook> {
        let mut workbook = Workbook::new();
        let fmt_date = Format::new().set_num_format(&self.options.num_format_date);
        let fmt_datetime = Format::new().set_num_format(&self.options.num_format_datetime);

        let worksheet = workbook.add_worksheet();
        if let Some(title) = &self.title {
            worksheet.set_name(title)?;
        }

        for (row_idx, row) in self.rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                write_cell(
                    worksheet,
                    row_idx,
                    col_idx,
                    value,
                    &fmt_date,
                    &fmt_datetime,
                )?;
            }
        }

        if let Some(range) = self.autofilter {
            worksheet.autofilter(
                cast_row_num(range.row_first)?,
                cast_col_num(range.col_first)?,
                cast_row_num(range.row_last)?,
                cast_col_num(range.col_last)?,
            )?;
        }

        Ok(workbook)
    }
}

fn is_cell_populated(value: &EnumCellValue) -> bool {
    !matches!(value, EnumCellValue::String(val) if val.is_empty())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    fmt_date: &Format,
    fmt_datetime: &Format,
) -> ExportResult<()> {
    let row = cast_row_num(row_idx)?;
    let col = cast_col_num(col_idx)?;

    match value {
        EnumCellValue::Integer(val) => {
            worksheet.write_number(row, col, *val as f64)?;
        }
        EnumCellValue::Float(val) => {
            worksheet.write_number(row, col, *val)?;
        }
        EnumCellValue::Decimal(val) => match val.to_f64() {
            Some(n) => {
                worksheet.write_number(row, col, n)?;
            }
            None => {
                worksheet.write_string(row, col, val.to_string())?;
            }
        },
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean(row, col, *val)?;
        }
        // Dates outside 1900..=9999 have no serial number; store them as text.
        EnumCellValue::Date(val) => match derive_excel_date(val) {
            Some(datetime) => {
                worksheet.write_datetime_with_format(row, col, &datetime, fmt_date)?;
            }
            None => {
                worksheet.write_string(row, col, val.to_string())?;
            }
        },
        EnumCellValue::DateTime(val) => match derive_excel_datetime(val) {
            Some(datetime) => {
                worksheet.write_datetime_with_format(row, col, &datetime, fmt_datetime)?;
            }
            None => {
                worksheet.write_string(row, col, val.to_string())?;
            }
        },
        EnumCellValue::String(val) => {
            worksheet.write_string(row, col, val)?;
        }
    }
    Ok(())
}

/// `None` when the year is outside the format's date range.
fn derive_excel_date(date: &NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok()?;
    // Month and day always fit; chrono keeps them in 1..=12 / 1..=31.
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

fn derive_excel_datetime(datetime: &NaiveDateTime) -> Option<ExcelDateTime> {
    let time = datetime.time();
    let n_seconds = f64::from(time.second()) + f64::from(time.nanosecond()) / 1e9;
    derive_excel_date(&datetime.date())?
        .and_hms(time.hour() as u16, time.minute() as u8, n_seconds)
        .ok()
}

#[cfg(test)]
mod tests {
    use std::io;

    use std::io::{Cursor, Read};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::spec::ExportError;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn options_in(dir: &std::path::Path) -> SpecXlsxExportOptions {
        SpecXlsxExportOptions {
            dir_temp: Some(dir.to_path_buf()),
            ..SpecXlsxExportOptions::default()
        }
    }

    fn count_entries(dir: &std::path::Path) -> usize {
        fs::read_dir(dir).expect("read temp dir").count()
    }

    fn read_part(v_xlsx: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(v_xlsx)).expect("open xlsx zip");
        let mut part = archive.by_name(name).expect("part exists");
        let mut c_xml = String::new();
        part.read_to_string(&mut c_xml).expect("read part");
        c_xml
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_set_title_accepts_short_titles() {
        let mut book = ExportWorkBook::new();
        book.set_title("Invoices").expect("short title");
        assert_eq!(book.title(), Some("Invoices"));

        book.set_title(2024).expect("numeric title is text-coerced");
        assert_eq!(book.title(), Some("2024"));

        let c_title = "t".repeat(31);
        book.set_title(&c_title).expect("31 chars is the maximum");
        assert_eq!(book.title(), Some(c_title.as_str()));
    }

    #[test]
    fn test_set_title_rejects_32_chars_and_more() {
        let mut book = ExportWorkBook::new();
        book.set_title("Before").expect("short title");

        for n_len in [32, 33, 100] {
            let err = book.set_title("t".repeat(n_len)).expect_err("too long");
            match err {
                ExportError::TitleTooLong { len, .. } => assert_eq!(len, n_len),
                other => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(book.title(), Some("Before"));
    }

    #[test]
    fn test_fill_puts_headers_first_then_rows_in_order() {
        let mut book = ExportWorkBook::new();
        let headers = strings(&["A", "B"]);
        book.fill(
            vec![
                vec![EnumCellValue::Integer(1), EnumCellValue::Boolean(true)],
                vec![EnumCellValue::Integer(2), EnumCellValue::Boolean(false)],
            ],
            Some(headers.as_slice()),
        );

        assert_eq!(
            book.rows(),
            &[
                vec![EnumCellValue::from("A"), EnumCellValue::from("B")],
                vec![EnumCellValue::Integer(1), EnumCellValue::Boolean(true)],
                vec![EnumCellValue::Integer(2), EnumCellValue::Boolean(false)],
            ]
        );
    }

    #[test]
    fn test_fill_with_headers_sets_autofilter_over_used_range() {
        let mut book = ExportWorkBook::new();
        let headers = strings(&["A", "B", "C"]);
        book.fill(
            (0..4).map(|i| {
                vec![
                    EnumCellValue::Integer(i),
                    EnumCellValue::from("x"),
                    EnumCellValue::Float(0.5),
                ]
            }),
            Some(headers.as_slice()),
        );

        let range = book.autofilter().expect("autofilter set");
        assert_eq!(
            range,
            SpecCellRange {
                row_first: 0,
                col_first: 0,
                row_last: 4,
                col_last: 2,
            }
        );
        assert_eq!(range.to_a1(), "A1:C5");
    }

    #[test]
    fn test_fill_autofilter_widens_to_longest_row() {
        let mut book = ExportWorkBook::new();
        let headers = strings(&["A"]);
        book.fill(
            vec![vec![EnumCellValue::Integer(1), EnumCellValue::Integer(2)]],
            Some(headers.as_slice()),
        );
        assert_eq!(book.autofilter().map(|r| r.to_a1()), Some("A1:B2".to_string()));
    }

    #[test]
    fn test_fill_with_headers_and_no_rows_filters_header_only() {
        let mut book = ExportWorkBook::new();
        let headers = strings(&["A", "B"]);
        book.fill(Vec::new(), Some(headers.as_slice()));
        assert_eq!(book.rows().len(), 1);
        assert_eq!(book.autofilter().map(|r| r.to_a1()), Some("A1:B1".to_string()));
    }

    #[test]
    fn test_fill_autofilter_ignores_trailing_empty_rows() {
        let mut book = ExportWorkBook::new();
        let headers = strings(&["A", "B"]);
        book.fill(
            vec![
                vec![EnumCellValue::Integer(1), EnumCellValue::Integer(2)],
                vec![EnumCellValue::Integer(3), EnumCellValue::from("")],
                Vec::new(),
                vec![EnumCellValue::from(""), EnumCellValue::from("")],
            ],
            Some(headers.as_slice()),
        );
        assert_eq!(book.rows().len(), 5);
        assert_eq!(book.autofilter().map(|r| r.to_a1()), Some("A1:B3".to_string()));
    }

    #[test]
    fn test_fill_without_headers_has_no_autofilter() {
        let mut book = ExportWorkBook::new();
        book.fill(vec![vec![EnumCellValue::Integer(1)]], None);
        assert_eq!(book.rows(), &[vec![EnumCellValue::Integer(1)]]);
        assert_eq!(book.autofilter(), None);

        let mut book = ExportWorkBook::new();
        book.fill(vec![vec![EnumCellValue::Integer(1)]], Some(&[][..]));
        assert_eq!(book.rows().len(), 1);
        assert_eq!(book.autofilter(), None);
    }

    #[test]
    fn test_fill_respects_disabled_autofilter_option() {
        let mut book = ExportWorkBook::with_options(SpecXlsxExportOptions {
            if_autofilter: false,
            ..SpecXlsxExportOptions::default()
        });
        let headers = strings(&["A"]);
        book.fill(vec![vec![EnumCellValue::Integer(1)]], Some(headers.as_slice()));
        assert_eq!(book.rows().len(), 2);
        assert_eq!(book.autofilter(), None);
    }

    #[test]
    fn test_write_to_file_emits_zip_and_removes_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut book = ExportWorkBook::with_options(options_in(dir.path()));
        let headers = strings(&["When", "Amount"]);
        book.fill(
            vec![vec![
                EnumCellValue::DateTime(
                    NaiveDate::from_ymd_opt(2024, 3, 1)
                        .and_then(|d| d.and_hms_opt(12, 30, 15))
                        .expect("valid datetime"),
                ),
                EnumCellValue::Decimal("12.50".parse().expect("decimal")),
            ]],
            Some(headers.as_slice()),
        );
        book.set_title("Payments").expect("title");

        let mut v_out = Vec::new();
        let n_written = book.write_to_file(&mut v_out).expect("write");

        assert_eq!(n_written, v_out.len());
        assert!(v_out.starts_with(b"PK"), "xlsx payload is a zip archive");
        assert_eq!(count_entries(dir.path()), 0);
    }

    #[test]
    fn test_write_to_file_removes_temp_file_when_output_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut book = ExportWorkBook::with_options(options_in(dir.path()));
        book.fill(vec![vec![EnumCellValue::from("payload")]], None);

        let err = book
            .write_to_file(&mut FailingWriter)
            .expect_err("writer fails");
        assert!(matches!(err, ExportError::Io(_)));
        assert_eq!(count_entries(dir.path()), 0);
    }

    #[test]
    fn test_write_to_file_removes_temp_file_when_serialization_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut book = ExportWorkBook::with_options(options_in(dir.path()));
        // Longer than the 32767-character cell limit of the format.
        book.fill(vec![vec![EnumCellValue::String("x".repeat(40_000))]], None);

        let mut v_out = Vec::new();
        let err = book.write_to_file(&mut v_out).expect_err("cell too long");
        assert!(matches!(err, ExportError::Xlsx(_)));
        assert!(v_out.is_empty());
        assert_eq!(count_entries(dir.path()), 0);
    }

    #[test]
    fn test_write_to_file_fails_when_temp_dir_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let book = ExportWorkBook::with_options(options_in(&dir.path().join("missing")));

        let mut v_out = Vec::new();
        let err = book.write_to_file(&mut v_out).expect_err("no temp dir");
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn test_derive_excel_date_is_none_before_1900() {
        let date = NaiveDate::from_ymd_opt(1850, 1, 1).expect("valid date");
        assert!(derive_excel_date(&date).is_none());
        assert!(derive_excel_datetime(&date.and_hms_opt(8, 0, 0).expect("valid")).is_none());
    }

    #[test]
    fn test_write_to_file_stores_dates_before_1900_as_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut book = ExportWorkBook::with_options(options_in(dir.path()));
        let headers = strings(&["Born", "Seen"]);
        let date = NaiveDate::from_ymd_opt(1850, 1, 1).expect("valid date");
        book.fill(
            vec![vec![
                EnumCellValue::Date(date),
                EnumCellValue::DateTime(date.and_hms_opt(8, 30, 0).expect("valid datetime")),
            ]],
            Some(headers.as_slice()),
        );

        let mut v_out = Vec::new();
        book.write_to_file(&mut v_out)
            .expect("historical dates do not abort the export");

        let c_strings = read_part(&v_out, "xl/sharedStrings.xml");
        assert!(c_strings.contains("<t>1850-01-01</t>"), "{c_strings}");
        assert!(c_strings.contains("<t>1850-01-01 08:30:00</t>"), "{c_strings}");
        assert_eq!(count_entries(dir.path()), 0);
    }
}
