//! Exporter contract and the XLSX exporter.
//!
//! An [`ExportSource`] is the host framework's side: it knows the model's
//! display names, its columns and how to pull one row of raw field values per
//! entry. An [`Exporter`] turns that into a file of one particular format.

use std::io::Write;

use chrono::{Local, NaiveDate};

use crate::conf::{C_CONTENT_TYPE_XLSX, C_EXTENSION_XLSX};
use crate::spec::{
    EnumCellValue, EnumFieldValue, ExportResult, SpecColumn, SpecExportResponse,
    SpecXlsxExportOptions,
};
use crate::util::{sanitize_sheet_title, slugify};
use crate::writer::ExportWorkBook;

/// Boxed row iterator borrowed from a source or an exporter.
pub type TypeRowIter<'a, T> = Box<dyn Iterator<Item = Vec<T>> + 'a>;

/// Host-side provider of the exported table.
pub trait ExportSource {
    /// Singular display name of the exported objects.
    fn title(&self) -> String;

    /// Plural display name, used for download filenames.
    fn title_plural(&self) -> String {
        self.title()
    }

    /// Columns selected for export, in order.
    fn columns(&self) -> Vec<SpecColumn>;

    /// One row of raw values per exported entry, in `columns` order.
    fn rows<'a>(&'a self, columns: &'a [SpecColumn]) -> TypeRowIter<'a, EnumFieldValue>;
}

/// A file format the host framework can export to.
pub trait Exporter {
    /// MIME type of the produced file.
    const CONTENT_TYPE: &'static str = "application/octet-stream";
    /// Extension of the produced file.
    const EXTENSION: &'static str = "dat";
    /// Human-readable file kind; the extension is used when empty.
    const READABLE_FILE_KIND: &'static str = "";

    type Source: ExportSource;

    fn source(&self) -> &Self::Source;

    /// Convert one raw field value into a value the format can store.
    fn normalize_value(&self, value: EnumFieldValue) -> EnumCellValue;

    /// Write the table for `columns` into `f`.
    fn fill_file(&self, f: &mut dyn Write, columns: &[SpecColumn]) -> ExportResult<()>;

    /// Menu label for this exporter.
    fn description() -> String {
        let c_kind = if Self::READABLE_FILE_KIND.is_empty() {
            Self::EXTENSION
        } else {
            Self::READABLE_FILE_KIND
        };
        format!("Export selected objects as a {c_kind} file")
    }

    /// Lowercased type name without module path or generics.
    fn name() -> String
    where
        Self: Sized,
    {
        let c_type_name = std::any::type_name::<Self>();
        let c_base = c_type_name.split('<').next().unwrap_or(c_type_name);
        c_base
            .rsplit("::")
            .next()
            .unwrap_or(c_base)
            .to_lowercase()
    }

    fn make_title(&self) -> String {
        self.source().title()
    }

    /// `{slug}_{YYYY-MM-DD}.{extension}` for the given export date.
    fn make_filename_on(&self, date: NaiveDate) -> String {
        format!(
            "{}_{}.{}",
            slugify(&self.source().title_plural()),
            date,
            Self::EXTENSION
        )
    }

    fn make_filename(&self) -> String {
        self.make_filename_on(Local::now().date_naive())
    }

    fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.make_filename())
    }

    /// Source rows with every value passed through [`Self::normalize_value`].
    fn rows<'a>(&'a self, columns: &'a [SpecColumn]) -> TypeRowIter<'a, EnumCellValue> {
        Box::new(self.source().rows(columns).map(move |row| {
            row.into_iter()
                .map(|value| self.normalize_value(value))
                .collect::<Vec<_>>()
        }))
    }

    /// Export the source's own column selection into `f`.
    fn export_to_file(&self, f: &mut dyn Write) -> ExportResult<()> {
        let columns = self.source().columns();
        self.fill_file(f, &columns)
    }

    /// Export into memory, with the headers a download response needs.
    fn export_to_response(&self) -> ExportResult<SpecExportResponse> {
        let mut v_body = Vec::new();
        self.export_to_file(&mut v_body)?;
        Ok(SpecExportResponse {
            content_type: Self::CONTENT_TYPE.to_string(),
            content_disposition: self.content_disposition(),
            body: v_body,
        })
    }
}

/// Map a raw field value onto a spreadsheet cell value.
///
/// Lazy text is evaluated, numbers, booleans, dates and datetimes are kept as
/// they are, anything else becomes its text form. Never fails.
pub fn normalize_xlsx_value(value: EnumFieldValue) -> EnumCellValue {
    match value {
        EnumFieldValue::Lazy(text) => EnumCellValue::String(text.to_text()),
        EnumFieldValue::Integer(val) => EnumCellValue::Integer(val),
        EnumFieldValue::Float(val) => EnumCellValue::Float(val),
        EnumFieldValue::Decimal(val) => EnumCellValue::Decimal(val),
        EnumFieldValue::Boolean(val) => EnumCellValue::Boolean(val),
        EnumFieldValue::Date(val) => EnumCellValue::Date(val),
        EnumFieldValue::DateTime(val) => EnumCellValue::DateTime(val),
        EnumFieldValue::String(val) => EnumCellValue::String(val),
        EnumFieldValue::Time(val) => EnumCellValue::String(val.to_string()),
        EnumFieldValue::Null => EnumCellValue::String(String::new()),
        EnumFieldValue::Object(val) => EnumCellValue::String(val.to_string()),
    }
}

/// Spreadsheet exporter: one sheet titled after the source, one column per
/// selected field, auto-filter on the header row.
#[derive(Debug, Clone)]
pub struct XlsxExporter<S> {
    source: S,
    options: SpecXlsxExportOptions,
}

impl<S> XlsxExporter<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, SpecXlsxExportOptions::default())
    }

    pub fn with_options(source: S, options: SpecXlsxExportOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &SpecXlsxExportOptions {
        &self.options
    }
}

impl<S: ExportSource> Exporter for XlsxExporter<S> {
    const CONTENT_TYPE: &'static str = C_CONTENT_TYPE_XLSX;
    const EXTENSION: &'static str = C_EXTENSION_XLSX;

    type Source = S;

    fn source(&self) -> &S {
        &self.source
    }

    fn normalize_value(&self, value: EnumFieldValue) -> EnumCellValue {
        normalize_xlsx_value(value)
    }

    fn fill_file(&self, f: &mut dyn Write, columns: &[SpecColumn]) -> ExportResult<()> {
        let c_title = sanitize_sheet_title(&self.make_title());
        let l_headers: Vec<String> = columns.iter().map(|col| col.title.clone()).collect();

        let mut book = ExportWorkBook::with_options(self.options.clone());
        book.fill(self.rows(columns), Some(l_headers.as_slice()));
        book.set_title(&c_title)?;

        let n_bytes = book.write_to_file(f)?;
        log::debug!(
            "exported {} columns as {:?} ({n_bytes} bytes)",
            columns.len(),
            c_title
        );
        Ok(())
    }
}
