//! Shared export models: values, columns, ranges, options and errors.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::conf::{C_NUM_FORMAT_DATE, C_NUM_FORMAT_DATETIME, C_TEMP_PREFIX};
use crate::util::derive_column_letters;

////////////////////////////////////////////////////////////////////////////////
// #region ValueSpecification

/// Deferred text whose content is only produced on demand (translations etc.).
pub trait LazyText {
    /// Force evaluation.
    fn to_text(&self) -> String;
}

impl<F> LazyText for F
where
    F: Fn() -> String,
{
    fn to_text(&self) -> String {
        self()
    }
}

/// Raw value handed over by the host framework for one field of one entry.
#[derive(Clone)]
pub enum EnumFieldValue {
    /// Deferred text, evaluated at normalization time.
    Lazy(Arc<dyn LazyText + Send + Sync>),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Fixed-point decimal value.
    Decimal(Decimal),
    /// Boolean value.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Date with time of day.
    DateTime(NaiveDateTime),
    /// Time of day without date.
    Time(NaiveTime),
    /// Plain text.
    String(String),
    /// Missing value.
    Null,
    /// Any other host object, known only through its textual form.
    Object(Arc<dyn fmt::Display + Send + Sync>),
}

impl EnumFieldValue {
    /// Wrap a closure producing text on demand.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(f))
    }

    /// Wrap an arbitrary displayable object.
    pub fn object<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self::Object(Arc::new(value))
    }
}

impl fmt::Debug for EnumFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lazy(_) => f.write_str("Lazy(..)"),
            Self::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            Self::Boolean(v) => f.debug_tuple("Boolean").field(v).finish(),
            Self::Date(v) => f.debug_tuple("Date").field(v).finish(),
            Self::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            Self::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Null => f.write_str("Null"),
            Self::Object(v) => f.debug_tuple("Object").field(&v.to_string()).finish(),
        }
    }
}

impl From<i64> for EnumFieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for EnumFieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for EnumFieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for EnumFieldValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for EnumFieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDate> for EnumFieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for EnumFieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveTime> for EnumFieldValue {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<&str> for EnumFieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumFieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T> From<Option<T>> for EnumFieldValue
where
    T: Into<EnumFieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Spreadsheet-safe cell value stored in the export sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Integer number.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Fixed-point decimal number.
    Decimal(Decimal),
    /// Boolean.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Date with time of day.
    DateTime(NaiveDateTime),
    /// Text.
    String(String),
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetSpecification

/// One exported column: field name on the entry, display title in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumn {
    /// Field name used to look up values.
    pub name: String,
    /// Human-readable header title.
    pub title: String,
}

impl SpecColumn {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }
}

/// Inclusive, zero-based cell rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecCellRange {
    /// First row index.
    pub row_first: usize,
    /// First column index.
    pub col_first: usize,
    /// Last row index (inclusive).
    pub row_last: usize,
    /// Last column index (inclusive).
    pub col_last: usize,
}

impl SpecCellRange {
    /// Render as an A1-style reference, e.g. `A1:C10`.
    pub fn to_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            derive_column_letters(self.col_first),
            self.row_first + 1,
            derive_column_letters(self.col_last),
            self.row_last + 1
        )
    }
}

impl fmt::Display for SpecCellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Workbook-wide options for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxExportOptions {
    /// Directory for the temporary serialization file; system default when `None`.
    pub dir_temp: Option<PathBuf>,
    /// Prefix of the temporary file name.
    pub temp_prefix: String,
    /// Apply an auto-filter over the used range when headers are present.
    pub if_autofilter: bool,
    /// Number format for date cells.
    pub num_format_date: String,
    /// Number format for datetime cells.
    pub num_format_datetime: String,
}

impl Default for SpecXlsxExportOptions {
    fn default() -> Self {
        Self {
            dir_temp: None,
            temp_prefix: C_TEMP_PREFIX.to_string(),
            if_autofilter: true,
            num_format_date: C_NUM_FORMAT_DATE.to_string(),
            num_format_datetime: C_NUM_FORMAT_DATETIME.to_string(),
        }
    }
}

/// In-memory export result, the shape a web response is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExportResponse {
    /// MIME type of `body`.
    pub content_type: String,
    /// `Content-Disposition` header value.
    pub content_disposition: String,
    /// Serialized file bytes.
    pub body: Vec<u8>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Result type for export operations.
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Errors raised while building or serializing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Sheet title reaches the format's length limit.
    #[error("An excel sheet title must be shorter than 32 chars (got {len}): {title:?}")]
    TitleTooLong {
        /// Offending title.
        title: String,
        /// Its length in characters.
        len: usize,
    },

    /// Sheet title rejected by the format for another reason.
    #[error("Invalid sheet title: {0}")]
    InvalidTitle(String),

    /// Row or column index outside the worksheet grid.
    #[error("Index overflow: {0}")]
    IndexOverflow(String),

    /// Workbook serialization error.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// IO error on the temporary file or the output writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
