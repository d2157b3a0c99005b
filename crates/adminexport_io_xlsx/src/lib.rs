//! `adminexport_io_xlsx` v1:
//! XLSX format adapter for the admin export framework.
//!
//! Modules:
//! - `conf`     : constants and default presets
//! - `spec`     : values/columns/options/errors
//! - `util`     : pure helper functions
//! - `writer`   : single-sheet workbook and temp-file serialization
//! - `exporter` : exporter contract, host source contract, XLSX exporter
pub mod conf;
pub mod exporter;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_CONTENT_TYPE_XLSX, C_EXTENSION_XLSX, N_LEN_EXCEL_SHEET_TITLE_LIMIT, TUP_EXCEL_ILLEGAL,
};
pub use exporter::{ExportSource, Exporter, TypeRowIter, XlsxExporter, normalize_xlsx_value};
pub use spec::{
    EnumCellValue, EnumFieldValue, ExportError, ExportResult, LazyText, SpecCellRange,
    SpecColumn, SpecExportResponse, SpecXlsxExportOptions,
};
pub use util::{sanitize_sheet_title, slugify, truncate_chars, validate_sheet_title};
pub use writer::ExportWorkBook;
