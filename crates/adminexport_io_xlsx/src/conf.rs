//! XLSX export constants and defaults.

/// Exclusive upper bound on sheet title length (in characters).
pub const N_LEN_EXCEL_SHEET_TITLE_LIMIT: usize = 32;
/// Characters not allowed in sheet titles.
pub const TUP_EXCEL_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// MIME type announced to the host framework.
pub const C_CONTENT_TYPE_XLSX: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// File extension announced to the host framework.
pub const C_EXTENSION_XLSX: &str = "xlsx";

/// Prefix of the temporary serialization file.
pub const C_TEMP_PREFIX: &str = "adminexport_";
/// Suffix of the temporary serialization file.
pub const C_TEMP_SUFFIX: &str = ".xlsx";

/// Number format applied to date cells.
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd";
/// Number format applied to datetime cells.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd h:mm:ss";
