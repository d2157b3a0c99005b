//! Stateless helper utilities used by the workbook and the exporter.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization as _;

use crate::conf::{N_LEN_EXCEL_SHEET_TITLE_LIMIT, TUP_EXCEL_ILLEGAL};
use crate::spec::{ExportError, ExportResult};

static RE_SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static slug pattern"));
static RE_SLUG_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("static slug pattern"));

////////////////////////////////////////////////////////////////////////////////
// #region TitleUtils

/// Keep at most `n_chars_max` characters of `text`.
pub fn truncate_chars(text: &str, n_chars_max: usize) -> String {
    text.chars().take(n_chars_max).collect()
}

/// Fit a derived title into the sheet-title limit.
///
/// Truncates to the longest accepted length, then trims the apostrophes and
/// whitespace the cut may have exposed at either end.
pub fn sanitize_sheet_title(title: &str) -> String {
    let c_title = truncate_chars(title, N_LEN_EXCEL_SHEET_TITLE_LIMIT - 1);
    c_title
        .trim_matches(|c: char| c == '\'' || c.is_whitespace())
        .to_string()
}

/// Check a sheet title against the format's naming rules.
pub fn validate_sheet_title(title: &str) -> ExportResult<()> {
    let n_len = title.chars().count();
    if n_len >= N_LEN_EXCEL_SHEET_TITLE_LIMIT {
        return Err(ExportError::TitleTooLong {
            title: title.to_string(),
            len: n_len,
        });
    }
    if title.trim().is_empty() {
        return Err(ExportError::InvalidTitle(
            "sheet title cannot be blank".to_string(),
        ));
    }
    if let Some(c_illegal) = title.chars().find(|c| TUP_EXCEL_ILLEGAL.contains(c)) {
        return Err(ExportError::InvalidTitle(format!(
            "sheet title {title:?} contains illegal character {c_illegal:?}"
        )));
    }
    if title.starts_with('\'') || title.ends_with('\'') {
        return Err(ExportError::InvalidTitle(format!(
            "sheet title {title:?} cannot start or end with an apostrophe"
        )));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FilenameUtils

/// ASCII-fold, lowercase, drop non-word characters, join words with `-`.
pub fn slugify(value: &str) -> String {
    let c_ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let c_lower = c_ascii.to_lowercase();
    let c_stripped = RE_SLUG_STRIP.replace_all(&c_lower, "");
    RE_SLUG_DASH
        .replace_all(c_stripped.trim(), "-")
        .into_owned()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddressing

/// Zero-based column index to spreadsheet letters (`0 -> A`, `26 -> AA`).
pub fn derive_column_letters(col_idx: usize) -> String {
    let mut v_letters = Vec::new();
    let mut n_rest = col_idx + 1;
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        v_letters.push(char::from(b'A' + n_rem as u8));
        n_rest = (n_rest - 1) / 26;
    }
    v_letters.iter().rev().collect()
}

pub fn cast_row_num(value: usize) -> ExportResult<u32> {
    u32::try_from(value).map_err(|_| ExportError::IndexOverflow(format!("row index {value}")))
}

pub fn cast_col_num(value: usize) -> ExportResult<u16> {
    u16::try_from(value).map_err(|_| ExportError::IndexOverflow(format!("column index {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
