//! A1-style cell reference helpers
//!
//! All positions in this crate are 1-based, the way they appear in Excel
//! (row 1 is the first row, column 1 is `A`).

/// Largest column Excel accepts (`XFD`)
pub const MAX_COLUMN: u32 = 16_384;

/// Largest row Excel accepts
pub const MAX_ROW: u32 = 1_048_576;

/// Convert a 1-based column number to its Excel letters
///
/// Examples:
/// - 1 → A
/// - 26 → Z
/// - 27 → AA
/// - 34 → AH
pub fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col.max(1);

    while n > 0 {
        let remainder = (n - 1) % 26;
        result.insert(0, char::from(b'A' + remainder as u8));
        n = (n - 1) / 26;
    }

    result
}

/// Convert Excel column letters back to a 1-based column number
///
/// Returns `None` for anything that is not a run of ASCII letters.
pub fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }

    let mut n: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(c.to_ascii_uppercase() as u8 - b'A' + 1);
        n = n.checked_mul(26)?.checked_add(digit)?;
    }

    (n <= MAX_COLUMN).then_some(n)
}

/// Relative A1 name of a cell (`J3`)
pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", column_letter(col), row)
}

/// Quote a sheet name for use in a formula when Excel requires it
///
/// `Dashboard` stays bare, `Realisasi Desember` becomes `'Realisasi Desember'`.
pub fn sheet_prefix(sheet: &str) -> String {
    let bare = !sheet.is_empty()
        && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !sheet.starts_with(|c: char| c.is_ascii_digit());

    if bare {
        format!("{}!", sheet)
    } else {
        format!("'{}'!", sheet.replace('\'', "''"))
    }
}

/// Absolute whole-column reference on another sheet (`'Data Pelanggan'!$AO:$AO`)
pub fn whole_column(sheet: &str, col: u32) -> String {
    let letter = column_letter(col);
    format!("{}${}:${}", sheet_prefix(sheet), letter, letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(28), "AB");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_dashboard_template_columns() {
        assert_eq!(column_letter(10), "J");
        assert_eq!(column_letter(21), "U");
        assert_eq!(column_letter(22), "V");
        assert_eq!(column_letter(23), "W");
        assert_eq!(column_letter(34), "AH");
        assert_eq!(column_letter(41), "AO");
        assert_eq!(column_letter(51), "AY");
        assert_eq!(column_letter(63), "BK");
    }

    #[test]
    fn test_column_number() {
        assert_eq!(column_number("A"), Some(1));
        assert_eq!(column_number("z"), Some(26));
        assert_eq!(column_number("AH"), Some(34));
        assert_eq!(column_number("XFD"), Some(MAX_COLUMN));
        assert_eq!(column_number("XFE"), None);
        assert_eq!(column_number(""), None);
        assert_eq!(column_number("A1"), None);
    }

    #[test]
    fn test_sheet_prefix() {
        assert_eq!(sheet_prefix("Dashboard"), "Dashboard!");
        assert_eq!(sheet_prefix("Realisasi Desember"), "'Realisasi Desember'!");
        assert_eq!(sheet_prefix("O'Brien"), "'O''Brien'!");
        assert_eq!(
            whole_column("Data Pelanggan", 41),
            "'Data Pelanggan'!$AO:$AO"
        );
    }
}
