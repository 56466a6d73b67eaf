use rust_xlsxwriter::Workbook;

use vaptrack_core::{DomainError, DomainResult};
use vaptrack_domain::Finding;

use crate::{COLUMNS, finding_rows};

const MIN_WIDTH: usize = 12;
const MAX_WIDTH: usize = 60;
const PADDING: usize = 2;

/// Column width heuristic: longest rendered string plus padding, clamped.
fn column_width(header: &str, rows: &[[String; 7]], col: usize) -> f64 {
    let longest = rows
        .iter()
        .map(|row| row[col].chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0);
    (longest + PADDING).clamp(MIN_WIDTH, MAX_WIDTH) as f64
}

/// Render findings as a single-sheet workbook named "Findings", with the
/// same columns and row order as the CSV export.
pub fn findings_to_xlsx(findings: &[Finding]) -> DomainResult<Vec<u8>> {
    let rows = finding_rows(findings);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Findings")
        .map_err(|e| DomainError::store(format!("xlsx sheet naming failed: {e}")))?;

    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| DomainError::store(format!("xlsx write failed: {e}")))?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            worksheet
                .write_string((row_idx + 1) as u32, col as u16, value)
                .map_err(|e| DomainError::store(format!("xlsx write failed: {e}")))?;
        }
    }

    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, column_width(header, &rows, col))
            .map_err(|e| DomainError::store(format!("xlsx column sizing failed: {e}")))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| DomainError::store(format!("xlsx render failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::finding;

    #[test]
    fn width_clamps_to_minimum_for_short_columns() {
        let rows = finding_rows(&[finding(1, "x", "Low")]);
        // "id" column: header 2 chars, value 1 char.
        assert_eq!(column_width("id", &rows, 0), 12.0);
    }

    #[test]
    fn width_tracks_longest_cell_with_padding() {
        let title = "A".repeat(30);
        let rows = finding_rows(&[finding(1, &title, "Low")]);
        assert_eq!(column_width("title", &rows, 2), 32.0);
    }

    #[test]
    fn width_clamps_to_maximum_for_long_columns() {
        let title = "A".repeat(200);
        let rows = finding_rows(&[finding(1, &title, "Low")]);
        assert_eq!(column_width("title", &rows, 2), 60.0);
    }

    #[test]
    fn renders_a_non_empty_workbook() {
        let bytes = findings_to_xlsx(&[finding(1, "SQLi on /login", "Critical")]).unwrap();
        // XLSX is a zip container.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn workbook_reads_back_to_the_shared_row_matrix() {
        use calamine::Reader;

        let findings = vec![
            finding(2, "XSS in search", "High"),
            finding(1, "SQLi on /login", "Critical"),
        ];
        let bytes = findings_to_xlsx(&findings).unwrap();

        let mut workbook =
            calamine::Xlsx::new(std::io::Cursor::new(bytes)).expect("workbook should open");
        let range = workbook
            .worksheet_range("Findings")
            .expect("sheet \"Findings\" should exist");

        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        assert_eq!(cells[0], COLUMNS.map(str::to_string).to_vec());
        let expected: Vec<Vec<String>> = finding_rows(&findings)
            .into_iter()
            .map(|row| row.to_vec())
            .collect();
        assert_eq!(&cells[1..], &expected[..]);
    }
}
