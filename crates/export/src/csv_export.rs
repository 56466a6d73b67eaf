use vaptrack_core::{DomainError, DomainResult};
use vaptrack_domain::Finding;

use crate::{COLUMNS, finding_rows};

/// Render findings as CSV: one header row, then one row per finding in the
/// order given (callers pass them id-descending). Standard CSV quoting only.
pub fn findings_to_csv(findings: &[Finding]) -> DomainResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(COLUMNS)
        .map_err(|e| DomainError::store(format!("csv write failed: {e}")))?;
    for row in finding_rows(findings) {
        writer
            .write_record(&row)
            .map_err(|e| DomainError::store(format!("csv write failed: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| DomainError::store(format!("csv flush failed: {e}")))
}
