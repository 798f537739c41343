//! Grid writer for failure report artifacts

use super::SheetError;

/// Accumulates a rectangular grid of cells and renders it as csv bytes.
#[derive(Default)]
pub struct ReportWriter {
    rows: Vec<Vec<String>>,
}

impl ReportWriter {
    /// Create a blank report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to the grid.
    pub fn write_grid(&mut self, rows: impl IntoIterator<Item = Vec<String>>) {
        self.rows.extend(rows);
    }

    /// Render the grid to csv bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>, SheetError> {
        let mut buffer = Vec::new();

        {
            let mut writer = csv::Writer::from_writer(&mut buffer);
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        Ok(buffer)
    }
}
