use crate::errors::{PredictError, Result};
use crate::services::table::CsvTable;

/// Columns a results table must carry, checked in this order.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "Irradiance",
    "Temperature",
    "Pmax_calculated",
    "Imax_calculated",
    "Vmax_calculated",
];

const WHOLE_NUMBER_COLUMNS: [&str; 3] = ["Irradiance", "Temperature", "Pmax_calculated"];
const TWO_DECIMAL_COLUMNS: [&str; 2] = ["Imax_calculated", "Vmax_calculated"];

fn reformat(table: &mut CsvTable, column: usize, decimals: usize) -> Result<()> {
    let name = table.columns[column].clone();
    for row in table.rows.iter_mut() {
        if let Some(Some(cell)) = row.get_mut(column) {
            let value: f64 = cell.parse().map_err(|_| {
                PredictError::Parse(format!("column '{}' holds a non-numeric value '{}'", name, cell))
            })?;
            *cell = format!("{:.*}", decimals, value);
        }
    }
    Ok(())
}

/// Validate a history CSV and format it for display. The input text is not
/// modified; only the returned table carries the rounded strings.
pub fn format_results(csv_text: &str) -> Result<CsvTable> {
    let mut table = CsvTable::parse(csv_text)?;
    for column in REQUIRED_COLUMNS {
        table.require(column)?;
    }
    for column in WHOLE_NUMBER_COLUMNS {
        let idx = table.require(column)?;
        reformat(&mut table, idx, 0)?;
    }
    for column in TWO_DECIMAL_COLUMNS {
        let idx = table.require(column)?;
        reformat(&mut table, idx, 2)?;
    }
    Ok(table)
}
