use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{PredictError, Result};

/// Loosely-typed CSV table: named columns, text cells, `None` for a null cell.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CsvTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(PredictError::Parse("the CSV file is empty".to_string()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|cell| if cell.is_empty() { None } else { Some(cell.to_string()) })
                    .collect(),
            );
        }
        Ok(Self { columns, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of `name`, or a schema error naming it.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| PredictError::schema(name))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn number(&self, row: usize, column: usize) -> Option<f64> {
        self.cell(row, column)?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cells_become_null() {
        let t = CsvTable::parse("Irradiance,Imax\n800,\n1000,8.0\n").unwrap();
        assert_eq!(t.columns, vec!["Irradiance", "Imax"]);
        assert_eq!(t.cell(0, 1), None);
        assert_eq!(t.number(1, 1), Some(8.0));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = CsvTable::parse("a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, PredictError::Parse(_)));
    }

    #[test]
    fn test_blank_input_is_rejected() {
        assert!(matches!(CsvTable::parse("  \n"), Err(PredictError::Parse(_))));
    }

    #[test]
    fn test_require_names_the_column() {
        let t = CsvTable::parse("a\n1\n").unwrap();
        match t.require("Irradiance") {
            Err(PredictError::Schema { column }) => assert_eq!(column, "Irradiance"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
