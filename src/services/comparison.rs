use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{PredictError, Result};
use crate::services::table::CsvTable;

pub const KEY_COLUMN: &str = "Irradiance";
pub const CALCULATED_SUFFIX: &str = "_calculated";
pub const DATASHEET_SUFFIX: &str = "_datasheet";

/// Electrical parameter a comparison chart is drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Parameter {
    Imax,
    Vmax,
    Pmax,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Imax => "Imax",
            Parameter::Vmax => "Vmax",
            Parameter::Pmax => "Pmax",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Imax => "A",
            Parameter::Vmax => "V",
            Parameter::Pmax => "W",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Imax" => Ok(Parameter::Imax),
            "Vmax" => Ok(Parameter::Vmax),
            "Pmax" => Ok(Parameter::Pmax),
            other => Err(PredictError::Validation(format!(
                "unknown parameter '{}', expected Imax, Vmax or Pmax",
                other
            ))),
        }
    }
}

/// One chart point: reference and calculated values at an irradiance.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeriesPoint {
    pub irradiance: Option<f64>,
    pub datasheet: Option<f64>,
    pub calculated: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ComparisonSeries {
    pub parameter: Parameter,
    pub unit: String,
    pub datasheet_column: String,
    pub calculated_column: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComparisonResponse {
    pub table: CsvTable,
    pub series: Option<ComparisonSeries>,
}

fn same_key(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a.trim() == b.trim(),
    }
}

/// Left join of `calculated` onto `reference` on the irradiance column.
///
/// Every calculated row appears exactly once, in order. Columns present on
/// both sides are suffixed `_calculated` / `_datasheet`; unmatched reference
/// rows are dropped and unmatched calculated rows get nulls.
pub fn merge(calculated: &CsvTable, reference: &CsvTable) -> Result<CsvTable> {
    let left_key = calculated.require(KEY_COLUMN)?;
    let right_key = reference.require(KEY_COLUMN)?;

    let right_cols: Vec<usize> = (0..reference.columns.len()).filter(|&i| i != right_key).collect();
    let collides = |name: &str| {
        name != KEY_COLUMN && calculated.columns.iter().any(|c| c == name) && reference.columns.iter().any(|c| c == name)
    };

    let mut columns: Vec<String> = calculated
        .columns
        .iter()
        .map(|c| if collides(c.as_str()) { format!("{}{}", c, CALCULATED_SUFFIX) } else { c.clone() })
        .collect();
    columns.extend(right_cols.iter().map(|&i| {
        let c = &reference.columns[i];
        if collides(c.as_str()) { format!("{}{}", c, DATASHEET_SUFFIX) } else { c.clone() }
    }));

    let rows = calculated
        .rows
        .iter()
        .map(|left| {
            let matched = left.get(left_key).cloned().flatten().and_then(|key| {
                reference
                    .rows
                    .iter()
                    .find(|right| right.get(right_key).cloned().flatten().is_some_and(|k| same_key(&key, &k)))
            });
            let mut row = left.clone();
            row.extend(right_cols.iter().map(|&i| matched.and_then(|r| r.get(i).cloned().flatten())));
            row
        })
        .collect();

    Ok(CsvTable { columns, rows })
}

/// Reference and calculated values of `parameter` against irradiance.
pub fn series(table: &CsvTable, parameter: Parameter) -> Result<ComparisonSeries> {
    let key = table.require(KEY_COLUMN)?;
    let calculated_column = format!("{}{}", parameter, CALCULATED_SUFFIX);
    let calculated = table.require(&calculated_column)?;

    let suffixed = format!("{}{}", parameter, DATASHEET_SUFFIX);
    let (datasheet_column, datasheet) = match table.column(&suffixed) {
        Some(i) => (suffixed, i),
        None => match table.column(parameter.name()) {
            Some(i) => (parameter.name().to_string(), i),
            None => return Err(PredictError::schema(suffixed)),
        },
    };

    let points = (0..table.rows.len())
        .map(|row| SeriesPoint {
            irradiance: table.number(row, key),
            datasheet: table.number(row, datasheet),
            calculated: table.number(row, calculated),
        })
        .collect();

    Ok(ComparisonSeries {
        parameter,
        unit: parameter.unit().to_string(),
        datasheet_column,
        calculated_column,
        points,
    })
}

/// Parse both uploads, merge them and optionally extract a chart series.
pub fn compare(reference_csv: &str, calculated_csv: &str, parameter: Option<Parameter>) -> Result<ComparisonResponse> {
    let reference = CsvTable::parse(reference_csv)?;
    let calculated = CsvTable::parse(calculated_csv)?;
    let table = merge(&calculated, &reference)?;
    let series = parameter.map(|p| series(&table, p)).transpose()?;
    log::info!(
        "[COMPARE] {} calculated row(s) against {} reference row(s)",
        calculated.rows.len(),
        reference.rows.len()
    );
    Ok(ComparisonResponse { table, series })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALCULATED: &str = "\
Module Type,Irradiance,Temperature,Imax_calculated,Vmax_calculated,Pmax_calculated
Mono,800,35,6.43,38.72,249
Mono,600,30,4.81,39.36,189
Mono,1000,25,8.0,40.0,320
";

    const REFERENCE: &str = "\
Irradiance,Temperature,Imax,Vmax,Pmax
1000,25,8.0,40.0,320
800,25,6.4,40.0,256
200,25,1.6,40.0,64
";

    #[test]
    fn test_left_join_keeps_calculated_rows_in_order() {
        let out = compare(REFERENCE, CALCULATED, None).unwrap();
        let t = out.table;
        assert_eq!(
            t.columns,
            vec![
                "Module Type", "Irradiance", "Temperature_calculated", "Imax_calculated",
                "Vmax_calculated", "Pmax_calculated", "Temperature_datasheet", "Imax", "Vmax", "Pmax",
            ]
        );
        assert_eq!(t.rows.len(), 3);
        let irr = t.column("Irradiance").unwrap();
        let imax = t.column("Imax").unwrap();
        assert_eq!(t.cell(0, irr), Some("800"));
        assert_eq!(t.cell(0, imax), Some("6.4"));
        // 600 W/m² has no reference row
        assert_eq!(t.cell(1, imax), None);
        assert_eq!(t.cell(1, t.column("Temperature_datasheet").unwrap()), None);
        assert_eq!(t.cell(2, imax), Some("8.0"));
    }

    #[test]
    fn test_keys_match_numerically() {
        let calculated = CsvTable::parse("Irradiance,Imax_calculated\n800.0,6.43\n").unwrap();
        let reference = CsvTable::parse("Irradiance,Imax\n800,6.4\n").unwrap();
        let t = merge(&calculated, &reference).unwrap();
        assert_eq!(t.cell(0, 2), Some("6.4"));
    }

    #[test]
    fn test_duplicate_reference_keys_do_not_duplicate_rows() {
        let calculated = CsvTable::parse("Irradiance,Imax_calculated\n800,6.43\n").unwrap();
        let reference = CsvTable::parse("Irradiance,Imax\n800,6.4\n800,6.5\n").unwrap();
        let t = merge(&calculated, &reference).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.cell(0, 2), Some("6.4"));
    }

    #[test]
    fn test_missing_irradiance_fails_without_partial_result() {
        let no_key = "Temperature,Imax\n25,8.0\n";
        match compare(no_key, CALCULATED, None) {
            Err(PredictError::Schema { column }) => assert_eq!(column, KEY_COLUMN),
            other => panic!("expected schema error, got {:?}", other.map(|r| r.table)),
        }
        assert!(matches!(compare(REFERENCE, no_key, None), Err(PredictError::Schema { .. })));
    }

    #[test]
    fn test_malformed_upload_is_a_parse_error() {
        let broken = "Irradiance,Imax\n800,6.4,extra\n";
        assert!(matches!(compare(broken, CALCULATED, None), Err(PredictError::Parse(_))));
    }

    #[test]
    fn test_series_uses_plain_reference_columns() {
        let out = compare(REFERENCE, CALCULATED, Some(Parameter::Pmax)).unwrap();
        let s = out.series.unwrap();
        assert_eq!(s.datasheet_column, "Pmax");
        assert_eq!(s.calculated_column, "Pmax_calculated");
        assert_eq!(s.unit, "W");
        assert_eq!(
            s.points[0],
            SeriesPoint { irradiance: Some(800.0), datasheet: Some(256.0), calculated: Some(249.0) }
        );
        assert_eq!(s.points[1].datasheet, None);
    }

    #[test]
    fn test_series_prefers_datasheet_suffix() {
        let reference = "Irradiance,Imax_datasheet\n1000,8.0\n";
        let out = compare(reference, CALCULATED, Some(Parameter::Imax)).unwrap();
        let s = out.series.unwrap();
        assert_eq!(s.datasheet_column, "Imax_datasheet");
        assert_eq!(s.points[2].datasheet, Some(8.0));
    }

    #[test]
    fn test_parameter_parsing() {
        assert_eq!("Vmax".parse::<Parameter>().unwrap(), Parameter::Vmax);
        assert!(matches!("Voc".parse::<Parameter>(), Err(PredictError::Validation(_))));
    }
}
