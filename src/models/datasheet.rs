use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{PredictError, Result};

// ─── Module technology ───────────────────────────────────────────────────────

pub const UNSPECIFIED_MODULE_TYPE: &str = "Unspecified";

/// Photovoltaic technology of the module. Uploaded CSVs may carry any label
/// (possibly already translated), which is kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModuleType {
    Monocrystalline,
    Polycrystalline,
    CadmiumTelluride,
    Cigs,
    Perovskite,
    Other(String),
}

impl ModuleType {
    pub const KNOWN: [ModuleType; 5] = [
        ModuleType::Monocrystalline,
        ModuleType::Polycrystalline,
        ModuleType::CadmiumTelluride,
        ModuleType::Cigs,
        ModuleType::Perovskite,
    ];

    pub fn label(&self) -> &str {
        match self {
            ModuleType::Monocrystalline => "Monocrystalline (m-Si)",
            ModuleType::Polycrystalline => "Polycrystalline (p-Si)",
            ModuleType::CadmiumTelluride => "Cadmium Telluride (CdTe)",
            ModuleType::Cigs => "Copper Indium Gallium Selenide (CIGS)",
            ModuleType::Perovskite => "Perovskite",
            ModuleType::Other(label) => label,
        }
    }

    /// Label given to uploads that carry no `module_type` column.
    pub fn unspecified() -> Self {
        ModuleType::Other(UNSPECIFIED_MODULE_TYPE.to_string())
    }

    /// Key of the built-in label table entry for this technology.
    pub fn label_key(&self) -> Option<&'static str> {
        match self {
            ModuleType::Monocrystalline => Some("module_monocrystalline"),
            ModuleType::Polycrystalline => Some("module_polycrystalline"),
            ModuleType::CadmiumTelluride => Some("module_cdte"),
            ModuleType::Cigs => Some("module_cigs"),
            ModuleType::Perovskite => Some("module_perovskite"),
            ModuleType::Other(_) => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label().trim().is_empty()
    }
}

impl From<String> for ModuleType {
    fn from(s: String) -> Self {
        ModuleType::KNOWN
            .iter()
            .find(|m| m.label() == s.trim())
            .cloned()
            .unwrap_or(ModuleType::Other(s))
    }
}

impl From<ModuleType> for String {
    fn from(m: ModuleType) -> Self {
        m.label().to_string()
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A selectable technology: the stored label and the name shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ModuleTypeOption {
    pub value: String,
    pub label: String,
}

// ─── Datasheet record ────────────────────────────────────────────────────────

/// Nameplate values of one module at STC.
/// Numeric fields are optional because a record can come from an uploaded CSV
/// missing some columns; the adjustment engine reports what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DatasheetRecord {
    #[schema(value_type = String, example = "Monocrystalline (m-Si)")]
    pub module_type: ModuleType,
    /// Rated maximum power (W)
    pub power_rated: Option<f64>,
    /// Vmp at STC (V)
    pub voltage_max_rated: Option<f64>,
    /// Imp at STC (A)
    pub current_max_rated: Option<f64>,
    /// Voc at STC (V)
    pub voltage_open_circuit: Option<f64>,
    /// Isc at STC (A)
    pub current_short_circuit: Option<f64>,
    /// α, short-circuit current temperature coefficient
    pub alpha: Option<f64>,
    /// β, open-circuit voltage temperature coefficient (usually negative)
    pub beta: Option<f64>,
    /// γ, power temperature coefficient (usually negative)
    pub gamma: Option<f64>,
    /// μ, annual degradation as a fraction
    pub mu: Option<f64>,
    /// Nominal operating cell temperature (°C)
    pub noct: Option<f64>,
    pub cell_count: Option<u32>,
    pub diode_ideality_factor: Option<f64>,
}

/// STC irradiance written alongside an exported record.
pub const STC_IRRADIANCE: f64 = 1000.0;
/// STC cell temperature written alongside an exported record.
pub const STC_TEMPERATURE: f64 = 25.0;

pub const EXPORT_HEADER: [&str; 15] = [
    "module_type",
    "Pmax_datasheet",
    "Vmax_datasheet",
    "Imax_datasheet",
    "voc_datasheet",
    "isc_datasheet",
    "alpha",
    "beta",
    "gamma",
    "mu",
    "noct",
    "cells",
    "diode_factor",
    "Irradiance",
    "Temperature",
];

const ISC_COLUMNS: [&str; 3] = ["current_short", "current_short_datasheet", "isc_datasheet"];
const VOC_COLUMNS: [&str; 3] = ["voltage_open", "voltage_open_datasheet", "voc_datasheet"];
const IMAX_COLUMNS: [&str; 3] = ["current_max", "current_max_datasheet", "Imax_datasheet"];
const VMAX_COLUMNS: [&str; 3] = ["voltage_max", "voltage_max_datasheet", "Vmax_datasheet"];
const PMAX_COLUMNS: [&str; 2] = ["Pmax_datasheet", "power"];

fn column_cell<'a>(headers: &csv::StringRecord, row: &'a csv::StringRecord, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h == *name)
            .and_then(|idx| row.get(idx))
            .filter(|v| !v.is_empty())
    })
}

fn column_number(headers: &csv::StringRecord, row: &csv::StringRecord, names: &[&str]) -> Result<Option<f64>> {
    match column_cell(headers, row, names) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| PredictError::Parse(format!("column '{}' holds a non-numeric value '{}'", names[0], raw))),
    }
}

impl DatasheetRecord {
    pub fn new(module_type: ModuleType) -> Self {
        Self {
            module_type,
            power_rated: None,
            voltage_max_rated: None,
            current_max_rated: None,
            voltage_open_circuit: None,
            current_short_circuit: None,
            alpha: None,
            beta: None,
            gamma: None,
            mu: None,
            noct: None,
            cell_count: None,
            diode_ideality_factor: None,
        }
    }

    /// Reject values a datasheet form would never accept.
    /// Only β and γ may be negative.
    pub fn validate(&self) -> Result<()> {
        if self.module_type.is_blank() {
            return Err(PredictError::Validation("module type must not be empty".to_string()));
        }

        let non_negative = [
            ("power_rated", self.power_rated),
            ("voltage_max_rated", self.voltage_max_rated),
            ("current_max_rated", self.current_max_rated),
            ("voltage_open_circuit", self.voltage_open_circuit),
            ("current_short_circuit", self.current_short_circuit),
            ("alpha", self.alpha),
            ("mu", self.mu),
            ("noct", self.noct),
            ("diode_ideality_factor", self.diode_ideality_factor),
        ];
        for (name, value) in non_negative {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(PredictError::Validation(format!("{} must be a non-negative number, got {}", name, v)));
                }
            }
        }
        for (name, value) in [("beta", self.beta), ("gamma", self.gamma)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(PredictError::Validation(format!("{} must be a finite number", name)));
                }
            }
        }
        Ok(())
    }

    /// Parse the first data row of an uploaded datasheet CSV.
    /// Without a `module_type` column the record is labelled "Unspecified".
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let row = match reader.records().next() {
            Some(row) => row?,
            None => return Err(PredictError::Parse("the datasheet CSV has no data row".to_string())),
        };

        let cell = |names: &[&str]| column_cell(&headers, &row, names);
        let number = |names: &[&str]| column_number(&headers, &row, names);

        let module_type = cell(&["module_type"][..])
            .map(|s| ModuleType::from(s.to_string()))
            .unwrap_or_else(ModuleType::unspecified);

        let cell_count = match number(&["cells"][..])? {
            Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => Some(v as u32),
            Some(v) => {
                return Err(PredictError::Parse(format!(
                    "column 'cells' must hold a whole number between 0 and {}, got {}",
                    u32::MAX,
                    v
                )));
            }
            None => None,
        };

        Ok(Self {
            module_type,
            power_rated: number(&PMAX_COLUMNS[..])?,
            voltage_max_rated: number(&VMAX_COLUMNS[..])?,
            current_max_rated: number(&IMAX_COLUMNS[..])?,
            voltage_open_circuit: number(&VOC_COLUMNS[..])?,
            current_short_circuit: number(&ISC_COLUMNS[..])?,
            alpha: number(&["alpha"][..])?,
            beta: number(&["beta"][..])?,
            gamma: number(&["gamma"][..])?,
            mu: number(&["mu"][..])?,
            noct: number(&["noct"][..])?,
            cell_count,
            diode_ideality_factor: number(&["diode_factor"][..])?,
        })
    }

    /// Single-row CSV with the record at STC; absent values are empty cells.
    pub fn to_csv(&self) -> Result<String> {
        let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(EXPORT_HEADER)?;
        writer.write_record([
            self.module_type.label().to_string(),
            opt(self.power_rated),
            opt(self.voltage_max_rated),
            opt(self.current_max_rated),
            opt(self.voltage_open_circuit),
            opt(self.current_short_circuit),
            opt(self.alpha),
            opt(self.beta),
            opt(self.gamma),
            opt(self.mu),
            opt(self.noct),
            self.cell_count.map(|c| c.to_string()).unwrap_or_default(),
            opt(self.diode_ideality_factor),
            STC_IRRADIANCE.to_string(),
            STC_TEMPERATURE.to_string(),
        ])?;
        let bytes = writer.into_inner().map_err(|e| PredictError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| PredictError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DatasheetRecord {
        DatasheetRecord {
            power_rated: Some(320.0),
            voltage_max_rated: Some(40.0),
            current_max_rated: Some(8.0),
            voltage_open_circuit: Some(48.5),
            current_short_circuit: Some(8.6),
            alpha: Some(0.0004),
            beta: Some(-0.0032),
            gamma: Some(-0.004),
            mu: Some(0.005),
            noct: Some(45.0),
            cell_count: Some(72),
            diode_ideality_factor: Some(1.3),
            ..DatasheetRecord::new(ModuleType::Monocrystalline)
        }
    }

    #[test]
    fn test_known_labels_map_back_to_variants() {
        assert_eq!(ModuleType::from("Perovskite".to_string()), ModuleType::Perovskite);
        assert_eq!(
            ModuleType::from("Monocristalino (m-Si)".to_string()),
            ModuleType::Other("Monocristalino (m-Si)".to_string())
        );
    }

    #[test]
    fn test_export_then_upload_keeps_the_record() {
        let record = sample();
        let csv_text = record.to_csv().unwrap();
        assert!(csv_text.starts_with("module_type,Pmax_datasheet,Vmax_datasheet"));
        assert!(csv_text.contains(",1000,25"));
        assert_eq!(DatasheetRecord::from_csv(&csv_text).unwrap(), record);
    }

    #[test]
    fn test_upload_accepts_short_column_names() {
        let text = "current_short,voltage_open,current_max,voltage_max,alpha,beta\n9.1,45.2,8.5,37.1,0.0005,-0.003\n";
        let record = DatasheetRecord::from_csv(text).unwrap();
        assert_eq!(record.current_short_circuit, Some(9.1));
        assert_eq!(record.voltage_max_rated, Some(37.1));
        assert_eq!(record.beta, Some(-0.003));
        assert_eq!(record.gamma, None);
        assert_eq!(record.module_type, ModuleType::unspecified());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_upload_rejects_cell_count_beyond_u32() {
        let err = DatasheetRecord::from_csv("cells\n5000000000\n").unwrap_err();
        assert!(matches!(err, PredictError::Parse(_)));
        let ok = DatasheetRecord::from_csv("cells\n4294967295\n").unwrap();
        assert_eq!(ok.cell_count, Some(u32::MAX));
    }

    #[test]
    fn test_upload_without_rows_is_a_parse_error() {
        let err = DatasheetRecord::from_csv("alpha,beta\n").unwrap_err();
        assert!(matches!(err, PredictError::Parse(_)));
    }

    #[test]
    fn test_upload_with_text_in_numeric_column_is_a_parse_error() {
        let err = DatasheetRecord::from_csv("alpha,beta\nabc,-0.003\n").unwrap_err();
        assert!(matches!(err, PredictError::Parse(_)));
    }

    #[test]
    fn test_validation_allows_negative_beta_only() {
        assert!(sample().validate().is_ok());

        let mut bad = sample();
        bad.alpha = Some(-0.1);
        assert!(matches!(bad.validate(), Err(PredictError::Validation(_))));

        let mut blank = sample();
        blank.module_type = ModuleType::Other("  ".to_string());
        assert!(matches!(blank.validate(), Err(PredictError::Validation(_))));
    }
}
