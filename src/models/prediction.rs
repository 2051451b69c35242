use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{PredictError, Result};
use crate::models::datasheet::{DatasheetRecord, ModuleType};
use crate::services::adjustment::FormulaVariant;

/// Lowest cell temperature the input form accepts (°C).
pub const MIN_TEMPERATURE_C: f64 = -5.0;

// ─── Engine inputs / outputs ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OperatingConditions {
    /// Plane-of-array irradiance (W/m²)
    pub irradiance: f64,
    /// Cell temperature (°C)
    pub temperature: f64,
}

impl OperatingConditions {
    pub fn validate(&self) -> Result<()> {
        if !self.irradiance.is_finite() || self.irradiance < 0.0 {
            return Err(PredictError::Validation(format!(
                "irradiance must be >= 0 W/m², got {}",
                self.irradiance
            )));
        }
        if !self.temperature.is_finite() || self.temperature < MIN_TEMPERATURE_C {
            return Err(PredictError::Validation(format!(
                "temperature must be >= {} °C, got {}",
                MIN_TEMPERATURE_C, self.temperature
            )));
        }
        Ok(())
    }
}

/// Maximum-power-point values corrected to the operating conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdjustedResult {
    #[schema(value_type = String)]
    pub module_type: ModuleType,
    pub irradiance: f64,
    pub temperature: f64,
    pub current_adjusted: f64,
    pub voltage_adjusted: f64,
    /// current × voltage rounded to 2 decimals
    pub power_adjusted: f64,
}

/// Values as shown to the user: I and V to 2 decimals, P to whole watts.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DisplayValues {
    pub current: String,
    pub voltage: String,
    pub power: String,
}

impl AdjustedResult {
    pub fn display(&self) -> DisplayValues {
        DisplayValues {
            current: format!("{:.2}", self.current_adjusted),
            voltage: format!("{:.2}", self.voltage_adjusted),
            power: format!("{:.0}", self.power_adjusted),
        }
    }
}

// ─── Session API ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Language code, e.g. "en" or "pt"
    pub language: Option<String>,
    pub variant: Option<FormulaVariant>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetLanguageRequest {
    pub language: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub language: String,
    pub variant: FormulaVariant,
    pub created_at: DateTime<Utc>,
    pub datasheet: Option<DatasheetRecord>,
}

// ─── Computation API ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ComputeRequest {
    pub irradiance: f64,
    pub temperature: f64,
    /// Overrides the session's formula variant for this call only
    pub variant: Option<FormulaVariant>,
}

impl ComputeRequest {
    pub fn conditions(&self) -> OperatingConditions {
        OperatingConditions {
            irradiance: self.irradiance,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComputeResponse {
    pub computed_at: DateTime<Utc>,
    pub variant: FormulaVariant,
    pub result: AdjustedResult,
    pub display: DisplayValues,
    /// Number of rows in the history after this computation
    pub history_len: usize,
}

// ─── Comparison / formatting API ─────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompareRequest {
    /// Reference (datasheet) table as CSV text
    pub reference_csv: String,
    /// Calculated results table as CSV text
    pub calculated_csv: String,
    /// Parameter to extract a chart series for: Imax, Vmax or Pmax
    pub parameter: Option<String>,
}
