/// ============================================================
///  Datasheet Parameter Adjustment Engine
///
///  Translates STC nameplate values (Imp, Vmp) to the requested
///  operating point using the datasheet temperature coefficients:
///   1. Check the record carries every field the formulas use
///   2. Current  – coefficient α, scaled with irradiance
///   3. Voltage  – coefficient β
///   4. Power    – P = I × V, rounded to 2 decimals
///
///  Two correction forms are in use and they do NOT agree, so the
///  caller always names one through `FormulaVariant`.
/// ============================================================

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{PredictError, Result};
use crate::models::datasheet::DatasheetRecord;
use crate::models::prediction::{AdjustedResult, OperatingConditions};

// ─── Reference conditions (STC) ──────────────────────────────
pub const T_REF_C: f64 = 25.0; // °C
pub const G_REF_W_M2: f64 = 1000.0; // W/m²
const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FormulaVariant {
    /// I = Imp + α·((T + 273.15) − Tref)·(G/Gref),  V = Vmp·(1 + β·((T + 273.15) − Tref))
    AbsoluteTemperature,
    /// I = Imp·(G/Gref)·(1 + α·(T − Tref)),  V = Vmp·(1 + β·(T − Tref))
    #[default]
    CelsiusDelta,
}

/// The subset of a datasheet the formulas read, all present.
#[derive(Debug, Clone, Copy)]
struct RequiredInputs {
    imp: f64,
    vmp: f64,
    alpha: f64,
    beta: f64,
}

fn required_inputs(record: &DatasheetRecord) -> Result<RequiredInputs> {
    let fields = [
        ("current_short_circuit", record.current_short_circuit),
        ("voltage_open_circuit", record.voltage_open_circuit),
        ("current_max_rated", record.current_max_rated),
        ("voltage_max_rated", record.voltage_max_rated),
        ("alpha", record.alpha),
        ("beta", record.beta),
    ];
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(PredictError::MissingField(missing));
    }

    // Every field was checked above.
    let get = |v: Option<f64>| v.unwrap_or_default();
    Ok(RequiredInputs {
        imp: get(record.current_max_rated),
        vmp: get(record.voltage_max_rated),
        alpha: get(record.alpha),
        beta: get(record.beta),
    })
}

#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Main entry point – pure, no I/O.
///
/// * `record`     – nameplate values of the module
/// * `conditions` – irradiance (W/m²) and cell temperature (°C)
/// * `variant`    – which correction form to apply
pub fn adjust(
    record: &DatasheetRecord,
    conditions: OperatingConditions,
    variant: FormulaVariant,
) -> Result<AdjustedResult> {
    let inputs = required_inputs(record)?;
    let g_ratio = conditions.irradiance / G_REF_W_M2;
    let t = conditions.temperature;

    let (current, voltage) = match variant {
        FormulaVariant::AbsoluteTemperature => {
            let dt = (t + KELVIN_OFFSET) - T_REF_C;
            (
                inputs.imp + inputs.alpha * dt * g_ratio,
                inputs.vmp * (1.0 + inputs.beta * dt),
            )
        }
        FormulaVariant::CelsiusDelta => {
            let dt = t - T_REF_C;
            (
                inputs.imp * g_ratio * (1.0 + inputs.alpha * dt),
                inputs.vmp * (1.0 + inputs.beta * dt),
            )
        }
    };

    Ok(AdjustedResult {
        module_type: record.module_type.clone(),
        irradiance: conditions.irradiance,
        temperature: conditions.temperature,
        current_adjusted: current,
        voltage_adjusted: voltage,
        power_adjusted: round2(current * voltage),
    })
}
