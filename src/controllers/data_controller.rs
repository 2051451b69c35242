use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::errors::Result;
use crate::models::datasheet::ModuleType;
use crate::models::prediction::CompareRequest;
use crate::services::comparison::{self, ComparisonResponse, Parameter};
use crate::services::formatter;
use crate::services::history::HistoryRow;
use crate::services::table::CsvTable;
use crate::shared_state::AppState;

/// GET /api/history
/// All computed rows in insertion order
#[utoipa::path(
    get,
    path = "/api/history",
    responses(
        (status = 200, description = "History rows", body = Vec<HistoryRow>)
    )
)]
pub async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    let rows = state.history().rows().to_vec();
    Json(rows).into_response()
}

/// GET /api/history/export
/// Download the history as CSV
#[utoipa::path(
    get,
    path = "/api/history/export",
    responses(
        (status = 200, description = "calculated_results.csv", body = String, content_type = "text/csv"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn export_history(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let csv = state.history().export()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"calculated_results.csv\""),
        ],
        csv,
    ))
}

/// DELETE /api/history
/// Start a new analysis with an empty history
#[utoipa::path(
    delete,
    path = "/api/history",
    responses(
        (status = 204, description = "History cleared"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_history(State(state): State<AppState>) -> Result<StatusCode> {
    state.clear_history()?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/compare
/// Join calculated results onto reference data by irradiance
///
/// Returns the combined table and, when `parameter` is given, the
/// datasheet/calculated series for that parameter.
#[utoipa::path(
    post,
    path = "/api/compare",
    request_body = CompareRequest,
    responses(
        (status = 200, description = "Combined table", body = ComparisonResponse),
        (status = 422, description = "Unreadable CSV or missing Irradiance column")
    )
)]
pub async fn compare(Json(req): Json<CompareRequest>) -> Result<Json<ComparisonResponse>> {
    let parameter = req.parameter.as_deref().map(str::parse::<Parameter>).transpose()?;
    let response = comparison::compare(&req.reference_csv, &req.calculated_csv, parameter)?;
    Ok(Json(response))
}

/// POST /api/results/format
/// Validate and format a results CSV for display
#[utoipa::path(
    post,
    path = "/api/results/format",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Formatted table", body = CsvTable),
        (status = 422, description = "Unreadable CSV or missing column")
    )
)]
pub async fn format_results(body: String) -> Result<Json<CsvTable>> {
    Ok(Json(formatter::format_results(&body)?))
}

/// GET /api/module-types
#[utoipa::path(
    get,
    path = "/api/module-types",
    responses(
        (status = 200, description = "Selectable module technologies", body = Vec<String>)
    )
)]
pub async fn list_module_types() -> impl IntoResponse {
    let labels: Vec<String> = ModuleType::KNOWN.iter().map(|m| m.label().to_string()).collect();
    Json(labels).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PredictError;
    use crate::models::prediction::OperatingConditions;
    use crate::shared_state::tests::{sample_record, scratch_state};

    #[tokio::test]
    async fn test_history_export_feeds_the_formatter() {
        let (state, dir) = scratch_state();
        let session = state.create_session(None, None).await;
        state.set_datasheet(session.id, sample_record()).unwrap();
        state
            .compute(session.id, OperatingConditions { irradiance: 800.0, temperature: 35.0 }, None)
            .unwrap();

        let csv = state.history().export().unwrap();
        let Json(table) = format_results(csv).await.unwrap();
        let p = table.column("Pmax_calculated").unwrap();
        assert_eq!(table.cell(0, p), Some("249"));

        clear_history(State(state.clone())).await.unwrap();
        assert!(state.history().is_empty());
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_compare_rejects_unknown_parameter() {
        let req = CompareRequest {
            reference_csv: "Irradiance,Imax\n800,6.4\n".to_string(),
            calculated_csv: "Irradiance,Imax_calculated\n800,6.43\n".to_string(),
            parameter: Some("Isc".to_string()),
        };
        let err = compare(Json(req)).await.unwrap_err();
        assert!(matches!(err, PredictError::Validation(_)));
    }

    #[tokio::test]
    async fn test_compare_returns_series() {
        let req = CompareRequest {
            reference_csv: "Irradiance,Imax\n800,6.4\n".to_string(),
            calculated_csv: "Irradiance,Imax_calculated\n800,6.43\n".to_string(),
            parameter: Some("Imax".to_string()),
        };
        let Json(resp) = compare(Json(req)).await.unwrap();
        let series = resp.series.unwrap();
        assert_eq!(series.points[0].datasheet, Some(6.4));
        assert_eq!(series.points[0].calculated, Some(6.43));
    }
}
