use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::errors::{PredictError, Result};
use crate::models::datasheet::{DatasheetRecord, ModuleType, ModuleTypeOption};
use crate::models::prediction::{
    ComputeRequest, ComputeResponse, CreateSessionRequest, SessionResponse, SetLanguageRequest,
};
use crate::services::localization::LabelTable;
use crate::shared_state::AppState;

/// POST /api/sessions
/// Start a session
///
/// Creates a session holding the display language, the resolved label table
/// and the formula variant. Labels are resolved once here.
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body(content = CreateSessionRequest, description = "Optional; omitted fields use the configured defaults"),
    responses(
        (status = 201, description = "Session created", body = SessionResponse)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session = state.create_session(req.language.as_deref(), req.variant).await;
    (StatusCode::CREATED, Json(session.snapshot()))
}

/// GET /api/sessions/{id}
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>> {
    Ok(Json(state.session(id)?.snapshot()))
}

/// PUT /api/sessions/{id}/language
#[utoipa::path(
    put,
    path = "/api/sessions/{id}/language",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = SetLanguageRequest,
    responses(
        (status = 200, description = "Labels for the new language", body = LabelTable),
        (status = 404, description = "Session not found")
    )
)]
pub async fn set_language(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(req): Json<SetLanguageRequest>,
) -> Result<Json<LabelTable>> {
    let session = state.set_language(id, &req.language).await?;
    Ok(Json(session.labels))
}

/// GET /api/sessions/{id}/labels
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/labels",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Resolved label table", body = LabelTable),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_labels(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<LabelTable>> {
    Ok(Json(state.session(id)?.labels))
}

/// GET /api/sessions/{id}/module-types
/// Module technologies named in the session's language
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/module-types",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Selectable module technologies", body = Vec<ModuleTypeOption>),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_module_types(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ModuleTypeOption>>> {
    let labels = state.session(id)?.labels;
    let options = ModuleType::KNOWN
        .iter()
        .map(|m| ModuleTypeOption { value: m.label().to_string(), label: labels.module_type(m) })
        .collect();
    Ok(Json(options))
}

/// PUT /api/sessions/{id}/datasheet
/// Submit the datasheet form
///
/// Replaces the session's active record.
#[utoipa::path(
    put,
    path = "/api/sessions/{id}/datasheet",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = DatasheetRecord,
    responses(
        (status = 200, description = "Record stored", body = SessionResponse),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Invalid datasheet values")
    )
)]
pub async fn put_datasheet(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(record): Json<DatasheetRecord>,
) -> Result<Json<SessionResponse>> {
    Ok(Json(state.set_datasheet(id, record)?.snapshot()))
}

/// POST /api/sessions/{id}/datasheet/csv
/// Upload a datasheet CSV
///
/// The first data row is used. Column names may be the short form
/// (`current_short`), the `_datasheet` form or the export form (`isc_datasheet`).
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/datasheet/csv",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Record stored", body = SessionResponse),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Unreadable CSV or invalid values")
    )
)]
pub async fn upload_datasheet(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    body: String,
) -> Result<Json<SessionResponse>> {
    let record = DatasheetRecord::from_csv(&body)?;
    Ok(Json(state.set_datasheet(id, record)?.snapshot()))
}

/// GET /api/sessions/{id}/datasheet/export
/// Download the active record as a one-row CSV at STC
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/datasheet/export",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "datasheet_data.csv", body = String, content_type = "text/csv"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "No datasheet submitted")
    )
)]
pub async fn export_datasheet(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let session = state.session(id)?;
    let record = session.datasheet.ok_or(PredictError::NoDatasheet)?;
    let csv = record.to_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"datasheet_data.csv\""),
        ],
        csv,
    ))
}

/// POST /api/sessions/{id}/compute
/// Compute Imax / Vmax / Pmax at the given irradiance and temperature
///
/// On success the result is appended to the history and the history file is
/// saved. On any error nothing is stored.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/compute",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = ComputeRequest,
    responses(
        (status = 200, description = "Adjusted values", body = ComputeResponse),
        (status = 404, description = "Session not found"),
        (status = 409, description = "No datasheet submitted"),
        (status = 422, description = "Invalid input or missing datasheet fields")
    )
)]
pub async fn compute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(req): Json<ComputeRequest>,
) -> Result<Json<ComputeResponse>> {
    let c = state.compute(id, req.conditions(), req.variant)?;
    Ok(Json(ComputeResponse {
        computed_at: Utc::now(),
        variant: c.variant,
        display: c.result.display(),
        result: c.result,
        history_len: c.history_len,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_state::tests::{sample_record, scratch_state};

    #[tokio::test]
    async fn test_upload_then_compute_through_handlers() {
        let (state, dir) = scratch_state();
        let session = state.create_session(None, None).await;

        let csv = "module_type,isc_datasheet,voc_datasheet,Imax_datasheet,Vmax_datasheet,alpha,beta\n\
                   Perovskite,8.6,48.5,8.0,40,0.0004,-0.0032\n";
        let Json(snapshot) = upload_datasheet(Path(session.id), State(state.clone()), csv.to_string())
            .await
            .unwrap();
        assert!(snapshot.datasheet.is_some());

        let req = ComputeRequest { irradiance: 1000.0, temperature: 25.0, variant: None };
        let Json(resp) = compute(Path(session.id), State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(resp.result.current_adjusted, 8.0);
        assert_eq!(resp.display.power, "320");
        assert_eq!(resp.history_len, 1);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_export_requires_a_record() {
        let (state, _dir) = scratch_state();
        let session = state.create_session(None, None).await;
        let err = export_datasheet(Path(session.id), State(state.clone())).await.err().unwrap();
        assert!(matches!(err, PredictError::NoDatasheet));

        state.set_datasheet(session.id, sample_record()).unwrap();
        assert!(export_datasheet(Path(session.id), State(state)).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_without_body_uses_defaults() {
        let (state, _dir) = scratch_state();
        let resp = create_session(State(state.clone()), None).await.into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(state.sessions.read().unwrap().len(), 1);
        let session = state.sessions.read().unwrap().values().next().cloned().unwrap();
        assert_eq!(session.language, "en");
    }

    #[tokio::test]
    async fn test_module_types_follow_session_language() {
        let (state, _dir) = scratch_state();
        let session = state.create_session(Some("pt"), None).await;
        let Json(options) = get_module_types(Path(session.id), State(state)).await.unwrap();
        assert_eq!(options.len(), ModuleType::KNOWN.len());
        assert_eq!(options[0].value, "Monocrystalline (m-Si)");
        assert_eq!(options[0].label, "Monocristalino (m-Si)");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (state, _dir) = scratch_state();
        let err = get_session(Path(Uuid::new_v4()), State(state)).await.unwrap_err();
        assert!(matches!(err, PredictError::SessionNotFound(_)));
    }
}
