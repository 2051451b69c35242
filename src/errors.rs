use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PredictError {
    /// Datasheet fields the adjustment formulas need are absent from the record.
    #[error("missing datasheet field(s): {}", .0.join(", "))]
    MissingField(Vec<&'static str>),
    #[error("the column '{column}' is missing in the CSV file")]
    Schema { column: String },
    #[error("could not read CSV: {0}")]
    Parse(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    #[error("no datasheet record has been submitted for this session")]
    NoDatasheet,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PredictError {
    pub fn schema(column: impl Into<String>) -> Self {
        PredictError::Schema { column: column.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::MissingField(_) => "missing_field",
            PredictError::Schema { .. } => "schema",
            PredictError::Parse(_) => "parse",
            PredictError::Validation(_) => "validation",
            PredictError::SessionNotFound(_) => "session_not_found",
            PredictError::NoDatasheet => "no_datasheet",
            PredictError::Io(_) => "io",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            PredictError::MissingField(_)
            | PredictError::Schema { .. }
            | PredictError::Parse(_)
            | PredictError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            PredictError::NoDatasheet => StatusCode::CONFLICT,
            PredictError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<csv::Error> for PredictError {
    fn from(e: csv::Error) -> Self {
        if !e.is_io_error() {
            return PredictError::Parse(e.to_string());
        }
        match e.into_kind() {
            csv::ErrorKind::Io(io) => PredictError::Io(io),
            other => PredictError::Parse(format!("{:?}", other)),
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("[API] {}", self);
        } else {
            log::warn!("[API] {} ({})", self, self.kind());
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PredictError>;
