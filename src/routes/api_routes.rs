use axum::{routing::{get, post, put}, Router};
use crate::controllers::data_controller::{
    // History
    get_history, export_history, clear_history,
    // Comparison & formatting
    compare, format_results, list_module_types,
};
use crate::controllers::session_controller::{
    // Sessions & language
    create_session, get_session, set_language, get_labels, get_module_types,
    // Datasheet & computation
    put_datasheet, upload_datasheet, export_datasheet, compute,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/sessions",                         post(create_session))
        .route("/sessions/{id}",                    get(get_session))
        .route("/sessions/{id}/language",           put(set_language))
        .route("/sessions/{id}/labels",             get(get_labels))
        .route("/sessions/{id}/module-types",       get(get_module_types))
        .route("/sessions/{id}/datasheet",          put(put_datasheet))
        .route("/sessions/{id}/datasheet/csv",      post(upload_datasheet))
        .route("/sessions/{id}/datasheet/export",   get(export_datasheet))
        .route("/sessions/{id}/compute",            post(compute))
        .route("/history",                          get(get_history).delete(clear_history))
        .route("/history/export",                   get(export_history))
        .route("/compare",                          post(compare))
        .route("/results/format",                   post(format_results))
        .route("/module-types",                     get(list_module_types))
        .with_state(state)
}
