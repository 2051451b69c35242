use utoipa::OpenApi;
use crate::controllers::{data_controller, session_controller};
use crate::models::{datasheet, prediction};
use crate::services::{adjustment, comparison, history, localization, table};

#[derive(OpenApi)]
#[openapi(
    paths(
        session_controller::create_session,
        session_controller::get_session,
        session_controller::set_language,
        session_controller::get_labels,
        session_controller::get_module_types,
        session_controller::put_datasheet,
        session_controller::upload_datasheet,
        session_controller::export_datasheet,
        session_controller::compute,
        data_controller::get_history,
        data_controller::export_history,
        data_controller::clear_history,
        data_controller::compare,
        data_controller::format_results,
        data_controller::list_module_types
    ),
    components(
        schemas(
            datasheet::DatasheetRecord,
            datasheet::ModuleTypeOption,
            prediction::OperatingConditions,
            prediction::AdjustedResult,
            prediction::DisplayValues,
            prediction::CreateSessionRequest,
            prediction::SetLanguageRequest,
            prediction::SessionResponse,
            prediction::ComputeRequest,
            prediction::ComputeResponse,
            prediction::CompareRequest,
            adjustment::FormulaVariant,
            history::HistoryRow,
            history::PersistPolicy,
            comparison::Parameter,
            comparison::SeriesPoint,
            comparison::ComparisonSeries,
            comparison::ComparisonResponse,
            localization::LabelTable,
            table::CsvTable
        )
    ),
    tags(
        (name = "pv-datasheet-predictor", description = "PV module datasheet adjustment API")
    )
)]
pub struct ApiDoc;
