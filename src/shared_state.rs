use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{PredictError, Result};
use crate::models::datasheet::DatasheetRecord;
use crate::models::prediction::{AdjustedResult, OperatingConditions, SessionResponse};
use crate::services::adjustment::{self, FormulaVariant};
use crate::services::history::HistoryStore;
use crate::services::localization::{self, LabelTable, Translator};

/// Per-user context that used to live in ambient globals: language,
/// resolved labels, the active datasheet and the formula choice.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub language: String,
    pub labels: LabelTable,
    pub datasheet: Option<DatasheetRecord>,
    pub variant: FormulaVariant,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn snapshot(&self) -> SessionResponse {
        SessionResponse {
            id: self.id,
            language: self.language.clone(),
            variant: self.variant,
            created_at: self.created_at,
            datasheet: self.datasheet.clone(),
        }
    }
}

/// Outcome of a successful computation.
#[derive(Debug, Clone)]
pub struct Computation {
    pub result: AdjustedResult,
    pub variant: FormulaVariant,
    pub history_len: usize,
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Map of session id to session context
    pub sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    /// Single history file; the lock serializes appends and writes
    pub history: Arc<Mutex<HistoryStore>>,
    pub translator: Translator,
}

impl AppState {
    pub fn new(config: Config, history: HistoryStore, translator: Translator) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(Mutex::new(history)),
            translator,
        }
    }

    pub fn history(&self) -> MutexGuard<'_, HistoryStore> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn language_or_default(&self, language: Option<&str>) -> String {
        let fallback = &self.config.localization.default_language;
        localization::normalize_language(language.unwrap_or(fallback), fallback)
    }

    pub async fn create_session(&self, language: Option<&str>, variant: Option<FormulaVariant>) -> Session {
        let language = self.language_or_default(language);
        let labels = localization::resolve(&language, &self.translator).await;
        let session = Session {
            id: Uuid::new_v4(),
            language,
            labels,
            datasheet: None,
            variant: variant.unwrap_or(self.config.formula.default_variant),
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(session.id, session.clone());
        log::info!("[SESSION] Created {} (lang={}, variant={:?})", session.id, session.language, session.variant);
        session
    }

    pub fn session(&self, id: Uuid) -> Result<Session> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .cloned()
            .ok_or(PredictError::SessionNotFound(id))
    }

    fn update_session<F>(&self, id: Uuid, f: F) -> Result<Session>
    where
        F: FnOnce(&mut Session),
    {
        let mut map = self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let session = map.get_mut(&id).ok_or(PredictError::SessionNotFound(id))?;
        f(session);
        Ok(session.clone())
    }

    /// Switch language; labels are resolved here, never on render.
    pub async fn set_language(&self, id: Uuid, language: &str) -> Result<Session> {
        self.session(id)?;
        let language = self.language_or_default(Some(language));
        let labels = localization::resolve(&language, &self.translator).await;
        self.update_session(id, |s| {
            s.language = language;
            s.labels = labels;
        })
    }

    /// Replace the session's datasheet record.
    pub fn set_datasheet(&self, id: Uuid, record: DatasheetRecord) -> Result<Session> {
        record.validate()?;
        let session = self.update_session(id, |s| s.datasheet = Some(record))?;
        log::info!("[SESSION] {} datasheet set: {}", id, session.datasheet.as_ref().map(|d| d.module_type.label()).unwrap_or_default());
        Ok(session)
    }

    /// Validate, compute, then append and save. Nothing is stored on error.
    pub fn compute(
        &self,
        id: Uuid,
        conditions: OperatingConditions,
        variant: Option<FormulaVariant>,
    ) -> Result<Computation> {
        let session = self.session(id)?;
        conditions.validate()?;
        let record = session.datasheet.as_ref().ok_or(PredictError::NoDatasheet)?;
        let variant = variant.unwrap_or(session.variant);

        let result = adjustment::adjust(record, conditions, variant)?;

        let mut history = self.history();
        history.append(&result);
        if let Err(e) = history.save() {
            history.discard_last();
            return Err(e);
        }
        log::info!(
            "[COMPUTE] {} | G={} W/m² T={} °C | I={:.2} A V={:.2} V P={:.2} W ({:?})",
            result.module_type, conditions.irradiance, conditions.temperature,
            result.current_adjusted, result.voltage_adjusted, result.power_adjusted, variant
        );
        Ok(Computation { result, variant, history_len: history.len() })
    }

    /// Write the empty table, then empty the in-memory history.
    pub fn clear_history(&self) -> Result<()> {
        self.history().clear()?;
        log::info!("[HISTORY] Cleared");
        Ok(())
    }
}
