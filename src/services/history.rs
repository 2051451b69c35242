use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{PredictError, Result};
use crate::models::datasheet::ModuleType;
use crate::models::prediction::AdjustedResult;

pub const HISTORY_HEADER: [&str; 6] = [
    "Module Type",
    "Irradiance",
    "Temperature",
    "Imax_calculated",
    "Vmax_calculated",
    "Pmax_calculated",
];

/// How the history file is written after each computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Rewrite the whole file with the full row sequence.
    #[default]
    Overwrite,
    /// Append only the newest row, writing the header into an empty file.
    AppendLog,
}

/// One history row, named after the CSV columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryRow {
    #[serde(rename = "Module Type")]
    pub module_type: String,
    #[serde(rename = "Irradiance")]
    pub irradiance: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Imax_calculated")]
    pub imax_calculated: f64,
    #[serde(rename = "Vmax_calculated")]
    pub vmax_calculated: f64,
    #[serde(rename = "Pmax_calculated")]
    pub pmax_calculated: f64,
}

impl From<&AdjustedResult> for HistoryRow {
    fn from(r: &AdjustedResult) -> Self {
        Self {
            module_type: r.module_type.to_string(),
            irradiance: r.irradiance,
            temperature: r.temperature,
            imax_calculated: r.current_adjusted,
            vmax_calculated: r.voltage_adjusted,
            pmax_calculated: r.power_adjusted,
        }
    }
}

impl From<&HistoryRow> for AdjustedResult {
    fn from(row: &HistoryRow) -> Self {
        Self {
            module_type: ModuleType::from(row.module_type.clone()),
            irradiance: row.irradiance,
            temperature: row.temperature,
            current_adjusted: row.imax_calculated,
            voltage_adjusted: row.vmax_calculated,
            power_adjusted: row.pmax_calculated,
        }
    }
}

/// Ordered log of computed results, backed by one CSV file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    policy: PersistPolicy,
    rows: Vec<HistoryRow>,
}

impl HistoryStore {
    /// Read the history file. A missing file starts an empty history;
    /// anything unreadable is reported.
    pub fn load(path: impl AsRef<Path>, policy: PersistPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = match fs::read_to_string(&path) {
            Ok(text) => parse_rows(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("[HISTORY] {} not found, starting empty", path.display());
                Vec::new()
            }
            Err(e) => return Err(PredictError::Io(e)),
        };
        log::info!("[HISTORY] Loaded {} row(s) from {}", rows.len(), path.display());
        Ok(Self { path, policy, rows })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add one row at the end; identical rows accumulate.
    pub fn append(&mut self, result: &AdjustedResult) {
        let row = HistoryRow::from(result);
        #[cfg(feature = "verbose_log")]
        log::debug!("[HISTORY] append #{}: {:?}", self.rows.len() + 1, row);
        self.rows.push(row);
    }

    /// Drop the newest row after its save failed.
    pub fn discard_last(&mut self) -> Option<HistoryRow> {
        self.rows.pop()
    }

    /// Write an empty table to the history file, then drop the rows.
    /// On a failed write the rows are kept.
    pub fn clear(&mut self) -> Result<()> {
        let empty = Self { path: self.path.clone(), policy: self.policy, rows: Vec::new() };
        empty.persist(&self.path)?;
        self.rows.clear();
        Ok(())
    }

    /// Full table as CSV text, header included even when empty.
    pub fn export(&self) -> Result<String> {
        let bytes = write_rows(Vec::new(), &self.rows, true)?;
        String::from_utf8(bytes).map_err(|e| PredictError::Parse(e.to_string()))
    }

    /// Write the full row sequence to `path`, replacing its content.
    /// The table goes to a sibling temp file first, so a failed write
    /// leaves the previous file intact.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let tmp = temp_sibling(path);
        let written = fs::File::create(&tmp)
            .map_err(PredictError::from)
            .and_then(|file| write_rows(file, &self.rows, true))
            .and_then(|file| file.sync_all().map_err(PredictError::from))
            .and_then(|_| fs::rename(&tmp, path).map_err(PredictError::from));
        if let Err(e) = written {
            fs::remove_file(&tmp).ok();
            return Err(e);
        }
        log::debug!("[HISTORY] Wrote {} row(s) to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Save after a successful computation, following the configured policy.
    pub fn save(&self) -> Result<()> {
        match self.policy {
            PersistPolicy::Overwrite => self.persist(&self.path),
            PersistPolicy::AppendLog => {
                let Some(last) = self.rows.last() else {
                    return Ok(());
                };
                ensure_parent_dir(&self.path)?;
                let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
                let needs_header = file.metadata()?.len() == 0;
                write_rows(file, std::slice::from_ref(last), needs_header)?;
                log::debug!("[HISTORY] Appended 1 row to {}", self.path.display());
                Ok(())
            }
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

fn parse_rows(text: &str) -> Result<Vec<HistoryRow>> {
    // An empty file is an empty history, not a schema violation.
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    if let Some(column) = HISTORY_HEADER.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(PredictError::schema(*column));
    }

    reader
        .deserialize::<HistoryRow>()
        .map(|row| row.map_err(PredictError::from))
        .collect()
}

fn write_rows<W: std::io::Write>(sink: W, rows: &[HistoryRow], with_header: bool) -> Result<W> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
    if with_header {
        writer.write_record(HISTORY_HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| PredictError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pv-history-{}", uuid::Uuid::new_v4()))
    }

    fn result(irradiance: f64, temperature: f64) -> AdjustedResult {
        AdjustedResult {
            module_type: ModuleType::Monocrystalline,
            irradiance,
            temperature,
            current_adjusted: 6.4256,
            voltage_adjusted: 38.72,
            power_adjusted: 248.8,
        }
    }

    #[test]
    fn test_missing_file_loads_empty_with_header_on_export() {
        let dir = scratch_dir();
        let store = HistoryStore::load(dir.join("none.csv"), PersistPolicy::Overwrite).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.export().unwrap(),
            "Module Type,Irradiance,Temperature,Imax_calculated,Vmax_calculated,Pmax_calculated\n"
        );
    }

    #[test]
    fn test_append_preserves_order_and_duplicates() {
        let dir = scratch_dir();
        let mut store = HistoryStore::load(dir.join("h.csv"), PersistPolicy::Overwrite).unwrap();
        store.append(&result(800.0, 35.0));
        store.append(&result(800.0, 35.0));
        store.append(&result(200.0, 10.0));
        let rows = store.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], rows[1]);
        assert_eq!(rows[2].irradiance, 200.0);
    }

    #[test]
    fn test_persist_creates_directory_and_round_trips() {
        let dir = scratch_dir();
        let path = dir.join("nested").join("calculated_results.csv");
        let mut store = HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap();
        store.append(&result(800.0, 35.0));
        store.append(&result(1000.0, -5.0));
        store.save().unwrap();

        let reloaded = HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap();
        assert_eq!(reloaded.rows(), store.rows());
        let first = AdjustedResult::from(&reloaded.rows()[0]);
        assert_eq!(first, result(800.0, 35.0));

        // load → persist without appends leaves the file unchanged
        let before = fs::read_to_string(&path).unwrap();
        reloaded.persist(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_append_log_policy_only_adds_the_new_row() {
        let dir = scratch_dir();
        let path = dir.join("log.csv");
        let mut store = HistoryStore::load(&path, PersistPolicy::AppendLog).unwrap();
        store.append(&result(800.0, 35.0));
        store.save().unwrap();
        store.append(&result(600.0, 30.0));
        store.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.matches("Module Type").count(), 1);
        let reloaded = HistoryStore::load(&path, PersistPolicy::AppendLog).unwrap();
        assert_eq!(reloaded.len(), 2);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_clear_writes_empty_table() {
        let dir = scratch_dir();
        let path = dir.join("h.csv");
        let mut store = HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap();
        store.append(&result(800.0, 35.0));
        store.save().unwrap();

        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap().is_empty());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_failed_clear_keeps_rows_and_file() {
        let dir = scratch_dir();
        let path = dir.join("h.csv");
        let mut store = HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap();
        store.append(&result(800.0, 35.0));
        store.append(&result(600.0, 30.0));
        store.save().unwrap();

        // a directory in place of the file makes the rename fail
        let blocked = dir.join("blocked");
        fs::create_dir_all(blocked.join("inner")).unwrap();
        let mut stuck = HistoryStore { path: blocked.clone(), ..store.clone() };
        assert!(matches!(stuck.clear(), Err(PredictError::Io(_))));
        assert_eq!(stuck.len(), 2);
        assert!(blocked.join("inner").is_dir());

        // no temp files left behind, original file untouched
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap().len(), 2);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.csv");
        fs::write(
            &path,
            "Module Type,Irradiance,Temperature,Imax_calculated,Vmax_calculated,Pmax_calculated\nx,abc,1,2,3,4\n",
        )
        .unwrap();
        let err = HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap_err();
        assert!(matches!(err, PredictError::Parse(_)), "got {:?}", err);

        fs::write(&path, "Irradiance,Temperature\n1,2\n").unwrap();
        let err = HistoryStore::load(&path, PersistPolicy::Overwrite).unwrap_err();
        assert!(matches!(err, PredictError::Schema { .. }));

        fs::remove_dir_all(dir).ok();
    }
}
