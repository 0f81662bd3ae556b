//! Colaboradores de persistencia: de dónde salen los catálogos y los
//! historiales, y dónde se guardan los planes.
//!
//! El núcleo (`algorithm`) nunca toca estos traits; recibe snapshots ya
//! cargados. Las implementaciones abren archivos o conexiones por llamada,
//! así que son `Send + Sync` y se pueden compartir entre hilos.

mod json;
mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, StoreLocation};
use crate::error::StoreError;
use crate::models::{Catalog, Plan, StudentRecord};

pub use json::JsonStore;
pub use sqlite::SqliteStore;

/// Fuente de catálogos por id de programa.
pub trait CatalogSource {
    fn load_catalog(&self, program_id: &str) -> Result<Catalog, StoreError>;
}

/// Carga y guarda historiales por id de estudiante.
pub trait StudentRecordStore {
    fn load_record(&self, student_id: &str) -> Result<StudentRecord, StoreError>;
    fn save_record(&self, student_id: &str, record: &StudentRecord) -> Result<(), StoreError>;
}

/// Planes guardados por el estudiante (el más reciente primero al listar).
pub trait PlanArchive {
    fn save_plan(&self, student_id: &str, program_id: &str, plan: &Plan) -> Result<SavedPlan, StoreError>;
    fn list_plans(&self, student_id: &str) -> Result<Vec<SavedPlan>, StoreError>;
}

/// Todo lo que necesita la aplicación de un store.
pub trait PlanStore: CatalogSource + StudentRecordStore + PlanArchive {}

impl<T: CatalogSource + StudentRecordStore + PlanArchive> PlanStore for T {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPlan {
    pub id: i64,
    pub student_id: String,
    pub program_id: String,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

/// Abre el store indicado por la configuración (`DEGREEPATH_STORE_URL`).
pub fn open_store(config: &Config) -> Result<Box<dyn PlanStore + Send + Sync>, StoreError> {
    match config.store_location()? {
        StoreLocation::Json(dir) => {
            info!(dir = %dir.display(), "using json store");
            Ok(Box::new(JsonStore::new(dir)))
        }
        StoreLocation::Sqlite(path) => {
            info!(path = %path.display(), "using sqlite store");
            Ok(Box::new(SqliteStore::open(path)?))
        }
    }
}

/// Los ids se usan como nombres de archivo: sólo alfanuméricos, '-', '_' y '.'.
pub(crate) fn check_id(kind: &'static str, id: &str) -> Result<(), StoreError> {
    let ok = !id.is_empty()
        && !id.starts_with('.')
        && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::Malformed(format!("invalid {} id '{}'", kind, id)))
    }
}
