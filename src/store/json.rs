use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{Catalog, Plan, StudentRecord};
use crate::store::{check_id, CatalogSource, PlanArchive, SavedPlan, StudentRecordStore};

/// Store sobre un directorio de archivos JSON:
///
/// ```text
/// <root>/catalogs/<program>.json
/// <root>/students/<student>.json
/// <root>/plans/<student>.json
/// ```
///
/// Cada archivo se escribe en un temporal único y se renombra. Los clones
/// comparten el candado de escritura del archivo de planes; entre procesos
/// distintos el store es de un solo escritor.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonStore {
            root: root.into(),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Guarda (o reemplaza) el catálogo de un programa.
    pub fn put_catalog(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let id = &catalog.program().id;
        check_id("program", id)?;
        write_json(&self.file("catalogs", id), catalog)
    }

    fn file(&self, dir: &str, id: &str) -> PathBuf {
        self.root.join(dir).join(format!("{}.json", id))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, kind: &'static str, id: &str) -> Result<T, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound { kind, id: id.to_string() });
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };
    debug!(path = %path.display(), "reading json");
    Ok(serde_json::from_str(&text)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
    }
    let text = serde_json::to_string_pretty(value)?;
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(text.as_bytes()).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    debug!(path = %path.display(), "json written");
    Ok(())
}

impl CatalogSource for JsonStore {
    fn load_catalog(&self, program_id: &str) -> Result<Catalog, StoreError> {
        check_id("program", program_id)?;
        read_json(&self.file("catalogs", program_id), "program", program_id)
    }
}

impl StudentRecordStore for JsonStore {
    fn load_record(&self, student_id: &str) -> Result<StudentRecord, StoreError> {
        check_id("student", student_id)?;
        read_json(&self.file("students", student_id), "student", student_id)
    }

    fn save_record(&self, student_id: &str, record: &StudentRecord) -> Result<(), StoreError> {
        check_id("student", student_id)?;
        write_json(&self.file("students", student_id), record)
    }
}

impl PlanArchive for JsonStore {
    fn save_plan(&self, student_id: &str, program_id: &str, plan: &Plan) -> Result<SavedPlan, StoreError> {
        check_id("student", student_id)?;
        let path = self.file("plans", student_id);
        // leer-modificar-escribir bajo el candado
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut saved: Vec<SavedPlan> = match read_json(&path, "plans", student_id) {
            Ok(v) => v,
            Err(StoreError::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        let entry = SavedPlan {
            id: saved.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            student_id: student_id.to_string(),
            program_id: program_id.to_string(),
            plan: plan.clone(),
            created_at: Utc::now(),
        };
        saved.push(entry.clone());
        write_json(&path, &saved)?;
        Ok(entry)
    }

    fn list_plans(&self, student_id: &str) -> Result<Vec<SavedPlan>, StoreError> {
        check_id("student", student_id)?;
        let mut saved: Vec<SavedPlan> = match read_json(&self.file("plans", student_id), "plans", student_id) {
            Ok(v) => v,
            Err(StoreError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        saved.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(saved)
    }
}
