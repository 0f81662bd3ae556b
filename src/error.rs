//! Tipos de error del motor de planes.
//!
//! - `CatalogError`: catálogo mal formado o con ciclos; se corrige en origen
//! - `RecordError`: historial con más de una entrada por curso
//! - `GenerationError`: no hay plan válido posible para las entradas
//! - `StoreError`: fallas de persistencia e importación
//!
//! Las violaciones de un plan no son errores; ver [`crate::algorithm::ValidationResult`].

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::algorithm::Violation;
use crate::models::CourseId;

fn join_ids<'a, I: IntoIterator<Item = &'a CourseId>>(ids: I) -> String {
    ids.into_iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("prerequisite cycle involving: {}", join_ids(.0))]
    Cycle(BTreeSet<CourseId>),

    #[error("course {0} is listed more than once")]
    DuplicateCourse(CourseId),

    #[error("course {course} references unknown course {reference}")]
    UnknownReference { course: CourseId, reference: CourseId },

    #[error("course {0} must carry a positive credit weight")]
    InvalidCredits(CourseId),

    #[error("course {0} lists itself as a co-requisite")]
    SelfCorequisite(CourseId),

    #[error("invalid program: {0}")]
    InvalidProgram(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("course {0} already appears in the student record")]
    DuplicateEnrollment(CourseId),

    #[error("course {0} is in progress or planned but has no semester slot")]
    MissingSlot(CourseId),

    #[error("semester slot must be 1 or greater, got {0}")]
    InvalidSlot(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Cursos que deben compartir semestre pero no caben juntos.
    #[error("cannot schedule together: {} ({reason})", join_ids(.courses))]
    Infeasible { courses: Vec<CourseId>, reason: String },

    /// Curso que nunca puede ubicarse; `blocked` son los obligatorios que
    /// dependen de él.
    #[error("course {course} can never be scheduled: {reason}")]
    UnsatisfiableRequirement {
        course: CourseId,
        reason: String,
        blocked: Vec<CourseId>,
    },

    #[error("only {available} of {required} required credits can be planned")]
    CreditShortfall { required: u32, available: u32 },

    #[error("generated plan failed validation with {} violation(s)", .0.len())]
    Unverified(Vec<Violation>),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("unsupported store url '{0}'")]
    UnsupportedUrl(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }
}

/// Error del crate para quien encadena carga, validación y generación.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
