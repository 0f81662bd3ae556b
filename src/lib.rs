// Biblioteca raíz del crate `degreepath`.
// Motor de planes de carrera: catálogo de cursos con prerequisitos, validación
// de planes por semestre y generación automática de un plan válido.
// Los snapshots (catálogo, historial) se cargan desde `store` y se pasan como
// parámetros; el núcleo no guarda estado compartido.

pub mod algorithm;
pub mod catalog;
pub mod config;
pub mod error;
pub mod excel;
pub mod logging;
pub mod models;
pub mod planner;
pub mod store;

pub use algorithm::{generate, validate, validate_many, ValidationResult, Violation, ViolationKind};
pub use catalog::detect_cycles;
pub use config::Config;
pub use error::{CatalogError, Error, GenerationError, RecordError, Result, StoreError};
pub use models::{
    Catalog, Course, CourseId, Enrollment, EnrollmentStatus, Plan, PlannedSemester, Program, SemesterSlot,
    StudentRecord, Term,
};
pub use planner::{adopt_plan, review_plan, Adoption, PlanReview};
pub use store::{open_store, CatalogSource, JsonStore, PlanArchive, PlanStore, SavedPlan, SqliteStore, StudentRecordStore};
