// Estructuras de datos principales: catálogo de cursos, historial del
// estudiante y planes por semestre.

mod course;
mod plan;
mod record;

pub use course::{Catalog, Course, CourseId, Program, Term};
pub use plan::{Plan, PlannedSemester, SemesterSlot};
pub use record::{Enrollment, EnrollmentStatus, StudentRecord};
