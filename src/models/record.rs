use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::models::{CourseId, Plan, SemesterSlot, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Completed,
    InProgress,
    Planned,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::InProgress => "in_progress",
            EnrollmentStatus::Planned => "planned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "completed" => Some(EnrollmentStatus::Completed),
            "in_progress" => Some(EnrollmentStatus::InProgress),
            "planned" => Some(EnrollmentStatus::Planned),
            _ => None,
        }
    }
}

/// Estado de un curso en el historial del estudiante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enrollment {
    Completed,
    InProgress(SemesterSlot),
    Planned(SemesterSlot),
}

impl Enrollment {
    pub fn status(self) -> EnrollmentStatus {
        match self {
            Enrollment::Completed => EnrollmentStatus::Completed,
            Enrollment::InProgress(_) => EnrollmentStatus::InProgress,
            Enrollment::Planned(_) => EnrollmentStatus::Planned,
        }
    }

    pub fn slot(self) -> Option<SemesterSlot> {
        match self {
            Enrollment::Completed => None,
            Enrollment::InProgress(s) | Enrollment::Planned(s) => Some(s),
        }
    }

    pub fn from_parts(status: EnrollmentStatus, slot: Option<SemesterSlot>) -> Option<Self> {
        match (status, slot) {
            (EnrollmentStatus::Completed, _) => Some(Enrollment::Completed),
            (EnrollmentStatus::InProgress, Some(s)) => Some(Enrollment::InProgress(s)),
            (EnrollmentStatus::Planned, Some(s)) => Some(Enrollment::Planned(s)),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RecordEntry {
    course: CourseId,
    status: EnrollmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slot: Option<SemesterSlot>,
}

#[derive(Serialize, Deserialize)]
struct RecordRepr {
    #[serde(default)]
    current_term: Option<Term>,
    #[serde(default)]
    courses: Vec<RecordEntry>,
}

/// Historial académico de un estudiante: cada curso aparece a lo más una vez.
///
/// `current_term` es el periodo que corresponde al slot 1 de los planes; sin
/// él no se revisa la oferta por periodo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr", into = "RecordRepr")]
pub struct StudentRecord {
    current_term: Option<Term>,
    enrollments: BTreeMap<CourseId, Enrollment>,
}

impl StudentRecord {
    pub fn new() -> Self {
        StudentRecord::default()
    }

    pub fn with_current_term(mut self, term: Term) -> Self {
        self.current_term = Some(term);
        self
    }

    pub fn current_term(&self) -> Option<Term> {
        self.current_term
    }

    pub fn set_current_term(&mut self, term: Option<Term>) {
        self.current_term = term;
    }

    /// Registro con los cursos dados como aprobados.
    pub fn with_completed<I, C>(courses: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = C>,
        C: Into<CourseId>,
    {
        let mut record = StudentRecord::new();
        for c in courses {
            record.complete(c)?;
        }
        Ok(record)
    }

    pub fn insert(&mut self, course: impl Into<CourseId>, enrollment: Enrollment) -> Result<(), RecordError> {
        let course = course.into();
        if self.enrollments.contains_key(&course) {
            return Err(RecordError::DuplicateEnrollment(course));
        }
        self.enrollments.insert(course, enrollment);
        Ok(())
    }

    pub fn complete(&mut self, course: impl Into<CourseId>) -> Result<(), RecordError> {
        self.insert(course, Enrollment::Completed)
    }

    pub fn enroll(&mut self, course: impl Into<CourseId>, slot: SemesterSlot) -> Result<(), RecordError> {
        self.insert(course, Enrollment::InProgress(slot))
    }

    pub fn plan(&mut self, course: impl Into<CourseId>, slot: SemesterSlot) -> Result<(), RecordError> {
        self.insert(course, Enrollment::Planned(slot))
    }

    pub fn enrollment(&self, course: &CourseId) -> Option<Enrollment> {
        self.enrollments.get(course).copied()
    }

    pub fn is_completed(&self, course: &CourseId) -> bool {
        matches!(self.enrollments.get(course), Some(Enrollment::Completed))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CourseId, Enrollment)> {
        self.enrollments.iter().map(|(c, e)| (c, *e))
    }

    pub fn completed(&self) -> impl Iterator<Item = &CourseId> {
        self.iter()
            .filter(|(_, e)| *e == Enrollment::Completed)
            .map(|(c, _)| c)
    }

    pub fn in_progress(&self) -> impl Iterator<Item = (&CourseId, SemesterSlot)> {
        self.iter().filter_map(|(c, e)| match e {
            Enrollment::InProgress(s) => Some((c, s)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.enrollments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrollments.is_empty()
    }

    /// Plan formado por los cursos en curso y planificados del historial.
    pub fn recorded_plan(&self) -> Plan {
        self.iter()
            .filter_map(|(c, e)| e.slot().map(|s| (s, c.clone())))
            .collect()
    }

    /// Nuevo registro donde las entradas planificadas se reemplazan por `plan`.
    /// Los cursos aprobados y en curso se conservan; un curso del plan que ya
    /// está aprobado o en curso en otro semestre es un error.
    pub fn with_plan(&self, plan: &Plan) -> Result<StudentRecord, RecordError> {
        let mut next = StudentRecord {
            current_term: self.current_term,
            enrollments: self
                .enrollments
                .iter()
                .filter(|(_, e)| !matches!(e, Enrollment::Planned(_)))
                .map(|(c, e)| (c.clone(), *e))
                .collect(),
        };
        for (slot, courses) in plan.iter() {
            for course in courses {
                match next.enrollments.get(course) {
                    Some(Enrollment::InProgress(s)) if *s == slot => continue,
                    Some(_) => return Err(RecordError::DuplicateEnrollment(course.clone())),
                    None => {
                        next.enrollments.insert(course.clone(), Enrollment::Planned(slot));
                    }
                }
            }
        }
        Ok(next)
    }
}

impl TryFrom<RecordRepr> for StudentRecord {
    type Error = RecordError;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        let mut record = StudentRecord::new();
        record.current_term = repr.current_term;
        for entry in repr.courses {
            let enrollment = Enrollment::from_parts(entry.status, entry.slot)
                .ok_or_else(|| RecordError::MissingSlot(entry.course.clone()))?;
            record.insert(entry.course, enrollment)?;
        }
        Ok(record)
    }
}

impl From<StudentRecord> for RecordRepr {
    fn from(r: StudentRecord) -> Self {
        RecordRepr {
            current_term: r.current_term,
            courses: r
                .enrollments
                .into_iter()
                .map(|(course, e)| RecordEntry {
                    course,
                    status: e.status(),
                    slot: e.slot(),
                })
                .collect(),
        }
    }
}
