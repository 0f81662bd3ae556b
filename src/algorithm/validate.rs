//! Validador de planes.
//!
//! Revisa un plan completo contra el catálogo y el historial del estudiante y
//! devuelve TODAS las violaciones encontradas en una sola pasada, en un orden
//! estable:
//!
//! 1. asignaciones duplicadas
//! 2. por semestre (ascendente) y por curso (ascendente): curso desconocido,
//!    prerequisitos, co-requisitos, oferta del periodo
//! 3. sobrecarga de créditos por semestre
//! 4. cursos en curso movidos o ausentes
//! 5. cobertura de cursos obligatorios
//! 6. créditos totales del programa

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::models::{Catalog, CourseId, Plan, SemesterSlot, StudentRecord, Term};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    PrerequisiteUnmet {
        course: CourseId,
        slot: SemesterSlot,
        prerequisite: CourseId,
    },
    CoRequisiteMissing {
        course: CourseId,
        slot: SemesterSlot,
        corequisite: CourseId,
    },
    DuplicateAssignment {
        course: CourseId,
        slots: Vec<SemesterSlot>,
        also_completed: bool,
    },
    CreditOverload {
        slot: SemesterSlot,
        credits: u32,
        max: u32,
    },
    IncompleteCoverage {
        course: CourseId,
    },
    UnknownCourse {
        course: CourseId,
        slot: SemesterSlot,
        suggestion: Option<CourseId>,
    },
    TermUnavailable {
        course: CourseId,
        slot: SemesterSlot,
        term: Term,
    },
    InProgressMismatch {
        course: CourseId,
        recorded: SemesterSlot,
        planned: Option<SemesterSlot>,
    },
    CreditShortfall {
        planned: u32,
        required: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    PrerequisiteUnmet,
    CoRequisiteMissing,
    DuplicateAssignment,
    CreditOverload,
    IncompleteCoverage,
    UnknownCourse,
    TermUnavailable,
    InProgressMismatch,
    CreditShortfall,
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::PrerequisiteUnmet { .. } => ViolationKind::PrerequisiteUnmet,
            Violation::CoRequisiteMissing { .. } => ViolationKind::CoRequisiteMissing,
            Violation::DuplicateAssignment { .. } => ViolationKind::DuplicateAssignment,
            Violation::CreditOverload { .. } => ViolationKind::CreditOverload,
            Violation::IncompleteCoverage { .. } => ViolationKind::IncompleteCoverage,
            Violation::UnknownCourse { .. } => ViolationKind::UnknownCourse,
            Violation::TermUnavailable { .. } => ViolationKind::TermUnavailable,
            Violation::InProgressMismatch { .. } => ViolationKind::InProgressMismatch,
            Violation::CreditShortfall { .. } => ViolationKind::CreditShortfall,
        }
    }

    /// Curso afectado, si la violación apunta a uno.
    pub fn course(&self) -> Option<&CourseId> {
        match self {
            Violation::PrerequisiteUnmet { course, .. }
            | Violation::CoRequisiteMissing { course, .. }
            | Violation::DuplicateAssignment { course, .. }
            | Violation::IncompleteCoverage { course }
            | Violation::UnknownCourse { course, .. }
            | Violation::TermUnavailable { course, .. }
            | Violation::InProgressMismatch { course, .. } => Some(course),
            Violation::CreditOverload { .. } | Violation::CreditShortfall { .. } => None,
        }
    }

    /// Semestre afectado, si la violación apunta a uno.
    pub fn slot(&self) -> Option<SemesterSlot> {
        match self {
            Violation::PrerequisiteUnmet { slot, .. }
            | Violation::CoRequisiteMissing { slot, .. }
            | Violation::CreditOverload { slot, .. }
            | Violation::UnknownCourse { slot, .. }
            | Violation::TermUnavailable { slot, .. } => Some(*slot),
            Violation::InProgressMismatch { planned, .. } => *planned,
            Violation::DuplicateAssignment { slots, .. } => slots.first().copied(),
            Violation::IncompleteCoverage { .. } | Violation::CreditShortfall { .. } => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::PrerequisiteUnmet { course, slot, prerequisite } => write!(
                f,
                "{course} in semester {slot} needs {prerequisite} completed or planned earlier"
            ),
            Violation::CoRequisiteMissing { course, slot, corequisite } => write!(
                f,
                "{course} in semester {slot} must be taken together with {corequisite}"
            ),
            Violation::DuplicateAssignment { course, slots, also_completed } => {
                let list = slots.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");
                if *also_completed {
                    write!(f, "{course} is already completed but planned in semester(s) {list}")
                } else {
                    write!(f, "{course} is planned in several semesters: {list}")
                }
            }
            Violation::CreditOverload { slot, credits, max } => {
                write!(f, "semester {slot} carries {credits} credits (max {max})")
            }
            Violation::IncompleteCoverage { course } => {
                write!(f, "required course {course} is neither completed nor planned")
            }
            Violation::UnknownCourse { course, slot, suggestion } => match suggestion {
                Some(s) => write!(f, "{course} in semester {slot} is not in the catalog (did you mean {s}?)"),
                None => write!(f, "{course} in semester {slot} is not in the catalog"),
            },
            Violation::TermUnavailable { course, slot, term } => {
                write!(f, "{course} is not offered in {term} (semester {slot})")
            }
            Violation::InProgressMismatch { course, recorded, planned } => match planned {
                Some(p) => write!(f, "{course} is in progress in semester {recorded} but planned in {p}"),
                None => write!(f, "{course} is in progress in semester {recorded} but missing from the plan"),
            },
            Violation::CreditShortfall { planned, required } => {
                write!(f, "plan reaches {planned} of {required} required credits")
            }
        }
    }
}

/// Resultado de validar un plan: válido o la lista no vacía de violaciones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "violations", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(violations)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid(v) => v,
        }
    }

    pub fn has(&self, kind: ViolationKind) -> bool {
        self.violations().iter().any(|v| v.kind() == kind)
    }
}

/// Valida `plan` para el estudiante `record` contra `catalog`.
///
/// Un catálogo con ciclos se rechaza con `CatalogError` antes de revisar el
/// plan.
pub fn validate(
    catalog: &Catalog,
    record: &StudentRecord,
    plan: &Plan,
) -> Result<ValidationResult, CatalogError> {
    catalog.ensure_acyclic()?;
    Ok(check_plan(catalog, record, plan))
}

/// Valida varios planes candidatos en paralelo (hilos con scope, uno por CPU).
/// Los resultados quedan en el mismo orden que `plans`.
pub fn validate_many(
    catalog: &Catalog,
    record: &StudentRecord,
    plans: &[Plan],
) -> Result<Vec<ValidationResult>, CatalogError> {
    catalog.ensure_acyclic()?;
    if plans.is_empty() {
        return Ok(Vec::new());
    }

    let workers = num_cpus::get().clamp(1, plans.len());
    let chunk = plans.len().div_ceil(workers);
    debug!(plans = plans.len(), workers, "validating candidate plans");

    let results: Vec<ValidationResult> = thread::scope(|scope| {
        let handles: Vec<_> = plans
            .chunks(chunk)
            .map(|batch| {
                scope.spawn(move || {
                    batch
                        .iter()
                        .map(|p| check_plan(catalog, record, p))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });
    Ok(results)
}

/// Validación sin chequeo de ciclos; quien llama ya lo hizo.
pub(crate) fn check_plan(catalog: &Catalog, record: &StudentRecord, plan: &Plan) -> ValidationResult {
    let mut out: Vec<Violation> = Vec::new();

    // Índice curso -> semestres donde aparece (ordenados).
    let mut placements: BTreeMap<&CourseId, Vec<SemesterSlot>> = BTreeMap::new();
    for (slot, courses) in plan.iter() {
        for c in courses {
            placements.entry(c).or_default().push(slot);
        }
    }

    let first_term = record.current_term();
    if let Some(t) = first_term {
        if catalog.program().term_at(t, 0).is_none() {
            warn!(term = %t, program = %catalog.program().id, "current term is not part of the program term sequence, skipping offering checks");
        }
    }
    let term_of = |slot: SemesterSlot| first_term.and_then(|t| catalog.program().term_at(t, slot.index()));

    // 1) duplicados
    for (course, slots) in placements.iter() {
        let also_completed = record.is_completed(course);
        if slots.len() > 1 || also_completed {
            out.push(Violation::DuplicateAssignment {
                course: (*course).clone(),
                slots: slots.clone(),
                also_completed,
            });
        }
    }

    // 2) chequeos por curso
    for (slot, courses) in plan.iter() {
        for course in courses {
            let Some(def) = catalog.get(course) else {
                out.push(Violation::UnknownCourse {
                    course: course.clone(),
                    slot,
                    suggestion: catalog.closest_code(course.as_str()),
                });
                continue;
            };

            for prereq in def.prerequisites.iter() {
                let satisfied = record.is_completed(prereq)
                    || placements
                        .get(prereq)
                        .and_then(|s| s.first())
                        .is_some_and(|earliest| *earliest < slot);
                if !satisfied {
                    out.push(Violation::PrerequisiteUnmet {
                        course: course.clone(),
                        slot,
                        prerequisite: prereq.clone(),
                    });
                }
            }

            for coreq in def.corequisites.iter() {
                let satisfied = record.is_completed(coreq)
                    || placements.get(coreq).is_some_and(|s| s.contains(&slot));
                if !satisfied {
                    out.push(Violation::CoRequisiteMissing {
                        course: course.clone(),
                        slot,
                        corequisite: coreq.clone(),
                    });
                }
            }

            if let Some(term) = term_of(slot) {
                if !def.is_offered_in(term) {
                    out.push(Violation::TermUnavailable {
                        course: course.clone(),
                        slot,
                        term,
                    });
                }
            }
        }
    }

    // 3) carga por semestre
    let max = catalog.max_credits_per_semester();
    for (slot, _) in plan.iter() {
        let credits = plan.credits_in(slot, catalog);
        if credits > max {
            out.push(Violation::CreditOverload { slot, credits, max });
        }
    }

    // 4) cursos en curso
    for (course, recorded) in record.in_progress() {
        let slots = placements.get(course);
        if !slots.is_some_and(|s| s.contains(&recorded)) {
            out.push(Violation::InProgressMismatch {
                course: course.clone(),
                recorded,
                planned: slots.and_then(|s| s.first().copied()),
            });
        }
    }

    // 5) cobertura
    for course in catalog.required_courses() {
        if !record.is_completed(&course.id) && !placements.contains_key(&course.id) {
            out.push(Violation::IncompleteCoverage {
                course: course.id.clone(),
            });
        }
    }

    // 6) créditos totales
    let required = catalog.program().total_credits_required;
    if required > 0 {
        let counted: BTreeSet<&CourseId> = record.completed().chain(placements.keys().copied()).collect();
        let planned = counted
            .into_iter()
            .map(|c| catalog.credits_of(c))
            .fold(0, u32::saturating_add);
        if planned < required {
            out.push(Violation::CreditShortfall { planned, required });
        }
    }

    debug!(
        program = %catalog.program().id,
        semesters = plan.semester_count(),
        violations = out.len(),
        "plan checked"
    );
    ValidationResult::from_violations(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Program};

    fn slot(n: u32) -> SemesterSlot {
        SemesterSlot::new(n).unwrap()
    }

    #[test]
    fn violations_keep_their_kind_and_course() {
        let v = Violation::PrerequisiteUnmet {
            course: CourseId::new("B"),
            slot: slot(1),
            prerequisite: CourseId::new("A"),
        };
        assert_eq!(v.kind(), ViolationKind::PrerequisiteUnmet);
        assert_eq!(v.course(), Some(&CourseId::new("B")));
        assert_eq!(v.slot(), Some(slot(1)));
        assert!(v.to_string().contains("needs A"));
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let r = ValidationResult::from_violations(vec![Violation::IncompleteCoverage {
            course: CourseId::new("X"),
        }]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "invalid");
        assert_eq!(json["violations"][0]["kind"], "incomplete_coverage");
        assert_eq!(serde_json::to_value(ValidationResult::Valid).unwrap()["status"], "valid");
    }

    #[test]
    fn credits_of_unknown_courses_do_not_count() {
        let catalog = Catalog::new(Program::new("p", 3), vec![Course::new("A", 3)]).unwrap();
        let plan = Plan::new().with_course(slot(1), "A").with_course(slot(1), "ZZZ");
        let r = check_plan(&catalog, &StudentRecord::new(), &plan);
        assert!(!r.has(ViolationKind::CreditOverload));
        assert!(r.has(ViolationKind::UnknownCourse));
    }
}
