//! Flujo completo para un estudiante: cargar snapshots del store, validar el
//! plan registrado y generar uno nuevo sólo si hace falta.

use tracing::info;

use crate::algorithm::{generate, validate, ValidationResult, Violation};
use crate::error::Result;
use crate::models::Plan;
use crate::store::{CatalogSource, PlanArchive, SavedPlan, StudentRecordStore};

/// Resultado de `review_plan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanReview {
    /// El plan registrado del estudiante ya es válido.
    Valid(Plan),
    /// Plan generado; `replaced` son las violaciones del plan registrado
    /// (vacío si la generación fue pedida explícitamente).
    Generated { plan: Plan, replaced: Vec<Violation> },
}

impl PlanReview {
    pub fn plan(&self) -> &Plan {
        match self {
            PlanReview::Valid(plan) => plan,
            PlanReview::Generated { plan, .. } => plan,
        }
    }

    pub fn was_generated(&self) -> bool {
        matches!(self, PlanReview::Generated { .. })
    }
}

/// Resultado de `adopt_plan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adoption {
    Saved(SavedPlan),
    Rejected(Vec<Violation>),
}

/// Valida el plan registrado del estudiante (cursos en curso + planificados)
/// y genera uno nuevo cuando no es válido o cuando `regenerate` es true.
pub fn review_plan<S>(store: &S, program_id: &str, student_id: &str, regenerate: bool) -> Result<PlanReview>
where
    S: CatalogSource + StudentRecordStore + ?Sized,
{
    let catalog = store.load_catalog(program_id)?;
    let record = store.load_record(student_id)?;

    let mut replaced = Vec::new();
    if !regenerate {
        let recorded = record.recorded_plan();
        match validate(&catalog, &record, &recorded)? {
            ValidationResult::Valid => {
                info!(student = student_id, program = program_id, "recorded plan is valid");
                return Ok(PlanReview::Valid(recorded));
            }
            ValidationResult::Invalid(violations) => {
                info!(
                    student = student_id,
                    program = program_id,
                    violations = violations.len(),
                    "recorded plan is invalid, generating a new one"
                );
                replaced = violations;
            }
        }
    }

    let plan = generate(&catalog, &record)?;
    info!(student = student_id, semesters = plan.semester_count(), "plan generated");
    Ok(PlanReview::Generated { plan, replaced })
}

/// Adopta un plan candidato (por ejemplo, editado por el usuario): si es
/// válido reemplaza las entradas planificadas del historial y lo archiva.
/// Un plan inválido no toca el store.
pub fn adopt_plan<S>(store: &S, program_id: &str, student_id: &str, plan: &Plan) -> Result<Adoption>
where
    S: CatalogSource + StudentRecordStore + PlanArchive + ?Sized,
{
    let catalog = store.load_catalog(program_id)?;
    let record = store.load_record(student_id)?;

    if let ValidationResult::Invalid(violations) = validate(&catalog, &record, plan)? {
        info!(student = student_id, violations = violations.len(), "candidate plan rejected");
        return Ok(Adoption::Rejected(violations));
    }

    let updated = record.with_plan(plan)?;
    store.save_record(student_id, &updated)?;
    let saved = store.save_plan(student_id, program_id, plan)?;
    info!(student = student_id, plan_id = saved.id, "plan adopted");
    Ok(Adoption::Saved(saved))
}
