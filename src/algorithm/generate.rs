//! Generador automático de planes.
//!
//! Pipeline:
//! 1. rechazar catálogos con ciclos
//! 2. cursos objetivo = obligatorios pendientes + su clausura de
//!    prerequisitos / co-requisitos no aprobados (los cursos en curso quedan
//!    fijos en su semestre)
//! 3. completar créditos del programa con electivos si hace falta
//! 4. agrupar co-requisitos y ordenar los grupos por capas
//! 5. ubicar cada grupo en el primer semestre posible (después de sus
//!    prerequisitos, con cupo de créditos y dictado en ese periodo); los
//!    grupos con plazo por un curso en curso van antes dentro de su capa
//! 6. validar el plan resultante; un plan generado siempre es válido

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, info};

use crate::algorithm::layers::{group_corequisites, layer_groups, placement_order, CourseGroup};
use crate::algorithm::validate::{check_plan, ValidationResult};
use crate::error::GenerationError;
use crate::models::{Catalog, Course, CourseId, Plan, SemesterSlot, StudentRecord, Term};

/// Genera un plan válido con todos los cursos pendientes del estudiante.
///
/// Es determinista: mismas entradas, mismo plan. Los empates se resuelven por
/// código de curso ascendente.
pub fn generate(catalog: &Catalog, record: &StudentRecord) -> Result<Plan, GenerationError> {
    catalog.ensure_acyclic()?;

    let program = catalog.program();
    let max = program.max_credits_per_semester;
    let first_term = record
        .current_term()
        .filter(|t| program.term_at(*t, 0).is_some());

    let completed: BTreeSet<&CourseId> = record.completed().collect();
    let pinned: BTreeMap<&CourseId, SemesterSlot> = record.in_progress().collect();

    for course in pinned.keys() {
        if !catalog.contains(course) {
            return Err(GenerationError::UnsatisfiableRequirement {
                course: (*course).clone(),
                reason: "in progress but not part of the catalog".to_string(),
                blocked: Vec::new(),
            });
        }
    }

    let settled = |c: &CourseId| completed.contains(c) || pinned.contains_key(c);

    // 2) obligatorios pendientes + clausura
    let mut targets: BTreeSet<&CourseId> = BTreeSet::new();
    let seeds: Vec<&CourseId> = catalog
        .required_courses()
        .map(|c| &c.id)
        .filter(|c| !settled(*c))
        .chain(pinned.keys().copied())
        .collect();
    close_over_dependencies(catalog, seeds, &settled, &mut targets);

    for course in targets.iter() {
        if let Some(reason) = blocker(catalog, course, first_term) {
            let blocked = blocked_required(catalog, course, &settled);
            return Err(GenerationError::UnsatisfiableRequirement {
                course: (*course).clone(),
                reason,
                blocked,
            });
        }
    }

    // 3) electivos para alcanzar los créditos del programa
    let required_total = program.total_credits_required;
    let base = credit_total(catalog, completed.iter().copied())
        .saturating_add(credit_total(catalog, pinned.keys().copied()));
    let available =
        |targets: &BTreeSet<&CourseId>| base.saturating_add(credit_total(catalog, targets.iter().copied()));
    if available(&targets) < required_total {
        for elective in catalog.courses().filter(|c| !c.required) {
            if settled(&elective.id) || targets.contains(&elective.id) {
                continue;
            }
            let mut extra: BTreeSet<&CourseId> = BTreeSet::new();
            close_over_dependencies(catalog, vec![&elective.id], &settled, &mut extra);
            if let Some(c) = extra.iter().find(|c| blocker(catalog, c, first_term).is_some()) {
                debug!(elective = %elective.id, blocked_by = %c, "skipping elective that cannot be scheduled");
                continue;
            }
            if let Err(e) = elective_fits(catalog, &targets, &extra, &pinned, max, first_term) {
                debug!(elective = %elective.id, error = %e, "skipping elective whose group cannot be scheduled");
                continue;
            }
            debug!(elective = %elective.id, added = extra.len(), "adding elective to reach program credits");
            targets.extend(extra);
            if available(&targets) >= required_total {
                break;
            }
        }
        let reached = available(&targets);
        if reached < required_total {
            return Err(GenerationError::CreditShortfall {
                required: required_total,
                available: reached,
            });
        }
    }

    // 4) grupos y capas
    let mut scope = targets.clone();
    scope.extend(pinned.keys().copied());
    let groups = group_corequisites(catalog, &scope, &pinned)?;
    let layers = layer_groups(&groups)?;
    debug!(
        program = %program.id,
        courses = scope.len(),
        groups = groups.len(),
        layers = layers.len(),
        "layered ordering computed"
    );

    // 5) ubicación
    let mut load: BTreeMap<SemesterSlot, u32> = BTreeMap::new();
    for g in groups.iter() {
        check_group_fits(catalog, g, max, first_term)?;
        if let Some(slot) = g.pinned {
            if !offered_together(catalog, g, term_for(catalog, first_term, slot)) {
                return Err(GenerationError::Infeasible {
                    courses: g.member_ids(),
                    reason: format!("in progress in semester {} but not offered in that term", slot),
                });
            }
            let l = load.entry(slot).or_insert(0);
            *l = l.saturating_add(g.credits);
            if *l > max {
                return Err(GenerationError::Infeasible {
                    courses: pinned_in(&groups, slot),
                    reason: format!("courses in progress in semester {} exceed {} credits", slot, max),
                });
            }
        }
    }

    let mut placed: BTreeMap<&CourseId, SemesterSlot> = BTreeMap::new();
    let mut plan = Plan::new();
    let window = program.term_sequence.len() as u32 + 1;

    for gi in placement_order(&groups, &layers) {
        let group = &groups[gi];
        let mut earliest = SemesterSlot::FIRST;
        for prev in group.prerequisites.iter().filter_map(|p| placed.get(p)) {
            let Some(after) = prev.checked_next() else {
                return Err(GenerationError::Infeasible {
                    courses: group.member_ids(),
                    reason: format!("no semester after {} is left for them", prev),
                });
            };
            earliest = earliest.max(after);
        }

        let slot = match group.pinned {
            Some(slot) => {
                if slot < earliest {
                    return Err(GenerationError::Infeasible {
                        courses: group.member_ids(),
                        reason: format!(
                            "in progress in semester {} but prerequisites only fit by semester {}",
                            slot, earliest
                        ),
                    });
                }
                slot
            }
            None => {
                let last_used = load.keys().next_back().copied().unwrap_or(SemesterSlot::FIRST);
                let limit = earliest.get().max(last_used.get()).saturating_add(window);
                let found = (earliest.get()..=limit)
                    .filter_map(SemesterSlot::new)
                    .find(|s| {
                        load.get(s).copied().unwrap_or(0).saturating_add(group.credits) <= max
                            && offered_together(catalog, group, term_for(catalog, first_term, *s))
                    });
                let Some(slot) = found else {
                    return Err(GenerationError::Infeasible {
                        courses: group.member_ids(),
                        reason: format!("no semester between {} and {} can host them", earliest, limit),
                    });
                };
                let l = load.entry(slot).or_insert(0);
                *l = l.saturating_add(group.credits);
                slot
            }
        };

        for m in group.members.iter() {
            placed.insert(*m, slot);
            plan.assign(slot, (*m).clone());
        }
    }

    // 6) post-condición
    match check_plan(catalog, record, &plan) {
        ValidationResult::Valid => {
            info!(
                program = %program.id,
                courses = scope.len(),
                semesters = plan.semester_count(),
                "plan generated"
            );
            Ok(plan)
        }
        ValidationResult::Invalid(violations) => {
            error!(
                program = %program.id,
                violations = violations.len(),
                "generated plan failed validation"
            );
            Err(GenerationError::Unverified(violations))
        }
    }
}

/// Agrega a `out` los cursos de `seeds` no resueltos y, transitivamente, sus
/// prerequisitos y co-requisitos no resueltos.
fn close_over_dependencies<'a>(
    catalog: &'a Catalog,
    seeds: Vec<&'a CourseId>,
    settled: &dyn Fn(&CourseId) -> bool,
    out: &mut BTreeSet<&'a CourseId>,
) {
    let mut stack = seeds;
    while let Some(id) = stack.pop() {
        let Some(course) = catalog.get(id) else { continue };
        if !settled(id) && !out.insert(&course.id) {
            continue;
        }
        for dep in course.prerequisites.iter().chain(course.corequisites.iter()) {
            if !settled(dep) && !out.contains(dep) {
                stack.push(dep);
            }
        }
    }
}

fn credit_total<'a, I: IntoIterator<Item = &'a CourseId>>(catalog: &Catalog, ids: I) -> u32 {
    ids.into_iter().map(|c| catalog.credits_of(c)).fold(0, u32::saturating_add)
}

/// Verifica que los grupos de co-requisitos que tocaría un electivo (con sus
/// cursos arrastrados) quepan en un semestre y no formen ciclos entre grupos.
fn elective_fits<'a>(
    catalog: &'a Catalog,
    targets: &BTreeSet<&'a CourseId>,
    extra: &BTreeSet<&'a CourseId>,
    pinned: &BTreeMap<&'a CourseId, SemesterSlot>,
    max: u32,
    first_term: Option<Term>,
) -> Result<(), GenerationError> {
    let mut scope = targets.clone();
    scope.extend(extra.iter().copied());
    scope.extend(pinned.keys().copied());
    let groups = group_corequisites(catalog, &scope, pinned)?;
    for g in groups.iter().filter(|g| g.members.iter().any(|m| extra.contains(m))) {
        check_group_fits(catalog, g, max, first_term)?;
    }
    layer_groups(&groups)?;
    Ok(())
}

fn term_for(catalog: &Catalog, first: Option<Term>, slot: SemesterSlot) -> Option<Term> {
    first.and_then(|t| catalog.program().term_at(t, slot.index()))
}

fn offered_together(catalog: &Catalog, group: &CourseGroup<'_>, term: Option<Term>) -> bool {
    let Some(term) = term else { return true };
    group
        .members
        .iter()
        .filter_map(|m| catalog.get(m))
        .all(|c| c.is_offered_in(term))
}

fn offered_in_sequence(catalog: &Catalog, course: &Course) -> bool {
    catalog
        .program()
        .term_sequence
        .iter()
        .any(|t| course.is_offered_in(*t))
}

/// Motivo por el que un curso nunca podría ubicarse, si lo hay.
fn blocker(catalog: &Catalog, id: &CourseId, first_term: Option<Term>) -> Option<String> {
    let course = catalog.get(id)?;
    let max = catalog.max_credits_per_semester();
    if course.credits > max {
        return Some(format!(
            "needs {} credits but a semester allows at most {}",
            course.credits, max
        ));
    }
    if first_term.is_some() && !offered_in_sequence(catalog, course) {
        return Some("not offered in any term of the program calendar".to_string());
    }
    None
}

fn check_group_fits(
    catalog: &Catalog,
    group: &CourseGroup<'_>,
    max: u32,
    first_term: Option<Term>,
) -> Result<(), GenerationError> {
    if group.members.len() > 1 && group.credits > max {
        return Err(GenerationError::Infeasible {
            courses: group.member_ids(),
            reason: format!(
                "co-requisites add up to {} credits, above the {} credit cap",
                group.credits, max
            ),
        });
    }
    if first_term.is_some()
        && group.pinned.is_none()
        && !catalog
            .program()
            .term_sequence
            .iter()
            .any(|t| offered_together(catalog, group, Some(*t)))
    {
        return Err(GenerationError::Infeasible {
            courses: group.member_ids(),
            reason: "co-requisites are never offered in the same term".to_string(),
        });
    }
    Ok(())
}

/// Obligatorios pendientes que dependen (directa o transitivamente) de `id`.
fn blocked_required(
    catalog: &Catalog,
    id: &CourseId,
    settled: &dyn Fn(&CourseId) -> bool,
) -> Vec<CourseId> {
    catalog
        .required_courses()
        .filter(|c| !settled(&c.id))
        .filter(|c| {
            let mut closure = BTreeSet::new();
            close_over_dependencies(catalog, vec![&c.id], settled, &mut closure);
            closure.contains(id)
        })
        .map(|c| c.id.clone())
        .collect()
}

fn pinned_in(groups: &[CourseGroup<'_>], slot: SemesterSlot) -> Vec<CourseId> {
    groups
        .iter()
        .filter(|g| g.pinned == Some(slot))
        .flat_map(|g| g.member_ids())
        .collect()
}
