// Agrupación por co-requisitos y orden topológico por capas.
//
// Un grupo es una componente conexa de la relación de co-requisitos dentro de
// los cursos a planificar: todos sus miembros van al mismo semestre. Las capas
// se calculan sobre los grupos: capa 0 = grupos sin prerequisitos pendientes,
// capa k = grupos cuyos prerequisitos están todos en capas < k.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::unionfind::UnionFind;

use crate::error::GenerationError;
use crate::models::{Catalog, CourseId, SemesterSlot};

#[derive(Debug, Clone)]
pub(crate) struct CourseGroup<'a> {
    /// Ordenados ascendentemente; `members[0]` es el ancla del grupo.
    pub members: Vec<&'a CourseId>,
    pub credits: u32,
    /// Semestre fijado por un curso en curso dentro del grupo.
    pub pinned: Option<SemesterSlot>,
    /// Prerequisitos fuera del grupo que también hay que planificar.
    pub prerequisites: BTreeSet<&'a CourseId>,
}

impl CourseGroup<'_> {
    pub fn member_ids(&self) -> Vec<CourseId> {
        self.members.iter().map(|c| (*c).clone()).collect()
    }
}

/// Arma los grupos de co-requisitos de `scope` (cursos a planificar más los
/// cursos en curso). Los grupos salen ordenados por su ancla.
pub(crate) fn group_corequisites<'a>(
    catalog: &'a Catalog,
    scope: &BTreeSet<&'a CourseId>,
    pinned: &BTreeMap<&'a CourseId, SemesterSlot>,
) -> Result<Vec<CourseGroup<'a>>, GenerationError> {
    let ids: Vec<&CourseId> = scope.iter().copied().collect();
    let index: BTreeMap<&CourseId, usize> = ids.iter().enumerate().map(|(i, c)| (*c, i)).collect();

    let mut uf: UnionFind<usize> = UnionFind::new(ids.len());
    for (i, id) in ids.iter().enumerate() {
        let Some(course) = catalog.get(id) else { continue };
        for coreq in course.corequisites.iter() {
            if let Some(&j) = index.get(coreq) {
                uf.union(i, j);
            }
        }
    }

    let mut by_root: BTreeMap<usize, Vec<&CourseId>> = BTreeMap::new();
    for (i, root) in uf.into_labeling().into_iter().enumerate() {
        by_root.entry(root).or_default().push(ids[i]);
    }

    let mut groups: Vec<CourseGroup> = Vec::with_capacity(by_root.len());
    for (_, mut members) in by_root {
        members.sort();
        let member_set: BTreeSet<&CourseId> = members.iter().copied().collect();

        let pinned_slots: BTreeSet<SemesterSlot> =
            members.iter().filter_map(|c| pinned.get(c).copied()).collect();
        if pinned_slots.len() > 1 {
            return Err(GenerationError::Infeasible {
                courses: members.iter().map(|c| (*c).clone()).collect(),
                reason: "co-requisites are in progress in different semesters".to_string(),
            });
        }

        let mut prerequisites = BTreeSet::new();
        for member in members.iter() {
            let Some(course) = catalog.get(member) else { continue };
            for prereq in course.prerequisites.iter() {
                if member_set.contains(prereq) {
                    return Err(GenerationError::Infeasible {
                        courses: members.iter().map(|c| (*c).clone()).collect(),
                        reason: format!(
                            "{} must precede {} but both have to share a semester",
                            prereq, member
                        ),
                    });
                }
                if let Some(p) = scope.get(prereq) {
                    prerequisites.insert(*p);
                }
            }
        }

        let credits = members
            .iter()
            .map(|c| catalog.credits_of(c))
            .fold(0, u32::saturating_add);
        groups.push(CourseGroup {
            members,
            credits,
            pinned: pinned_slots.into_iter().next(),
            prerequisites,
        });
    }

    groups.sort_by(|a, b| a.members.cmp(&b.members));
    Ok(groups)
}

/// Para cada grupo, los índices de los grupos que son sus prerequisitos.
pub(crate) fn group_dependencies(groups: &[CourseGroup<'_>]) -> Vec<BTreeSet<usize>> {
    let mut group_of: BTreeMap<&CourseId, usize> = BTreeMap::new();
    for (gi, g) in groups.iter().enumerate() {
        for m in g.members.iter() {
            group_of.insert(*m, gi);
        }
    }

    groups
        .iter()
        .enumerate()
        .map(|(gi, g)| {
            g.prerequisites
                .iter()
                .filter_map(|p| group_of.get(p).copied())
                .filter(|d| *d != gi)
                .collect()
        })
        .collect()
}

/// Orden por capas de los grupos (índices en `groups`). Dentro de cada capa
/// los grupos quedan por ancla ascendente.
pub(crate) fn layer_groups(groups: &[CourseGroup<'_>]) -> Result<Vec<Vec<usize>>, GenerationError> {
    let deps = group_dependencies(groups);

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
    for (gi, ds) in deps.iter().enumerate() {
        for d in ds {
            dependents[*d].push(gi);
        }
    }

    let mut pending: Vec<usize> = deps.iter().map(|d| d.len()).collect();
    let mut current: Vec<usize> = (0..groups.len()).filter(|gi| pending[*gi] == 0).collect();
    let mut layers: Vec<Vec<usize>> = Vec::new();
    let mut seen = 0usize;

    while !current.is_empty() {
        seen += current.len();
        let mut next: Vec<usize> = Vec::new();
        for gi in current.iter() {
            for dep in dependents[*gi].iter() {
                pending[*dep] -= 1;
                if pending[*dep] == 0 {
                    next.push(*dep);
                }
            }
        }
        next.sort_unstable();
        layers.push(current);
        current = next;
    }

    if seen < groups.len() {
        // Con un catálogo acíclico esto sólo ocurre si juntar co-requisitos
        // cierra un ciclo (A co-req B, A -> C -> B).
        let stuck: Vec<CourseId> = (0..groups.len())
            .filter(|gi| pending[*gi] > 0)
            .flat_map(|gi| groups[gi].member_ids())
            .collect();
        return Err(GenerationError::Infeasible {
            courses: stuck,
            reason: "co-requisite grouping forms a prerequisite loop".to_string(),
        });
    }

    Ok(layers)
}

/// Orden en que se ubican los grupos: respeta los prerequisitos y, entre los
/// grupos listos, toma primero el de plazo más cercano (capa y ancla
/// desempatan).
///
/// El plazo de un grupo fijado es su semestre; el de un prerequisito es el
/// plazo de quien depende de él menos uno. Sin cursos en curso el orden es
/// exactamente el de las capas.
pub(crate) fn placement_order(groups: &[CourseGroup<'_>], layers: &[Vec<usize>]) -> Vec<usize> {
    let deps = group_dependencies(groups);

    let mut deadline: Vec<Option<i64>> = groups
        .iter()
        .map(|g| g.pinned.map(|s| i64::from(s.get())))
        .collect();
    // capas al revés: los dependientes ya tienen su plazo final
    for layer in layers.iter().rev() {
        for &gi in layer {
            let Some(d) = deadline[gi] else { continue };
            for &p in deps[gi].iter() {
                let bound = d - 1;
                deadline[p] = Some(deadline[p].map_or(bound, |x| x.min(bound)));
            }
        }
    }

    let mut layer_of = vec![0usize; groups.len()];
    for (li, layer) in layers.iter().enumerate() {
        for &gi in layer {
            layer_of[gi] = li;
        }
    }

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
    for (gi, ds) in deps.iter().enumerate() {
        for &d in ds {
            dependents[d].push(gi);
        }
    }

    let key = |gi: usize| (deadline[gi].unwrap_or(i64::MAX), layer_of[gi], gi);
    let mut pending: Vec<usize> = deps.iter().map(|d| d.len()).collect();
    let mut ready: BTreeSet<(i64, usize, usize)> =
        (0..groups.len()).filter(|gi| pending[*gi] == 0).map(key).collect();

    let mut order = Vec::with_capacity(groups.len());
    while let Some((_, _, gi)) = ready.pop_first() {
        order.push(gi);
        for &dep in dependents[gi].iter() {
            pending[dep] -= 1;
            if pending[dep] == 0 {
                ready.insert(key(dep));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Program};

    fn catalog(courses: Vec<Course>) -> Catalog {
        Catalog::new(Program::new("p", 12), courses).unwrap()
    }

    #[test]
    fn corequisites_end_up_in_one_group() {
        let cat = catalog(vec![
            Course::new("A", 3).with_corequisites(["B"]),
            Course::new("B", 1),
            Course::new("C", 3).with_prerequisites(["A"]),
        ]);
        let scope: BTreeSet<&CourseId> = cat.course_ids().collect();
        let groups = group_corequisites(&cat, &scope, &BTreeMap::new()).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].member_ids(), vec![CourseId::new("A"), CourseId::new("B")]);
        assert_eq!(groups[0].credits, 4);

        let layers = layer_groups(&groups).unwrap();
        assert_eq!(layers, vec![vec![0], vec![1]]);
    }

    #[test]
    fn groups_feeding_an_in_progress_course_go_first() {
        let cat = catalog(vec![
            Course::new("A", 3),
            Course::new("B", 3),
            Course::new("C", 3).with_prerequisites(["B"]),
        ]);
        let scope: BTreeSet<&CourseId> = cat.course_ids().collect();
        let c = CourseId::new("C");
        let pinned: BTreeMap<&CourseId, SemesterSlot> = [(&c, SemesterSlot::new(2).unwrap())].into_iter().collect();
        let groups = group_corequisites(&cat, &scope, &pinned).unwrap();
        let layers = layer_groups(&groups).unwrap();
        assert_eq!(layers, vec![vec![0, 1], vec![2]]);

        // B (plazo 1) antes que A (sin plazo)
        assert_eq!(placement_order(&groups, &layers), vec![1, 2, 0]);
        // sin cursos en curso, el orden de las capas
        let free = group_corequisites(&cat, &scope, &BTreeMap::new()).unwrap();
        assert_eq!(placement_order(&free, &layer_groups(&free).unwrap()), vec![0, 1, 2]);
    }

    #[test]
    fn contracted_loop_is_infeasible() {
        let cat = catalog(vec![
            Course::new("A", 3).with_corequisites(["B"]),
            Course::new("B", 3).with_prerequisites(["C"]),
            Course::new("C", 3).with_prerequisites(["A"]),
        ]);
        let scope: BTreeSet<&CourseId> = cat.course_ids().collect();
        let groups = group_corequisites(&cat, &scope, &BTreeMap::new()).unwrap();
        let err = layer_groups(&groups).unwrap_err();
        assert!(matches!(err, GenerationError::Infeasible { .. }));
    }

    #[test]
    fn prerequisite_inside_group_is_infeasible() {
        let cat = catalog(vec![
            Course::new("A", 3).with_corequisites(["B"]),
            Course::new("B", 3).with_prerequisites(["A"]),
        ]);
        let scope: BTreeSet<&CourseId> = cat.course_ids().collect();
        let err = group_corequisites(&cat, &scope, &BTreeMap::new()).unwrap_err();
        match err {
            GenerationError::Infeasible { courses, .. } => {
                assert_eq!(courses, vec![CourseId::new("A"), CourseId::new("B")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
