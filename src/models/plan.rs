use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::models::{Catalog, CourseId};

/// Posición ordinal (1, 2, 3, ...) de un periodo dentro del plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SemesterSlot(NonZeroU32);

impl SemesterSlot {
    pub const FIRST: SemesterSlot = SemesterSlot(NonZeroU32::MIN);

    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(SemesterSlot)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn next(self) -> Self {
        SemesterSlot(self.0.saturating_add(1))
    }

    /// Semestre siguiente; `None` en el último representable.
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(SemesterSlot)
    }

    /// Índice 0-based (slot 1 => 0).
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl TryFrom<u32> for SemesterSlot {
    type Error = RecordError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        SemesterSlot::new(n).ok_or(RecordError::InvalidSlot(n))
    }
}

impl From<SemesterSlot> for u32 {
    fn from(s: SemesterSlot) -> Self {
        s.get()
    }
}

impl fmt::Display for SemesterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Forma serializada de un semestre del plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSemester {
    pub slot: SemesterSlot,
    pub courses: BTreeSet<CourseId>,
}

/// Asignación de cursos a semestres.
///
/// Los planes son valores: las ediciones (`with_course`, `moved`,
/// `without_course`) devuelven un plan nuevo que luego se vuelve a validar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PlannedSemester>", into = "Vec<PlannedSemester>")]
pub struct Plan {
    semesters: BTreeMap<SemesterSlot, BTreeSet<CourseId>>,
}

impl Plan {
    pub fn new() -> Self {
        Plan::default()
    }

    /// Agrega `course` al semestre `slot`. Un mismo curso puede quedar en
    /// varios semestres; el validador lo reporta como asignación duplicada.
    pub fn assign(&mut self, slot: SemesterSlot, course: impl Into<CourseId>) {
        self.semesters.entry(slot).or_default().insert(course.into());
    }

    pub fn with_course(&self, slot: SemesterSlot, course: impl Into<CourseId>) -> Plan {
        let mut next = self.clone();
        next.assign(slot, course);
        next
    }

    pub fn without_course(&self, course: &CourseId) -> Plan {
        let mut next = self.clone();
        for courses in next.semesters.values_mut() {
            courses.remove(course);
        }
        next.semesters.retain(|_, courses| !courses.is_empty());
        next
    }

    /// Mueve `course` (de donde esté) a `slot`, como un arrastrar-y-soltar.
    pub fn moved(&self, course: &CourseId, slot: SemesterSlot) -> Plan {
        self.without_course(course).with_course(slot, course.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SemesterSlot, &BTreeSet<CourseId>)> {
        self.semesters.iter().map(|(s, c)| (*s, c))
    }

    pub fn courses_in(&self, slot: SemesterSlot) -> impl Iterator<Item = &CourseId> {
        self.semesters.get(&slot).into_iter().flatten()
    }

    /// Todos los semestres donde aparece `course`, en orden.
    pub fn slots_of(&self, course: &CourseId) -> Vec<SemesterSlot> {
        self.semesters
            .iter()
            .filter(|(_, courses)| courses.contains(course))
            .map(|(s, _)| *s)
            .collect()
    }

    /// Primer semestre donde aparece `course`.
    pub fn slot_of(&self, course: &CourseId) -> Option<SemesterSlot> {
        self.semesters
            .iter()
            .find(|(_, courses)| courses.contains(course))
            .map(|(s, _)| *s)
    }

    pub fn contains(&self, course: &CourseId) -> bool {
        self.semesters.values().any(|c| c.contains(course))
    }

    pub fn course_ids(&self) -> BTreeSet<&CourseId> {
        self.semesters.values().flatten().collect()
    }

    pub fn last_slot(&self) -> Option<SemesterSlot> {
        self.semesters.keys().next_back().copied()
    }

    pub fn semester_count(&self) -> usize {
        self.semesters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.semesters.values().all(|c| c.is_empty())
    }

    /// Créditos del semestre según el catálogo (cursos desconocidos valen 0).
    pub fn credits_in(&self, slot: SemesterSlot, catalog: &Catalog) -> u32 {
        self.courses_in(slot)
            .map(|c| catalog.credits_of(c))
            .fold(0, u32::saturating_add)
    }
}

impl FromIterator<(SemesterSlot, CourseId)> for Plan {
    fn from_iter<T: IntoIterator<Item = (SemesterSlot, CourseId)>>(iter: T) -> Self {
        let mut plan = Plan::new();
        for (slot, course) in iter {
            plan.assign(slot, course);
        }
        plan
    }
}

impl From<Vec<PlannedSemester>> for Plan {
    fn from(entries: Vec<PlannedSemester>) -> Self {
        let mut plan = Plan::new();
        for entry in entries {
            plan.semesters.entry(entry.slot).or_default().extend(entry.courses);
        }
        plan
    }
}

impl From<Plan> for Vec<PlannedSemester> {
    fn from(plan: Plan) -> Self {
        plan.semesters
            .into_iter()
            .map(|(slot, courses)| PlannedSemester { slot, courses })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: u32) -> SemesterSlot {
        SemesterSlot::new(n).unwrap()
    }

    #[test]
    fn slot_zero_is_rejected() {
        assert!(SemesterSlot::new(0).is_none());
        assert!(serde_json::from_str::<SemesterSlot>("0").is_err());
        assert_eq!(SemesterSlot::FIRST.next(), slot(2));
    }

    #[test]
    fn last_slot_has_no_successor() {
        let last = slot(u32::MAX);
        assert_eq!(last.next(), last);
        assert_eq!(last.checked_next(), None);
        assert_eq!(slot(7).checked_next(), Some(slot(8)));
    }

    #[test]
    fn huge_credit_loads_saturate() {
        use crate::models::{Course, Program};

        let catalog = Catalog::new(
            Program::new("p", 10),
            vec![Course::new("A", u32::MAX), Course::new("B", u32::MAX - 1)],
        )
        .unwrap();
        let plan = Plan::new().with_course(slot(1), "A").with_course(slot(1), "B");
        assert_eq!(plan.credits_in(slot(1), &catalog), u32::MAX);
    }

    #[test]
    fn moved_returns_a_new_plan() {
        let plan: Plan = [(slot(1), CourseId::new("A")), (slot(1), CourseId::new("B"))]
            .into_iter()
            .collect();
        let edited = plan.moved(&CourseId::new("B"), slot(3));

        assert_eq!(plan.slot_of(&CourseId::new("B")), Some(slot(1)));
        assert_eq!(edited.slot_of(&CourseId::new("B")), Some(slot(3)));
        assert_eq!(edited.semester_count(), 2);
    }

    #[test]
    fn plan_json_is_a_list_of_semesters() {
        let plan = Plan::new().with_course(slot(2), "X").with_course(slot(1), "Y");
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(json, r#"[{"slot":1,"courses":["Y"]},{"slot":2,"courses":["X"]}]"#);
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }
}
