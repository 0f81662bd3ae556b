use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Código de curso normalizado (sin espacios, en mayúsculas).
///
/// `"cs 101"`, `" CS101 "` y `"CS101"` son el mismo curso.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CourseId(String);

impl CourseId {
    pub fn new(code: impl AsRef<str>) -> Self {
        CourseId(normalize_code(code.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_code(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl From<String> for CourseId {
    fn from(s: String) -> Self {
        CourseId::new(s)
    }
}

impl From<&str> for CourseId {
    fn from(s: &str) -> Self {
        CourseId::new(s)
    }
}

impl From<CourseId> for String {
    fn from(id: CourseId) -> Self {
        id.0
    }
}

impl Borrow<str> for CourseId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Periodo académico en el que se dicta un curso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Fall,
    Spring,
    Summer,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Term::Fall => "Fall",
            Term::Spring => "Spring",
            Term::Summer => "Summer",
        };
        f.write_str(s)
    }
}

impl FromStr for Term {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fall" | "autumn" => Ok(Term::Fall),
            "spring" => Ok(Term::Spring),
            "summer" => Ok(Term::Summer),
            other => Err(format!("unknown term '{}'", other)),
        }
    }
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub title: String,
    pub credits: u32,
    #[serde(default)]
    pub prerequisites: BTreeSet<CourseId>,
    #[serde(default)]
    pub corequisites: BTreeSet<CourseId>,
    /// `None` => se dicta todos los periodos.
    #[serde(default)]
    pub offered_terms: Option<BTreeSet<Term>>,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl Course {
    pub fn new(id: impl Into<CourseId>, credits: u32) -> Self {
        Course {
            id: id.into(),
            title: String::new(),
            credits,
            prerequisites: BTreeSet::new(),
            corequisites: BTreeSet::new(),
            offered_terms: None,
            required: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_prerequisites<I, C>(mut self, prereqs: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CourseId>,
    {
        self.prerequisites.extend(prereqs.into_iter().map(Into::into));
        self
    }

    pub fn with_corequisites<I, C>(mut self, coreqs: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CourseId>,
    {
        self.corequisites.extend(coreqs.into_iter().map(Into::into));
        self
    }

    pub fn offered_in<I: IntoIterator<Item = Term>>(mut self, terms: I) -> Self {
        self.offered_terms = Some(terms.into_iter().collect());
        self
    }

    /// Marca el curso como electivo (no obligatorio para egresar).
    pub fn elective(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn is_offered_in(&self, term: Term) -> bool {
        self.offered_terms.as_ref().map_or(true, |t| t.contains(&term))
    }
}

fn default_term_sequence() -> Vec<Term> {
    vec![Term::Fall, Term::Spring]
}

/// Metadatos del programa (carrera) al que pertenece un catálogo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub program_name: String,
    #[serde(default)]
    pub degree_type: String,
    #[serde(default)]
    pub total_credits_required: u32,
    pub max_credits_per_semester: u32,
    #[serde(default)]
    pub min_semesters: u32,
    #[serde(default = "default_term_sequence")]
    pub term_sequence: Vec<Term>,
}

impl Program {
    pub fn new(id: impl Into<String>, max_credits_per_semester: u32) -> Self {
        Program {
            id: id.into(),
            school_name: String::new(),
            program_name: String::new(),
            degree_type: String::new(),
            total_credits_required: 0,
            max_credits_per_semester,
            min_semesters: 0,
            term_sequence: default_term_sequence(),
        }
    }

    pub fn with_total_credits(mut self, credits: u32) -> Self {
        self.total_credits_required = credits;
        self
    }

    pub fn with_min_semesters(mut self, semesters: u32) -> Self {
        self.min_semesters = semesters;
        self
    }

    pub fn with_term_sequence(mut self, terms: Vec<Term>) -> Self {
        self.term_sequence = terms;
        self
    }

    /// Periodo que corresponde a la posición `index` (0 = primer semestre del
    /// plan) cuando el plan parte en `first`. `None` si `first` no está en la
    /// secuencia del programa.
    pub fn term_at(&self, first: Term, index: usize) -> Option<Term> {
        let start = self.term_sequence.iter().position(|t| *t == first)?;
        let n = self.term_sequence.len();
        Some(self.term_sequence[(start + index % n) % n])
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.max_credits_per_semester == 0 {
            return Err(CatalogError::InvalidProgram(format!(
                "program '{}' allows zero credits per semester",
                self.id
            )));
        }
        if self.term_sequence.is_empty() {
            return Err(CatalogError::InvalidProgram(format!(
                "program '{}' has an empty term sequence",
                self.id
            )));
        }
        let distinct: BTreeSet<_> = self.term_sequence.iter().collect();
        if distinct.len() != self.term_sequence.len() {
            return Err(CatalogError::InvalidProgram(format!(
                "program '{}' repeats a term in its term sequence",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogRepr {
    program: Program,
    courses: Vec<Course>,
}

/// Snapshot inmutable de los cursos de un programa.
///
/// La construcción valida la estructura (ids únicos, referencias conocidas,
/// créditos positivos). Los ciclos de prerequisitos NO se rechazan aquí para
/// poder reportarlos con [`crate::catalog::detect_cycles`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CatalogRepr", into = "CatalogRepr")]
pub struct Catalog {
    program: Program,
    courses: BTreeMap<CourseId, Course>,
}

impl Catalog {
    pub fn new<I>(program: Program, courses: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = Course>,
    {
        program.check()?;

        let mut map: BTreeMap<CourseId, Course> = BTreeMap::new();
        for course in courses {
            if course.credits == 0 {
                return Err(CatalogError::InvalidCredits(course.id));
            }
            if course.corequisites.contains(&course.id) {
                return Err(CatalogError::SelfCorequisite(course.id));
            }
            if map.contains_key(&course.id) {
                return Err(CatalogError::DuplicateCourse(course.id));
            }
            map.insert(course.id.clone(), course);
        }

        for course in map.values() {
            for reference in course.prerequisites.iter().chain(course.corequisites.iter()) {
                if !map.contains_key(reference) {
                    return Err(CatalogError::UnknownReference {
                        course: course.id.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        Ok(Catalog { program, courses: map })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn get(&self, id: &CourseId) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn contains(&self, id: &CourseId) -> bool {
        self.courses.contains_key(id)
    }

    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    pub fn course_ids(&self) -> impl Iterator<Item = &CourseId> {
        self.courses.keys()
    }

    pub fn required_courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values().filter(|c| c.required)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn credits_of(&self, id: &CourseId) -> u32 {
        self.courses.get(id).map_or(0, |c| c.credits)
    }

    pub fn max_credits_per_semester(&self) -> u32 {
        self.program.max_credits_per_semester
    }
}

impl TryFrom<CatalogRepr> for Catalog {
    type Error = CatalogError;

    fn try_from(repr: CatalogRepr) -> Result<Self, Self::Error> {
        Catalog::new(repr.program, repr.courses)
    }
}

impl From<Catalog> for CatalogRepr {
    fn from(c: Catalog) -> Self {
        CatalogRepr {
            program: c.program,
            courses: c.courses.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_ids_are_normalized() {
        assert_eq!(CourseId::new(" cs 101 "), CourseId::new("CS101"));
        let parsed: CourseId = serde_json::from_str("\"mat 1\"").unwrap();
        assert_eq!(parsed.as_str(), "MAT1");
    }

    #[test]
    fn catalog_rejects_unknown_prerequisite() {
        let err = Catalog::new(
            Program::new("p", 12),
            vec![Course::new("B", 3).with_prerequisites(["A"])],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownReference { .. }));
    }

    #[test]
    fn catalog_rejects_zero_credits_and_duplicates() {
        let err = Catalog::new(Program::new("p", 12), vec![Course::new("A", 0)]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCredits(_)));

        let err = Catalog::new(
            Program::new("p", 12),
            vec![Course::new("A", 3), Course::new("a", 4)],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCourse(_)));
    }

    #[test]
    fn term_at_wraps_around_sequence() {
        let p = Program::new("p", 12)
            .with_term_sequence(vec![Term::Fall, Term::Spring, Term::Summer]);
        assert_eq!(p.term_at(Term::Spring, 0), Some(Term::Spring));
        assert_eq!(p.term_at(Term::Spring, 2), Some(Term::Fall));
        let p2 = Program::new("p", 12);
        assert_eq!(p2.term_at(Term::Summer, 0), None);
    }

    #[test]
    fn catalog_json_goes_through_checks() {
        let json = r#"{
            "program": { "id": "cs", "max_credits_per_semester": 0 },
            "courses": []
        }"#;
        assert!(serde_json::from_str::<Catalog>(json).is_err());
    }
}
