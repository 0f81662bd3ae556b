// Chequeos sobre el catálogo que van más allá de la construcción:
// ciclos de prerequisitos y sugerencias de códigos.

mod graph;

use std::collections::BTreeSet;

use strsim::jaro_winkler;
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::models::{Catalog, CourseId};

pub use graph::PrerequisiteGraph;

/// Umbral de similitud para sugerir un código parecido.
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// Devuelve todos los cursos que están en algún ciclo de prerequisitos
/// (vacío si el grafo es acíclico).
pub fn detect_cycles(catalog: &Catalog) -> BTreeSet<CourseId> {
    let graph = PrerequisiteGraph::build(catalog);
    debug!(
        program = %catalog.program().id,
        courses = graph.node_count(),
        edges = graph.edge_count(),
        "checking prerequisite graph for cycles"
    );
    let cyclic = graph.cyclic_courses();
    if !cyclic.is_empty() {
        warn!(program = %catalog.program().id, courses = ?cyclic, "prerequisite cycle detected");
    }
    cyclic
}

impl Catalog {
    /// Error `CatalogError::Cycle` si el catálogo tiene ciclos de prerequisitos.
    pub fn ensure_acyclic(&self) -> Result<(), CatalogError> {
        let cyclic = detect_cycles(self);
        if cyclic.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Cycle(cyclic))
        }
    }

    /// Código conocido más parecido a `code`, si alguno supera el umbral.
    pub fn closest_code(&self, code: &str) -> Option<CourseId> {
        let wanted = CourseId::new(code);
        self.course_ids()
            .map(|id| (jaro_winkler(wanted.as_str(), id.as_str()), id))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0).then_with(|| b.1.cmp(a.1)))
            .map(|(_, id)| id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Program};

    #[test]
    fn self_prerequisite_is_a_cycle() {
        let catalog = Catalog::new(
            Program::new("p", 12),
            vec![Course::new("A", 3).with_prerequisites(["A"]), Course::new("B", 3)],
        )
        .unwrap();
        let cyclic = detect_cycles(&catalog);
        assert_eq!(cyclic, BTreeSet::from([CourseId::new("A")]));
    }

    #[test]
    fn closest_code_prefers_best_match() {
        let catalog = Catalog::new(
            Program::new("p", 12),
            vec![Course::new("MAT1001", 3), Course::new("FIS2000", 3)],
        )
        .unwrap();
        assert_eq!(catalog.closest_code("MAT1010"), Some(CourseId::new("MAT1001")));
        assert_eq!(catalog.closest_code("QQQ"), None);
    }
}
