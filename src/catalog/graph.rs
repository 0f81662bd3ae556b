use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::models::{Catalog, CourseId};

/// Grafo de prerequisitos del catálogo: una arista `P -> C` por cada
/// prerequisito `P` del curso `C`.
pub struct PrerequisiteGraph<'a> {
    graph: DiGraph<&'a CourseId, ()>,
    node_map: HashMap<&'a CourseId, NodeIndex>,
}

impl<'a> PrerequisiteGraph<'a> {
    pub fn build(catalog: &'a Catalog) -> Self {
        let mut graph: DiGraph<&CourseId, ()> = DiGraph::with_capacity(catalog.len(), 0);
        let mut node_map: HashMap<&CourseId, NodeIndex> = HashMap::new();

        for id in catalog.course_ids() {
            let idx = graph.add_node(id);
            node_map.insert(id, idx);
        }

        // Catalog::new ya garantiza que cada referencia existe; si algo se
        // escapa simplemente no se agrega la arista.
        for course in catalog.courses() {
            let Some(&to) = node_map.get(&course.id) else { continue };
            for prereq in course.prerequisites.iter() {
                if let Some(&from) = node_map.get(prereq) {
                    if graph.find_edge(from, to).is_none() {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        PrerequisiteGraph { graph, node_map }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_edge(&self, from: &CourseId, to: &CourseId) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Cursos que pertenecen a algún ciclo: componentes fuertemente conexas
    /// con más de un nodo, más los cursos que son prerequisito de sí mismos.
    pub fn cyclic_courses(&self) -> BTreeSet<CourseId> {
        let mut out = BTreeSet::new();
        for component in tarjan_scc(&self.graph) {
            let on_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| self.graph.find_edge(n, n).is_some());
            if on_cycle {
                out.extend(component.into_iter().map(|n| self.graph[n].clone()));
            }
        }
        out
    }
}
