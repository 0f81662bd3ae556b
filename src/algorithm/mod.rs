// Módulo de alto nivel para validar y generar planes de estudio.
// Declarar submódulos (archivos en la carpeta `src/algorithm`)
mod generate;
mod layers;
mod validate;

// Reexportar solo la API pública
pub use generate::generate;
pub use validate::{validate, validate_many, ValidationResult, Violation, ViolationKind};
