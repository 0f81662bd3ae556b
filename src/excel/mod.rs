//! Importación de catálogos desde planillas Excel.
//!
//! Submódulos:
//! - `io`: helpers de lectura/parseo de celdas y hojas
//! - `catalog`: hojas `program` + `courses` -> `Catalog`

/// Helpers de IO y utilidades para parsing de Excel
mod io;

/// Lectura del catálogo: `read_catalog_xlsx`
mod catalog;

pub use catalog::{catalog_from_sheets, read_catalog_xlsx};
pub use io::normalize_header;
