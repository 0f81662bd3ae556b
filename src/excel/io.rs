use calamine::{Data, Reader, Sheets};
use std::io::{Read, Seek};

use crate::error::StoreError;

/// Convierte un `Data` de calamine a String (versión genérica para celdas)
pub fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if (f.floor() - f).abs() < f64::EPSILON {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        Data::Bool(b) => format!("{}", b),
        Data::Empty => String::new(),
        Data::Error(_) => String::new(),
        Data::DateTime(s) => s.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Normaliza encabezados y claves: minúsculas, sólo alfanuméricos.
/// "Max Credits / Semester" y "max_credits_semester" quedan iguales.
pub fn normalize_header(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Separa una celda con varios códigos ("MAT1, MAT2; FIS1").
pub fn split_list(s: &str) -> Vec<String> {
    s.split([',', ';', '|'])
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

/// Busca una hoja por nombre normalizado y la devuelve como filas de texto.
pub fn read_sheet_rows<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    wanted: &str,
) -> Result<Vec<Vec<String>>, StoreError> {
    let key = normalize_header(wanted);
    let sheet = workbook
        .sheet_names()
        .into_iter()
        .find(|n| normalize_header(n) == key)
        .ok_or_else(|| StoreError::Malformed(format!("workbook has no '{}' sheet", wanted)))?;

    let range = workbook.worksheet_range(&sheet)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_without_fraction_render_as_integers() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&Data::String("  MAT1 ".into())), "MAT1");
    }

    #[test]
    fn split_list_accepts_mixed_separators() {
        assert_eq!(split_list("A, B;C | "), vec!["A", "B", "C"]);
        assert!(split_list("  ").is_empty());
    }
}
