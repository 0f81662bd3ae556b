use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use calamine::open_workbook_auto;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::excel::io::{normalize_header, read_sheet_rows, split_list};
use crate::models::{Catalog, Course, Program, Term};

/// Lee un catálogo desde un libro Excel con dos hojas:
/// - `program`: filas clave / valor (id, max credits per semester, ...)
/// - `courses`: fila de encabezado + una fila por curso
pub fn read_catalog_xlsx<P: AsRef<Path>>(path: P) -> Result<Catalog, StoreError> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;
    let program_rows = read_sheet_rows(&mut workbook, "program")?;
    let course_rows = read_sheet_rows(&mut workbook, "courses")?;
    debug!(path = %path.display(), courses = course_rows.len(), "workbook sheets loaded");

    let catalog = catalog_from_sheets(&program_rows, &course_rows)?;
    info!(program = %catalog.program().id, courses = catalog.len(), "catalog imported from spreadsheet");
    Ok(catalog)
}

/// Arma el catálogo a partir de las filas ya leídas de ambas hojas.
pub fn catalog_from_sheets(
    program_rows: &[Vec<String>],
    course_rows: &[Vec<String>],
) -> Result<Catalog, StoreError> {
    let program = parse_program(program_rows)?;
    let courses = parse_courses(course_rows)?;
    Ok(Catalog::new(program, courses)?)
}

fn parse_number(field: &str, value: &str) -> Result<u32, StoreError> {
    let v = value.trim();
    if let Ok(n) = v.parse::<u32>() {
        return Ok(n);
    }
    match v.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u32),
        _ => Err(StoreError::Malformed(format!("{} must be a whole number, got '{}'", field, value))),
    }
}

fn parse_terms(value: &str) -> Result<Vec<Term>, StoreError> {
    split_list(value)
        .iter()
        .map(|t| t.parse::<Term>().map_err(StoreError::Malformed))
        .collect()
}

fn parse_program(rows: &[Vec<String>]) -> Result<Program, StoreError> {
    let mut values: HashMap<String, String> = HashMap::new();
    for row in rows {
        let key = row.first().map(|k| normalize_header(k)).unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        let value = row.get(1).cloned().unwrap_or_default();
        values.insert(key, value);
    }

    let get = |k: &str| values.get(k).map(|v| v.trim()).filter(|v| !v.is_empty());

    let id = get("id")
        .or_else(|| get("programid"))
        .ok_or_else(|| StoreError::Malformed("program sheet has no id".to_string()))?;
    let max = get("maxcreditspersemester")
        .or_else(|| get("maxcredits"))
        .ok_or_else(|| StoreError::Malformed("program sheet has no max credits per semester".to_string()))?;

    let mut program = Program::new(id, parse_number("max credits per semester", max)?);
    if let Some(v) = get("schoolname").or_else(|| get("school")) {
        program.school_name = v.to_string();
    }
    if let Some(v) = get("programname").or_else(|| get("name")) {
        program.program_name = v.to_string();
    }
    if let Some(v) = get("degreetype").or_else(|| get("degree")) {
        program.degree_type = v.to_string();
    }
    if let Some(v) = get("totalcreditsrequired").or_else(|| get("totalcredits")) {
        program.total_credits_required = parse_number("total credits required", v)?;
    }
    if let Some(v) = get("minsemesters") {
        program.min_semesters = parse_number("min semesters", v)?;
    }
    if let Some(v) = get("termsequence").or_else(|| get("terms")) {
        program.term_sequence = parse_terms(v)?;
    }
    Ok(program)
}

fn parse_required(value: &str) -> Result<bool, StoreError> {
    match value.trim().to_lowercase().as_str() {
        "" | "yes" | "y" | "true" | "1" | "required" => Ok(true),
        "no" | "n" | "false" | "0" | "elective" => Ok(false),
        other => Err(StoreError::Malformed(format!("unrecognized required flag '{}'", other))),
    }
}

fn parse_courses(rows: &[Vec<String>]) -> Result<Vec<Course>, StoreError> {
    // Detectar encabezado: primera fila con una columna "code"
    let header_idx = rows
        .iter()
        .position(|r| r.iter().any(|c| matches!(normalize_header(c).as_str(), "code" | "coursecode")))
        .ok_or_else(|| StoreError::Malformed("courses sheet has no header with a 'code' column".to_string()))?;

    let header: Vec<String> = rows[header_idx].iter().map(|h| normalize_header(h)).collect();
    let col = |names: &[&str]| header.iter().position(|h| names.contains(&h.as_str()));

    let code_col = col(&["code", "coursecode"]);
    let title_col = col(&["title", "name"]);
    let credits_col = col(&["credits"]);
    let prereq_col = col(&["prerequisites", "prereqs"]);
    let coreq_col = col(&["corequisites", "coreqs"]);
    let terms_col = col(&["offeredterms", "terms"]);
    let required_col = col(&["required"]);

    let cell = |row: &Vec<String>, idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    let mut courses = Vec::new();
    for (offset, row) in rows.iter().enumerate().skip(header_idx + 1) {
        let code = cell(row, code_col);
        if code.is_empty() {
            continue;
        }
        let line = offset + 1;
        let credits = parse_number(&format!("credits (row {})", line), &cell(row, credits_col))?;

        let mut course = Course::new(code.as_str(), credits)
            .with_title(cell(row, title_col))
            .with_prerequisites(split_list(&cell(row, prereq_col)))
            .with_corequisites(split_list(&cell(row, coreq_col)));

        let terms = cell(row, terms_col);
        if !terms.is_empty() {
            let offered: BTreeSet<Term> = parse_terms(&terms)?.into_iter().collect();
            course.offered_terms = Some(offered);
        }
        course.required = parse_required(&cell(row, required_col))?;
        courses.push(course);
    }
    Ok(courses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseId;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
    }

    #[test]
    fn builds_catalog_from_sheet_rows() {
        let program = rows(&[
            &["Id", "cs-bs"],
            &["Program Name", "Computer Science"],
            &["Max Credits Per Semester", "15"],
            &["Total Credits Required", "9"],
            &["Term Sequence", "Fall, Spring, Summer"],
        ]);
        let courses = rows(&[
            &["Course catalog 2025"],
            &["Code", "Title", "Credits", "Prerequisites", "Corequisites", "Offered Terms", "Required"],
            &["CS101", "Intro", "3", "", "CS101L", "Fall", "yes"],
            &["CS101L", "Intro lab", "1", "", "", "", "yes"],
            &["CS201", "Data structures", "3.0", "CS101", "", "Spring; Fall", ""],
            &["", "", "", "", "", "", ""],
            &["ART1", "Drawing", "2", "", "", "", "elective"],
        ]);

        let catalog = catalog_from_sheets(&program, &courses).unwrap();
        assert_eq!(catalog.program().id, "cs-bs");
        assert_eq!(catalog.program().term_sequence, vec![Term::Fall, Term::Spring, Term::Summer]);
        assert_eq!(catalog.len(), 4);

        let cs201 = catalog.get(&CourseId::new("CS201")).unwrap();
        assert_eq!(cs201.credits, 3);
        assert!(cs201.prerequisites.contains(&CourseId::new("CS101")));
        assert!(cs201.is_offered_in(Term::Spring));
        assert!(!cs201.is_offered_in(Term::Summer));
        assert!(!catalog.get(&CourseId::new("ART1")).unwrap().required);
    }

    #[test]
    fn bad_credit_cell_is_reported_with_row() {
        let program = rows(&[&["id", "p"], &["max credits", "12"]]);
        let courses = rows(&[&["code", "credits"], &["A", "three"]]);
        let err = catalog_from_sheets(&program, &courses).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn missing_workbook_is_an_error() {
        assert!(read_catalog_xlsx("/nonexistent/catalog.xlsx").is_err());
    }
}
