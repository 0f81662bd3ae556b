use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::StoreError;
use crate::models::{
    Catalog, Course, CourseId, Enrollment, EnrollmentStatus, Plan, Program, SemesterSlot, StudentRecord, Term,
};
use crate::store::{CatalogSource, PlanArchive, SavedPlan, StudentRecordStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS programs (
        id TEXT PRIMARY KEY,
        school_name TEXT NOT NULL DEFAULT '',
        program_name TEXT NOT NULL DEFAULT '',
        degree_type TEXT NOT NULL DEFAULT '',
        total_credits_required INTEGER NOT NULL DEFAULT 0,
        max_credits_per_semester INTEGER NOT NULL,
        min_semesters INTEGER NOT NULL DEFAULT 0,
        term_sequence TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS courses (
        program_id TEXT NOT NULL,
        code TEXT NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        credits INTEGER NOT NULL,
        prerequisites TEXT NOT NULL DEFAULT '[]',
        corequisites TEXT NOT NULL DEFAULT '[]',
        offered_terms TEXT,
        required INTEGER NOT NULL DEFAULT 1,
        PRIMARY KEY (program_id, code)
    );

    CREATE TABLE IF NOT EXISTS students (
        id TEXT PRIMARY KEY,
        current_term TEXT
    );

    CREATE TABLE IF NOT EXISTS student_courses (
        student_id TEXT NOT NULL,
        code TEXT NOT NULL,
        status TEXT NOT NULL,
        slot INTEGER,
        PRIMARY KEY (student_id, code)
    );

    CREATE TABLE IF NOT EXISTS plans (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id TEXT NOT NULL,
        program_id TEXT NOT NULL,
        plan_data TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
";

/// Store SQLite. Abre una conexión corta por operación, igual que el resto
/// de los colaboradores, así que se puede compartir entre hilos.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Abre (o crea) la base en `path` y asegura que existan las tablas.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
            }
        }
        let store = SqliteStore { path };
        store.connect()?.execute_batch(SCHEMA)?;
        debug!(path = %store.path.display(), "sqlite schema ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.path)?)
    }

    /// Guarda (o reemplaza) el catálogo de un programa.
    pub fn put_catalog(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let p = catalog.program();
        let terms: Vec<String> = p.term_sequence.iter().map(|t| t.to_string()).collect();

        tx.execute(
            "INSERT OR REPLACE INTO programs
                (id, school_name, program_name, degree_type, total_credits_required,
                 max_credits_per_semester, min_semesters, term_sequence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                p.id,
                p.school_name,
                p.program_name,
                p.degree_type,
                p.total_credits_required,
                p.max_credits_per_semester,
                p.min_semesters,
                serde_json::to_string(&terms)?,
            ],
        )?;
        tx.execute("DELETE FROM courses WHERE program_id = ?1", params![p.id])?;

        for c in catalog.courses() {
            let offered = c.offered_terms.as_ref().map(serde_json::to_string).transpose()?;
            tx.execute(
                "INSERT INTO courses
                    (program_id, code, title, credits, prerequisites, corequisites, offered_terms, required)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    p.id,
                    c.id.as_str(),
                    c.title,
                    c.credits,
                    serde_json::to_string(&c.prerequisites)?,
                    serde_json::to_string(&c.corequisites)?,
                    offered,
                    c.required,
                ],
            )?;
        }
        tx.commit()?;
        debug!(program = %p.id, courses = catalog.len(), "catalog stored");
        Ok(())
    }
}

fn parse_term(s: &str) -> Result<Term, StoreError> {
    s.parse::<Term>().map_err(StoreError::Malformed)
}

impl CatalogSource for SqliteStore {
    fn load_catalog(&self, program_id: &str) -> Result<Catalog, StoreError> {
        let conn = self.connect()?;
        let program = conn
            .query_row(
                "SELECT id, school_name, program_name, degree_type, total_credits_required,
                        max_credits_per_semester, min_semesters, term_sequence
                 FROM programs WHERE id = ?1",
                params![program_id],
                |row| {
                    Ok((
                        Program {
                            id: row.get(0)?,
                            school_name: row.get(1)?,
                            program_name: row.get(2)?,
                            degree_type: row.get(3)?,
                            total_credits_required: row.get(4)?,
                            max_credits_per_semester: row.get(5)?,
                            min_semesters: row.get(6)?,
                            term_sequence: Vec::new(),
                        },
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;
        let Some((mut program, terms_json)) = program else {
            return Err(StoreError::NotFound { kind: "program", id: program_id.to_string() });
        };
        let terms: Vec<String> = serde_json::from_str(&terms_json)?;
        program.term_sequence = terms.iter().map(|t| parse_term(t)).collect::<Result<_, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT code, title, credits, prerequisites, corequisites, offered_terms, required
             FROM courses WHERE program_id = ?1 ORDER BY code",
        )?;
        let rows = stmt.query_map(params![program_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, bool>(6)?,
            ))
        })?;

        let mut courses = Vec::new();
        for r in rows {
            let (code, title, credits, prereqs, coreqs, offered, required) = r?;
            let mut course = Course::new(code, credits).with_title(title);
            course.prerequisites = serde_json::from_str::<BTreeSet<CourseId>>(&prereqs)?;
            course.corequisites = serde_json::from_str::<BTreeSet<CourseId>>(&coreqs)?;
            course.offered_terms = offered
                .map(|o| serde_json::from_str::<BTreeSet<Term>>(&o))
                .transpose()?;
            course.required = required;
            courses.push(course);
        }

        Ok(Catalog::new(program, courses)?)
    }
}

impl StudentRecordStore for SqliteStore {
    fn load_record(&self, student_id: &str) -> Result<StudentRecord, StoreError> {
        let conn = self.connect()?;
        let current: Option<Option<String>> = conn
            .query_row(
                "SELECT current_term FROM students WHERE id = ?1",
                params![student_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(StoreError::NotFound { kind: "student", id: student_id.to_string() });
        };

        let mut record = StudentRecord::new();
        record.set_current_term(current.as_deref().map(parse_term).transpose()?);

        let mut stmt = conn.prepare(
            "SELECT code, status, slot FROM student_courses WHERE student_id = ?1 ORDER BY code",
        )?;
        let rows = stmt.query_map(params![student_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<u32>>(2)?,
            ))
        })?;
        for r in rows {
            let (code, status, slot) = r?;
            let status = EnrollmentStatus::parse(&status)
                .ok_or_else(|| StoreError::Malformed(format!("unknown status '{}' for {}", status, code)))?;
            let slot = slot.map(SemesterSlot::try_from).transpose()?;
            let enrollment = Enrollment::from_parts(status, slot)
                .ok_or_else(|| StoreError::Malformed(format!("course {} has no semester slot", code)))?;
            record.insert(code, enrollment)?;
        }
        Ok(record)
    }

    fn save_record(&self, student_id: &str, record: &StudentRecord) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO students (id, current_term) VALUES (?1, ?2)",
            params![student_id, record.current_term().map(|t| t.to_string())],
        )?;
        tx.execute("DELETE FROM student_courses WHERE student_id = ?1", params![student_id])?;
        for (course, enrollment) in record.iter() {
            tx.execute(
                "INSERT INTO student_courses (student_id, code, status, slot) VALUES (?1, ?2, ?3, ?4)",
                params![
                    student_id,
                    course.as_str(),
                    enrollment.status().as_str(),
                    enrollment.slot().map(|s| s.get()),
                ],
            )?;
        }
        tx.commit()?;
        debug!(student = student_id, courses = record.len(), "student record stored");
        Ok(())
    }
}

impl PlanArchive for SqliteStore {
    fn save_plan(&self, student_id: &str, program_id: &str, plan: &Plan) -> Result<SavedPlan, StoreError> {
        let conn = self.connect()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO plans (student_id, program_id, plan_data, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![student_id, program_id, serde_json::to_string(plan)?, created_at.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        debug!(student = student_id, program = program_id, plan_id = id, "plan saved");
        Ok(SavedPlan {
            id,
            student_id: student_id.to_string(),
            program_id: program_id.to_string(),
            plan: plan.clone(),
            created_at,
        })
    }

    fn list_plans(&self, student_id: &str) -> Result<Vec<SavedPlan>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, program_id, plan_data, created_at FROM plans
             WHERE student_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![student_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (id, program_id, plan_data, created_at) = r?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StoreError::Malformed(format!("plan {} has a bad timestamp: {}", id, e)))?
                .with_timezone(&Utc);
            out.push(SavedPlan {
                id,
                student_id: student_id.to_string(),
                program_id,
                plan: serde_json::from_str(&plan_data)?,
                created_at,
            });
        }
        Ok(out)
    }
}
