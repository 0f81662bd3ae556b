use degreepath::{
    generate, validate, Catalog, Course, CourseId, GenerationError, Plan, Program, SemesterSlot, StudentRecord, Term,
};

fn slot(n: u32) -> SemesterSlot {
    SemesterSlot::new(n).unwrap()
}

fn id(code: &str) -> CourseId {
    CourseId::new(code)
}

fn plan(entries: &[(u32, &str)]) -> Plan {
    entries.iter().map(|(s, c)| (slot(*s), id(c))).collect()
}

fn assert_valid(catalog: &Catalog, record: &StudentRecord, plan: &Plan) {
    let result = validate(catalog, record, plan).expect("catálogo acíclico");
    assert!(result.is_valid(), "plan generado inválido: {:?}", result.violations());
}

#[test]
fn chain_is_spread_over_consecutive_semesters() {
    let catalog = Catalog::new(
        Program::new("p", 3),
        vec![Course::new("A", 3), Course::new("B", 3).with_prerequisites(["A"])],
    )
    .unwrap();
    let generated = generate(&catalog, &StudentRecord::new()).unwrap();
    assert_eq!(generated, plan(&[(1, "A"), (2, "B")]));
}

#[test]
fn completed_courses_are_left_out() {
    let catalog = Catalog::new(
        Program::new("p", 3),
        vec![Course::new("A", 3), Course::new("B", 3).with_prerequisites(["A"])],
    )
    .unwrap();
    let record = StudentRecord::with_completed(["A"]).unwrap();
    let generated = generate(&catalog, &record).unwrap();
    assert_eq!(generated, plan(&[(1, "B")]));
    assert_valid(&catalog, &record, &generated);
}

#[test]
fn credit_cap_keeps_unrelated_courses_apart() {
    let catalog = Catalog::new(Program::new("p", 3), vec![Course::new("A", 3), Course::new("B", 3)]).unwrap();
    let generated = generate(&catalog, &StudentRecord::new()).unwrap();
    assert_ne!(generated.slot_of(&id("A")), generated.slot_of(&id("B")));
    assert_eq!(generated, plan(&[(1, "A"), (2, "B")]));
}

#[test]
fn nothing_left_means_an_empty_plan() {
    let catalog = Catalog::new(Program::new("p", 6), vec![Course::new("A", 3)]).unwrap();
    let record = StudentRecord::with_completed(["A"]).unwrap();
    let generated = generate(&catalog, &record).unwrap();
    assert!(generated.is_empty());
}

#[test]
fn corequisites_share_a_semester() {
    let catalog = Catalog::new(
        Program::new("cs", 6),
        vec![
            Course::new("INTRO", 3).with_corequisites(["LAB"]),
            Course::new("LAB", 1),
            Course::new("DATA", 3).with_prerequisites(["INTRO"]),
            Course::new("ALGO", 3).with_prerequisites(["DATA"]),
        ],
    )
    .unwrap();
    let generated = generate(&catalog, &StudentRecord::new()).unwrap();
    assert_eq!(generated.slot_of(&id("INTRO")), generated.slot_of(&id("LAB")));
    assert!(generated.slot_of(&id("DATA")) > generated.slot_of(&id("INTRO")));
    assert!(generated.slot_of(&id("ALGO")) > generated.slot_of(&id("DATA")));
    assert_valid(&catalog, &StudentRecord::new(), &generated);
}

#[test]
fn oversized_corequisite_group_is_infeasible() {
    let catalog = Catalog::new(
        Program::new("p", 4),
        vec![Course::new("X", 3).with_corequisites(["Y"]), Course::new("Y", 3)],
    )
    .unwrap();
    match generate(&catalog, &StudentRecord::new()) {
        Err(GenerationError::Infeasible { courses, .. }) => assert_eq!(courses, vec![id("X"), id("Y")]),
        other => panic!("esperaba Infeasible, obtuve {:?}", other),
    }
}

#[test]
fn course_above_the_cap_is_unsatisfiable() {
    let catalog = Catalog::new(
        Program::new("p", 4),
        vec![Course::new("BIG", 5), Course::new("TOP", 3).with_prerequisites(["BIG"]), Course::new("FREE", 3)],
    )
    .unwrap();
    match generate(&catalog, &StudentRecord::new()) {
        Err(GenerationError::UnsatisfiableRequirement { course, blocked, .. }) => {
            assert_eq!(course, id("BIG"));
            assert_eq!(blocked, vec![id("BIG"), id("TOP")]);
        }
        other => panic!("esperaba UnsatisfiableRequirement, obtuve {:?}", other),
    }
}

#[test]
fn term_offerings_push_courses_to_the_right_semester() {
    let catalog = Catalog::new(
        Program::new("p", 6),
        vec![
            Course::new("SPRINGONLY", 3).offered_in([Term::Spring]),
            Course::new("FALLONLY", 3).offered_in([Term::Fall]),
            Course::new("NEXT", 3).with_prerequisites(["FALLONLY"]).offered_in([Term::Fall]),
        ],
    )
    .unwrap();
    let record = StudentRecord::new().with_current_term(Term::Fall);
    let generated = generate(&catalog, &record).unwrap();

    // 1 = Fall, 2 = Spring, 3 = Fall
    assert_eq!(generated, plan(&[(1, "FALLONLY"), (2, "SPRINGONLY"), (3, "NEXT")]));
    assert_valid(&catalog, &record, &generated);
}

#[test]
fn course_never_offered_in_the_calendar_is_unsatisfiable() {
    let catalog = Catalog::new(
        Program::new("p", 6),
        vec![Course::new("SUMMER", 3).offered_in([Term::Summer]), Course::new("A", 3)],
    )
    .unwrap();
    let record = StudentRecord::new().with_current_term(Term::Spring);
    let err = generate(&catalog, &record).unwrap_err();
    assert!(matches!(err, GenerationError::UnsatisfiableRequirement { ref course, .. } if *course == id("SUMMER")));
}

#[test]
fn electives_fill_the_program_credit_total() {
    let catalog = Catalog::new(
        Program::new("p", 6).with_total_credits(9),
        vec![
            Course::new("A", 3),
            Course::new("E1", 3).elective(),
            Course::new("E2", 3).elective(),
            Course::new("E3", 3).elective(),
        ],
    )
    .unwrap();
    let generated = generate(&catalog, &StudentRecord::new()).unwrap();
    assert!(generated.contains(&id("A")));
    assert!(generated.contains(&id("E1")));
    assert!(generated.contains(&id("E2")));
    assert!(!generated.contains(&id("E3")));
    assert_valid(&catalog, &StudentRecord::new(), &generated);
}

#[test]
fn elective_prerequisites_come_along() {
    let catalog = Catalog::new(
        Program::new("p", 6).with_total_credits(9),
        vec![
            Course::new("A", 3),
            Course::new("BASE", 3).elective(),
            Course::new("ADV", 3).elective().with_prerequisites(["BASE"]),
        ],
    )
    .unwrap();
    let generated = generate(&catalog, &StudentRecord::new()).unwrap();
    // ADV es el primer electivo por código y arrastra a BASE
    assert!(generated.contains(&id("ADV")));
    assert!(generated.slot_of(&id("BASE")) < generated.slot_of(&id("ADV")));
    assert_valid(&catalog, &StudentRecord::new(), &generated);
}

#[test]
fn not_enough_credits_in_the_catalog_is_a_shortfall() {
    let catalog = Catalog::new(
        Program::new("p", 6).with_total_credits(12),
        vec![Course::new("A", 3), Course::new("E1", 3).elective()],
    )
    .unwrap();
    let err = generate(&catalog, &StudentRecord::new()).unwrap_err();
    assert_eq!(err, GenerationError::CreditShortfall { required: 12, available: 6 });
}

#[test]
fn in_progress_courses_stay_where_they_are() {
    let catalog = Catalog::new(
        Program::new("cs", 6),
        vec![
            Course::new("INTRO", 3).with_corequisites(["LAB"]),
            Course::new("LAB", 1),
            Course::new("DATA", 3).with_prerequisites(["INTRO"]),
            Course::new("ALGO", 3).with_prerequisites(["DATA"]),
        ],
    )
    .unwrap();
    let mut record = StudentRecord::new();
    record.enroll("INTRO", slot(1)).unwrap();
    record.enroll("LAB", slot(1)).unwrap();
    // las entradas planificadas no atan al generador
    record.plan("ALGO", slot(1)).unwrap();

    let generated = generate(&catalog, &record).unwrap();
    assert_eq!(generated, plan(&[(1, "INTRO"), (1, "LAB"), (2, "DATA"), (3, "ALGO")]));
    assert_valid(&catalog, &record, &generated);
}

#[test]
fn in_progress_course_outside_the_catalog_is_unsatisfiable() {
    let catalog = Catalog::new(Program::new("p", 6), vec![Course::new("A", 3)]).unwrap();
    let mut record = StudentRecord::new();
    record.enroll("GHOST", slot(1)).unwrap();
    let err = generate(&catalog, &record).unwrap_err();
    assert!(matches!(err, GenerationError::UnsatisfiableRequirement { ref course, .. } if *course == id("GHOST")));
}

#[test]
fn generation_is_deterministic() {
    let courses: Vec<Course> = (0..12)
        .map(|i| {
            let c = Course::new(format!("C{:02}", i), 1 + (i % 3) as u32);
            if i >= 3 { c.with_prerequisites([format!("C{:02}", i - 3)]) } else { c }
        })
        .collect();
    let catalog = Catalog::new(Program::new("p", 5), courses).unwrap();
    let record = StudentRecord::new();

    let first = generate(&catalog, &record).unwrap();
    let second = generate(&catalog, &record).unwrap();
    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    assert_valid(&catalog, &record, &first);
}

#[test]
fn elective_whose_corequisites_exceed_the_cap_is_skipped() {
    let catalog = Catalog::new(
        Program::new("p", 4).with_total_credits(6),
        vec![
            Course::new("A", 3),
            Course::new("E1", 3).elective().with_corequisites(["E1L"]),
            Course::new("E1L", 3).elective().with_corequisites(["E1"]),
            Course::new("E2", 3).elective(),
        ],
    )
    .unwrap();
    let generated = generate(&catalog, &StudentRecord::new()).unwrap();
    assert!(generated.contains(&id("A")));
    assert!(generated.contains(&id("E2")));
    assert!(!generated.contains(&id("E1")));
    assert!(!generated.contains(&id("E1L")));
    assert_valid(&catalog, &StudentRecord::new(), &generated);
}

#[test]
fn prerequisites_of_in_progress_courses_are_placed_first() {
    let catalog = Catalog::new(
        Program::new("p", 3),
        vec![Course::new("A", 3), Course::new("B", 3), Course::new("C", 3).with_prerequisites(["B"])],
    )
    .unwrap();
    let mut record = StudentRecord::new();
    record.enroll("C", slot(2)).unwrap();

    let generated = generate(&catalog, &record).unwrap();
    assert_eq!(generated, plan(&[(1, "B"), (2, "C"), (3, "A")]));
    assert_valid(&catalog, &record, &generated);
}

#[test]
fn dependents_of_a_course_in_the_last_semester_are_infeasible() {
    let catalog = Catalog::new(
        Program::new("p", 6),
        vec![Course::new("A", 3), Course::new("B", 3).with_prerequisites(["A"])],
    )
    .unwrap();
    let mut record = StudentRecord::new();
    record.enroll("A", slot(u32::MAX)).unwrap();

    match generate(&catalog, &record) {
        Err(GenerationError::Infeasible { courses, .. }) => assert_eq!(courses, vec![id("B")]),
        other => panic!("esperaba Infeasible, obtuve {:?}", other),
    }
}

#[test]
fn in_progress_course_outside_its_terms_is_infeasible() {
    let catalog = Catalog::new(
        Program::new("p", 6),
        vec![Course::new("FALLONLY", 3).offered_in([Term::Fall]), Course::new("A", 3)],
    )
    .unwrap();
    // semestre 1 = Spring
    let mut record = StudentRecord::new().with_current_term(Term::Spring);
    record.enroll("FALLONLY", slot(1)).unwrap();

    match generate(&catalog, &record) {
        Err(GenerationError::Infeasible { courses, .. }) => assert_eq!(courses, vec![id("FALLONLY")]),
        other => panic!("esperaba Infeasible, obtuve {:?}", other),
    }
}
