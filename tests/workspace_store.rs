use rusqlite::Connection;
use trainingd::db::{self, DB_FILE, SCHEMA_VERSION};
use trainingd::error::StoreError;
use trainingd::model::{PersonDraft, QuestionDraft, Role};
use trainingd::seed;
use trainingd::store::{Link, Store};

fn sorted(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort();
    ids
}

#[test]
fn task_under_two_pois_lists_both_parents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("open");
    let recon = store.create_poi("Recon", &[]).expect("poi");
    let medic = store.create_poi("Medic", &[]).expect("poi");
    let task = store.create_task("Patrol", &[recon.id, medic.id]).expect("task");

    assert_eq!(
        sorted(store.list_parents(Link::TaskPoi, task.id).expect("parents")),
        sorted(vec![recon.id, medic.id])
    );
    assert_eq!(
        store.list_tasks_for_poi(medic.id).expect("tasks"),
        vec![task.clone()]
    );
}

#[test]
fn deleting_poi_removes_its_links_but_keeps_other_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("open");
    let program = store.create_program("Alpha").expect("program");
    let recon = store.create_poi("Recon", &[program.id]).expect("poi");
    let medic = store.create_poi("Medic", &[program.id]).expect("poi");
    let task = store.create_task("Patrol", &[recon.id, medic.id]).expect("task");

    store.delete_poi(recon.id, false).expect("delete poi");

    assert_eq!(store.list_parents(Link::TaskPoi, task.id).expect("parents"), vec![medic.id]);
    assert_eq!(store.list_children(Link::PoiProgram, program.id).expect("children"), vec![medic.id]);
    assert!(matches!(store.get_poi(recon.id), Err(StoreError::NotFound(_))));
    assert_eq!(store.get_task(task.id).expect("task survives").name, "Patrol");
}

#[test]
fn restricted_delete_refuses_parent_with_children() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("open");
    let program = store.create_program("Alpha").expect("program");
    store.create_poi("Recon", &[program.id]).expect("poi");

    let err = store.delete_program(program.id, true).expect_err("restricted");
    assert_eq!(err.code(), "in_use");
    store.delete_program(program.id, false).expect("unrestricted delete");
    assert!(store.list_programs().expect("list").is_empty());
}

#[test]
fn reopening_workspace_does_not_duplicate_seed_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first_counts = {
        let store = Store::open(dir.path()).expect("open");
        let report = seed::prepopulate(&store).expect("seed");
        assert!(report.inserted_anything());
        (
            store.count_rows("programs").expect("count"),
            store.count_rows("questions").expect("count"),
            store.count_rows("poi_programs").expect("count"),
        )
    };

    let store = Store::open(dir.path()).expect("reopen");
    let report = seed::prepopulate(&store).expect("seed again");
    assert!(!report.inserted_anything());
    assert_eq!(
        (
            store.count_rows("programs").expect("count"),
            store.count_rows("questions").expect("count"),
            store.count_rows("poi_programs").expect("count"),
        ),
        first_counts
    );
}

#[test]
fn renaming_student_refreshes_full_name() {
    let store = Store::open_in_memory().expect("open");
    let student = store
        .create_student(&PersonDraft::new("Sam", "Ortiz"))
        .expect("student");
    assert_eq!(student.full_name, "Ortiz, Sam");

    let updated = store
        .update_student(student.id, &PersonDraft::new("Samuel", "Ortiz"))
        .expect("update");
    assert_eq!(updated.full_name, "Ortiz, Samuel");
    assert_eq!(store.get_student(student.id).expect("get").full_name, "Ortiz, Samuel");
}

#[test]
fn generation_moves_only_on_committed_writes() {
    let store = Store::open_in_memory().expect("open");
    let g0 = store.generation();
    store.create_program("Alpha").expect("program");
    let g1 = store.generation();
    assert!(g1 > g0);

    store.create_program("Alpha").expect_err("duplicate");
    assert_eq!(store.generation(), g1);
    store.list_programs().expect("read");
    assert_eq!(store.generation(), g1);
}

#[test]
fn question_scale_and_instructor_links_round_out_the_catalog() {
    let store = Store::open_in_memory().expect("open");
    let scale = store.create_scale("Rating", "1,2,3").expect("scale");
    let program = store.create_program("Alpha").expect("program");
    let poi = store.create_poi("Recon", &[program.id]).expect("poi");
    let task = store.create_task("Patrol", &[poi.id]).expect("task");
    let question = store
        .create_question(
            &QuestionDraft {
                sub_task: "Move quietly".into(),
                control_type: trainingd::model::ControlType::Score,
                scale_id: Some(scale.id),
                critical_task: false,
            },
            &[task.id],
        )
        .expect("question");

    assert_eq!(store.delete_scale(scale.id).expect_err("scale in use").code(), "in_use");

    let instructor = store
        .create_user(&PersonDraft::new("Dana", "Reyes").with_role(Role::Instructor))
        .expect("instructor");
    store
        .assign(Link::InstructorProgram, program.id, instructor.id)
        .expect("instructor program");
    assert_eq!(
        store.list_parents(Link::InstructorProgram, instructor.id).expect("programs"),
        vec![program.id]
    );

    let found = store.questions_for(program.id, poi.id).expect("questions");
    assert_eq!(found.iter().map(|q| q.id).collect::<Vec<_>>(), vec![question.id]);
}

/// Build a workspace in the pre-join-table layout, where link ids lived in
/// comma-separated text columns.
fn write_legacy_workspace(dir: &std::path::Path) {
    let conn = Connection::open(dir.join(DB_FILE)).expect("open legacy db");
    conn.execute_batch(
        "CREATE TABLE programs(id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
         CREATE TABLE pois(id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, program_ids TEXT);
         CREATE TABLE tasks(id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, poi_ids TEXT);
         CREATE TABLE questions(
             id INTEGER PRIMARY KEY,
             sub_task TEXT NOT NULL,
             control_type TEXT NOT NULL DEFAULT 'text',
             scale_id INTEGER,
             critical_task INTEGER NOT NULL DEFAULT 0,
             task_ids TEXT
         );
         INSERT INTO programs(id, name) VALUES (1, 'Alpha'), (2, 'Bravo');
         INSERT INTO pois(id, name, program_ids) VALUES (10, 'Recon', '1,2'), (11, 'Medic', ' 2 ,99,');
         INSERT INTO tasks(id, name, poi_ids) VALUES (20, 'Patrol', '10,11');
         INSERT INTO questions(id, sub_task, task_ids) VALUES (30, 'Check weapon', '20'), (31, 'Loose', '');",
    )
    .expect("legacy schema");
}

#[test]
fn legacy_id_lists_migrate_into_link_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_legacy_workspace(dir.path());

    let store = Store::open(dir.path()).expect("open migrates");
    let conn = store.conn();
    assert_eq!(db::user_version(conn).expect("version"), SCHEMA_VERSION);
    assert!(!db::table_has_column(conn, "pois", "program_ids").expect("info"));
    assert!(!db::table_has_column(conn, "tasks", "poi_ids").expect("info"));
    assert!(!db::table_has_column(conn, "questions", "task_ids").expect("info"));

    assert_eq!(sorted(store.list_parents(Link::PoiProgram, 10).expect("recon")), vec![1, 2]);
    // Id 99 never existed, so it is dropped.
    assert_eq!(store.list_parents(Link::PoiProgram, 11).expect("medic"), vec![2]);
    assert_eq!(sorted(store.list_parents(Link::TaskPoi, 20).expect("patrol")), vec![10, 11]);
    assert_eq!(store.list_parents(Link::QuestionTask, 31).expect("loose"), Vec::<i64>::new());

    let names: Vec<String> = store
        .questions_for_names("Alpha", "Recon")
        .expect("questions")
        .into_iter()
        .map(|q| q.sub_task)
        .collect();
    assert_eq!(names, vec!["Check weapon".to_string()]);
    drop(store);

    // Second open is a no-op.
    let store = Store::open(dir.path()).expect("reopen");
    assert_eq!(store.count_rows("poi_programs").expect("count"), 3);
}
