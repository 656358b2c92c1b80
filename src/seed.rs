//! Default catalog loaded into a fresh workspace.
//!
//! Rows are matched by their unique names, so running the seed again only
//! fills in what is missing.

use crate::error::StoreResult;
use crate::model::ControlType;
use crate::store::{link_insert, link_insert_ignore, Link, Store};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

struct QuestionSeed {
    sub_task: &'static str,
    control: ControlType,
    scale: Option<&'static str>,
    critical: bool,
}

struct TaskSeed {
    name: &'static str,
    questions: &'static [QuestionSeed],
}

struct PoiSeed {
    name: &'static str,
    tasks: &'static [TaskSeed],
}

struct ProgramSeed {
    name: &'static str,
    pois: &'static [PoiSeed],
}

const fn q(sub_task: &'static str, scale: &'static str, critical: bool) -> QuestionSeed {
    QuestionSeed {
        sub_task,
        control: ControlType::Combo,
        scale: Some(scale),
        critical,
    }
}

const fn scored(sub_task: &'static str) -> QuestionSeed {
    QuestionSeed {
        sub_task,
        control: ControlType::Score,
        scale: Some(RATING),
        critical: false,
    }
}

const fn remark(sub_task: &'static str) -> QuestionSeed {
    QuestionSeed {
        sub_task,
        control: ControlType::Text,
        scale: None,
        critical: false,
    }
}

const GO_NO_GO: &str = "GO/NO-GO";
const RATING: &str = "Rating 1-5";

const SCALES: &[(&str, &str)] = &[
    (GO_NO_GO, "GO,NO-GO"),
    (RATING, "1,2,3,4,5"),
    ("Proficiency", "Untrained,Practiced,Trained"),
];

const WEAPONS: PoiSeed = PoiSeed {
    name: "Weapons Qualification",
    tasks: &[
        TaskSeed {
            name: "Perform a Function Check",
            questions: &[
                q("Clear the weapon", GO_NO_GO, true),
                q("Check safe, semi and burst positions", GO_NO_GO, false),
                remark("Function check notes"),
            ],
        },
        TaskSeed {
            name: "Zero a Rifle",
            questions: &[
                q("Establish a steady firing position", GO_NO_GO, false),
                q("Adjust sights to point of impact", GO_NO_GO, true),
                scored("Shot group tightness"),
            ],
        },
    ],
};

const FIRST_AID: PoiSeed = PoiSeed {
    name: "First Aid",
    tasks: &[
        TaskSeed {
            name: "Evaluate a Casualty",
            questions: &[
                q("Check for responsiveness", GO_NO_GO, true),
                q("Check for breathing", GO_NO_GO, true),
                q("Check for bleeding", GO_NO_GO, true),
            ],
        },
        TaskSeed {
            name: "Apply a Tourniquet",
            questions: &[
                q("Place tourniquet above the wound", GO_NO_GO, true),
                q("Tighten until bleeding stops", GO_NO_GO, true),
                remark("Time applied"),
            ],
        },
    ],
};

const LAND_NAV: PoiSeed = PoiSeed {
    name: "Land Navigation",
    tasks: &[
        TaskSeed {
            name: "Determine Grid Coordinates",
            questions: &[
                q("Identify the grid zone", GO_NO_GO, false),
                q("Report an eight-digit grid", GO_NO_GO, true),
            ],
        },
        TaskSeed {
            name: "Navigate with Map and Compass",
            questions: &[
                q("Orient the map", GO_NO_GO, false),
                scored("Pace count accuracy"),
                q("Reach the final point", GO_NO_GO, true),
            ],
        },
    ],
};

const COMMS: PoiSeed = PoiSeed {
    name: "Communications",
    tasks: &[
        TaskSeed {
            name: "Operate a Field Radio",
            questions: &[
                q("Install the battery and antenna", GO_NO_GO, false),
                q("Perform a radio check", GO_NO_GO, true),
            ],
        },
        TaskSeed {
            name: "Send a SALUTE Report",
            questions: &[
                q("Report size, activity and location", GO_NO_GO, true),
                q("Report unit, time and equipment", GO_NO_GO, true),
                scored("Report clarity"),
            ],
        },
    ],
};

// First Aid is shared by both programs.
const CATALOG: &[ProgramSeed] = &[
    ProgramSeed {
        name: "Basic Combat Training",
        pois: &[WEAPONS, FIRST_AID, LAND_NAV],
    },
    ProgramSeed {
        name: "Advanced Individual Training",
        pois: &[COMMS, FIRST_AID],
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub scales: usize,
    pub programs: usize,
    pub pois: usize,
    pub tasks: usize,
    pub questions: usize,
    pub links: usize,
}

impl SeedReport {
    pub fn inserted_anything(&self) -> bool {
        self.scales + self.programs + self.pois + self.tasks + self.questions + self.links > 0
    }
}

/// Insert whatever part of the default catalog is missing.
pub fn prepopulate(store: &Store) -> StoreResult<SeedReport> {
    let report = store.write(|tx| {
        let mut report = SeedReport::default();
        for (name, options) in SCALES {
            report.scales += tx.execute(
                "INSERT INTO scales(name, options) VALUES(?, ?) ON CONFLICT(name) DO NOTHING",
                (name, options),
            )?;
        }

        for program in CATALOG {
            let program_id = upsert_named(tx, "programs", program.name, &mut report.programs)?;
            for poi in program.pois {
                let poi_id = upsert_named(tx, "pois", poi.name, &mut report.pois)?;
                report.links += link_insert_ignore(tx, Link::PoiProgram, program_id, poi_id)?;
                for task in poi.tasks {
                    let task_id = upsert_named(tx, "tasks", task.name, &mut report.tasks)?;
                    report.links += link_insert_ignore(tx, Link::TaskPoi, poi_id, task_id)?;
                    for question in task.questions {
                        if ensure_question(tx, task_id, question)? {
                            report.questions += 1;
                            report.links += 1;
                        }
                    }
                }
            }
        }
        Ok(report)
    })?;

    if report.inserted_anything() {
        info!(?report, "default catalog seeded");
    } else {
        info!("default catalog already present");
    }
    Ok(report)
}

fn upsert_named(
    conn: &Connection,
    table: &str,
    name: &str,
    inserted: &mut usize,
) -> StoreResult<i64> {
    *inserted += conn.execute(
        &format!("INSERT INTO {table}(name) VALUES(?) ON CONFLICT(name) DO NOTHING"),
        [name],
    )?;
    let id = conn.query_row(
        &format!("SELECT id FROM {table} WHERE name = ?"),
        [name],
        |r| r.get(0),
    )?;
    Ok(id)
}

/// Questions are not uniquely named, so they are matched by text within
/// their task. Returns true when a row was inserted.
fn ensure_question(conn: &Connection, task_id: i64, seed: &QuestionSeed) -> StoreResult<bool> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT q.id FROM questions q
             JOIN question_tasks qt ON qt.question_id = q.id
             WHERE qt.task_id = ? AND q.sub_task = ?",
            (task_id, seed.sub_task),
            |r| r.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(false);
    }

    let scale_id: Option<i64> = match seed.scale {
        Some(name) => conn
            .query_row("SELECT id FROM scales WHERE name = ?", [name], |r| r.get(0))
            .optional()?,
        None => None,
    };
    conn.execute(
        "INSERT INTO questions(sub_task, control_type, scale_id, critical_task) VALUES(?, ?, ?, ?)",
        (seed.sub_task, seed.control.as_str(), scale_id, seed.critical as i64),
    )?;
    let question_id = conn.last_insert_rowid();
    link_insert(conn, Link::QuestionTask, task_id, question_id)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &[&str] = &[
        "scales",
        "programs",
        "pois",
        "tasks",
        "questions",
        "poi_programs",
        "task_pois",
        "question_tasks",
    ];

    fn counts(store: &Store) -> Vec<i64> {
        TABLES
            .iter()
            .map(|t| store.count_rows(t).expect("count"))
            .collect()
    }

    #[test]
    fn second_run_inserts_nothing() {
        let store = Store::open_in_memory().expect("store");
        let first = prepopulate(&store).expect("seed");
        assert!(first.inserted_anything());
        assert_eq!(first.programs, 2);
        // First Aid is shared, so it is only inserted once.
        assert_eq!(first.pois, 4);
        let after_first = counts(&store);

        let second = prepopulate(&store).expect("reseed");
        assert_eq!(second, SeedReport::default());
        assert_eq!(counts(&store), after_first);
    }

    #[test]
    fn seed_fills_gaps_without_duplicating() {
        let store = Store::open_in_memory().expect("store");
        store.create_program("Basic Combat Training").expect("existing");
        let report = prepopulate(&store).expect("seed");
        assert_eq!(report.programs, 1);
        assert_eq!(store.list_programs().expect("list").len(), 2);
    }

    #[test]
    fn shared_poi_links_to_both_programs() {
        let store = Store::open_in_memory().expect("store");
        prepopulate(&store).expect("seed");
        let poi = store.find_poi("First Aid").expect("find").expect("present");
        let parents = store
            .list_parents(crate::store::Link::PoiProgram, poi.id)
            .expect("parents");
        assert_eq!(parents.len(), 2);
    }
}
