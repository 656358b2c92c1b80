use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use trainingd::backup;
use trainingd::store::Store;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("training-backup-src");
    let workspace2 = temp_dir("training-backup-dst");
    let out_dir = temp_dir("training-backup-out");

    let db_src = workspace.join("training.sqlite3");
    let bytes = b"sqlite-test-payload";
    std::fs::write(&db_src, bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.trainingbackup.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(export.db_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("manifest json");
    assert_eq!(manifest["format"], serde_json::json!(backup::BUNDLE_FORMAT));
    assert_eq!(manifest["bundleId"], serde_json::json!(export.bundle_id));
    assert_eq!(manifest["dbSha256"], serde_json::json!(export.db_sha256));
    archive
        .by_name("db/training.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT);

    let restored = std::fs::read(workspace2.join("training.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);
    assert!(!workspace2.join("training.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn raw_sqlite_import_is_supported() {
    let out_dir = temp_dir("training-backup-raw");
    let workspace = temp_dir("training-backup-raw-dst");

    let raw_file = out_dir.join("copy.sqlite3");
    {
        let conn = rusqlite::Connection::open(&raw_file).expect("create raw sqlite");
        conn.execute_batch("CREATE TABLE marker(v TEXT); INSERT INTO marker VALUES('raw');")
            .expect("write marker");
    }
    let bytes = std::fs::read(&raw_file).expect("read raw sqlite");

    let import = backup::import_workspace_bundle(&raw_file, &workspace).expect("import raw sqlite");
    assert_eq!(import.bundle_format_detected, backup::RAW_SQLITE_FORMAT);

    let restored = std::fs::read(workspace.join("training.sqlite3")).expect("read restored sqlite");
    assert_eq!(restored, bytes);
    assert!(!workspace.join("training.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn non_database_file_is_rejected_and_workspace_survives() {
    let out_dir = temp_dir("training-backup-junk");
    let workspace = temp_dir("training-backup-junk-dst");
    {
        let store = Store::open(&workspace).expect("open workspace");
        store.create_program("Alpha").expect("program");
    }

    let junk = out_dir.join("notes.txt");
    std::fs::write(&junk, b"this is not a database at all").expect("write junk");

    let err = backup::import_workspace_bundle(&junk, &workspace)
        .expect_err("text file must be rejected");
    assert!(format!("{err:#}").contains("SQLite database"));

    let store = Store::open(&workspace).expect("workspace still opens");
    let names: Vec<String> = store
        .list_programs()
        .expect("list")
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Alpha".to_string()]);

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn checksum_mismatch_leaves_existing_database_alone() {
    let out_dir = temp_dir("training-backup-tampered");
    let workspace = temp_dir("training-backup-tampered-dst");
    let existing = workspace.join("training.sqlite3");
    std::fs::write(&existing, b"keep-me").expect("write existing db");

    let bundle_path = out_dir.join("tampered.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest entry");
        zip.write_all(
            serde_json::json!({
                "format": backup::BUNDLE_FORMAT,
                "dbSha256": "00".repeat(32),
            })
            .to_string()
            .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file("db/training.sqlite3", opts).expect("db entry");
        zip.write_all(b"not-what-the-manifest-says").expect("write db");
        zip.finish().expect("finish zip");
    }

    let err = backup::import_workspace_bundle(&bundle_path, &workspace)
        .expect_err("tampered bundle must be rejected");
    assert!(format!("{err:#}").contains("checksum mismatch"));
    assert_eq!(std::fs::read(&existing).expect("read existing"), b"keep-me");

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bundle_without_checksum_is_rejected() {
    let out_dir = temp_dir("training-backup-nosum");
    let workspace = temp_dir("training-backup-nosum-dst");
    let existing = workspace.join("training.sqlite3");
    std::fs::write(&existing, b"keep-me").expect("write existing db");

    let bundle_path = out_dir.join("unsigned.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest entry");
        zip.write_all(
            serde_json::json!({ "format": backup::BUNDLE_FORMAT })
                .to_string()
                .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file("db/training.sqlite3", opts).expect("db entry");
        zip.write_all(b"unverified-payload").expect("write db");
        zip.finish().expect("finish zip");
    }

    let err = backup::import_workspace_bundle(&bundle_path, &workspace)
        .expect_err("bundle without checksum must be rejected");
    assert!(format!("{err:#}").contains("dbSha256"));
    assert_eq!(std::fs::read(&existing).expect("read existing"), b"keep-me");

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_bundle_format_is_rejected() {
    let out_dir = temp_dir("training-backup-format");
    let workspace = temp_dir("training-backup-format-dst");

    let bundle_path = out_dir.join("other.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest entry");
        zip.write_all(br#"{"format":"something-else"}"#)
            .expect("write manifest");
        zip.finish().expect("finish zip");
    }

    let err = backup::import_workspace_bundle(&bundle_path, &workspace)
        .expect_err("foreign bundle must be rejected");
    assert!(format!("{err:#}").contains("unsupported bundle format"));

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
