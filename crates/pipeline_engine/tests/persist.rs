use std::fs;

use pipeline_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_artifact() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("result.xlsx", b"first").unwrap();
    assert_eq!(first.file_name().unwrap(), "result.xlsx");
    assert_eq!(fs::read(&first).unwrap(), b"first");

    let second = writer.write("result.xlsx", b"second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"second");

    let entries: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("result.xlsx")]);
}

#[test]
fn no_partial_file_when_output_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("result.zip", b"data");
    assert!(matches!(result, Err(PersistError::OutputDir(_))));
    assert!(!file_path.with_file_name("result.zip").exists());
}

#[test]
fn rejects_names_that_escape_the_output_dir() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("out"));

    for name in ["", "..", "../evil.zip", "a\\b.zip"] {
        assert!(
            matches!(writer.write(name, b"x"), Err(PersistError::InvalidFilename(_))),
            "{name:?} should be rejected"
        );
    }
    assert!(!temp.path().join("evil.zip").exists());
}
