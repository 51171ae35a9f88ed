//! Library-level pipeline tests: drive `Session` directly.

use std::fs;

use tempfile::TempDir;
use timidc_drv::{Config, DriverError, Session};

fn session_for(files: Vec<std::path::PathBuf>) -> Session {
    Session::new(Config {
        compile_only: true,
        dev: false,
        files,
    })
}

#[test]
fn test_pipeline_produces_magic_prefixed_output() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("program.timid");
    fs::write(
        &path,
        "$total = 0\nfor $i = 1, i <= 3, i += 1 { total += i }\nprint total\n",
    )
    .expect("write source");

    let session = session_for(vec![path.clone()]);
    session.run().expect("compiles cleanly");

    let bytes = fs::read(dir.path().join("program.timb")).expect("output written");
    assert_eq!(&bytes[..2], &[0xFA, 0xCC]);
    // The code stream ends in OP_RETURN
    assert_eq!(bytes.last().copied(), Some(36));
}

#[test]
fn test_pipeline_gates_output_on_errors() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("broken.timid");
    fs::write(&path, "while { print 1 }\n").expect("write source");

    let session = session_for(vec![path.clone()]);
    let error = session.run().expect_err("must fail");
    assert!(matches!(error, DriverError::CompilationFailed));
    assert!(session.handler.has_errors());

    assert!(!dir.path().join("broken.timb").exists());
}

#[test]
fn test_handler_resets_between_files() {
    let dir = TempDir::new().expect("temp dir");
    let bad = dir.path().join("bad.timid");
    let good = dir.path().join("good.timid");
    fs::write(&bad, "break;\n").expect("write source");
    fs::write(&good, "print 1;\n").expect("write source");

    // The bad file fails...
    let session = session_for(vec![bad]);
    assert!(session.run().is_err());

    // ...but a fresh compile of the good file starts from clear flags
    session.compile_file(&good).expect("good file compiles");
    assert!(!session.handler.has_errors());
    assert!(dir.path().join("good.timb").exists());
}

#[test]
fn test_unreadable_input_maps_to_exit_65() {
    let session = session_for(vec!["nope/missing.timid".into()]);
    let error = session.run().expect_err("must fail");
    assert!(matches!(error, DriverError::Unreadable { .. }));
    assert_eq!(error.exit_code(), 65);
}
