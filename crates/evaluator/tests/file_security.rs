//! `file()` semantics inside the project boundary, and the boundary
//! itself.

mod common;

use cmeval_events::DiagSeverity;
use common::{count_error_diags_for_command, run, Sandbox};

#[test]
fn read_relative_inside_project_works() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("data.txt", "hello\n");
    let mut eval = sandbox.evaluator();
    run(&mut eval, "file(READ data.txt OUT)\n");
    assert_eq!(eval.var_get("OUT"), "hello\n");
    assert_eq!(eval.report().error_count, 0);
}

#[cfg(unix)]
#[test]
fn strings_rejects_absolute_outside_project() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "file(STRINGS /etc/hosts OUT)\n");
    assert!(!eval.var_defined("OUT"));
    assert!(count_error_diags_for_command(&eval, "file") >= 1);
    assert!(eval
        .events()
        .has_diag_cause_containing(DiagSeverity::Error, "Security Violation"));
}

#[test]
fn dotdot_escape_is_rejected_without_touching_disk() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(&mut eval, "file(WRITE ../../escape.txt gotcha)\n");
    assert!(eval
        .events()
        .has_diag_cause_containing(DiagSeverity::Error, "Security Violation"));
    assert!(!sandbox.source.parent().unwrap().join("escape.txt").exists());
}

#[test]
fn write_and_append_land_in_binary_dir() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "file(WRITE out/gen.txt \"one\")\nfile(APPEND out/gen.txt \"-two\")\n",
    );
    let written = std::fs::read_to_string(sandbox.binary.join("out/gen.txt")).unwrap();
    assert_eq!(written, "one-two");
}

#[test]
fn strings_splits_lines() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("lines.txt", "alpha\r\nbeta\n\ngamma\n");
    let mut eval = sandbox.evaluator();
    run(&mut eval, "file(STRINGS lines.txt OUT)\n");
    assert_eq!(eval.var_get("OUT"), "alpha;beta;gamma");
}

#[test]
fn copy_preserves_leaf_names() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("assets/a.txt", "x");
    let mut eval = sandbox.evaluator();
    run(&mut eval, "file(COPY assets/a.txt DESTINATION staged)\n");
    assert!(sandbox.binary.join("staged/a.txt").exists());
    assert_eq!(eval.report().error_count, 0);
}

#[test]
fn glob_finds_and_sorts_matches() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("src/b.c", "");
    sandbox.write_source_file("src/a.c", "");
    sandbox.write_source_file("src/nested/deep.c", "");
    sandbox.write_source_file("src/readme.md", "");
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "file(GLOB FLAT RELATIVE \"${CMAKE_CURRENT_SOURCE_DIR}\" src/*.c)\nfile(GLOB_RECURSE ALL RELATIVE \"${CMAKE_CURRENT_SOURCE_DIR}\" src/*.c)\n",
    );
    assert_eq!(eval.var_get("FLAT"), "src/a.c;src/b.c");
    assert_eq!(eval.var_get("ALL"), "src/a.c;src/b.c;src/nested/deep.c");
}

#[test]
fn remove_and_make_directory() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "file(MAKE_DIRECTORY d1/d2)\nfile(WRITE d1/d2/x.txt data)\nfile(REMOVE d1/d2/x.txt)\nfile(REMOVE_RECURSE d1)\n",
    );
    assert!(!sandbox.binary.join("d1").exists());
    assert_eq!(eval.report().error_count, 0);
}

#[test]
fn size_and_hash() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("payload.bin", "hello\n");
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "file(SIZE payload.bin SZ)\nfile(SHA256 payload.bin DIGEST)\n",
    );
    assert_eq!(eval.var_get("SZ"), "6");
    assert_eq!(
        eval.var_get("DIGEST"),
        "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
    );
}

#[test]
fn unsupported_hash_is_engine_limitation() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("payload.bin", "hello\n");
    let mut eval = sandbox.evaluator();
    run(&mut eval, "file(MD5 payload.bin DIGEST)\n");
    assert!(!eval.var_defined("DIGEST"));
    assert_eq!(eval.report().engine_limitation_count, 1);
}

#[test]
fn generate_resolves_genex_content() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "file(GENERATE OUTPUT conf.h CONTENT \"#define DEBUG $<CONFIG:Debug>\")\n",
    );
    let generated = std::fs::read_to_string(sandbox.binary.join("conf.h")).unwrap();
    assert_eq!(generated, "#define DEBUG 1");
}

#[test]
fn archive_round_trip() {
    let sandbox = Sandbox::new();
    sandbox.write_source_file("tree/inner/file.txt", "archived");
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "file(ARCHIVE_CREATE OUTPUT pack.tar.gz PATHS tree COMPRESSION GZip)\nfile(ARCHIVE_EXTRACT INPUT \"${CMAKE_BINARY_DIR}/pack.tar.gz\" DESTINATION unpacked)\n",
    );
    let extracted = sandbox.binary.join("unpacked/tree/inner/file.txt");
    assert_eq!(std::fs::read_to_string(extracted).unwrap(), "archived");
    assert_eq!(eval.report().error_count, 0);
}

#[test]
fn download_is_declared_unsupported() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "file(DOWNLOAD https://example.com/x.tar.gz x.tar.gz)\n",
    );
    assert!(count_error_diags_for_command(&eval, "file") >= 1);
    assert_eq!(eval.report().unsupported_count, 1);
}

#[test]
fn configure_log_receives_yaml_documents() {
    let sandbox = Sandbox::new();
    let mut eval = sandbox.evaluator();
    run(
        &mut eval,
        "message(CHECK_START \"probing\")\nmessage(CONFIGURE_LOG \"probe output line\")\nmessage(CHECK_PASS \"done\")\n",
    );
    let log = std::fs::read_to_string(
        sandbox.binary.join("CMakeFiles/CMakeConfigureLog.yaml"),
    )
    .unwrap();
    assert!(log.contains("kind: \"message-v1\""));
    assert!(log.contains("probe output line"));
    assert!(log.contains("- \"probing\""));
}
