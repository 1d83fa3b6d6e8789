use std::path::PathBuf;
use std::process::{Command, Output};

fn seam(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_seam"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run seam")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn reference_manifest() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../crates/seam-reference/seam_reference.seam.toml")
}

#[test]
fn doctor_reports_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = seam(dir.path(), &["doctor"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Seam Doctor"));
    assert!(text.contains("unchecked callback failure: abort"));
}

#[test]
fn doctor_reads_nearest_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("seam.toml"),
        "[executor]\nworkers = 2\n\n[callbacks]\nunchecked_failure = \"return-default\"\n",
    )
    .unwrap();
    let output = seam(dir.path(), &["doctor"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("seam.toml"));
    assert!(text.contains("workers = 2"));
    assert!(text.contains("unchecked callback failure: return-default"));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("seam.toml"), "[executor]\nworkers = 0\n").unwrap();
    let output = seam(dir.path(), &["doctor"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("workers"));
}

#[test]
fn inspect_reference_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = reference_manifest();
    let output = seam(dir.path(), &["inspect", manifest.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Library: seam_reference"));
    assert!(text.contains("string_upper(text: string) -> string"));
    assert!(text.contains("opaque-handle"));

    let output = seam(
        dir.path(),
        &["inspect", manifest.to_str().unwrap(), "--function", "start_compute", "--json"],
    );
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["functions"][0]["returns"]["path"], "ticket");
}

#[test]
fn layout_of_reference_struct() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = reference_manifest();
    let output = seam(dir.path(), &["layout", manifest.to_str().unwrap(), "Vec3f32", "--json"]);
    assert!(output.status.success());
    let layout: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(layout["size"], 12);
    assert_eq!(layout["fields"][2]["offset"], 8);
}

#[test]
fn bench_runs_small_iteration_count() {
    let dir = tempfile::tempdir().unwrap();
    let output = seam(dir.path(), &["bench", "--iterations", "100"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("baseline"));
    assert!(text.contains("callback_apply"));
}

#[test]
fn harness_detects_double_release() {
    let dir = tempfile::tempdir().unwrap();
    let output = seam(dir.path(), &["harness", "double-release"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("second release: detected"));
}

#[test]
fn harness_checked_fault_runs_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let output = seam(dir.path(), &["harness", "checked-fault"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("observed: Err(Panic)"));
    assert!(text.contains("cleanup: out = 42"));
}

#[test]
fn harness_unchecked_fault_aborts_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let output = seam(dir.path(), &["harness", "unchecked-fault"]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("policy: abort"));
    assert!(!text.contains("cleanup"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("aborting"));
}

#[test]
fn harness_unchecked_fault_with_return_default() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("seam.toml"),
        "[callbacks]\nunchecked_failure = \"return-default\"\n",
    )
    .unwrap();
    let output = seam(dir.path(), &["harness", "unchecked-fault"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("observed: Ok(())"));
    assert!(text.contains("cleanup: out = 42"));
}

#[test]
fn harness_guarded_violation_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let output = seam(dir.path(), &["harness", "guarded-violation"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("first destroy: Ok"));
    assert!(!stdout(&output).contains("instead of aborting"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("boundary protocol violation: double release of handle"));
    assert!(!stderr.contains("instead of aborting"));
}

#[test]
fn harness_released_callback_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let output = seam(dir.path(), &["harness", "released-callback"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("before release: 2"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("use of released callback context"));
    assert!(!stderr.contains("instead of aborting"));
}
