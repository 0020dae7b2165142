use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn vfs_bench(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vfs-bench").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn write_results(dir: &Path, name: &str, backend: &str, durations: &[f64]) {
    let file = serde_json::json!({
        "backend_id": backend,
        "unit": "s",
        "workload": "veracruz-vfs-bench.wasm",
        "durations": durations,
    });
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(&file).unwrap()).unwrap();
}

#[test]
fn test_graph_writes_chart_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    write_results(dir.path(), "vc-fee.json", "vc-fee", &[3.0, 3.2, 2.9]);
    write_results(dir.path(), "wasmtime.json", "wasmtime", &[1.5, 1.4, 1.6]);

    vfs_bench(dir.path())
        .args([
            "graph",
            "out.svg",
            "vc-fee=vc-fee.json",
            "wasmtime+tmpfs=wasmtime.json",
            "--summary",
            "summary.md",
            "--baseline",
            "wasmtime+tmpfs",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("out.svg"));

    let svg = std::fs::read_to_string(dir.path().join("out.svg")).unwrap();
    assert_eq!(svg.matches(r#"class="series""#).count(), 2);
    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("vs wasmtime+tmpfs"));
}

#[test]
fn test_graph_with_missing_series_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_results(dir.path(), "vc-fee.json", "vc-fee", &[3.0]);

    vfs_bench(dir.path())
        .args(["graph", "out.svg", "vc-fee=vc-fee.json", "wasmtime=missing.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"))
        .stderr(predicate::str::contains("missing.json"));

    assert!(!dir.path().join("out.svg").exists());
}

#[test]
fn test_graph_rejects_malformed_series_argument() {
    let dir = tempfile::tempdir().unwrap();

    vfs_bench(dir.path())
        .args(["graph", "out.svg", "vc-fee.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("LABEL=PATH"));
}

#[test]
fn test_graph_unknown_baseline_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_results(dir.path(), "vc-fee.json", "vc-fee", &[3.0]);

    vfs_bench(dir.path())
        .args([
            "graph",
            "out.svg",
            "vc-fee=vc-fee.json",
            "--summary",
            "summary.md",
            "--baseline",
            "wasmtime",
        ])
        .assert()
        .code(1);

    assert!(!dir.path().join("out.svg").exists());
    assert!(!dir.path().join("summary.md").exists());
}

#[test]
fn test_bench_unknown_backend() {
    let dir = tempfile::tempdir().unwrap();

    vfs_bench(dir.path())
        .args(["bench", "wasmer", "wasmer.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown backend `wasmer`"));

    assert!(!dir.path().join("target").exists());
}

#[test]
fn test_bench_rejects_zero_jobs() {
    let dir = tempfile::tempdir().unwrap();

    vfs_bench(dir.path())
        .args(["bench", "wasmtime", "wasmtime.json", "--jobs", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("positive integer"));

    assert!(!dir.path().join("target").exists());
    assert!(!dir.path().join("wasmtime.json").exists());
}

/// Config whose scratch step succeeds without privileges, so `bench` gets
/// as far as resolving the (unbuilt) workload.
const LENIENT_SCRATCH: &str = "[scratch]\nmount_policy = \"lenient\"\nmount_command = [\"false\"]\n";

#[test]
fn test_flags_override_file_values_before_validation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("vfs-bench.toml"),
        format!("{}[run]\njobs = 0\n", LENIENT_SCRATCH),
    )
    .unwrap();

    vfs_bench(dir.path())
        .args(["bench", "wasmtime", "out.json", "--jobs", "3"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("vfs-bench build"))
        .stderr(predicate::str::contains("run.jobs").not());

    vfs_bench(dir.path())
        .args(["bench", "wasmtime", "out.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("run.jobs"));
}

#[test]
fn test_environment_overrides_file_and_is_validated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("vfs-bench.toml"),
        format!("{}[run]\nworkers = 0\n", LENIENT_SCRATCH),
    )
    .unwrap();

    vfs_bench(dir.path())
        .args(["bench", "wasmtime", "out.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("run.workers"));

    vfs_bench(dir.path())
        .args(["bench", "wasmtime", "out.json", "--workers", "2"])
        .env("VFS_BENCH_RUN__JOBS", "0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("run.jobs"));

    vfs_bench(dir.path())
        .args(["bench", "wasmtime", "out.json"])
        .env("VFS_BENCH_RUN__WORKERS", "2")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("vfs-bench build"));
}

#[test]
fn test_graph_and_status_ignore_invalid_run_section() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("vfs-bench.toml"), "[run]\njobs = 0\n").unwrap();
    write_results(dir.path(), "vc-fee.json", "vc-fee", &[3.0]);

    vfs_bench(dir.path())
        .args(["graph", "out.svg", "vc-fee=vc-fee.json"])
        .assert()
        .success();
    assert!(dir.path().join("out.svg").exists());

    vfs_bench(dir.path()).arg("status").assert().success();
}

#[test]
fn test_missing_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();

    vfs_bench(dir.path())
        .args(["--config", "nope.toml", "status"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn test_status() {
    let dir = tempfile::tempdir().unwrap();

    vfs_bench(dir.path())
        .args(["status", "--detailed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VFS Bench Harness"))
        .stdout(predicate::str::contains("not built"))
        .stdout(predicate::str::contains("vc-fee: vc-fee -de -x jit"));
}
