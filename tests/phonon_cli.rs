use std::fs;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_phonon_cli"))
}

fn assets_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("cipic_124.hrtf"), b"hrtf").expect("write hrtf");
    dir
}

fn run_json(cmd: &mut Command) -> (Option<i32>, Value) {
    let output = cmd.output().expect("failed to run phonon_cli");
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json = serde_json::from_str(stdout.trim()).expect("JSON report on stdout");
    (output.status.code(), json)
}

#[test]
fn simulate_reports_active_scene() {
    let assets = assets_dir();
    let (code, json) = run_json(cli().args([
        "simulate",
        "--engine",
        "unity",
        "--frames",
        "10",
        "--sources",
        "3",
        "--assets-dir",
        assets.path().to_str().unwrap(),
    ]));

    assert_eq!(code, Some(0));
    assert_eq!(json["activated"], true);
    assert_eq!(json["frames"], 10);
    assert_eq!(json["status"]["phase"], "active");
    assert_eq!(json["final_phase"], "uninitialized");
    assert_eq!(json["runtime_calls"]["update_listener"], 10);
    assert_eq!(json["runtime_calls"]["create_source"], 3);
    assert_eq!(json["runtime_calls"]["destroy_source"], 3);
    assert_eq!(json["final_attenuation"].as_object().unwrap().len(), 3);
}

#[test]
fn simulate_reports_source_cap_overflow() {
    let assets = assets_dir();
    let (code, json) = run_json(cli().args([
        "simulate",
        "--frames",
        "1",
        "--sources",
        "3",
        "--max-sources",
        "2",
        "--assets-dir",
        assets.path().to_str().unwrap(),
    ]));

    assert_eq!(code, Some(0));
    assert_eq!(json["runtime_calls"]["create_source"], 3);
    let events = json["events"].as_array().unwrap();
    assert!(events
        .iter()
        .any(|event| event["kind"]["type"] == "source_cap_exceeded"));
}

#[test]
fn simulate_failure_exits_with_code_two() {
    let assets = assets_dir();
    let (code, json) = run_json(cli().args([
        "simulate",
        "--engine",
        "wwise",
        "--frames",
        "5",
        "--fail-at",
        "listener",
        "--assets-dir",
        assets.path().to_str().unwrap(),
    ]));

    assert_eq!(code, Some(2));
    assert_eq!(json["activated"], false);
    assert_eq!(json["activation_error"]["code"], 3001);
    assert_eq!(json["status"]["phase"], "uninitialized");
}

#[test]
fn simulate_without_hrtf_reports_asset_error() {
    let empty = tempfile::tempdir().unwrap();
    let (code, json) = run_json(cli().args([
        "simulate",
        "--frames",
        "1",
        "--assets-dir",
        empty.path().to_str().unwrap(),
    ]));

    assert_eq!(code, Some(2));
    assert_eq!(json["activation_error"]["code"], 3002);
}

#[test]
fn attenuate_prints_inverse_distance() {
    let (code, json) = run_json(cli().args(["attenuate", "--distance", "5"]));

    assert_eq!(code, Some(0));
    let value = json["attenuation"].as_f64().unwrap();
    assert!((value - 4.0).abs() < 1e-5);
}

#[test]
fn attenuate_clamps_zero_distance() {
    let (_, json) = run_json(cli().args(["attenuate", "--distance", "0", "--scale", "1"]));
    let value = json["attenuation"].as_f64().unwrap();
    assert!(value.is_finite());
}

#[test]
fn unknown_engine_is_rejected() {
    let output = cli()
        .args(["simulate", "--engine", "openal"])
        .output()
        .expect("failed to run phonon_cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("openal"), "unexpected stderr: {stderr}");
}

#[test]
fn simulate_help_documents_asset_directory() {
    let output = cli()
        .args(["simulate", "--help"])
        .output()
        .expect("failed to run phonon_cli simulate --help");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(stdout.contains("--assets-dir"), "help was: {stdout}");
    assert!(stdout.contains("assets/StreamingAssets"), "help was: {stdout}");
    assert!(stdout.contains("3002"), "help was: {stdout}");
}
