use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};

fn write_script(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).expect("script should be written");
    path
}

fn replay(args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("gis-measure")
        .arg("replay")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

#[test]
fn length_of_geographic_line() {
    cargo_bin_cmd!("gis-measure")
        .args(["length", "--projection", "EPSG:4326", "0,0", "0,0.001", "0.001,0.001"])
        .assert()
        .success()
        .stdout("0.22 km\n");
}

#[test]
fn length_in_meters_accepts_negative_coordinates() {
    cargo_bin_cmd!("gis-measure")
        .args(["length", "--projection", "EPSG:4326", "--unit", "meters", "-0.001,0", "0,0"])
        .assert()
        .success()
        .stdout("111.14 meters\n");
}

#[test]
fn area_of_geographic_square() {
    cargo_bin_cmd!("gis-measure")
        .args([
            "area",
            "--projection",
            "EPSG:4326",
            "--unit",
            "sqmeters",
            "0,0",
            "0.001,0",
            "0.001,0.001",
            "0,0.001",
        ])
        .assert()
        .success()
        .stdout("12392.14 sqmeters\n");
}

#[test]
fn degenerate_area_is_zero() {
    cargo_bin_cmd!("gis-measure")
        .args(["area", "0,0", "10,10"])
        .assert()
        .success()
        .stdout("0.00 km²\n");
}

#[test]
fn unknown_unit_is_rejected() {
    cargo_bin_cmd!("gis-measure")
        .args(["length", "--unit", "furlongs", "0,0", "1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown length unit"));
}

#[test]
fn unknown_metric_mode_is_rejected() {
    cargo_bin_cmd!("gis-measure")
        .args(["length", "--mode", "flat", "0,0", "1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown metric mode"));
}

#[test]
fn invalid_coordinate_is_rejected() {
    cargo_bin_cmd!("gis-measure")
        .args(["length", "0,0", "north"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid coordinate"));
}

#[test]
fn units_emits_unit_table() {
    let output = cargo_bin_cmd!("gis-measure")
        .arg("units")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let table: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(table["length"].as_array().map(Vec::len), Some(4));
    assert_eq!(table["length"][1]["name"], "km");
    assert_eq!(table["length"][1]["scale"], 0.001);
    assert_eq!(table["area"][2]["name"], "acres");
    assert_eq!(table["area"][2]["scale"], 0.000247105);
}

#[test]
fn replay_draws_and_selects() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = write_script(
        temp.path(),
        "draw.json",
        r#"[
            {"action": "start", "kind": "line"},
            {"action": "click", "x": 0.0, "y": 0.0},
            {"action": "move", "x": 0.0, "y": 500.0},
            {"action": "click", "x": 0.0, "y": 1000.0},
            {"action": "double_click", "x": 1000.0, "y": 1000.0},
            {"action": "start", "kind": "polygon"},
            {"action": "click", "x": 5000.0, "y": 5000.0},
            {"action": "click", "x": 6000.0, "y": 5000.0},
            {"action": "click", "x": 6000.0, "y": 6000.0},
            {"action": "finish"},
            {"action": "set_unit", "kind": "line", "unit": "meters"},
            {"action": "click", "x": 0.0, "y": 600.0}
        ]"#,
    );

    let value = replay(&[script.to_str().expect("utf-8 path")]);
    assert_eq!(value["mode"], "idle");
    assert_eq!(value["capabilities"]["editing"], true);
    assert_eq!(value["units"]["length"], "meters");
    assert_eq!(value["context_menu"], false);

    let geometries = value["geometries"].as_array().expect("geometries array");
    assert_eq!(geometries.len(), 2);
    assert_eq!(geometries[0]["kind"], "line");
    assert_eq!(geometries[0]["vertices"].as_array().map(Vec::len), Some(3));
    assert!(geometries[0]["label"].as_str().is_some_and(|label| label.ends_with(" meters")));
    assert_eq!(geometries[1]["kind"], "polygon");
    assert!(geometries[1]["label"].as_str().is_some_and(|label| label.ends_with(" km²")));

    assert_eq!(value["record"]["geometry_id"], geometries[0]["id"]);
    assert_eq!(value["record"]["kind"], "line");
    assert_eq!(value["readout"], geometries[0]["label"]);
}

#[test]
fn replay_geographic_polygon_keeps_every_vertex() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = write_script(
        temp.path(),
        "square.json",
        r#"[
            {"action": "start", "kind": "polygon"},
            {"action": "click", "x": 0.0, "y": 10.0},
            {"action": "click", "x": 0.001, "y": 10.0},
            {"action": "click", "x": 0.001, "y": 10.001},
            {"action": "click", "x": 0.0, "y": 10.001},
            {"action": "click", "x": 0.0, "y": 10.001},
            {"action": "double_click", "x": 0.0, "y": 10.001}
        ]"#,
    );

    let value = replay(&[
        script.to_str().expect("utf-8 path"),
        "--projection",
        "EPSG:4326",
    ]);
    let geometries = value["geometries"].as_array().expect("geometries array");
    assert_eq!(geometries.len(), 1);
    assert_eq!(geometries[0]["vertices"].as_array().map(Vec::len), Some(4));
    let area = geometries[0]["value"].as_f64().expect("numeric value");
    assert!((area - 12_204.0).abs() < 50.0, "unexpected area {area}");
}

#[test]
fn replay_context_menu_clears_lines() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = write_script(
        temp.path(),
        "clear.json",
        r#"[
            {"action": "start", "kind": "line"},
            {"action": "click", "x": 0.0, "y": 0.0},
            {"action": "double_click", "x": 0.0, "y": 1000.0},
            {"action": "click", "x": 0.0, "y": 500.0},
            {"action": "right_click", "x": 0.0, "y": 500.0},
            {"action": "menu", "item": "clear_lines"}
        ]"#,
    );

    let value = replay(&[script.to_str().expect("utf-8 path")]);
    assert_eq!(value["geometries"].as_array().map(Vec::len), Some(0));
    assert_eq!(value["record"]["geometry_id"], Value::Null);
    assert_eq!(value["record"]["value"], Value::Null);
    assert_eq!(value["readout"], "0.00 km");
    assert_eq!(value["context_menu"], false);
}

#[test]
fn replay_uses_config_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let config = write_script(
        temp.path(),
        "config.json",
        r#"{"default_length_unit": "feet", "enable_select": false}"#,
    );
    let script = write_script(
        temp.path(),
        "draw.json",
        r#"[
            {"action": "start", "kind": "line"},
            {"action": "click", "x": 0.0, "y": 0.0},
            {"action": "double_click", "x": 100.0, "y": 0.0},
            {"action": "exit"}
        ]"#,
    );

    let value = replay(&[
        script.to_str().expect("utf-8 path"),
        "--config",
        config.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(value["units"]["length"], "feet");
    assert_eq!(value["capabilities"]["selecting"], false);
    assert_eq!(value["capabilities"]["editing"], false);
    assert_eq!(value["geometries"].as_array().map(Vec::len), Some(1));
}

#[test]
fn replay_fails_for_missing_config() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = write_script(temp.path(), "empty.json", "[]");

    cargo_bin_cmd!("gis-measure")
        .arg("replay")
        .arg(&script)
        .arg("--config")
        .arg(temp.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn replay_reports_failing_step() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = write_script(
        temp.path(),
        "bad.json",
        r#"[{"action": "set_unit", "kind": "polygon", "unit": "hectares"}]"#,
    );

    cargo_bin_cmd!("gis-measure")
        .arg("replay")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("script step 1"))
        .stderr(predicate::str::contains("unknown area unit"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("gis-measure")
        .arg("version")
        .assert()
        .success()
        .stdout(format!("{}\n", env!("CARGO_PKG_VERSION")));
}
