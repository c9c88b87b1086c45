use std::path::Path;

use assert_cmd::Command;
use serde_json::{Value, json};
use tempfile::TempDir;

fn descriptor_set() -> Value {
    json!({
        "file": [{
            "name": "e2e/e2e.proto",
            "package": "e2e",
            "options": { "goPackage": "example.com/protojson-gen/e2e" },
            "messageType": [{
                "name": "Basic",
                "field": [
                    { "name": "a", "number": 1, "label": "LABEL_OPTIONAL", "type": "TYPE_STRING", "jsonName": "a" },
                    { "name": "b", "number": 2, "label": "LABEL_OPTIONAL", "type": "TYPE_BYTES", "jsonName": "b" },
                    { "name": "pick", "number": 3, "label": "LABEL_OPTIONAL", "type": "TYPE_BOOL", "oneofIndex": 0 }
                ],
                "oneofDecl": [{ "name": "choice" }]
            }]
        }]
    })
}

fn write_input(dir: &Path, doc: &Value) -> String {
    let path = dir.join("descriptors.json");
    std::fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    path.to_string_lossy().into_owned()
}

fn bin() -> Command {
    Command::cargo_bin("protojson-gen").unwrap()
}

#[test]
fn go_writes_one_file_per_proto() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), &descriptor_set());
    let out_dir = dir.path().join("gen");

    bin()
        .args(["go", "-i", input.as_str(), "--out-dir"])
        .arg(&out_dir)
        .assert()
        .success();

    let generated = std::fs::read_to_string(out_dir.join("e2e/e2e.pb.json.go")).unwrap();
    assert!(generated.starts_with("// Code generated by protojson-gen. DO NOT EDIT.\n"));
    assert!(generated.contains("package e2e\n"));
    assert!(generated.contains("func (msg *Basic) MarshalJSON() ([]byte, error) {"));
    assert!(generated.contains("func (msg *Basic) UnmarshalJSON(b []byte) error {"));
    assert!(!generated.contains("GetPick"));
}

#[test]
fn go_prints_to_stdout_with_parameters() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), &descriptor_set());

    let output = bin()
        .args(["go", "-i", input.as_str(), "--param", "reject_unknown_fields,orig_name"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("\t\tDiscardUnknown: false,\n"));
    assert!(stdout.contains("use_original_field_names=true"));
}

#[test]
fn json_pointer_selects_the_descriptor_set() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), &json!({ "request": { "descriptors": descriptor_set() } }));

    let output = bin()
        .args(["go", "-i", input.as_str(), "--json-pointer", "/request/descriptors"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("func (msg *Basic) MarshalJSON"));
}

#[test]
fn plan_reports_lowering_and_skips() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), &descriptor_set());

    let output = bin().args(["plan", "-i", input.as_str(), "--enums-as-ints"]).output().unwrap();
    assert!(output.status.success());
    let plan: Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(plan["options"]["emit_enums_as_integers"], json!(true));
    let file = &plan["files"][0];
    assert_eq!(file["output"], json!("e2e/e2e.pb.json.go"));
    assert_eq!(file["package"], json!("e2e"));

    let record = &file["records"][0];
    assert_eq!(record["go_ident"], json!("Basic"));
    let fields = record["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0]["key"], json!("a"));
    assert_eq!(fields[2]["skipped"], json!("oneof"));
    assert_eq!(fields[2]["node"], Value::Null);
}

#[test]
fn unknown_parameter_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), &descriptor_set());

    let output = bin().args(["go", "-i", input.as_str(), "--param", "paths"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown option"));
}

#[test]
fn missing_file_filter_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), &descriptor_set());

    bin()
        .args(["go", "-i", input.as_str(), "--file", "nope.proto"])
        .assert()
        .failure();
}

#[test]
fn help_says_defaults_are_always_written() {
    let output = bin().args(["go", "--help"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("always writes default-valued fields"));
}
