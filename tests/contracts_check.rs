mod common;

use common::{load_schema, TestEnv, COMPOSE_FIXTURE};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

#[test]
fn contracts_check() {
    let env = TestEnv::new();

    let compose = env.write("docker-compose.yml", COMPOSE_FIXTURE);
    let remap = env.run_json(&[
        "ports",
        "remap",
        "--compose",
        compose.to_str().unwrap(),
        "--service",
        "webui",
        "--from",
        "8080:80",
        "--to",
        "8082:80",
        "--no-restart",
    ]);
    assert_eq!(remap["ok"], true);
    validate("remap-report.schema.json", &remap["data"]);

    env.write("scripts/a.sh", "#!/bin/sh\n");
    let perms = env.run_json(&["perms", "fix", "--path", &env.path("scripts"), "--dry-run"]);
    assert_eq!(perms["ok"], true);
    validate("perms-report.schema.json", &perms["data"]);

    let out_root = env.path("diag");
    fs::create_dir_all(&out_root).unwrap();
    let diag = env.run_json(&["diag", "collect", "--out-root", &out_root]);
    assert_eq!(diag["ok"], true);
    validate("diag-report.schema.json", &diag["data"]);

    let extract = env.run_json(&["diag", "extract", "--out-root", &out_root]);
    assert_eq!(extract["ok"], true);
    validate("extract-report.schema.json", &extract["data"]);

    env.write("src/config/app.env", "API_TOKEN=x\n");
    let export = env.run_json(&[
        "export",
        "run",
        "snap",
        "--src",
        &env.path("src"),
        "--dest",
        &env.path("dest"),
    ]);
    assert_eq!(export["ok"], true);
    validate("export-report.schema.json", &export["data"]);

    let boot = env.run_json(&["stack", "bootstrap", "--no-up"]);
    assert_eq!(boot["ok"], true);
    validate("bootstrap-report.schema.json", &boot["data"]);

    let remote = env
        .cmd()
        .args(["remote", "exec"])
        .write_stdin(r#"{"host":"h","cmd":"true"}"#)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let remote: Value = serde_json::from_slice(&remote).unwrap();
    validate("remote-response.schema.json", &remote);

    let err = env.run_json_failure(&["diag", "extract", "--out-root", &env.path("none")], 2);
    validate("error.schema.json", &err);
}
