use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_SEQ: AtomicUsize = AtomicUsize::new(0);

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}-{}",
        prefix,
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_absensid");
    let mut child = Command::new(exe)
        .env_remove("ABSENSID_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn absensid");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> String {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn sign_in_admin(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &Path) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "signup",
        "auth.signUp",
        json!({ "email": "admin@school.test", "password": "admin-pass" }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "signin",
        "auth.signIn",
        json!({ "email": "admin@school.test", "password": "admin-pass" }),
    );
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("absensid-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.get("signedIn"), Some(&json!(false)));
    sign_in_admin(&mut stdin, &mut reader, &workspace);

    let methods: Vec<(&str, serde_json::Value)> = vec![
        ("auth.session", json!({})),
        ("access.landing", json!({})),
        ("access.check", json!({ "path": "/admin" })),
        ("profiles.list", json!({})),
        ("students.list", json!({ "className": "sanah1" })),
        ("students.search", json!({ "query": "ab" })),
        ("courses.list", json!({})),
        ("records.list", json!({})),
        ("reports.class", json!({ "className": "tamhidi1" })),
        ("dormitories.list", json!({})),
        ("dormitoryStudents.list", json!({})),
        ("reports.dormitory", json!({})),
        ("changes.since", json!({ "seq": 0 })),
        ("changes.subscribe", json!({})),
        ("changes.poll", json!({})),
    ];
    for (i, (method, params)) in methods.into_iter().enumerate() {
        let id = format!("m{}", i);
        let _ = request_ok(&mut stdin, &mut reader, &id, method, params);
    }

    let unknown = request(&mut stdin, &mut reader, "x", "nope.method", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    let _ = request_ok(&mut stdin, &mut reader, "out", "auth.signOut", json!({}));
    drop(stdin);
    let _ = child.wait();
}

#[test]
fn bad_json_line_gets_error_reply_and_loop_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read reply");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("reply is json");
    assert_eq!(error_code(&v), "bad_json");

    let health = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));
    assert!(health.get("version").is_some());
    drop(stdin);
    let _ = child.wait();
}

#[test]
fn gated_methods_need_a_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let v = request(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert_eq!(error_code(&v), "no_workspace");
    drop(stdin);
    let _ = child.wait();
}
