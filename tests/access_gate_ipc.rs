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

fn select(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &Path) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
}

/// Creates the admin plus one academic and one dormitory account, then signs
/// out. Returns the academic profile id.
fn bootstrap(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &Path) -> String {
    select(stdin, reader, workspace);
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
        "signin-admin",
        "auth.signIn",
        json!({ "email": "admin@school.test", "password": "admin-pass" }),
    );
    let academic = request_ok(
        stdin,
        reader,
        "mk-academic",
        "profiles.create",
        json!({ "email": "guru@school.test", "password": "guru-pass", "role": "academic" }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "mk-dorm",
        "profiles.create",
        json!({ "email": "warden@school.test", "password": "warden-pass", "role": "dormitory" }),
    );
    let _ = request_ok(stdin, reader, "out-admin", "auth.signOut", json!({}));
    academic
        .get("profile")
        .and_then(|p| p.get("id"))
        .and_then(|v| v.as_str())
        .expect("academic profile id")
        .to_string()
}

fn sign_in(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, email: &str, password: &str) {
    let _ = request_ok(
        stdin,
        reader,
        &format!("signin-{}", email),
        "auth.signIn",
        json!({ "email": email, "password": password }),
    );
}

#[test]
fn anonymous_caller_is_sent_to_login() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = bootstrap(&mut stdin, &mut reader, &temp_dir("absensid-access"));

    for method in ["students.list", "profiles.list", "reports.dormitory", "changes.since"] {
        let v = request(&mut stdin, &mut reader, method, method, json!({}));
        assert_eq!(error_code(&v), "unauthenticated", "{}", method);
        assert_eq!(v["error"]["details"]["redirect"], json!("/login"));
    }

    let check = request_ok(&mut stdin, &mut reader, "c", "access.check", json!({ "path": "/academic/attendance" }));
    assert_eq!(check["decision"], json!("redirectToLogin"));
    let check = request_ok(&mut stdin, &mut reader, "c2", "access.check", json!({ "path": "/login" }));
    assert_eq!(check["decision"], json!("allow"));
}

#[test]
fn academic_role_cannot_reach_admin_or_dormitory_areas() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = bootstrap(&mut stdin, &mut reader, &temp_dir("absensid-access"));
    sign_in(&mut stdin, &mut reader, "guru@school.test", "guru-pass");

    let _ = request_ok(&mut stdin, &mut reader, "1", "students.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "2", "records.list", json!({}));

    for method in ["students.bulkCreate", "courses.create", "profiles.list", "dormitories.list", "reports.dormitory"] {
        let v = request(&mut stdin, &mut reader, method, method, json!({}));
        assert_eq!(error_code(&v), "forbidden", "{}", method);
        assert_eq!(v["error"]["details"]["redirect"], json!("/"));
    }

    let landing = request_ok(&mut stdin, &mut reader, "l", "access.landing", json!({}));
    assert_eq!(landing["modules"], json!({ "academic": true, "dormitory": false, "admin": false }));
    let check = request_ok(&mut stdin, &mut reader, "c", "access.check", json!({ "path": "/dormitory/report" }));
    assert_eq!(check["decision"], json!("redirectToHome"));
    assert_eq!(check["redirect"], json!("/"));
}

#[test]
fn dormitory_role_cannot_reach_academic_area() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = bootstrap(&mut stdin, &mut reader, &temp_dir("absensid-access"));
    sign_in(&mut stdin, &mut reader, "warden@school.test", "warden-pass");

    let _ = request_ok(&mut stdin, &mut reader, "1", "dormitories.list", json!({}));
    for method in ["students.list", "attendance.submit", "reports.class", "dormitories.create"] {
        let v = request(&mut stdin, &mut reader, method, method, json!({}));
        assert_eq!(error_code(&v), "forbidden", "{}", method);
    }
}

#[test]
fn role_change_applies_to_an_existing_session() {
    let workspace = temp_dir("absensid-role-change");
    let (_admin_child, mut admin_in, mut admin_out) = spawn_sidecar();
    let academic_id = bootstrap(&mut admin_in, &mut admin_out, &workspace);

    let (_user_child, mut user_in, mut user_out) = spawn_sidecar();
    select(&mut user_in, &mut user_out, &workspace);
    sign_in(&mut user_in, &mut user_out, "guru@school.test", "guru-pass");
    let _ = request_ok(&mut user_in, &mut user_out, "1", "students.list", json!({}));

    sign_in(&mut admin_in, &mut admin_out, "admin@school.test", "admin-pass");
    let changed = request_ok(
        &mut admin_in,
        &mut admin_out,
        "role",
        "profiles.setRole",
        json!({ "profileId": academic_id, "role": "dormitory" }),
    );
    assert_eq!(changed["profile"]["role"], json!("dormitory"));

    let v = request(&mut user_in, &mut user_out, "2", "students.list", json!({}));
    assert_eq!(error_code(&v), "forbidden");
    let _ = request_ok(&mut user_in, &mut user_out, "3", "dormitories.list", json!({}));
    let landing = request_ok(&mut user_in, &mut user_out, "4", "access.landing", json!({}));
    assert_eq!(landing["modules"], json!({ "academic": false, "dormitory": true, "admin": false }));
}

#[test]
fn sign_up_is_closed_after_first_admin_and_bad_password_is_rejected() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = bootstrap(&mut stdin, &mut reader, &temp_dir("absensid-access"));

    let v = request(
        &mut stdin,
        &mut reader,
        "su",
        "auth.signUp",
        json!({ "email": "late@school.test", "password": "late-pass" }),
    );
    assert_eq!(error_code(&v), "forbidden");

    let v = request(
        &mut stdin,
        &mut reader,
        "bad",
        "auth.signIn",
        json!({ "email": "guru@school.test", "password": "nope-nope" }),
    );
    assert_eq!(error_code(&v), "invalid_credentials");
    let session = request_ok(&mut stdin, &mut reader, "s", "auth.session", json!({}));
    assert!(session["session"].is_null());
}

#[test]
fn session_token_can_be_resumed_in_another_sidecar() {
    let workspace = temp_dir("absensid-resume");
    let (_a, mut stdin_a, mut reader_a) = spawn_sidecar();
    select(&mut stdin_a, &mut reader_a, &workspace);
    let _ = request_ok(
        &mut stdin_a,
        &mut reader_a,
        "su",
        "auth.signUp",
        json!({ "email": "admin@school.test", "password": "admin-pass" }),
    );
    let signed = request_ok(
        &mut stdin_a,
        &mut reader_a,
        "si",
        "auth.signIn",
        json!({ "email": "admin@school.test", "password": "admin-pass" }),
    );
    let token = signed["session"]["token"].as_str().expect("token").to_string();
    assert_eq!(signed["profile"]["role"], json!("admin"));

    let (_b, mut stdin_b, mut reader_b) = spawn_sidecar();
    select(&mut stdin_b, &mut reader_b, &workspace);
    let resumed = request_ok(&mut stdin_b, &mut reader_b, "r", "auth.resume", json!({ "token": token }));
    assert_eq!(resumed["profile"]["email"], json!("admin@school.test"));
    let _ = request_ok(&mut stdin_b, &mut reader_b, "p", "profiles.list", json!({}));

    // Signing out in the first sidecar revokes the token everywhere.
    let _ = request_ok(&mut stdin_a, &mut reader_a, "out", "auth.signOut", json!({}));
    let v = request(&mut stdin_b, &mut reader_b, "p2", "profiles.list", json!({}));
    assert_eq!(error_code(&v), "unauthenticated");
    let view = request_ok(&mut stdin_b, &mut reader_b, "s2", "auth.session", json!({}));
    assert!(view["session"].is_null());
    assert!(view["profile"].is_null());
}
