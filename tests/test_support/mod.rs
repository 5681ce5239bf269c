#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .env_remove("SCHOOLD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn send_line(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    line: &str,
) -> serde_json::Value {
    writeln!(stdin, "{}", line).expect("write request");
    stdin.flush().expect("flush request");

    let mut out = String::new();
    reader.read_line(&mut out).expect("read response line");
    assert!(!out.trim().is_empty(), "empty response for {}", line);
    serde_json::from_str(out.trim()).expect("parse response json")
}

fn exchange(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    payload: serde_json::Value,
) -> serde_json::Value {
    let id = payload
        .get("id")
        .and_then(|v| v.as_str())
        .expect("payload id")
        .to_string();
    let value = send_line(stdin, reader, &payload.to_string());
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
    value
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    exchange(
        stdin,
        reader,
        json!({
            "id": id,
            "method": method,
            "params": params,
        }),
    )
}

/// Same as `request`, carrying a session token from `auth.login`.
pub fn request_as(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    session: &str,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    exchange(
        stdin,
        reader,
        json!({
            "id": id,
            "method": method,
            "params": params,
            "session": session,
        }),
    )
}

fn expect_ok(method: &str, value: serde_json::Value) -> serde_json::Value {
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    expect_ok(method, request(stdin, reader, id, method, params))
}

pub fn request_ok_as(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    session: &str,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    expect_ok(method, request_as(stdin, reader, session, id, method, params))
}

pub fn error_code(value: &serde_json::Value) -> Option<&str> {
    value.pointer("/error/code").and_then(|v| v.as_str())
}

pub fn str_at<'a>(value: &'a serde_json::Value, pointer: &str) -> &'a str {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("missing string at {} in {}", pointer, value))
}

/// `context.items` of a `list_generic` result.
pub fn list_items(result: &serde_json::Value) -> Vec<serde_json::Value> {
    assert_eq!(
        result.get("template").and_then(|v| v.as_str()),
        Some("list_generic"),
        "not a list page: {}",
        result
    );
    result
        .pointer("/context/items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

pub fn login(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    identifier: &str,
    role: &str,
) -> String {
    let res = request_ok(
        stdin,
        reader,
        id,
        "auth.login",
        json!({ "identifier": identifier, "role": role }),
    );
    str_at(&res, "/sessionId").to_string()
}

/// One academy, college, department, classroom, teacher, student and subject,
/// plus a logged-in session for each role.
pub struct School {
    pub workspace: PathBuf,
    pub admin: String,
    pub teacher: String,
    pub student: String,
    pub academy_id: String,
    pub college_id: String,
    pub department_id: String,
    pub classroom_id: String,
    pub teacher_id: String,
    pub teacher_person_id: String,
    pub student_id: String,
    pub student_person_id: String,
    pub subject_id: String,
}

pub fn seed_school(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    prefix: &str,
) -> School {
    let workspace = temp_dir(prefix);
    let _ = request_ok(
        stdin,
        reader,
        "seed-ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "seed-bootstrap",
        "setup.bootstrap",
        json!({
            "firstName": "Ada",
            "lastName": "Admin",
            "email": "ada.admin@school.test",
            "identifier": "admin",
        }),
    );
    let admin = login(stdin, reader, "seed-login-admin", "admin", "admin");

    let res = request_ok_as(
        stdin,
        reader,
        &admin,
        "seed-academy",
        "academies.create",
        json!({ "name": "North Academy" }),
    );
    let academy_id = str_at(&res, "/academyId").to_string();

    let res = request_ok_as(
        stdin,
        reader,
        &admin,
        "seed-college",
        "colleges.create",
        json!({
            "name": "Pasteur College",
            "address": "1 Main Street",
            "phone": "0100000000",
            "website": "https://pasteur.school.test",
            "academyId": academy_id,
        }),
    );
    let college_id = str_at(&res, "/collegeId").to_string();

    let res = request_ok_as(
        stdin,
        reader,
        &admin,
        "seed-department",
        "departments.create",
        json!({ "name": "Sciences", "code": "SCI", "collegeId": college_id }),
    );
    let department_id = str_at(&res, "/departmentId").to_string();

    let res = request_ok_as(
        stdin,
        reader,
        &admin,
        "seed-classroom",
        "classrooms.create",
        json!({ "number": "101", "capacity": 30 }),
    );
    let classroom_id = str_at(&res, "/classroomId").to_string();

    let res = request_ok_as(
        stdin,
        reader,
        &admin,
        "seed-teacher",
        "people.create",
        json!({
            "firstName": "Marie",
            "lastName": "Curie",
            "email": "marie.curie@school.test",
            "identifier": "mcurie",
            "role": "teacher",
            "departmentId": department_id,
            "seniority": 5,
            "startDate": "2020-09-01",
        }),
    );
    let teacher_id = str_at(&res, "/recordId").to_string();
    let teacher_person_id = str_at(&res, "/personId").to_string();

    let res = request_ok_as(
        stdin,
        reader,
        &admin,
        "seed-student",
        "people.create",
        json!({
            "firstName": "John",
            "lastName": "Doe",
            "email": "john.doe@school.test",
            "identifier": "jdoe",
            "role": "student",
            "entryYear": 2023,
        }),
    );
    let student_id = str_at(&res, "/recordId").to_string();
    let student_person_id = str_at(&res, "/personId").to_string();

    let res = request_ok_as(
        stdin,
        reader,
        &admin,
        "seed-subject",
        "subjects.create",
        json!({
            "label": "Mathematics",
            "departmentId": department_id,
            "teacherId": teacher_id,
            "classroomId": classroom_id,
        }),
    );
    let subject_id = str_at(&res, "/subjectId").to_string();

    let teacher = login(stdin, reader, "seed-login-teacher", "mcurie", "teacher");
    let student = login(stdin, reader, "seed-login-student", "jdoe", "student");

    School {
        workspace,
        admin,
        teacher,
        student,
        academy_id,
        college_id,
        department_id,
        classroom_id,
        teacher_id,
        teacher_person_id,
        student_id,
        student_person_id,
        subject_id,
    }
}

/// Adds a subject in the seeded department, optionally taught by `teacher_id`.
pub fn add_subject(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    school: &School,
    label: &str,
    teacher_id: Option<&str>,
) -> String {
    let res = request_ok_as(
        stdin,
        reader,
        &school.admin,
        &format!("subject-{}", label),
        "subjects.create",
        json!({
            "label": label,
            "departmentId": school.department_id,
            "teacherId": teacher_id,
        }),
    );
    str_at(&res, "/subjectId").to_string()
}
