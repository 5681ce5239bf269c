mod test_support;

use serde_json::json;
use test_support::{
    error_code, list_items, request_as, request_ok_as, seed_school, spawn_sidecar, str_at,
};

fn row_values(list: &serde_json::Value, id: &str) -> Option<serde_json::Value> {
    list_items(list)
        .into_iter()
        .find(|item| item.get("id").and_then(|v| v.as_str()) == Some(id))
        .and_then(|item| item.get("values").cloned())
}

#[test]
fn deleting_a_teacher_unassigns_subjects_and_drops_their_sessions() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let school = seed_school(&mut stdin, &mut reader, "schoold-cascade-teacher");

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.teacher,
        "1",
        "content.create",
        json!({
            "title": "Fractions",
            "kind": "lesson",
            "body": "Numerator over denominator.",
            "subjectId": school.subject_id,
        }),
    );

    let deleted = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "2",
        "people.delete",
        json!({ "personId": school.teacher_person_id }),
    );
    assert_eq!(str_at(&deleted, "/redirect"), "people.list");

    let subjects = request_ok_as(&mut stdin, &mut reader, &school.admin, "3", "subjects.list", json!({}));
    assert_eq!(
        row_values(&subjects, &school.subject_id),
        Some(json!(["Mathematics", "Sciences", "Unassigned", "101"]))
    );

    let gone = request_as(&mut stdin, &mut reader, &school.teacher, "4", "teacher.dashboard", json!({}));
    assert_eq!(error_code(&gone), Some("login_required"));

    let db = rusqlite::Connection::open(school.workspace.join("school.sqlite3")).expect("open db");
    let contents: i64 = db
        .query_row("SELECT COUNT(*) FROM course_contents", [], |r| r.get(0))
        .expect("count content");
    assert_eq!(contents, 0);
    drop(db);

    let again = request_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "5",
        "people.delete",
        json!({ "personId": school.teacher_person_id }),
    );
    assert_eq!(error_code(&again), Some("not_found"));

    let _ = std::fs::remove_dir_all(&school.workspace);
}

#[test]
fn deleting_a_college_removes_departments_and_subjects() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let school = seed_school(&mut stdin, &mut reader, "schoold-cascade-college");

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.teacher,
        "1",
        "grades.assign",
        json!({ "studentId": school.student_id, "subjectId": school.subject_id, "value": 15 }),
    );

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "2",
        "colleges.delete",
        json!({ "collegeId": school.college_id }),
    );

    for (i, method) in ["colleges.list", "departments.list", "subjects.list"]
        .into_iter()
        .enumerate()
    {
        let list = request_ok_as(
            &mut stdin,
            &mut reader,
            &school.admin,
            &format!("list-{}", i),
            method,
            json!({}),
        );
        assert!(list_items(&list).is_empty(), "{} not empty: {}", method, list);
    }

    // Grades went with the subject; the student record itself remains.
    let grades = request_ok_as(&mut stdin, &mut reader, &school.student, "3", "student.grades", json!({}));
    assert!(list_items(&grades).is_empty());
    let dash = request_ok_as(&mut stdin, &mut reader, &school.student, "4", "student.dashboard", json!({}));
    assert_eq!(dash.pointer("/context/generalAverage").and_then(|v| v.as_f64()), Some(0.0));

    let academies = request_ok_as(&mut stdin, &mut reader, &school.admin, "5", "academies.list", json!({}));
    assert_eq!(
        row_values(&academies, &school.academy_id),
        Some(json!(["North Academy", 0]))
    );

    let _ = std::fs::remove_dir_all(&school.workspace);
}

#[test]
fn classroom_delete_and_subject_patch() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let school = seed_school(&mut stdin, &mut reader, "schoold-cascade-classroom");

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "1",
        "classrooms.update",
        json!({ "classroomId": school.classroom_id, "patch": { "capacity": "28" } }),
    );
    let rooms = request_ok_as(&mut stdin, &mut reader, &school.admin, "2", "classrooms.list", json!({}));
    assert_eq!(row_values(&rooms, &school.classroom_id), Some(json!(["101", 28, 1])));

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "3",
        "classrooms.delete",
        json!({ "classroomId": school.classroom_id }),
    );
    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "4",
        "subjects.update",
        json!({ "subjectId": school.subject_id, "patch": { "label": "Algebra", "teacherId": null } }),
    );
    let subjects = request_ok_as(&mut stdin, &mut reader, &school.admin, "5", "subjects.list", json!({}));
    assert_eq!(
        row_values(&subjects, &school.subject_id),
        Some(json!(["Algebra", "Sciences", "Unassigned", "Unassigned"]))
    );

    let bad = request_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "6",
        "subjects.update",
        json!({ "subjectId": school.subject_id, "patch": { "classroomId": "no-such-room" } }),
    );
    assert_eq!(error_code(&bad), Some("not_found"));

    let blank = request_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "7",
        "colleges.update",
        json!({ "collegeId": school.college_id, "patch": { "name": "  " } }),
    );
    assert_eq!(error_code(&blank), Some("bad_params"));

    let _ = std::fs::remove_dir_all(&school.workspace);
}

#[test]
fn people_management_rules() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let school = seed_school(&mut stdin, &mut reader, "schoold-people");

    let profile = request_ok_as(&mut stdin, &mut reader, &school.admin, "0", "auth.profile", json!({}));
    let admin_person_id = str_at(&profile, "/context/person/id").to_string();
    let self_delete = request_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "1",
        "people.delete",
        json!({ "personId": admin_person_id }),
    );
    assert_eq!(error_code(&self_delete), Some("bad_params"));

    let dup_email = request_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "2",
        "people.create",
        json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "email": "john.doe@school.test",
            "identifier": "jane",
            "role": "student",
            "entryYear": 2023,
        }),
    );
    assert_eq!(error_code(&dup_email), Some("conflict"));

    // The failed create left no orphan person behind.
    let people = request_ok_as(&mut stdin, &mut reader, &school.admin, "3", "people.list", json!({}));
    assert_eq!(list_items(&people).len(), 3);
    assert_eq!(
        row_values(&people, &school.student_person_id),
        Some(json!(["John Doe", "john.doe@school.test", "jdoe", "Student"]))
    );

    let bad_dept = request_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "4",
        "people.create",
        json!({
            "firstName": "Tim",
            "lastName": "Lost",
            "email": "tim@school.test",
            "identifier": "tim",
            "role": "teacher",
            "departmentId": "no-such-department",
            "seniority": 1,
        }),
    );
    assert_eq!(error_code(&bad_dept), Some("not_found"));
    let people = request_ok_as(&mut stdin, &mut reader, &school.admin, "5", "people.list", json!({}));
    assert_eq!(list_items(&people).len(), 3);

    let form = request_ok_as(&mut stdin, &mut reader, &school.admin, "6", "people.form", json!({}));
    assert_eq!(str_at(&form, "/template"), "form_generic");
    assert_eq!(str_at(&form, "/context/submitMethod"), "people.create");

    let _ = std::fs::remove_dir_all(&school.workspace);
}

#[test]
fn deleting_an_academy_removes_its_colleges_and_departments() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let school = seed_school(&mut stdin, &mut reader, "schoold-cascade-academy");

    let deleted = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "1",
        "academies.delete",
        json!({ "academyId": school.academy_id }),
    );
    assert_eq!(str_at(&deleted, "/redirect"), "academies.list");

    for (i, method) in ["academies.list", "colleges.list", "departments.list", "subjects.list"]
        .into_iter()
        .enumerate()
    {
        let list = request_ok_as(
            &mut stdin,
            &mut reader,
            &school.admin,
            &format!("list-{}", i),
            method,
            json!({}),
        );
        assert!(list_items(&list).is_empty(), "{} not empty: {}", method, list);
    }

    // The teacher record went with the department; the person stays.
    let people = request_ok_as(&mut stdin, &mut reader, &school.admin, "2", "people.list", json!({}));
    assert_eq!(
        row_values(&people, &school.teacher_person_id),
        Some(json!(["Marie Curie", "marie.curie@school.test", "mcurie", ""]))
    );

    let again = request_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "3",
        "academies.delete",
        json!({ "academyId": school.academy_id }),
    );
    assert_eq!(error_code(&again), Some("not_found"));

    let _ = std::fs::remove_dir_all(&school.workspace);
}
