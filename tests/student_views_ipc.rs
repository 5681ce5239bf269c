mod test_support;

use serde_json::json;
use test_support::{
    add_subject, error_code, list_items, request_as, request_ok_as, seed_school, spawn_sidecar,
    str_at,
};

#[test]
fn general_average_and_grade_list() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let school = seed_school(&mut stdin, &mut reader, "schoold-student-average");

    let physics = add_subject(&mut stdin, &mut reader, &school, "Physics", Some(&school.teacher_id));
    let chemistry = add_subject(&mut stdin, &mut reader, &school, "Chemistry", Some(&school.teacher_id));
    let music = add_subject(&mut stdin, &mut reader, &school, "Music", None);

    for (i, (subject, value)) in [
        (&school.subject_id, 15.5),
        (&physics, 14.0),
        (&chemistry, 16.5),
        (&music, 13.0),
    ]
    .into_iter()
    .enumerate()
    {
        let _ = request_ok_as(
            &mut stdin,
            &mut reader,
            &school.teacher,
            &format!("g{}", i),
            "grades.assign",
            json!({ "studentId": school.student_id, "subjectId": subject, "value": value }),
        );
    }

    let dash = request_ok_as(&mut stdin, &mut reader, &school.student, "1", "student.dashboard", json!({}));
    assert_eq!(str_at(&dash, "/template"), "student_dashboard");
    assert_eq!(dash.pointer("/context/generalAverage").and_then(|v| v.as_f64()), Some(14.75));
    assert_eq!(dash.pointer("/context/absenceHours").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(dash.pointer("/context/stats/subjects").and_then(|v| v.as_i64()), Some(4));
    assert_eq!(
        dash.pointer("/context/recentGrades")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(4)
    );

    let grades = request_ok_as(&mut stdin, &mut reader, &school.student, "2", "student.grades", json!({}));
    let values: Vec<serde_json::Value> = list_items(&grades)
        .into_iter()
        .filter_map(|item| item.get("values").cloned())
        .collect();
    assert_eq!(
        values,
        vec![
            json!(["Chemistry", 16.5, "Marie Curie"]),
            json!(["Mathematics", 15.5, "Marie Curie"]),
            json!(["Music", 13.0, "N/A"]),
            json!(["Physics", 14.0, "Marie Curie"]),
        ]
    );

    let schedule = request_ok_as(&mut stdin, &mut reader, &school.student, "3", "student.schedule", json!({}));
    let values: Vec<serde_json::Value> = list_items(&schedule)
        .into_iter()
        .filter_map(|item| item.get("values").cloned())
        .collect();
    assert_eq!(values.len(), 4);
    assert_eq!(values[1], json!(["Mathematics", "Marie Curie", "Room 101"]));
    assert_eq!(values[2], json!(["Music", "N/A", "N/A"]));

    let _ = std::fs::remove_dir_all(&school.workspace);
}

#[test]
fn course_content_is_scoped_to_author_and_graded_subjects() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let school = seed_school(&mut stdin, &mut reader, "schoold-student-content");
    let physics = add_subject(&mut stdin, &mut reader, &school, "Physics", Some(&school.teacher_id));

    let lesson = request_ok_as(
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
    let lesson_id = str_at(&lesson, "/contentId").to_string();
    let exercise = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.teacher,
        "2",
        "content.create",
        json!({
            "title": "Free fall",
            "kind": "exercise",
            "body": "Drop a ball.",
            "subjectId": physics,
        }),
    );
    let exercise_id = str_at(&exercise, "/contentId").to_string();

    let bad_kind = request_as(
        &mut stdin,
        &mut reader,
        &school.teacher,
        "3",
        "content.create",
        json!({ "title": "X", "kind": "quiz", "body": "?", "subjectId": physics }),
    );
    assert_eq!(error_code(&bad_kind), Some("bad_params"));

    let mine = request_ok_as(&mut stdin, &mut reader, &school.teacher, "4", "content.list", json!({}));
    assert_eq!(list_items(&mine).len(), 2);

    // Graded in mathematics only: the physics exercise stays hidden.
    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.teacher,
        "5",
        "grades.assign",
        json!({ "studentId": school.student_id, "subjectId": school.subject_id, "value": 12 }),
    );
    let visible = request_ok_as(&mut stdin, &mut reader, &school.student, "6", "student.content", json!({}));
    let items = list_items(&visible);
    assert_eq!(items.len(), 1);
    assert_eq!(str_at(&items[0], "/id"), lesson_id);
    assert_eq!(str_at(&items[0], "/values/1"), "Lesson");

    let detail = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.student,
        "7",
        "student.content.view",
        json!({ "contentId": lesson_id }),
    );
    assert_eq!(str_at(&detail, "/template"), "content_detail");
    assert_eq!(str_at(&detail, "/context/content/body"), "Numerator over denominator.");
    assert_eq!(str_at(&detail, "/context/content/author"), "Marie Curie");

    let hidden = request_as(
        &mut stdin,
        &mut reader,
        &school.student,
        "8",
        "student.content.view",
        json!({ "contentId": exercise_id }),
    );
    assert_eq!(error_code(&hidden), Some("not_found"));

    // Only the author may edit or delete.
    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.admin,
        "9",
        "people.create",
        json!({
            "firstName": "Paul",
            "lastName": "Langevin",
            "email": "paul.langevin@school.test",
            "identifier": "plangevin",
            "role": "teacher",
            "departmentId": school.department_id,
            "seniority": 2,
        }),
    );
    let other = test_support::login(&mut stdin, &mut reader, "10", "plangevin", "teacher");
    let foreign = request_as(
        &mut stdin,
        &mut reader,
        &other,
        "11",
        "content.update",
        json!({ "contentId": lesson_id, "patch": { "title": "Hijacked" } }),
    );
    assert_eq!(error_code(&foreign), Some("not_found"));
    let foreign = request_as(
        &mut stdin,
        &mut reader,
        &other,
        "12",
        "content.delete",
        json!({ "contentId": lesson_id }),
    );
    assert_eq!(error_code(&foreign), Some("not_found"));

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.teacher,
        "13",
        "content.update",
        json!({ "contentId": lesson_id, "patch": { "title": "Fractions, part 1", "kind": "exercise" } }),
    );
    let detail = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.student,
        "14",
        "student.content.view",
        json!({ "contentId": lesson_id }),
    );
    assert_eq!(str_at(&detail, "/context/content/title"), "Fractions, part 1");
    assert_eq!(str_at(&detail, "/context/content/kind"), "exercise");

    let _ = request_ok_as(
        &mut stdin,
        &mut reader,
        &school.teacher,
        "15",
        "content.delete",
        json!({ "contentId": lesson_id }),
    );
    let visible = request_ok_as(&mut stdin, &mut reader, &school.student, "16", "student.content", json!({}));
    assert!(list_items(&visible).is_empty());

    let _ = std::fs::remove_dir_all(&school.workspace);
}
