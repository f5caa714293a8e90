use crate::common::{TestApp, routes};
use serde_json::json;

#[tokio::test]
async fn created_score_carries_total_and_grade() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    let id = app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;

    let res = app.get_with_token(&routes::score(id), &token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["student_name"], "张三");
    assert_eq!(res.body["course_name"], "数据结构");
    assert_eq!(res.body["total"], 81.0);
    assert_eq!(res.body["grade_level"], "B");
}

#[tokio::test]
async fn second_score_for_same_pair_is_conflict() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;

    let res = app
        .post_with_token(
            routes::SCORES,
            &json!({
                "student_id": "1001",
                "course_id": "03",
                "regular_grade": 50,
                "midterm_grade": 50,
                "final_grade": 50,
            }),
            &token,
        )
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");

    let res = app.get_with_token(routes::SCORES, &token).await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["final_grade"], 90.0);
}

#[tokio::test]
async fn grades_outside_range_are_rejected() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    for grades in [(101.0, 50.0, 50.0), (50.0, -0.5, 50.0)] {
        let res = app
            .post_with_token(
                routes::SCORES,
                &json!({
                    "student_id": "1001",
                    "course_id": "03",
                    "regular_grade": grades.0,
                    "midterm_grade": grades.1,
                    "final_grade": grades.2,
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn unknown_student_or_course_is_validation_error() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    for (student_id, course_id) in [("9999", "03"), ("1001", "99")] {
        let res = app
            .post_with_token(
                routes::SCORES,
                &json!({
                    "student_id": student_id,
                    "course_id": course_id,
                    "regular_grade": 60,
                    "midterm_grade": 60,
                    "final_grade": 60,
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
    }
}

#[tokio::test]
async fn update_recomputes_total() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    let id = app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;

    let res = app
        .patch_with_token(&routes::score(id), &json!({"final_grade": 40}), &token)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["final_grade"], 40.0);
    assert_eq!(res.body["total"], 61.0);
    assert_eq!(res.body["grade_level"], "D");
}

#[tokio::test]
async fn moving_score_onto_taken_pair_is_conflict() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;
    let id = app.create_score(&token, "1001", "10", (60.0, 60.0, 60.0)).await;

    let res = app
        .patch_with_token(&routes::score(id), &json!({"course_id": "03"}), &token)
        .await;
    assert_eq!(res.status, 409);

    let res = app
        .patch_with_token(&routes::score(id), &json!({"student_id": "1002"}), &token)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["student_name"], "李四");
}

#[tokio::test]
async fn list_filters_by_student_and_course() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;
    app.create_score(&token, "1001", "10", (60.0, 60.0, 60.0)).await;
    app.create_score(&token, "1002", "03", (70.0, 70.0, 70.0)).await;

    let res = app
        .get_with_token(&format!("{}?student_id=1001", routes::SCORES), &token)
        .await;
    assert_eq!(res.body["pagination"]["total"], 2);

    let res = app
        .get_with_token(
            &format!("{}?student_id=1001&course_id=10", routes::SCORES),
            &token,
        )
        .await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["course_name"], "操作系统");

    let res = app
        .get_with_token(&format!("{}?page=abc", routes::SCORES), &token)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn delete_score_then_missing() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    let id = app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;

    let res = app.delete_with_token(&routes::score(id), &token).await;
    assert_eq!(res.status, 204);

    let res = app.delete_with_token(&routes::score(id), &token).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn viewer_can_read_scores_only() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.seed_roster(&admin).await;
    let id = app.create_score(&admin, "1001", "03", (80.0, 70.0, 90.0)).await;
    let viewer = app.create_user_with_role("viewer_qian", "viewer").await;

    let res = app.get_with_token(&routes::score(id), &viewer).await;
    assert_eq!(res.status, 200);

    let res = app.delete_with_token(&routes::score(id), &viewer).await;
    assert_eq!(res.status, 403);
}
