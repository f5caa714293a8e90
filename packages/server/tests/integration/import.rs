use crate::common::{TestApp, routes};
use sea_orm::ConnectionTrait;
use serde_json::Value;

const HEADER: &str = "学号,课程编号,平时成绩,期中成绩,期末成绩";

fn sheet(rows: &[&str]) -> Vec<u8> {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out.into_bytes()
}

fn error_rows(body: &Value) -> Vec<(u64, String)> {
    body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["row"].as_u64().unwrap(),
                e["code"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn imports_valid_rows() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    let res = app
        .upload_with_token(
            routes::SCORES_IMPORT,
            "scores.csv",
            sheet(&["1001,03,80,70,90", "1002,10,95.5,88,91"]),
            &token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success_count"], 2);
    assert_eq!(res.body["failure_count"], 0);
    assert!(res.body["errors"].as_array().unwrap().is_empty());

    let res = app.get_with_token(routes::SCORES, &token).await;
    assert_eq!(res.body["pagination"]["total"], 2);
}

#[tokio::test]
async fn reimport_overwrites_instead_of_duplicating() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    for final_grade in ["90", "90", "60"] {
        let row = format!("1001,03,80,70,{final_grade}");
        let res = app
            .upload_with_token(
                routes::SCORES_IMPORT,
                "scores.csv",
                sheet(&[&row]),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success_count"], 1);
    }

    let res = app.get_with_token(routes::SCORES, &token).await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["final_grade"], 60.0);
    assert_eq!(res.body["data"][0]["total"], 69.0);
}

#[tokio::test]
async fn bad_rows_do_not_stop_the_batch() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    let res = app
        .upload_with_token(
            routes::SCORES_IMPORT,
            "scores.csv",
            sheet(&[
                "1001,03,80,70,90",
                "9999,03,80,70,90",
                "1001,77,80,70,90",
                "1002,03,abc,70,90",
                "1002,10,80,70,101",
                "1002,03,60,60,60",
            ]),
            &token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success_count"], 2);
    assert_eq!(res.body["failure_count"], 4);
    assert_eq!(
        error_rows(&res.body),
        vec![
            (3, "REFERENCE".to_string()),
            (4, "REFERENCE".to_string()),
            (5, "FORMAT".to_string()),
            (6, "RANGE".to_string()),
        ]
    );
    let messages: Vec<&str> = res.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert!(messages[0].contains("9999"));
    assert!(messages[1].contains("77"));

    let res = app.get_with_token(routes::SCORES, &token).await;
    assert_eq!(res.body["pagination"]["total"], 2);
}

#[tokio::test]
async fn storage_failure_is_reported_and_batch_continues() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    app.db
        .execute_unprepared(
            "CREATE TRIGGER reject_1002 BEFORE INSERT ON score \
             WHEN NEW.student_id = '1002' \
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .await
        .unwrap();

    let res = app
        .upload_with_token(
            routes::SCORES_IMPORT,
            "scores.csv",
            sheet(&["1001,03,80,70,90", "1002,03,60,60,60", "1001,10,95,92,90"]),
            &token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success_count"], 2);
    assert_eq!(res.body["failure_count"], 1);
    assert_eq!(error_rows(&res.body), vec![(3, "UNKNOWN".to_string())]);
    assert!(!res.body["errors"][0]["message"]
        .as_str()
        .unwrap()
        .contains("disk full"));

    let res = app.get_with_token(routes::SCORES, &token).await;
    assert_eq!(res.body["pagination"]["total"], 2);
}

#[tokio::test]
async fn short_course_code_falls_back_to_padded_id() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    let res = app
        .upload_with_token(
            routes::SCORES_IMPORT,
            "scores.csv",
            sheet(&["1001,3,80,70,90"]),
            &token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success_count"], 1);

    let res = app
        .get_with_token(&routes::student_scores("1001"), &token)
        .await;
    let scores = res.body.as_array().unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0]["course_id"], "03");
    assert_eq!(scores[0]["total"], 81.0);
    assert_eq!(scores[0]["grade_level"], "B");
}

#[tokio::test]
async fn missing_column_rejects_whole_file() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    let body = "学号,课程编号,平时成绩,期中成绩\n1001,03,80,70\n".as_bytes().to_vec();
    let res = app
        .upload_with_token(routes::SCORES_IMPORT, "scores.csv", body, &token)
        .await;

    assert_eq!(res.status, 400, "{}", res.text);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert!(res.body["message"].as_str().unwrap().contains("期末成绩"));

    let res = app.get_with_token(routes::SCORES, &token).await;
    assert_eq!(res.body["pagination"]["total"], 0);
}

#[tokio::test]
async fn bom_and_padded_headers_are_accepted() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    let body = "\u{feff} 学号 ,课程编号,平时成绩,期中成绩,期末成绩\n 1001 ,03,80,70,90\n"
        .as_bytes()
        .to_vec();
    let res = app
        .upload_with_token(routes::SCORES_IMPORT, "scores.csv", body, &token)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success_count"], 1);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let form = reqwest::multipart::Form::new().text("note", "no file here");
    let res = app
        .client
        .post(format!("http://{}{}", app.addr, routes::SCORES_IMPORT))
        .header("Authorization", format!("Bearer {token}"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn viewer_cannot_import() {
    let app = TestApp::spawn().await;
    let viewer = app.create_user_with_role("viewer_li", "viewer").await;

    let res = app
        .upload_with_token(
            routes::SCORES_IMPORT,
            "scores.csv",
            sheet(&["1001,03,80,70,90"]),
            &viewer,
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn export_lists_scores_with_derived_columns() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    app.create_score(&token, "1002", "03", (60.0, 60.0, 60.0)).await;
    app.create_score(&token, "1001", "10", (95.0, 92.0, 90.0)).await;
    app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;

    let res = app.get_with_token(routes::SCORES_EXPORT, &token).await;
    assert_eq!(res.status, 200);

    let text = res.text.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "学号,课程编号,平时成绩,期中成绩,期末成绩,总成绩,等级",
            "1001,03,80,70,90,81,B",
            "1001,10,95,92,90,92.1,A",
            "1002,03,60,60,60,60,D",
        ]
    );
}

#[tokio::test]
async fn exported_sheet_can_be_reimported() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;

    let export = app.get_with_token(routes::SCORES_EXPORT, &token).await;
    let res = app
        .upload_with_token(
            routes::SCORES_IMPORT,
            "scores.csv",
            export.text.into_bytes(),
            &token,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success_count"], 1);
    assert_eq!(res.body["failure_count"], 0);
}

#[tokio::test]
async fn template_has_only_the_import_headers() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let res = app.get_with_token(routes::IMPORT_TEMPLATE, &token).await;

    assert_eq!(res.status, 200);
    let text = res.text.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec![HEADER]);
}
