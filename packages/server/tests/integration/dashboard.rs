use crate::common::{ADMIN_USERNAME, TestApp, routes};
use sea_orm::{ActiveModelTrait, Set};
use server::entity::course;

#[tokio::test]
async fn empty_dashboard_has_no_averages() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let res = app.get_with_token(routes::DASHBOARD, &token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["total_students"], 0);
    assert_eq!(res.body["total_classes"], 0);
    assert_eq!(res.body["total_courses"], 0);
    assert!(res.body["averages"]["regular"].is_null());
    assert!(res.body["averages"]["final"].is_null());
    assert!(res.body["recent_scores"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn dashboard_aggregates_records() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    app.create_class(&token, "C2", "二班").await;
    app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;
    app.create_score(&token, "1002", "03", (70.0, 75.0, 61.0)).await;

    let res = app.get_with_token(routes::DASHBOARD, &token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["total_students"], 2);
    assert_eq!(res.body["total_classes"], 2);
    assert_eq!(res.body["total_courses"], 2);
    assert_eq!(res.body["averages"]["regular"], 75.0);
    assert_eq!(res.body["averages"]["midterm"], 72.5);
    assert_eq!(res.body["averages"]["final"], 75.5);
    assert_eq!(res.body["recent_students"].as_array().unwrap().len(), 2);
    assert_eq!(res.body["recent_scores"].as_array().unwrap().len(), 2);

    let distribution = res.body["class_distribution"].as_array().unwrap();
    assert_eq!(distribution.len(), 2);
    let count_of = |id: &str| {
        distribution
            .iter()
            .find(|d| d["class_id"] == id)
            .map(|d| d["student_count"].as_u64().unwrap())
    };
    assert_eq!(count_of("C1"), Some(2));
    assert_eq!(count_of("C2"), Some(0));
}

#[tokio::test]
async fn dashboard_is_cached_until_a_write_goes_through_the_api() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let res = app.get_with_token(routes::DASHBOARD, &token).await;
    assert_eq!(res.body["total_courses"], 0);

    let now = chrono::Utc::now();
    course::ActiveModel {
        id: Set("42".to_string()),
        name: Set("直接写入".to_string()),
        description: Set(String::new()),
        credits: Set(2),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&app.db)
    .await
    .unwrap();

    let res = app.get_with_token(routes::DASHBOARD, &token).await;
    assert_eq!(res.body["total_courses"], 0, "served from cache");

    app.create_course(&token, "03", "数据结构").await;

    let res = app.get_with_token(routes::DASHBOARD, &token).await;
    assert_eq!(res.body["total_courses"], 2);
}

#[tokio::test]
async fn import_invalidates_cached_dashboard() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;

    let res = app.get_with_token(routes::DASHBOARD, &token).await;
    assert!(res.body["averages"]["regular"].is_null());

    let sheet = "学号,课程编号,平时成绩,期中成绩,期末成绩\n1001,03,80,70,90\n";
    let res = app
        .upload_with_token(
            routes::SCORES_IMPORT,
            "scores.csv",
            sheet.as_bytes().to_vec(),
            &token,
        )
        .await;
    assert_eq!(res.body["success_count"], 1);

    let res = app.get_with_token(routes::DASHBOARD, &token).await;
    assert_eq!(res.body["averages"]["regular"], 80.0);
    assert_eq!(res.body["recent_scores"][0]["grade_level"], "B");
}

#[tokio::test]
async fn zero_ttl_disables_caching() {
    let app = TestApp::spawn_with(|config| config.cache.stats_ttl_secs = 0).await;
    let token = app.admin_token().await;

    app.get_with_token(routes::DASHBOARD, &token).await;

    let now = chrono::Utc::now();
    course::ActiveModel {
        id: Set("42".to_string()),
        name: Set("直接写入".to_string()),
        description: Set(String::new()),
        credits: Set(2),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&app.db)
    .await
    .unwrap();

    let res = app.get_with_token(routes::DASHBOARD, &token).await;
    assert_eq!(res.body["total_courses"], 1);
}

#[tokio::test]
async fn profile_describes_current_user() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;
    app.seed_roster(&token).await;
    app.create_score(&token, "1001", "03", (80.0, 70.0, 90.0)).await;

    let res = app.get_with_token(routes::PROFILE, &token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["username"], ADMIN_USERNAME);
    assert_eq!(res.body["role"], "admin");
    assert_eq!(res.body["total_students"], 2);
    assert_eq!(res.body["total_scores"], 1);
    assert_eq!(res.body["recent_scores"][0]["student_name"], "张三");
}

#[tokio::test]
async fn dashboard_requires_authentication() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::DASHBOARD).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}
