use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/classes", class_routes())
        .nest("/courses", course_routes())
        .nest("/students", student_routes())
        .nest("/scores", score_routes(config))
        .routes(routes!(handlers::dashboard::dashboard))
        .routes(routes!(handlers::dashboard::profile))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::auth::create_user))
}

fn class_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::class_info::list_classes,
            handlers::class_info::create_class
        ))
        .routes(routes!(
            handlers::class_info::get_class,
            handlers::class_info::update_class,
            handlers::class_info::delete_class
        ))
}

fn course_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::course::list_courses,
            handlers::course::create_course
        ))
        .routes(routes!(
            handlers::course::get_course,
            handlers::course::update_course,
            handlers::course::delete_course
        ))
}

fn student_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::student::list_students,
            handlers::student::create_student
        ))
        .routes(routes!(
            handlers::student::get_student,
            handlers::student::update_student,
            handlers::student::delete_student
        ))
        .routes(routes!(handlers::student::list_student_scores))
}

fn score_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            handlers::score::list_scores,
            handlers::score::create_score
        ))
        .routes(routes!(
            handlers::score::get_score,
            handlers::score::update_score,
            handlers::score::delete_score
        ))
        .routes(routes!(handlers::import::export_scores))
        .routes(routes!(handlers::import::import_template));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::import::import_scores))
        .layer(handlers::import::import_body_limit(
            config.import.max_upload_bytes,
        ));

    crud.merge(upload)
}
