use std::net::SocketAddr;

use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tempfile::TempDir;

use server::config::{
    AppConfig, AuthConfig, CacheConfig, CorsConfig, DatabaseConfig, ImportConfig, ServerConfig,
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub mod routes {
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const USERS: &str = "/api/v1/auth/users";
    pub const CLASSES: &str = "/api/v1/classes";
    pub const COURSES: &str = "/api/v1/courses";
    pub const STUDENTS: &str = "/api/v1/students";
    pub const SCORES: &str = "/api/v1/scores";
    pub const SCORES_IMPORT: &str = "/api/v1/scores/import";
    pub const SCORES_EXPORT: &str = "/api/v1/scores/export";
    pub const IMPORT_TEMPLATE: &str = "/api/v1/scores/import/template";
    pub const DASHBOARD: &str = "/api/v1/dashboard";
    pub const PROFILE: &str = "/api/v1/profile";

    pub fn class(id: &str) -> String {
        format!("/api/v1/classes/{id}")
    }

    pub fn course(id: &str) -> String {
        format!("/api/v1/courses/{id}")
    }

    pub fn student(id: &str) -> String {
        format!("/api/v1/students/{id}")
    }

    pub fn student_scores(id: &str) -> String {
        format!("/api/v1/students/{id}/scores")
    }

    pub fn score(id: i64) -> String {
        format!("/api/v1/scores/{id}")
    }
}

/// A running test server backed by its own SQLite file.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a tweaked configuration.
    pub async fn spawn_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("sms.db").display());

        let mut app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig { url: db_url },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_days: 7,
                admin_username: Some(ADMIN_USERNAME.to_string()),
                admin_password: Some(ADMIN_PASSWORD.to_string()),
            },
            cache: CacheConfig {
                stats_ttl_secs: 300,
            },
            import: ImportConfig {
                max_upload_bytes: 8 * 1024 * 1024,
            },
        };
        tweak(&mut app_config);

        let state = server::bootstrap(app_config)
            .await
            .expect("Failed to bootstrap test state");
        let db = state.db.clone();

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload a CSV sheet in the `file` multipart field.
    pub async fn upload_with_token(
        &self,
        path: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Token of the bootstrap admin.
    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Create an account with the given role through the admin API, then log in as it.
    pub async fn create_user_with_role(&self, username: &str, role: &str) -> String {
        let admin = self.admin_token().await;
        let password = format!("{username}-password");
        let res = self
            .post_with_token(
                routes::USERS,
                &json!({"username": username, "password": password, "role": role}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 201, "create user failed: {}", res.text);

        self.login(username, &password).await
    }

    pub async fn create_class(&self, token: &str, id: &str, name: &str) {
        let res = self
            .post_with_token(
                routes::CLASSES,
                &json!({"id": id, "name": name, "grade": "2023级", "adviser": "王老师"}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_class failed: {}", res.text);
    }

    pub async fn create_course(&self, token: &str, id: &str, name: &str) {
        let res = self
            .post_with_token(
                routes::COURSES,
                &json!({"id": id, "name": name, "description": "", "credits": 3}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_course failed: {}", res.text);
    }

    pub async fn create_student(&self, token: &str, id: &str, name: &str, class_id: &str) {
        let res = self
            .post_with_token(
                routes::STUDENTS,
                &json!({
                    "id": id,
                    "name": name,
                    "gender": "男",
                    "age": 19,
                    "class_id": class_id,
                    "enrollment_date": "2023-09-01",
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_student failed: {}", res.text);
    }

    /// Record a score via the API and return its `id`.
    pub async fn create_score(
        &self,
        token: &str,
        student_id: &str,
        course_id: &str,
        grades: (f64, f64, f64),
    ) -> i64 {
        let res = self
            .post_with_token(
                routes::SCORES,
                &json!({
                    "student_id": student_id,
                    "course_id": course_id,
                    "regular_grade": grades.0,
                    "midterm_grade": grades.1,
                    "final_grade": grades.2,
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_score failed: {}", res.text);
        res.id()
    }

    /// One class `C1`, courses `03` and `10`, students `1001` and `1002`.
    pub async fn seed_roster(&self, token: &str) {
        self.create_class(token, "C1", "一班").await;
        self.create_course(token, "03", "数据结构").await;
        self.create_course(token, "10", "操作系统").await;
        self.create_student(token, "1001", "张三", "C1").await;
        self.create_student(token, "1002", "李四", "C1").await;
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i64 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'")
    }
}
