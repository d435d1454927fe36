//! Shared harness for the HTTP tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use carbonserver_api::{create_router, AppState};
use carbonserver_common::{
    auth::{Argon2Hasher, OidcProvider, RandomTokenGenerator},
    clock::SystemClock,
    config::AppConfig,
    db::{DbPool, Repository},
};
use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ISSUER: &str = "https://identity.test";
const SIGNING_SECRET: &[u8] = b"secret-key-for-carbonserver-tests";
const SIGNING_SECRET_B64: &str = "c2VjcmV0LWtleS1mb3ItY2FyYm9uc2VydmVyLXRlc3Rz";

/// Credentials attached to a request
#[derive(Debug, Clone)]
pub enum Auth {
    Anonymous,
    Bearer(String),
    ProjectToken(String),
    /// Verbatim `Authorization` header value
    Authorization(String),
}

pub struct TestApp {
    pub router: Router,
    pub repo: Repository,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = DbPool::from_connection(Database::connect(opts).await.unwrap());
        db.migrate().await.unwrap();

        let keys: JwkSet = serde_json::from_value(json!({
            "keys": [{"kty": "oct", "kid": "test", "alg": "HS256", "k": SIGNING_SECRET_B64}]
        }))
        .unwrap();

        let state = AppState::new(
            AppConfig::default(),
            db.clone(),
            Arc::new(OidcProvider::with_keys(ISSUER, None, keys)),
            Arc::new(Argon2Hasher::new(8, 1).unwrap()),
            Arc::new(RandomTokenGenerator),
            Arc::new(SystemClock),
        )
        .unwrap();

        Self {
            router: create_router(state),
            repo: Repository::new(db),
        }
    }

    pub async fn request(&self, method: Method, uri: &str, auth: &Auth, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        builder = match auth {
            Auth::Anonymous => builder,
            Auth::Bearer(jwt) => builder.header("authorization", format!("Bearer {}", jwt)),
            Auth::ProjectToken(token) => builder.header("x-project-token", token),
            Auth::Authorization(value) => builder.header("authorization", value),
        };
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, auth: &Auth) -> (StatusCode, Value) {
        self.request(Method::GET, uri, auth, None).await
    }

    pub async fn post(&self, uri: &str, auth: &Auth, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, auth, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, auth: &Auth) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, auth, None).await
    }

    /// A user (provisioned on first request) with an organization and project of their own
    pub async fn user_with_project(&self, name: &str, public: bool) -> Fixture {
        let user = user_jwt(Uuid::new_v4(), name);

        let (status, organization) = self
            .post("/organizations", &user, json!({"name": format!("{} org", name)}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", organization);
        let organization_id = id_of(&organization);

        let (status, project) = self
            .post(
                &format!("/organizations/{}/projects", organization_id),
                &user,
                json!({"name": format!("{} project", name), "public": public}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", project);

        Fixture {
            user,
            organization_id,
            project_id: id_of(&project),
        }
    }

    /// Issue a project token and return it as request credentials
    pub async fn token(&self, fixture: &Fixture, access: u8, expiration_date: Option<&str>) -> Auth {
        let mut body = json!({"name": "agent", "access": access});
        if let Some(expiration_date) = expiration_date {
            body["expiration_date"] = json!(expiration_date);
        }
        let (status, issued) = self
            .post(&format!("/projects/{}/api-tokens", fixture.project_id), &fixture.user, body)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", issued);
        Auth::ProjectToken(issued["token"].as_str().unwrap().to_string())
    }

    pub async fn experiment(&self, auth: &Auth, project_id: Uuid) -> Uuid {
        let (status, body) = self
            .post(
                "/experiments",
                auth,
                json!({
                    "timestamp": "2024-05-01T08:00:00Z",
                    "project_id": project_id,
                    "name": "E1",
                    "country_iso_code": "FRA",
                    "on_cloud": false
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }

    pub async fn run(&self, auth: &Auth, experiment_id: Uuid) -> Uuid {
        let (status, body) = self
            .post(
                "/runs",
                auth,
                json!({
                    "timestamp": "2024-05-01T08:00:00Z",
                    "experiment_id": experiment_id,
                    "os": "Linux",
                    "cpu_count": 8,
                    "tracking_mode": "machine"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }

    pub async fn emission(&self, auth: &Auth, run_id: Uuid) -> Uuid {
        let (status, body) = self.post("/emissions", auth, emission_body(run_id)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body)
    }
}

pub struct Fixture {
    pub user: Auth,
    pub organization_id: Uuid,
    pub project_id: Uuid,
}

/// Bearer credentials for `sub`, signed with the test key
pub fn user_jwt(sub: Uuid, name: &str) -> Auth {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("test".to_string());
    let claims = json!({
        "sub": sub,
        "name": name,
        "email": format!("{}@example.org", name.to_lowercase()),
        "iss": ISSUER,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let jwt = encode(&header, &claims, &EncodingKey::from_secret(SIGNING_SECRET)).unwrap();
    Auth::Bearer(jwt)
}

pub fn emission_body(run_id: Uuid) -> Value {
    json!({
        "timestamp": "2024-05-01T10:00:00+02:00",
        "run_id": run_id,
        "duration": 10,
        "emissions_sum": 0.5,
        "emissions_rate": 0.05,
        "energy_consumed": 1.2,
        "cpu_power": 0.1,
        "gpu_power": 0.1,
        "ram_power": 0.1,
        "cpu_energy": 0.4,
        "gpu_energy": 0.4,
        "ram_energy": 0.4
    })
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(|| panic!("no id in {}", body))
}

pub fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().map(|v| (v - expected).abs() < 1e-9).unwrap_or(false)
}
