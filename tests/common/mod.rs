#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use flight_incidents::app::cors_layer;
use flight_incidents::jwt::JwtConfig;
use flight_incidents::{build_router, AppState};

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub pool: SqlitePool,
    // keeps the database file alive for the duration of the test
    _dir: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    let state = AppState::new(pool.clone(), JwtConfig::new("test-secret", Duration::minutes(60)));
    let app = build_router(state.clone(), cors_layer(None)?);

    Ok(TestApp {
        app,
        state,
        pool,
        _dir: dir,
    })
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        self.send(req).await
    }

    pub async fn send(&self, req: Request<Body>) -> Result<Response> {
        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let set_cookie = resp
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };

        Ok(Response { status, set_cookie, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<Response> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<Response> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<Response> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    /// Signs a new user up and returns (token, user id).
    pub async fn signup(&self, email: &str, role: &str) -> Result<(String, String)> {
        let resp = self
            .request(
                Method::POST,
                "/api/signup",
                None,
                Some(json!({ "email": email, "password": "password123", "role": role })),
            )
            .await?;
        if resp.status != StatusCode::CREATED {
            anyhow::bail!("signup failed: {} - {}", resp.status, resp.body);
        }

        let token = resp.body["token"].as_str().context("missing token")?.to_string();
        let user_id = resp.body["user"]["id"].as_str().context("missing user id")?.to_string();
        Ok((token, user_id))
    }

    pub async fn login(&self, email: &str) -> Result<String> {
        let resp = self
            .request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": email, "password": "password123" })),
            )
            .await?;
        if resp.status != StatusCode::OK {
            anyhow::bail!("login failed: {} - {}", resp.status, resp.body);
        }
        Ok(resp.body["token"].as_str().context("missing token")?.to_string())
    }

    /// Files an incident and returns its id.
    pub async fn report(&self, token: &str, description: &str) -> Result<String> {
        let resp = self.post("/api/incidents", token, incident_body(description)).await?;
        if resp.status != StatusCode::CREATED {
            anyhow::bail!("incident create failed: {} - {}", resp.status, resp.body);
        }
        Ok(resp.body["id"].as_str().context("missing incident id")?.to_string())
    }
}

pub fn incident_body(description: &str) -> Value {
    json!({
        "flight_number": "AI202",
        "date_time": "2025-03-14T09:30:00Z",
        "location": { "latitude": 28.5562, "longitude": 77.1, "airport_code": "DEL" },
        "description": description,
        "severity": "Medium"
    })
}
