mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use common::spawn_app;
use flight_incidents::authz::Role;
use flight_incidents::jwt::JwtConfig;

#[tokio::test]
async fn signup_sets_cookie_and_cookie_authenticates() -> Result<()> {
    let t = spawn_app().await?;

    let resp = t
        .request(
            Method::POST,
            "/api/signup",
            None,
            Some(json!({ "email": "Crew.One@Example.com", "password": "password123" })),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.body);
    assert_eq!(resp.body["user"]["role"], "crew", "role defaults to crew");
    assert_eq!(resp.body["user"]["email"], "crew.one@example.com");
    assert!(resp.body["user"].get("password_hash").is_none());

    let cookie = resp.set_cookie.expect("signup must set a cookie");
    assert!(cookie.contains("HttpOnly"));
    let pair = cookie.split(';').next().unwrap().to_string();
    assert_eq!(pair, format!("token={}", resp.body["token"].as_str().unwrap()));

    let req = Request::builder()
        .method("GET")
        .uri("/api/user")
        .header("cookie", pair)
        .body(Body::empty())?;
    let me = t.send(req).await?;
    assert_eq!(me.status, StatusCode::OK, "{}", me.body);
    assert_eq!(me.body["email"], "crew.one@example.com");

    Ok(())
}

#[tokio::test]
async fn password_is_stored_hashed() -> Result<()> {
    let t = spawn_app().await?;
    t.signup("pilot@example.com", "pilot").await?;

    let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE email = ?")
        .bind("pilot@example.com")
        .fetch_one(&t.pool)
        .await?;
    assert_ne!(stored, "password123");
    assert!(stored.starts_with("$argon2"));

    Ok(())
}

#[tokio::test]
async fn logout_revokes_token_before_it_expires() -> Result<()> {
    let t = spawn_app().await?;
    let (token, _) = t.signup("crew@example.com", "crew").await?;

    assert_eq!(t.get("/api/user", &token).await?.status, StatusCode::OK);

    let out = t.request(Method::POST, "/api/logout", Some(&token), None).await?;
    assert_eq!(out.status, StatusCode::OK);
    assert!(out.set_cookie.unwrap_or_default().contains("Max-Age=0"));

    // signature and embedded expiry are still fine, the ledger entry is gone
    assert!(t.state.jwt.decode(&token).is_ok());
    let after = t.get("/api/user", &token).await?;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["error"], "unauthorized");

    let again = t.request(Method::POST, "/api/logout", Some(&token), None).await?;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn sessions_are_independent_per_device() -> Result<()> {
    let t = spawn_app().await?;
    let (first, _) = t.signup("pilot@example.com", "pilot").await?;
    let second = t.login("pilot@example.com").await?;
    assert_ne!(first, second);

    t.request(Method::POST, "/api/logout", Some(&first), None).await?;

    assert_eq!(t.get("/api/user", &first).await?.status, StatusCode::UNAUTHORIZED);
    assert_eq!(t.get("/api/user", &second).await?.status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn expired_token_rejected_even_with_live_session() -> Result<()> {
    let t = spawn_app().await?;
    let (_, user_id) = t.signup("crew@example.com", "crew").await?;
    let user_id = Uuid::parse_str(&user_id)?;

    let issued = t
        .state
        .jwt
        .issue(user_id, "crew@example.com", Role::Crew, Duration::seconds(-30))?;
    t.state
        .sessions
        .open(user_id, Role::Crew, &issued.token, Utc::now() + Duration::hours(1))
        .await?;

    let resp = t.get("/api/user", &issued.token).await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn expired_session_rejected_even_with_valid_token() -> Result<()> {
    let t = spawn_app().await?;
    let (_, user_id) = t.signup("crew@example.com", "crew").await?;
    let user_id = Uuid::parse_str(&user_id)?;

    let issued = t.state.jwt.encode(user_id, "crew@example.com", Role::Crew)?;
    t.state
        .sessions
        .open(user_id, Role::Crew, &issued.token, Utc::now() - Duration::seconds(1))
        .await?;

    let resp = t.get("/api/user", &issued.token).await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.body["message"].as_str().unwrap_or_default().contains("session"));

    Ok(())
}

#[tokio::test]
async fn token_signed_with_foreign_key_is_rejected() -> Result<()> {
    let t = spawn_app().await?;
    let (_, user_id) = t.signup("crew@example.com", "crew").await?;
    let user_id = Uuid::parse_str(&user_id)?;

    let forged = JwtConfig::new("not-the-server-secret", Duration::minutes(60))
        .encode(user_id, "crew@example.com", Role::Admin)?;
    t.state
        .sessions
        .open(user_id, Role::Admin, &forged.token, forged.expires_at)
        .await?;

    let resp = t.get("/api/users", &forged.token).await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.body["message"].as_str().unwrap_or_default().contains("invalid token"));

    Ok(())
}

#[tokio::test]
async fn role_change_applies_only_to_new_sessions() -> Result<()> {
    let t = spawn_app().await?;
    let (admin, _) = t.signup("admin@example.com", "admin").await?;
    let (crew, crew_id) = t.signup("crew@example.com", "crew").await?;

    let resp = t
        .put(&format!("/api/users/{}", crew_id), &admin, json!({ "role": "auditor" }))
        .await?;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.body);
    assert_eq!(resp.body["role"], "auditor");

    // the record changed, the old token still carries "crew"
    assert_eq!(t.get("/api/user", &crew).await?.body["role"], "auditor");
    assert_eq!(t.get("/api/incidents/export", &crew).await?.status, StatusCode::FORBIDDEN);

    let fresh = t.login("crew@example.com").await?;
    assert_eq!(t.get("/api/incidents/export", &fresh).await?.status, StatusCode::OK);

    Ok(())
}
