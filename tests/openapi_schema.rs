use serde_json::Value;

#[test]
fn openapi_documents_incident_lifecycle() -> anyhow::Result<()> {
    let doc = flight_incidents::docs::build_openapi(8000);
    let v = serde_json::to_value(&doc)?;

    let paths = v.get("paths").and_then(Value::as_object).expect("paths must exist");
    for path in [
        "/api/signup",
        "/api/login",
        "/api/logout",
        "/api/incidents",
        "/api/incidents/{id}/comments",
        "/api/incidents/{id}/suggest-action",
        "/api/incidents/{id}/assign-action",
        "/api/incidents/{id}/action-status",
        "/api/incidents/export",
        "/api/users/{id}",
    ] {
        assert!(paths.contains_key(path), "OpenAPI missing path '{}'", path);
    }

    let props = v
        .pointer("/components/schemas/Incident/properties")
        .and_then(Value::as_object)
        .expect("components.schemas.Incident.properties must exist");
    for key in ["comments", "suggested_action", "assigned_action", "action_status", "incident_type"] {
        assert!(props.contains_key(key), "Incident schema missing '{}'", key);
    }

    let schemes = v
        .pointer("/components/securitySchemes")
        .and_then(Value::as_object)
        .expect("security schemes must exist");
    assert!(schemes.contains_key("bearerAuth"));
    assert!(schemes.contains_key("cookieAuth"));

    Ok(())
}
