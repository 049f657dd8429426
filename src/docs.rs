use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::Server;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::TOKEN_COOKIE;
use crate::{authz, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::auth::signup,
		routes::auth::login,
		routes::auth::logout,
		routes::auth::me,
		routes::users::list_users,
		routes::users::update_user_role,
		routes::incidents::create_incident,
		routes::incidents::list_incidents,
		routes::incidents::get_incident,
		routes::incidents::add_comment,
		routes::incidents::suggest_action,
		routes::incidents::assign_action,
		routes::incidents::set_action_status,
		routes::incidents::export_incidents,
		routes::health::health
	),
	components(
		schemas(
			authz::Role,
			models::user::User,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::SignupRequest,
			models::user::RoleUpdateRequest,
			models::incident::Incident,
			models::incident::Location,
			models::incident::UserRef,
			models::incident::Comment,
			models::incident::Severity,
			models::incident::IncidentType,
			models::incident::ActionStatus,
			models::incident::IncidentCreateRequest,
			models::incident::CommentRequest,
			models::incident::ActionRequest,
			models::incident::ActionStatusRequest,
			models::incident::IncidentReportRow,
			routes::auth::MessageResponse,
			routes::health::HealthResponse
		)
	),
	modifiers(&SecuritySchemes),
	tags(
		(name = "Auth", description = "Signup, login and sessions"),
		(name = "Users", description = "User administration"),
		(name = "Incidents", description = "Incident reporting and resolution"),
		(name = "Health", description = "Liveness")
	)
)]
pub struct ApiDoc;

/// Registers the two ways a bearer token can travel: the `token` cookie set at
/// login, or an `Authorization: Bearer` header.
struct SecuritySchemes;

impl Modify for SecuritySchemes {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		let components = openapi.components.get_or_insert_with(Default::default);

		components.add_security_scheme(
			"bearerAuth",
			SecurityScheme::Http(
				HttpBuilder::new()
					.scheme(HttpAuthScheme::Bearer)
					.bearer_format("JWT")
					.build(),
			),
		);
		components.add_security_scheme(
			"cookieAuth",
			SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(TOKEN_COOKIE))),
		);
	}
}

pub fn build_openapi(port: u16) -> utoipa::openapi::OpenApi {
	let mut doc = ApiDoc::openapi();
	doc.servers = Some(vec![Server::new(format!("http://localhost:{port}"))]);
	doc
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
	Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", doc))
}
