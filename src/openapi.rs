//! OpenAPI document served by Swagger UI when `HTTP_SERVER_SWAGGER_ENABLED` is set.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest},
        handlers,
    },
    error::ErrorResponse,
};

pub const SWAGGER_UI_PATH: &str = "/swagger-ui";
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "northblog",
        description = "User registration, login and access tokens"
    ),
    paths(handlers::register, handlers::login, handlers::ping),
    components(schemas(RegisterRequest, LoginRequest, LoginResponse, ErrorResponse)),
    modifiers(&SecurityAddon),
    tags((name = "Users", description = "Registration, login and token checks"))
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/v1/users/login"))
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi())
}
