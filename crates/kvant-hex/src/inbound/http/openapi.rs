use axum::Json;
use kvant_types::domain::order::Order;
use kvant_types::domain::user::User;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::{
    self, CreateOrderRequest, CreateUserRequest, LoginRequest, TokenResponse, UpdateUserRequest,
    UserPage,
};
use crate::errors::ErrorBody;

/// OpenAPI document for every route the server mounts.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "kvant API",
        description = "User registry with per-user orders behind bearer-token auth"
    ),
    paths(
        handlers::health,
        handlers::login,
        handlers::create_user,
        handlers::list_users,
        handlers::get_user,
        handlers::update_user,
        handlers::delete_user,
        handlers::create_order,
        handlers::list_orders,
    ),
    components(schemas(
        User,
        Order,
        ErrorBody,
        LoginRequest,
        TokenResponse,
        CreateUserRequest,
        UpdateUserRequest,
        UserPage,
        CreateOrderRequest
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Token issuance"),
        (name = "users", description = "User registry"),
        (name = "orders", description = "Orders owned by a user")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme the protected paths refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/login",
            "/users",
            "/user/{id}",
            "/users/{user_id}/orders",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("User"));
        assert!(components.schemas.contains_key("ErrorBody"));
    }
}
