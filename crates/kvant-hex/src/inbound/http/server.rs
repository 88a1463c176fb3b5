use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    serve, Router,
};
use kvant_types::ports::order_repository::OrderRepository;
use kvant_types::ports::user_repository::UserRepository;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use uuid::Uuid;

use super::handlers::*;
use super::middleware::require_auth;
use super::openapi::{openapi_json, ApiDoc};
use crate::application::auth_service::AuthService;
use crate::application::notifications::NotificationQueue;
use crate::application::order_service::OrderService;
use crate::application::password::Passwords;
use crate::application::token::JwtService;
use crate::application::user_service::UserService;

/// A storage adapter serving both entities. Each service gets its own clone.
pub trait Storage: UserRepository + OrderRepository + Clone {}

impl<T: UserRepository + OrderRepository + Clone> Storage for T {}

pub struct AppState<R: Storage> {
    pub users: Arc<UserService<R>>,
    pub orders: Arc<OrderService<R, R>>,
    pub auth: Arc<AuthService<R>>,
    pub jwt: Arc<JwtService>,
}

impl<R: Storage> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            orders: self.orders.clone(),
            auth: self.auth.clone(),
            jwt: self.jwt.clone(),
        }
    }
}

impl<R: Storage> AppState<R> {
    pub fn new(
        repo: R,
        passwords: Passwords,
        jwt: JwtService,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(
                repo.clone(),
                passwords.clone(),
                notifications.clone(),
            )),
            orders: Arc::new(OrderService::new(repo.clone(), repo.clone(), notifications)),
            auth: Arc::new(AuthService::new(repo, passwords, jwt.clone())),
            jwt: Arc::new(jwt),
        }
    }
}

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

pub struct HttpServer<R: Storage> {
    pub state: AppState<R>,
    pub config: HttpServerConfig,
}

impl<R: Storage> HttpServer<R> {
    pub async fn new(state: AppState<R>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self { state, config })
    }

    /// Routes under `protected` pass through the bearer-token gate first.
    /// The OpenAPI document and its Scalar viewer are public.
    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let public = Router::new()
            .route("/health", get(health))
            .route("/auth/login", post(login::<R>))
            .route("/users", post(create_user::<R>).get(list_users::<R>))
            .route("/user/{id}", get(get_user::<R>))
            .route("/api-docs/openapi.json", get(openapi_json));

        let protected = Router::new()
            .route("/user/{id}", put(update_user::<R>).delete(delete_user::<R>))
            .route(
                "/users/{user_id}/orders",
                post(create_order::<R>).get(list_orders::<R>),
            )
            .route_layer(from_fn_with_state(self.state.jwt.clone(), require_auth));

        public
            .merge(protected)
            .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
            .layer(trace_layer)
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}
