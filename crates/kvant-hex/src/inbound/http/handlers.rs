use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use kvant_types::domain::order::Order;
use kvant_types::domain::user::{User, UserFilter, UserId};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::middleware::AuthUser;
use super::server::{AppState, Storage};
use crate::errors::{AppError, ErrorBody};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
    pub password: String,
}

/// Extra fields such as `id` are ignored; the path id wins.
#[derive(Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
}

/// `min_age=` with no value means no bound, like an omitted parameter.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_age: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub max_age: Option<i64>,
}

fn empty_as_none<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserPage {
    pub data: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub product: String,
    pub quantity: i32,
    pub price: f64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed access token", body = TokenResponse),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody)
    )
)]
pub async fn login<R>(
    State(state): State<AppState<R>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError>
where
    R: Storage,
{
    let Json(payload) = payload?;
    let token = state.auth.login(&payload.email, payload.password).await?;
    Ok(Json(TokenResponse { token }))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input or email already exists", body = ErrorBody)
    )
)]
pub async fn create_user<R>(
    State(state): State<AppState<R>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError>
where
    R: Storage,
{
    let Json(payload) = payload?;
    let user = state
        .users
        .create_user(payload.name, payload.email, payload.age, payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "One page of users", body = UserPage),
        (status = 400, description = "Invalid paging or age filter", body = ErrorBody)
    )
)]
pub async fn list_users<R>(
    State(state): State<AppState<R>>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<UserPage>, AppError>
where
    R: Storage,
{
    let Query(q) = query?;
    let filter = UserFilter::new(q.page, q.limit, q.min_age, q.max_age)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let (data, total) = state.users.list_users(filter).await?;
    Ok(Json(UserPage {
        data,
        total,
        page: filter.page,
        limit: filter.limit,
        min_age: filter.min_age,
        max_age: filter.max_age,
    }))
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, description = "Invalid id", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn get_user<R>(
    State(state): State<AppState<R>>,
    id: Result<Path<UserId>, PathRejection>,
) -> Result<Json<User>, AppError>
where
    R: Storage,
{
    let Path(id) = id?;
    Ok(Json(state.users.get_user(id).await?))
}

#[utoipa::path(
    put,
    path = "/user/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input or email already exists", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn update_user<R>(
    State(state): State<AppState<R>>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, AppError>
where
    R: Storage,
{
    let Path(id) = id?;
    let Json(payload) = payload?;
    tracing::debug!(principal = auth.user_id, user_id = id, "update user");
    let updated = state
        .users
        .update_user(id, payload.name, payload.email, payload.age)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/user/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "User and their orders deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn delete_user<R>(
    State(state): State<AppState<R>>,
    Extension(auth): Extension<AuthUser>,
    id: Result<Path<UserId>, PathRejection>,
) -> Result<StatusCode, AppError>
where
    R: Storage,
{
    let Path(id) = id?;
    tracing::debug!(principal = auth.user_id, user_id = id, "delete user");
    state.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/orders",
    tag = "orders",
    params(("user_id" = i64, Path, description = "Owner id")),
    request_body = CreateOrderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Invalid order fields", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn create_order<R>(
    State(state): State<AppState<R>>,
    Extension(auth): Extension<AuthUser>,
    user_id: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError>
where
    R: Storage,
{
    let Path(user_id) = user_id?;
    let Json(payload) = payload?;
    tracing::debug!(principal = auth.user_id, user_id, "create order");
    let order = state
        .orders
        .create_order(user_id, payload.product, payload.quantity, payload.price)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/orders",
    tag = "orders",
    params(("user_id" = i64, Path, description = "Owner id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Orders of the user, oldest first", body = Vec<Order>),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn list_orders<R>(
    State(state): State<AppState<R>>,
    Extension(auth): Extension<AuthUser>,
    user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Vec<Order>>, AppError>
where
    R: Storage,
{
    let Path(user_id) = user_id?;
    tracing::debug!(principal = auth.user_id, user_id, "list orders");
    Ok(Json(state.orders.list_orders(user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn parse(query: &str) -> Result<ListUsersQuery, QueryRejection> {
        let uri: Uri = format!("http://localhost/users?{query}").parse().unwrap();
        Query::<ListUsersQuery>::try_from_uri(&uri).map(|Query(q)| q)
    }

    #[test]
    fn empty_age_bounds_mean_no_bound() {
        let q = parse("min_age=&max_age=").unwrap();
        assert_eq!((q.min_age, q.max_age), (None, None));

        let q = parse("min_age=18&max_age=").unwrap();
        assert_eq!((q.min_age, q.max_age), (Some(18), None));

        let q = parse("page=2").unwrap();
        assert_eq!((q.page, q.min_age, q.max_age), (Some(2), None, None));
    }

    #[test]
    fn non_numeric_age_is_rejected() {
        assert!(parse("min_age=abc").is_err());
        assert!(parse("max_age=1.5").is_err());
    }
}
