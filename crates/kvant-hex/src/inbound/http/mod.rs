pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod server;

pub use middleware::AuthUser;
pub use openapi::ApiDoc;
pub use server::{AppState, HttpServer, HttpServerConfig, Storage};
