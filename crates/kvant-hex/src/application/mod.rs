pub mod auth_service;
pub mod notifications;
pub mod order_service;
pub mod password;
pub mod token;
pub mod user_service;
