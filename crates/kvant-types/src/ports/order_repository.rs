use async_trait::async_trait;

use super::RepoError;
use crate::domain::order::{NewOrder, Order};
use crate::domain::user::UserId;

#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepoError>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepoError>;
}
