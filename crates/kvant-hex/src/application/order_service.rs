use crate::application::notifications::{Notification, NotificationQueue};
use crate::errors::AppError;
use kvant_types::domain::order::{NewOrder, Order};
use kvant_types::domain::user::UserId;
use kvant_types::ports::order_repository::OrderRepository;
use kvant_types::ports::user_repository::UserRepository;

pub struct OrderService<U: UserRepository, O: OrderRepository> {
    users: U,
    orders: O,
    notifications: NotificationQueue,
}

impl<U: UserRepository, O: OrderRepository> OrderService<U, O> {
    pub fn new(users: U, orders: O, notifications: NotificationQueue) -> Self {
        Self {
            users,
            orders,
            notifications,
        }
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<(), AppError> {
        match self.users.get(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("user {}", user_id))),
        }
    }

    /// The owner is checked before the order fields.
    pub async fn create_order(
        &self,
        user_id: UserId,
        product: String,
        quantity: i32,
        price: f64,
    ) -> Result<Order, AppError> {
        self.ensure_user(user_id).await?;
        let order = NewOrder::new(user_id, product, quantity, price)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let order = self.orders.create_order(order).await?;
        tracing::info!(user_id, order_id = order.id, "order created");

        self.notifications.enqueue(Notification::OrderCreated {
            user_id,
            order_id: order.id,
            product: order.product.clone(),
        });
        Ok(order)
    }

    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, AppError> {
        self.ensure_user(user_id).await?;
        Ok(self.orders.list_by_user(user_id).await?)
    }
}
