use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::UserId;

pub type OrderId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Order {
    #[schema(value_type = i64)]
    pub id: OrderId,
    #[schema(value_type = i64)]
    pub user_id: UserId,
    pub product: String,
    pub quantity: i32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

/// A validated order that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub product: String,
    pub quantity: i32,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(user_id: UserId, product: String, quantity: i32, price: f64) -> anyhow::Result<Self> {
        if product.trim().is_empty() {
            anyhow::bail!("product empty");
        }
        if quantity < 1 {
            anyhow::bail!("quantity must be >= 1");
        }
        if !price.is_finite() || price < 0.0 {
            anyhow::bail!("price must be >= 0");
        }
        Ok(Self {
            user_id,
            product,
            quantity,
            price,
            created_at: Utc::now(),
        })
    }
}

impl Order {
    pub fn from_new(id: OrderId, new: NewOrder) -> Self {
        Self {
            id,
            user_id: new.user_id,
            product: new.product,
            quantity: new.quantity,
            price: new.price,
            created_at: new.created_at,
        }
    }
}
