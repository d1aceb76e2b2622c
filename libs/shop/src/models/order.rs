//! Order model and related functionality

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ShopError;
use crate::models::cart::CartView;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ShopError::Validation(format!("unknown order status: {other}"))),
        }
    }
}

/// Snapshot of a cart line at order time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
    pub name: String,
    pub image: String,
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub customer_comment: String,
    pub created_at: DateTime<Utc>,
}

/// Customer fields supplied at checkout. Missing fields fall back to the
/// user's profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub comment: Option<String>,
}

/// Resolved customer fields stored on an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub comment: String,
}

/// An order ready to be committed
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub customer: Customer,
}

impl NewOrder {
    /// Snapshot a resolved cart into order items priced at current prices
    pub fn from_cart(
        user_id: Uuid,
        order_number: String,
        cart: &CartView,
        customer: Customer,
    ) -> Self {
        let items = cart
            .items
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                name: line.name.clone(),
                image: line.image.clone(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            order_number,
            user_id,
            items,
            total: cart.total,
            customer,
        }
    }

    pub(crate) fn into_order(self, created_at: DateTime<Utc>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            items: self.items,
            total: self.total,
            status: OrderStatus::Processing,
            customer_name: self.customer.name,
            customer_phone: self.customer.phone,
            customer_address: self.customer.address,
            customer_comment: self.customer.comment,
            created_at,
        }
    }
}

/// Order listing row for administrators, with the placing account
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

/// Store-wide counters for the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub total_revenue: i64,
    pub pending_orders: i64,
}
