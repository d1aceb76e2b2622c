//! Cart ownership and views

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity attached to a request: an optional authenticated user and an
/// optional anonymous session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
}

impl Identity {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            session_id: None,
        }
    }

    pub fn guest(session_id: impl Into<String>) -> Self {
        Self {
            user_id: None,
            session_id: Some(session_id.into()),
        }
    }

    /// The cart this identity owns. A user id always wins over a session id;
    /// an empty session id counts as absent.
    pub fn owner(&self) -> Option<CartOwner> {
        match (&self.user_id, &self.session_id) {
            (Some(user_id), _) => Some(CartOwner::User(*user_id)),
            (None, Some(session_id)) if !session_id.is_empty() => {
                Some(CartOwner::Guest(session_id.clone()))
            }
            _ => None,
        }
    }
}

/// Owner of a set of cart rows.
///
/// Guest rows are only those with a session id and no user id, so rows
/// that were migrated to a user are never visible through the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    User(Uuid),
    Guest(String),
}

impl CartOwner {
    /// Whether a stored row with the given owner columns belongs to `self`
    pub fn matches(&self, user_id: Option<Uuid>, session_id: Option<&str>) -> bool {
        match self {
            CartOwner::User(id) => user_id == Some(*id),
            CartOwner::Guest(session) => user_id.is_none() && session_id == Some(session.as_str()),
        }
    }
}

/// One cart row joined with current product data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
    pub name: String,
    pub image: String,
    pub stock: i32,
}

impl CartLine {
    pub fn subtotal(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

/// Resolved cart with its total computed from current prices
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: i64,
}

impl CartView {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total = items.iter().map(CartLine::subtotal).sum();
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, product_id: Uuid) -> Option<i32> {
        self.items
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }
}

/// Largest quantity a single cart line may hold
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// How quantities combine when a guest cart is merged into a user cart
/// that already holds the same product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    #[default]
    Sum,
    KeepLarger,
}

impl MergePolicy {
    /// Combined quantity, capped at [`MAX_LINE_QUANTITY`]
    pub fn combine(&self, existing: i32, incoming: i32) -> i32 {
        let combined = match self {
            MergePolicy::Sum => existing.saturating_add(incoming),
            MergePolicy::KeepLarger => existing.max(incoming),
        };
        combined.min(MAX_LINE_QUANTITY)
    }
}
