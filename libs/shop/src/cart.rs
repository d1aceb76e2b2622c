//! Cart resolution and mutation for guests and authenticated users

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CartOwner, CartView, Identity, MAX_LINE_QUANTITY, MergePolicy};
use crate::store::Store;
use crate::{Result, ShopError};

/// Resolves and mutates the cart belonging to an [`Identity`].
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    merge_policy: MergePolicy,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>, merge_policy: MergePolicy) -> Self {
        Self {
            store,
            merge_policy,
        }
    }

    /// Resolve the identity's cart. An identity without user or session
    /// yields an empty cart.
    pub async fn get_cart(&self, identity: &Identity) -> Result<CartView> {
        match identity.owner() {
            Some(owner) => self.resolve(&owner).await,
            None => Ok(CartView::empty()),
        }
    }

    /// Add `quantity` units of a product, incrementing an existing line.
    pub async fn add_item(
        &self,
        identity: &Identity,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(ShopError::Validation("quantity must be at least 1".into()));
        }
        check_line_limit(quantity)?;

        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| ShopError::not_found("product", product_id))?;
        if product.stock < quantity {
            return Err(ShopError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }

        let owner = require_owner(identity)?;
        self.store.add_to_cart(&owner, product_id, quantity).await?;
        debug!(?owner, %product_id, quantity, "added to cart");

        self.resolve(&owner).await
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub async fn update_item(
        &self,
        identity: &Identity,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView> {
        let owner = require_owner(identity)?;
        check_line_limit(quantity)?;
        if quantity <= 0 {
            self.store.remove_from_cart(&owner, product_id).await?;
        } else {
            self.store
                .set_cart_quantity(&owner, product_id, quantity)
                .await?;
        }
        self.resolve(&owner).await
    }

    pub async fn remove_item(&self, identity: &Identity, product_id: Uuid) -> Result<CartView> {
        let owner = require_owner(identity)?;
        self.store.remove_from_cart(&owner, product_id).await?;
        self.resolve(&owner).await
    }

    pub async fn clear(&self, identity: &Identity) -> Result<()> {
        let owner = require_owner(identity)?;
        self.store.clear_cart(&owner).await
    }

    /// Move a guest session's cart into the user's cart after login or
    /// registration.
    pub async fn merge_guest_cart(&self, session_id: &str, user_id: Uuid) -> Result<u64> {
        if session_id.is_empty() {
            return Ok(0);
        }

        let merged = self
            .store
            .merge_guest_cart(session_id, user_id, self.merge_policy)
            .await?;
        if merged > 0 {
            info!(%user_id, merged, policy = ?self.merge_policy, "merged guest cart into user cart");
        }
        Ok(merged)
    }

    async fn resolve(&self, owner: &CartOwner) -> Result<CartView> {
        let lines = self.store.cart_lines(owner).await?;
        Ok(CartView::from_lines(lines))
    }
}

fn require_owner(identity: &Identity) -> Result<CartOwner> {
    identity.owner().ok_or(ShopError::IdentityRequired)
}

fn check_line_limit(quantity: i32) -> Result<()> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(ShopError::Validation(format!(
            "quantity must not exceed {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}
