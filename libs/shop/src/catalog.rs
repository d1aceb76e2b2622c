//! Catalog queries and product administration

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{NewProduct, Product, ProductFilter, ProductUpdate};
use crate::store::Store;
use crate::{Result, ShopError};

/// How many related products accompany a product page
pub const SIMILAR_LIMIT: usize = 4;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        self.store.list_products(filter).await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.store.categories().await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product> {
        self.store
            .find_product(id)
            .await?
            .ok_or_else(|| ShopError::not_found("product", id))
    }

    /// A product together with other products from its category
    pub async fn product_with_similar(&self, id: Uuid) -> Result<(Product, Vec<Product>)> {
        let product = self.get_product(id).await?;
        let similar = self.store.similar_products(&product, SIMILAR_LIMIT).await?;
        Ok((product, similar))
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;
        if self
            .store
            .find_product_by_name(&product.name, &product.category)
            .await?
            .is_some()
        {
            return Err(ShopError::Conflict(format!(
                "product {} already exists in {}",
                product.name, product.category
            )));
        }

        let product = self.store.insert_product(Uuid::new_v4(), product).await?;
        info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: Uuid, update: ProductUpdate) -> Result<Product> {
        if update.is_empty() {
            return Err(ShopError::Validation("no fields to update".into()));
        }
        update.validate()?;

        let product = self
            .store
            .update_product(id, &update)
            .await?
            .ok_or_else(|| ShopError::not_found("product", id))?;
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Delete a product that no order refers to. Cart lines holding it go too.
    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        self.get_product(id).await?;
        if self.store.product_in_orders(id).await? {
            warn!(product_id = %id, "refusing to delete product referenced by orders");
            return Err(ShopError::Conflict(
                "product is referenced by existing orders".into(),
            ));
        }

        if !self.store.delete_product(id).await? {
            return Err(ShopError::not_found("product", id));
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }
}
