use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::models::{
    AdminOrder, CartLine, CartOwner, MAX_LINE_QUANTITY, MergePolicy, NewOrder, NewProduct,
    NewUser, Order, OrderStatus, Product, ProductFilter, ProductUpdate, ProfileUpdate, Role,
    StoreStats, User,
};
use crate::{Result, ShopError};

#[derive(Debug, Clone)]
struct CartRow {
    user_id: Option<Uuid>,
    session_id: Option<String>,
    product_id: Uuid,
    quantity: i32,
}

impl CartRow {
    fn owned_by(&self, owner: &CartOwner) -> bool {
        owner.matches(self.user_id, self.session_id.as_deref())
    }
}

fn line_limit_exceeded() -> ShopError {
    ShopError::Validation(format!("quantity must not exceed {MAX_LINE_QUANTITY}"))
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    products: Vec<Product>,
    cart: Vec<CartRow>,
    orders: Vec<Order>,
}

impl Tables {
    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn name_taken(&self, name: &str, category: &str, except: Option<Uuid>) -> bool {
        self.products
            .iter()
            .any(|p| p.name == name && p.category == category && Some(p.id) != except)
    }
}

/// In-memory store implementation for testing.
///
/// All tables live behind a single lock, so every operation is atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(ShopError::EmailTaken(user.email));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            phone: user.phone,
            address: user.address,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.iter().rev().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            update.apply(user);
            user.clone()
        }))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        filter.sort.sort(&mut products);
        Ok(products)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.read().await.product(id).cloned())
    }

    async fn find_product_by_name(&self, name: &str, category: &str) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .find(|p| p.name == name && p.category == category)
            .cloned())
    }

    async fn similar_products(&self, product: &Product, limit: usize) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut similar: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| p.category == product.category && p.id != product.id)
            .cloned()
            .collect();
        similar.sort_by(|a, b| b.rating.total_cmp(&a.rating).then_with(|| a.name.cmp(&b.name)));
        similar.truncate(limit);
        Ok(similar)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<String> =
            tables.products.iter().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn insert_product(&self, id: Uuid, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(&product.name, &product.category, None) {
            return Err(ShopError::Conflict(format!(
                "product {} already exists in {}",
                product.name, product.category
            )));
        }
        let product = product.into_product(id);
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.product(id).cloned() else {
            return Ok(None);
        };

        let mut updated = current;
        update.apply(&mut updated);
        if tables.name_taken(&updated.name, &updated.category, Some(id)) {
            return Err(ShopError::Conflict(format!(
                "product {} already exists in {}",
                updated.name, updated.category
            )));
        }

        if let Some(slot) = tables.products.iter_mut().find(|p| p.id == id) {
            *slot = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn product_in_orders(&self, id: Uuid) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .any(|o| o.items.iter().any(|i| i.product_id == id)))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        if tables.products.len() == before {
            return Ok(false);
        }
        tables.cart.retain(|row| row.product_id != id);
        Ok(true)
    }

    async fn cart_lines(&self, owner: &CartOwner) -> Result<Vec<CartLine>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart
            .iter()
            .filter(|row| row.owned_by(owner))
            .filter_map(|row| {
                tables.product(row.product_id).map(|p| CartLine {
                    product_id: p.id,
                    quantity: row.quantity,
                    price: p.price,
                    name: p.name.clone(),
                    image: p.image.clone(),
                    stock: p.stock,
                })
            })
            .collect())
    }

    async fn add_to_cart(&self, owner: &CartOwner, product_id: Uuid, quantity: i32) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.product(product_id).is_none() {
            return Err(ShopError::not_found("product", product_id));
        }

        if let Some(row) = tables
            .cart
            .iter_mut()
            .find(|row| row.owned_by(owner) && row.product_id == product_id)
        {
            row.quantity = row
                .quantity
                .checked_add(quantity)
                .filter(|total| *total <= MAX_LINE_QUANTITY)
                .ok_or_else(line_limit_exceeded)?;
            return Ok(());
        }

        let (user_id, session_id) = match owner {
            CartOwner::User(id) => (Some(*id), None),
            CartOwner::Guest(session) => (None, Some(session.clone())),
        };
        tables.cart.push(CartRow {
            user_id,
            session_id,
            product_id,
            quantity,
        });
        Ok(())
    }

    async fn set_cart_quantity(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(row) = tables
            .cart
            .iter_mut()
            .find(|row| row.owned_by(owner) && row.product_id == product_id)
        {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn remove_from_cart(&self, owner: &CartOwner, product_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .cart
            .retain(|row| !(row.owned_by(owner) && row.product_id == product_id));
        Ok(())
    }

    async fn clear_cart(&self, owner: &CartOwner) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.cart.retain(|row| !row.owned_by(owner));
        Ok(())
    }

    async fn merge_guest_cart(
        &self,
        session_id: &str,
        user_id: Uuid,
        policy: MergePolicy,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let guest = CartOwner::Guest(session_id.to_string());
        let user = CartOwner::User(user_id);

        let (guest_rows, mut rest): (Vec<CartRow>, Vec<CartRow>) = tables
            .cart
            .iter()
            .cloned()
            .partition(|row| row.owned_by(&guest));
        let merged = guest_rows.len() as u64;

        for row in guest_rows {
            match rest
                .iter_mut()
                .find(|r| r.owned_by(&user) && r.product_id == row.product_id)
            {
                Some(existing) => existing.quantity = policy.combine(existing.quantity, row.quantity),
                None => rest.push(CartRow {
                    user_id: Some(user_id),
                    session_id: None,
                    product_id: row.product_id,
                    quantity: row.quantity.min(MAX_LINE_QUANTITY),
                }),
            }
        }

        tables.cart = rest;
        Ok(merged)
    }

    async fn commit_order(&self, order: NewOrder) -> Result<Order> {
        let mut tables = self.tables.write().await;
        if tables
            .orders
            .iter()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(ShopError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }

        // Validate every line before touching stock so a failure changes nothing.
        let mut remaining: HashMap<Uuid, i32> = HashMap::new();
        for item in &order.items {
            let stock = match remaining.get(&item.product_id) {
                Some(stock) => *stock,
                None => tables
                    .product(item.product_id)
                    .map(|p| p.stock)
                    .ok_or_else(|| ShopError::not_found("product", item.product_id))?,
            };
            if stock < item.quantity {
                return Err(ShopError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: stock,
                });
            }
            remaining.insert(item.product_id, stock - item.quantity);
        }

        for product in tables.products.iter_mut() {
            if let Some(stock) = remaining.get(&product.id) {
                product.stock = *stock;
            }
        }

        let user = CartOwner::User(order.user_id);
        tables.cart.retain(|row| {
            !(row.owned_by(&user) && order.items.iter().any(|i| i.product_id == row.product_id))
        });

        let order = order.into_order(Utc::now());
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<AdminOrder>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .map(|order| {
                let user = tables.users.iter().find(|u| u.id == order.user_id);
                AdminOrder {
                    order: order.clone(),
                    user_email: user.map(|u| u.email.clone()),
                    user_name: user.map(|u| u.name.clone()),
                }
            })
            .collect())
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.orders.iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stats(&self) -> Result<StoreStats> {
        let tables = self.tables.read().await;
        Ok(StoreStats {
            total_users: tables.users.len() as i64,
            total_products: tables.products.len() as i64,
            total_orders: tables.orders.len() as i64,
            total_revenue: tables.orders.iter().map(|o| o.total).sum(),
            pending_orders: tables
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Processing)
                .count() as i64,
        })
    }
}
