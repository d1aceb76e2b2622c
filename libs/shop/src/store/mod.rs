//! Persistence for users, products, carts and orders.
//!
//! [`PostgresStore`] is the production backend. [`InMemoryStore`] keeps the
//! same semantics in process memory and backs the unit and HTTP tests.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::models::{
    AdminOrder, CartLine, CartOwner, MergePolicy, NewOrder, NewProduct, NewUser, Order,
    OrderStatus, Product, ProductFilter, ProductUpdate, ProfileUpdate, Role, StoreStats, User,
};

/// Core trait for marketplace storage.
///
/// All implementations must be thread-safe (Send + Sync). Cart rows are
/// addressed through a [`CartOwner`]; guest rows never include rows that
/// already carry a user id.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a user. Fails with `EmailTaken` when the email exists.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Applies a profile update, returning the updated user if it exists.
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>>;

    /// Returns false when the user does not exist.
    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool>;

    /// Products matching `filter`, in the filter's sort order.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;

    async fn find_product_by_name(&self, name: &str, category: &str) -> Result<Option<Product>>;

    /// Up to `limit` other products in the same category, best rated first.
    async fn similar_products(&self, product: &Product, limit: usize) -> Result<Vec<Product>>;

    /// Distinct categories, alphabetically.
    async fn categories(&self) -> Result<Vec<String>>;

    /// Inserts a product. Fails with `Conflict` on a duplicate name and category.
    async fn insert_product(&self, id: Uuid, product: NewProduct) -> Result<Product>;

    async fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<Option<Product>>;

    /// Whether any order item references the product.
    async fn product_in_orders(&self, id: Uuid) -> Result<bool>;

    /// Deletes the product along with any cart rows holding it.
    /// Returns false when it does not exist.
    async fn delete_product(&self, id: Uuid) -> Result<bool>;

    /// The owner's cart rows joined with current product data, oldest first.
    async fn cart_lines(&self, owner: &CartOwner) -> Result<Vec<CartLine>>;

    /// Adds `quantity` to the owner's row for the product, creating it if absent.
    /// Concurrent adds for the same product never produce duplicate rows.
    async fn add_to_cart(&self, owner: &CartOwner, product_id: Uuid, quantity: i32) -> Result<()>;

    /// Sets the quantity of an existing row. No-op when the row is absent.
    async fn set_cart_quantity(&self, owner: &CartOwner, product_id: Uuid, quantity: i32)
    -> Result<()>;

    async fn remove_from_cart(&self, owner: &CartOwner, product_id: Uuid) -> Result<()>;

    async fn clear_cart(&self, owner: &CartOwner) -> Result<()>;

    /// Moves every guest row of `session_id` into the user's cart in one
    /// atomic step, combining quantities per `policy`. Returns the number of
    /// guest rows merged.
    async fn merge_guest_cart(&self, session_id: &str, user_id: Uuid, policy: MergePolicy)
    -> Result<u64>;

    /// Atomically inserts the order and its items, decrements stock for each
    /// line and removes the ordered lines from the user's cart. Any failure
    /// leaves no trace.
    async fn commit_order(&self, order: NewOrder) -> Result<Order>;

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;

    /// The user's orders, newest first.
    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

    /// Every order with its account, newest first.
    async fn all_orders(&self) -> Result<Vec<AdminOrder>>;

    /// Returns false when the order does not exist.
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<bool>;

    async fn stats(&self) -> Result<StoreStats>;
}
