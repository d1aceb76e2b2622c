//! Order placement and order history

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{
    AdminOrder, Customer, CustomerDetails, Identity, NewOrder, Order, OrderStatus, ProfileUpdate,
    StoreStats, User,
};
use crate::store::Store;
use crate::{CartService, Result, ShopError};

/// Generate a human-readable order number, `ORD-<unix millis>-<4 digits>`
pub fn generate_order_number() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD-{}-{suffix:04}", Utc::now().timestamp_millis())
}

/// Fill missing checkout fields from the user's profile
fn resolve_customer(user: &User, details: CustomerDetails) -> Customer {
    let pick = |given: Option<String>, fallback: &str| {
        given
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    };

    Customer {
        name: pick(details.name, &user.name),
        phone: pick(details.phone, &user.phone),
        address: pick(details.address, &user.address),
        comment: details.comment.unwrap_or_default(),
    }
}

/// Profile fields the customer changed at checkout
fn profile_changes(user: &User, customer: &Customer) -> ProfileUpdate {
    let changed = |new: &str, old: &str| (new != old).then(|| new.to_string());
    ProfileUpdate {
        name: changed(&customer.name, &user.name),
        phone: changed(&customer.phone, &user.phone),
        address: changed(&customer.address, &user.address),
    }
}

/// Turns a user's cart into a persisted order
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    carts: CartService,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, carts: CartService) -> Self {
        Self { store, carts }
    }

    /// Place an order for everything in the user's cart.
    ///
    /// The order, its items, the stock decrements and the removal of the
    /// ordered lines from the cart are committed together; on any failure
    /// none of them happen.
    pub async fn place_order(&self, user_id: Uuid, details: CustomerDetails) -> Result<Order> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ShopError::not_found("user", user_id))?;

        let cart = self.carts.get_cart(&Identity::user(user_id)).await?;
        if cart.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let customer = resolve_customer(&user, details);
        let changes = profile_changes(&user, &customer);
        let new_order = NewOrder::from_cart(user_id, generate_order_number(), &cart, customer);

        let order = match self.store.commit_order(new_order).await {
            Ok(order) => order,
            Err(ShopError::TransactionFailed(e)) => {
                error!(%user_id, error = %e, "order transaction failed");
                return Err(ShopError::TransactionFailed(e));
            }
            Err(e) => {
                warn!(%user_id, error = %e, "order rejected");
                return Err(e);
            }
        };
        info!(%user_id, order_number = %order.order_number, total = order.total, "order placed");

        if !changes.is_empty() {
            if let Err(e) = self.store.update_profile(user_id, &changes).await {
                warn!(%user_id, error = %e, "failed to save checkout details to profile");
            }
        }

        Ok(order)
    }

    /// The user's orders, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.store.orders_for_user(user_id).await
    }

    /// One of the user's own orders. Other users' orders are reported missing.
    pub async fn get_for_user(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        self.store
            .find_order(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or_else(|| ShopError::not_found("order", order_id))
    }

    pub async fn list_all(&self) -> Result<Vec<AdminOrder>> {
        self.store.all_orders().await
    }

    pub async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        if !self.store.set_order_status(order_id, status).await? {
            return Err(ShopError::not_found("order", order_id));
        }
        info!(%order_id, %status, "order status changed");
        Ok(())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MergePolicy, NewProduct, NewUser, Role, Specifications};
    use crate::store::InMemoryStore;

    struct Fixture {
        store: InMemoryStore,
        carts: CartService,
        orders: OrderService,
        user: User,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let carts = CartService::new(shared.clone(), MergePolicy::Sum);
        let orders = OrderService::new(shared, carts.clone());
        let user = store
            .insert_user(NewUser {
                email: "buyer@example.com".into(),
                password_hash: "hash".into(),
                name: "Buyer".into(),
                phone: "+7 700 000 00 00".into(),
                address: "Almaty".into(),
                role: Role::User,
            })
            .await
            .unwrap();
        Fixture {
            store,
            carts,
            orders,
            user,
        }
    }

    async fn product(store: &InMemoryStore, name: &str, price: i64, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        store
            .insert_product(
                id,
                NewProduct {
                    name: name.into(),
                    price,
                    category: "test".into(),
                    description: String::new(),
                    image: format!("{name}.png"),
                    rating: 0.0,
                    reviews: 0,
                    stock,
                    specifications: Specifications::new(),
                },
            )
            .await
            .unwrap();
        id
    }

    async fn stock_of(store: &InMemoryStore, id: Uuid) -> i32 {
        store.find_product(id).await.unwrap().unwrap().stock
    }

    #[test]
    fn order_numbers_have_expected_shape() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 4);
    }

    #[tokio::test]
    async fn place_order_snapshots_cart_and_decrements_stock() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 5).await;
        let b = product(&f.store, "B", 50, 3).await;
        let me = Identity::user(f.user.id);
        f.carts.add_item(&me, a, 2).await.unwrap();
        f.carts.add_item(&me, b, 1).await.unwrap();

        let order = f
            .orders
            .place_order(f.user.id, CustomerDetails::default())
            .await
            .unwrap();

        assert_eq!(order.total, 250);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.customer_name, "Buyer");
        assert_eq!(order.customer_address, "Almaty");
        assert_eq!(stock_of(&f.store, a).await, 3);
        assert_eq!(stock_of(&f.store, b).await, 2);
        assert!(f.carts.get_cart(&me).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_keeps_lines_added_after_the_snapshot() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 5).await;
        let b = product(&f.store, "B", 50, 5).await;
        let me = Identity::user(f.user.id);
        f.carts.add_item(&me, a, 1).await.unwrap();

        let snapshot = f.carts.get_cart(&me).await.unwrap();
        let customer = resolve_customer(&f.user, CustomerDetails::default());
        let new_order =
            NewOrder::from_cart(f.user.id, generate_order_number(), &snapshot, customer);

        f.carts.add_item(&me, b, 2).await.unwrap();
        let order = f.store.commit_order(new_order).await.unwrap();
        assert_eq!(order.items.len(), 1);

        let cart = f.carts.get_cart(&me).await.unwrap();
        assert_eq!(cart.quantity_of(a), None);
        assert_eq!(cart.quantity_of(b), Some(2));
    }

    #[tokio::test]
    async fn order_items_keep_their_price_after_edits() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 5).await;
        f.carts.add_item(&Identity::user(f.user.id), a, 1).await.unwrap();
        let order = f
            .orders
            .place_order(f.user.id, CustomerDetails::default())
            .await
            .unwrap();

        f.store
            .update_product(
                a,
                &crate::models::ProductUpdate {
                    price: Some(999),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = f.orders.get_for_user(f.user.id, order.id).await.unwrap();
        assert_eq!(stored.items[0].price, 100);
        assert_eq!(stored.total, 100);
    }

    #[tokio::test]
    async fn empty_cart_writes_nothing() {
        let f = fixture().await;
        let err = f
            .orders
            .place_order(f.user.id, CustomerDetails::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ShopError::EmptyCart));
        assert!(f.orders.list_for_user(f.user.id).await.unwrap().is_empty());
        assert_eq!(f.orders.stats().await.unwrap().total_orders, 0);
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_whole_order() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 5).await;
        let b = product(&f.store, "B", 50, 2).await;
        let me = Identity::user(f.user.id);
        f.carts.add_item(&me, a, 2).await.unwrap();
        f.carts.add_item(&me, b, 2).await.unwrap();

        // Stock drops after the item was carted.
        f.store
            .update_product(
                b,
                &crate::models::ProductUpdate {
                    stock: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = f
            .orders
            .place_order(f.user.id, CustomerDetails::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShopError::InsufficientStock { product_id, requested: 2, available: 1 } if product_id == b
        ));
        assert_eq!(stock_of(&f.store, a).await, 5);
        assert_eq!(stock_of(&f.store, b).await, 1);
        assert_eq!(f.carts.get_cart(&me).await.unwrap().items.len(), 2);
        assert!(f.orders.list_for_user(f.user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn racing_orders_for_last_unit_only_one_wins() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 1).await;
        let other = f
            .store
            .insert_user(NewUser {
                email: "other@example.com".into(),
                password_hash: "hash".into(),
                name: "Other".into(),
                phone: String::new(),
                address: "Astana".into(),
                role: Role::User,
            })
            .await
            .unwrap();

        f.carts.add_item(&Identity::user(f.user.id), a, 1).await.unwrap();
        f.carts.add_item(&Identity::user(other.id), a, 1).await.unwrap();

        let (first, second) = tokio::join!(
            f.orders.place_order(f.user.id, CustomerDetails::default()),
            f.orders.place_order(other.id, CustomerDetails::default()),
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(stock_of(&f.store, a).await, 0);
    }

    #[tokio::test]
    async fn checkout_details_override_and_update_profile() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 5).await;
        f.carts.add_item(&Identity::user(f.user.id), a, 1).await.unwrap();

        let order = f
            .orders
            .place_order(
                f.user.id,
                CustomerDetails {
                    address: Some("Shymkent".into()),
                    comment: Some("call first".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(order.customer_address, "Shymkent");
        assert_eq!(order.customer_comment, "call first");
        let user = f.store.find_user(f.user.id).await.unwrap().unwrap();
        assert_eq!(user.address, "Shymkent");
        assert_eq!(user.name, "Buyer");
    }

    #[tokio::test]
    async fn users_cannot_read_each_others_orders() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 5).await;
        f.carts.add_item(&Identity::user(f.user.id), a, 1).await.unwrap();
        let order = f
            .orders
            .place_order(f.user.id, CustomerDetails::default())
            .await
            .unwrap();

        let err = f
            .orders
            .get_for_user(Uuid::new_v4(), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound { .. }));
    }

    #[tokio::test]
    async fn admin_sees_all_orders_and_stats() {
        let f = fixture().await;
        let a = product(&f.store, "A", 100, 5).await;
        f.carts.add_item(&Identity::user(f.user.id), a, 2).await.unwrap();
        let order = f
            .orders
            .place_order(f.user.id, CustomerDetails::default())
            .await
            .unwrap();

        let all = f.orders.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_email.as_deref(), Some("buyer@example.com"));

        let stats = f.orders.stats().await.unwrap();
        assert_eq!(stats.total_revenue, 200);
        assert_eq!(stats.pending_orders, 1);

        f.orders
            .set_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(f.orders.stats().await.unwrap().pending_orders, 0);

        let err = f
            .orders
            .set_status(Uuid::new_v4(), OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound { .. }));
    }
}
