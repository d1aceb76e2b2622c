use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use super::Store;
use crate::models::{
    AdminOrder, CartLine, CartOwner, MAX_LINE_QUANTITY, MergePolicy, NewOrder, NewProduct,
    NewUser, Order, OrderItem, OrderStatus, Product, ProductFilter, ProductUpdate, ProfileUpdate,
    Role, Specifications, StoreStats, User,
};
use crate::{Result, ShopError};

const USER_COLUMNS: &str = "id, email, password_hash, name, phone, address, role, created_at";
const PRODUCT_COLUMNS: &str =
    "id, name, price, category, description, image, rating, reviews, stock, specifications";
const ORDER_COLUMNS: &str = "id, order_number, user_id, total, status, customer_name, \
     customer_phone, customer_address, customer_comment, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &PgRow) -> Result<User> {
        let role: String = row.try_get("role")?;
        Ok(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            role: role.parse()?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        let Json(specifications): Json<Specifications> = row.try_get("specifications")?;
        Ok(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            rating: row.try_get("rating")?,
            reviews: row.try_get("reviews")?,
            stock: row.try_get("stock")?,
            specifications,
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            user_id: row.try_get("user_id")?,
            items,
            total: row.try_get("total")?,
            status: status.parse()?,
            customer_name: row.try_get("customer_name")?,
            customer_phone: row.try_get("customer_phone")?,
            customer_address: row.try_get("customer_address")?,
            customer_comment: row.try_get("customer_comment")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Loads the items of the given orders, keyed by order id.
    async fn items_for(&self, order_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, price, name, image
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = row.try_get("order_id")?;
            items.entry(order_id).or_default().push(OrderItem {
                product_id: row.try_get("product_id")?,
                quantity: row.try_get("quantity")?,
                price: row.try_get("price")?,
                name: row.try_get("name")?,
                image: row.try_get("image")?,
            });
        }
        Ok(items)
    }

    async fn orders_with_items(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = self.items_for(ids).await?;

        rows.iter()
            .map(|row| -> Result<Order> {
                let id: Uuid = row.try_get("id")?;
                Self::row_to_order(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

/// Condition selecting the owner's cart rows, with the owner bound as `$1`.
fn owner_condition(owner: &CartOwner) -> &'static str {
    match owner {
        CartOwner::User(_) => "user_id = $1",
        CartOwner::Guest(_) => "session_id = $1 AND user_id IS NULL",
    }
}

fn bind_owner<'q>(
    query: Query<'q, Postgres, PgArguments>,
    owner: &'q CartOwner,
) -> Query<'q, Postgres, PgArguments> {
    match owner {
        CartOwner::User(id) => query.bind(*id),
        CartOwner::Guest(session_id) => query.bind(session_id.as_str()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, email, password_hash, name, phone, address, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ShopError::EmailTaken(user.email.clone())
            } else {
                ShopError::Database(e)
            }
        })?;

        Self::row_to_user(&row)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_user).collect()
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.address)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));

        if let Some(category) = filter.category() {
            query.push(" AND category = ").push_bind(category.to_string());
        }
        if let Some(term) = filter.search_term() {
            let pattern = format!("%{}%", escape_like(term));
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query.push(" ORDER BY ").push(filter.sort.order_by());

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_product).collect()
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn find_product_by_name(&self, name: &str, category: &str) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = $1 AND category = $2"
        ))
        .bind(name)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn similar_products(&self, product: &Product, limit: usize) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE category = $1 AND id <> $2 \
             ORDER BY rating DESC, name ASC LIMIT $3"
        ))
        .bind(&product.category)
        .bind(product.id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_product).collect()
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn insert_product(&self, id: Uuid, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (id, name, price, category, description, image, rating, reviews, stock, specifications)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.rating)
        .bind(product.reviews)
        .bind(product.stock)
        .bind(Json(&product.specifications))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ShopError::Conflict(format!(
                    "product {} already exists in {}",
                    product.name, product.category
                ))
            } else {
                ShopError::Database(e)
            }
        })?;

        Self::row_to_product(&row)
    }

    async fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                category = COALESCE($4, category),
                description = COALESCE($5, description),
                image = COALESCE($6, image),
                rating = COALESCE($7, rating),
                reviews = COALESCE($8, reviews),
                stock = COALESCE($9, stock),
                specifications = COALESCE($10, specifications)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(update.price)
        .bind(&update.category)
        .bind(&update.description)
        .bind(&update.image)
        .bind(update.rating)
        .bind(update.reviews)
        .bind(update.stock)
        .bind(update.specifications.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ShopError::Conflict("another product with this name and category exists".into())
            } else {
                ShopError::Database(e)
            }
        })?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn product_in_orders(&self, id: Uuid) -> Result<bool> {
        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(referenced)
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cart_lines(&self, owner: &CartOwner) -> Result<Vec<CartLine>> {
        let sql = format!(
            r#"
            SELECT ci.product_id, ci.quantity, p.price, p.name, p.image, p.stock
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE {}
            ORDER BY ci.added_at, ci.id
            "#,
            owner_condition(owner)
        );
        let rows = bind_owner(sqlx::query(&sql), owner)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<CartLine> {
                Ok(CartLine {
                    product_id: row.try_get("product_id")?,
                    quantity: row.try_get("quantity")?,
                    price: row.try_get("price")?,
                    name: row.try_get("name")?,
                    image: row.try_get("image")?,
                    stock: row.try_get("stock")?,
                })
            })
            .collect()
    }

    async fn add_to_cart(&self, owner: &CartOwner, product_id: Uuid, quantity: i32) -> Result<()> {
        // The partial unique indexes make concurrent adds collapse into one row.
        // An increment past the line maximum matches no row and changes nothing.
        let sql = match owner {
            CartOwner::User(_) => {
                r#"
                INSERT INTO cart_items (user_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, product_id) WHERE user_id IS NOT NULL
                DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
                WHERE cart_items.quantity + EXCLUDED.quantity <= $4
                "#
            }
            CartOwner::Guest(_) => {
                r#"
                INSERT INTO cart_items (session_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (session_id, product_id) WHERE user_id IS NULL
                DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
                WHERE cart_items.quantity + EXCLUDED.quantity <= $4
                "#
            }
        };

        let result = bind_owner(sqlx::query(sql), owner)
            .bind(product_id)
            .bind(quantity)
            .bind(MAX_LINE_QUANTITY)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ShopError::Validation(format!(
                "quantity must not exceed {MAX_LINE_QUANTITY}"
            )));
        }
        Ok(())
    }

    async fn set_cart_quantity(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE cart_items SET quantity = $2 WHERE {} AND product_id = $3",
            owner_condition(owner)
        );
        bind_owner(sqlx::query(&sql), owner)
            .bind(quantity)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_from_cart(&self, owner: &CartOwner, product_id: Uuid) -> Result<()> {
        let sql = format!(
            "DELETE FROM cart_items WHERE {} AND product_id = $2",
            owner_condition(owner)
        );
        bind_owner(sqlx::query(&sql), owner)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_cart(&self, owner: &CartOwner) -> Result<()> {
        let sql = format!("DELETE FROM cart_items WHERE {}", owner_condition(owner));
        bind_owner(sqlx::query(&sql), owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn merge_guest_cart(
        &self,
        session_id: &str,
        user_id: Uuid,
        policy: MergePolicy,
    ) -> Result<u64> {
        let combine = match policy {
            MergePolicy::Sum => "LEAST(cart_items.quantity + EXCLUDED.quantity, $3)",
            MergePolicy::KeepLarger => "GREATEST(cart_items.quantity, EXCLUDED.quantity)",
        };

        let mut tx = self.pool.begin().await?;

        let merged = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity, added_at)
            SELECT $1, product_id, quantity, added_at
            FROM cart_items
            WHERE session_id = $2 AND user_id IS NULL
            ON CONFLICT (user_id, product_id) WHERE user_id IS NOT NULL
            DO UPDATE SET quantity = {combine}
            "#
        ))
        .bind(user_id)
        .bind(session_id)
        .bind(MAX_LINE_QUANTITY)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND user_id IS NULL")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(%user_id, merged, "merged guest cart");
        Ok(merged)
    }

    async fn commit_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(ShopError::TransactionFailed)?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (id, order_number, user_id, total, status, customer_name,
                                customer_phone, customer_address, customer_comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.total)
        .bind(OrderStatus::Processing.as_str())
        .bind(&order.customer.name)
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .bind(&order.customer.comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ShopError::Conflict(format!("order number {} already exists", order.order_number))
            } else {
                ShopError::TransactionFailed(e)
            }
        })?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price, name, image)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price)
            .bind(&item.name)
            .bind(&item.image)
            .execute(&mut *tx)
            .await
            .map_err(ShopError::TransactionFailed)?;

            // Conditional decrement: zero rows means the stock ran out.
            let updated =
                sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2 AND stock >= $1")
                    .bind(item.quantity)
                    .bind(item.product_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(ShopError::TransactionFailed)?;

            if updated.rows_affected() == 0 {
                let available: Option<i32> =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                        .bind(item.product_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(ShopError::TransactionFailed)?;

                // Dropping `tx` rolls back everything written so far.
                return Err(match available {
                    Some(available) => ShopError::InsufficientStock {
                        product_id: item.product_id,
                        requested: item.quantity,
                        available,
                    },
                    None => ShopError::not_found("product", item.product_id),
                });
            }
        }

        // Only the ordered lines leave the cart; anything added after the
        // snapshot was taken stays.
        let ordered: Vec<Uuid> = order.items.iter().map(|item| item.product_id).collect();
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
            .bind(order.user_id)
            .bind(ordered)
            .execute(&mut *tx)
            .await
            .map_err(ShopError::TransactionFailed)?;

        tx.commit().await.map_err(ShopError::TransactionFailed)?;

        Self::row_to_order(&row, order.items)
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(self.orders_with_items(rows).await?.pop())
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.orders_with_items(rows).await
    }

    async fn all_orders(&self) -> Result<Vec<AdminOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.order_number, o.user_id, o.total, o.status, o.customer_name,
                   o.customer_phone, o.customer_address, o.customer_comment, o.created_at,
                   u.email AS user_email, u.name AS user_name
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            ORDER BY o.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let accounts = rows
            .iter()
            .map(|row| -> Result<(Option<String>, Option<String>)> {
                Ok((
                    row.try_get::<Option<String>, _>("user_email")?,
                    row.try_get::<Option<String>, _>("user_name")?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        let orders = self.orders_with_items(rows).await?;

        Ok(orders
            .into_iter()
            .zip(accounts)
            .map(|(order, (user_email, user_name))| AdminOrder {
                order,
                user_email,
                user_name,
            })
            .collect())
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM products) AS total_products,
                (SELECT COUNT(*) FROM orders) AS total_orders,
                (SELECT COALESCE(SUM(total), 0)::BIGINT FROM orders) AS total_revenue,
                (SELECT COUNT(*) FROM orders WHERE status = 'processing') AS pending_orders
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total_users: row.try_get("total_users")?,
            total_products: row.try_get("total_products")?,
            total_orders: row.try_get("total_orders")?,
            total_revenue: row.try_get("total_revenue")?,
            pending_orders: row.try_get("pending_orders")?,
        })
    }
}
