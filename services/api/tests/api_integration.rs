//! End-to-end tests of the HTTP surface over the in-memory store.

use std::sync::Arc;

use api::{
    AppState, create_app,
    settings::{AuthSettings, CartSettings, ServerSettings, Settings, StoreBackend},
};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use shop::models::{MergePolicy, Registration, Role};
use shop::store::InMemoryStore;
use tower::ServiceExt;

fn test_settings(add_window_ms: u64) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        auth: AuthSettings {
            jwt_secret: "test-secret".into(),
            token_expiry_seconds: 3600,
        },
        cart: CartSettings {
            merge_policy: MergePolicy::Sum,
            add_window_ms,
            add_guard_capacity: 1_000,
        },
        store: StoreBackend::Memory,
        seed_demo_data: false,
    }
}

struct TestApp {
    app: Router,
    state: AppState,
}

/// A request under construction
struct Call<'a> {
    method: &'a str,
    uri: &'a str,
    token: Option<&'a str>,
    session: Option<&'a str>,
    body: Option<Value>,
}

impl<'a> Call<'a> {
    fn new(method: &'a str, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            token: None,
            session: None,
            body: None,
        }
    }

    fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    fn session(mut self, session: &'a str) -> Self {
        self.session = Some(session);
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl TestApp {
    fn new() -> Self {
        Self::with_window(0)
    }

    fn with_window(add_window_ms: u64) -> Self {
        let state = AppState::new(Arc::new(InMemoryStore::new()), &test_settings(add_window_ms));
        Self {
            app: create_app(state.clone()),
            state,
        }
    }

    async fn send(&self, call: Call<'_>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(call.method).uri(call.uri);
        if let Some(token) = call.token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        if let Some(session) = call.session {
            builder = builder.header("x-session-id", session);
        }
        let request = match call.body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn admin_token(&self) -> String {
        let admin = self
            .state
            .accounts
            .create(
                Registration {
                    email: "admin@admin.kz".into(),
                    password: "admin123".into(),
                    name: "Admin".into(),
                    phone: None,
                    address: None,
                },
                Role::Admin,
            )
            .await
            .unwrap();
        self.state.jwt.issue(&admin).unwrap()
    }

    async fn create_product(&self, admin: &str, name: &str, price: i64, stock: i32) -> String {
        let (status, body) = self
            .send(Call::new("POST", "/api/admin/products").token(admin).json(json!({
                "name": name,
                "price": price,
                "category": "Electronics",
                "stock": stock,
            })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["product"]["id"].as_str().unwrap().to_string()
    }

    async fn register(&self, email: &str, session: Option<&str>) -> String {
        let mut call = Call::new("POST", "/api/register").json(json!({
            "email": email,
            "password": "secret123",
            "name": "Aida",
            "phone": "+7 701 000 0000",
            "address": "Almaty",
        }));
        if let Some(session) = session {
            call = call.session(session);
        }
        let (status, body) = self.send(call).await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(Call::new("GET", "/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_session_ids_are_unique() {
    let app = TestApp::new();
    let (_, first) = app.send(Call::new("POST", "/api/session")).await;
    let (_, second) = app.send(Call::new("POST", "/api/session")).await;
    assert!(first["sessionId"].as_str().is_some());
    assert_ne!(first["sessionId"], second["sessionId"]);
}

#[tokio::test]
async fn test_guest_cart_flow() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 10).await;

    let (status, body) = app
        .send(
            Call::new("POST", "/api/cart/add")
                .session("guest-1")
                .json(json!({ "productId": product, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["total"], 200);
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);

    let (status, body) = app
        .send(
            Call::new("PUT", &format!("/api/cart/update/{product}"))
                .session("guest-1")
                .json(json!({ "quantity": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["total"], 500);

    // Another session sees nothing.
    let (_, body) = app.send(Call::new("GET", "/api/cart").session("guest-2")).await;
    assert_eq!(body["cart"]["items"].as_array().unwrap().len(), 0);

    let (status, body) = app
        .send(Call::new("DELETE", &format!("/api/cart/remove/{product}")).session("guest-1"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["total"], 0);
}

#[tokio::test]
async fn test_add_without_identity_is_rejected() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 10).await;

    let (status, body) = app
        .send(Call::new("POST", "/api/cart/add").json(json!({ "productId": product })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app.send(Call::new("GET", "/api/cart")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["total"], 0);
}

#[tokio::test]
async fn test_add_beyond_stock_is_rejected() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 3).await;

    let (status, _) = app
        .send(
            Call::new("POST", "/api/cart/add")
                .session("guest-1")
                .json(json!({ "productId": product, "quantity": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Call::new("POST", "/api/cart/add")
                .session("guest-1")
                .json(json!({ "productId": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_add_within_window_is_throttled() {
    let app = TestApp::with_window(60_000);
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 10).await;
    let add = || {
        Call::new("POST", "/api/cart/add")
            .session("guest-1")
            .json(json!({ "productId": product }))
    };

    let (status, _) = app.send(add()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(add()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (_, body) = app.send(Call::new("GET", "/api/cart").session("guest-1")).await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_register_merges_guest_cart() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 10).await;

    app.send(
        Call::new("POST", "/api/cart/add")
            .session("guest-1")
            .json(json!({ "productId": product, "quantity": 2 })),
    )
    .await;

    let token = app.register("aida@example.com", Some("guest-1")).await;

    let (_, body) = app.send(Call::new("GET", "/api/cart").token(&token)).await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);
    assert_eq!(body["cart"]["total"], 200);

    // The guest rows moved, so the session alone resolves to nothing.
    let (_, body) = app.send(Call::new("GET", "/api/cart").session("guest-1")).await;
    assert_eq!(body["cart"]["total"], 0);
}

#[tokio::test]
async fn test_login_merges_and_sums_quantities() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 10).await;

    let token = app.register("aida@example.com", None).await;
    app.send(
        Call::new("POST", "/api/cart/add")
            .token(&token)
            .json(json!({ "productId": product, "quantity": 1 })),
    )
    .await;
    app.send(
        Call::new("POST", "/api/cart/add")
            .session("guest-9")
            .json(json!({ "productId": product, "quantity": 2 })),
    )
    .await;

    let (status, body) = app
        .send(
            Call::new("POST", "/api/login")
                .session("guest-9")
                .json(json!({ "email": "aida@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (_, body) = app.send(Call::new("GET", "/api/cart").token(&token)).await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 3);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::new();
    app.register("aida@example.com", None).await;

    let (status, _) = app
        .send(
            Call::new("POST", "/api/login")
                .json(json!({ "email": "aida@example.com", "password": "wrong-one" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new();
    app.register("aida@example.com", None).await;

    let (status, _) = app
        .send(Call::new("POST", "/api/register").json(json!({
            "email": "AIDA@example.com",
            "password": "secret123",
            "name": "Aida",
        })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_profile_requires_token() {
    let app = TestApp::new();

    let (status, _) = app.send(Call::new("GET", "/api/user")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Call::new("GET", "/api/user").token("not.a.token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.register("aida@example.com", None).await;
    let (status, body) = app.send(Call::new("GET", "/api/user").token(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "aida@example.com");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = app
        .send(
            Call::new("PUT", "/api/user")
                .token(&token)
                .json(json!({ "address": "Astana" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["address"], "Astana");
    assert_eq!(body["user"]["name"], "Aida");
}

#[tokio::test]
async fn test_invalid_token_on_cart_is_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .send(Call::new("GET", "/api/cart").token("garbage").session("guest-1"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_place_order_flow() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 150, 5).await;
    let token = app.register("aida@example.com", None).await;

    let (status, _) = app
        .send(Call::new("POST", "/api/orders/create").token(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.send(
        Call::new("POST", "/api/cart/add")
            .token(&token)
            .json(json!({ "productId": product, "quantity": 2 })),
    )
    .await;

    let (status, body) = app
        .send(
            Call::new("POST", "/api/orders/create")
                .token(&token)
                .json(json!({ "comment": "Ring twice" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let order = &body["order"];
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["total"], 300);
    assert_eq!(order["status"], "processing");
    assert_eq!(order["customerName"], "Aida");
    assert_eq!(order["customerComment"], "Ring twice");
    assert_eq!(order["items"][0]["price"], 150);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (_, body) = app.send(Call::new("GET", "/api/cart").token(&token)).await;
    assert_eq!(body["cart"]["total"], 0);

    let (_, body) = app
        .send(Call::new("GET", &format!("/api/products/{product}")))
        .await;
    assert_eq!(body["product"]["stock"], 3);

    let (_, body) = app.send(Call::new("GET", "/api/orders/my").token(&token)).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(Call::new("GET", &format!("/api/orders/{order_id}")).token(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["id"], order_id.as_str());

    // Other users cannot see it.
    let other = app.register("other@example.com", None).await;
    let (status, _) = app
        .send(Call::new("GET", &format!("/api/orders/{order_id}")).token(&other))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_requires_login() {
    let app = TestApp::new();
    let (status, _) = app
        .send(Call::new("POST", "/api/orders/create").session("guest-1"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_are_guarded() {
    let app = TestApp::new();

    let (status, _) = app.send(Call::new("GET", "/api/admin/stats")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = app.register("aida@example.com", None).await;
    let (status, _) = app
        .send(Call::new("GET", "/api/admin/stats").token(&user))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let (status, body) = app
        .send(Call::new("GET", "/api/admin/stats").token(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalUsers"], 2);
}

#[tokio::test]
async fn test_admin_manages_orders_and_roles() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 5).await;
    let token = app.register("aida@example.com", None).await;

    app.send(
        Call::new("POST", "/api/cart/add")
            .token(&token)
            .json(json!({ "productId": product })),
    )
    .await;
    let (_, body) = app
        .send(Call::new("POST", "/api/orders/create").token(&token))
        .await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .send(Call::new("GET", "/api/admin/orders").token(&admin))
        .await;
    assert_eq!(body["orders"][0]["userEmail"], "aida@example.com");

    let (status, _) = app
        .send(
            Call::new("PUT", &format!("/api/admin/orders/{order_id}/status"))
                .token(&admin)
                .json(json!({ "status": "shipped" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(Call::new("GET", &format!("/api/orders/{order_id}")).token(&token))
        .await;
    assert_eq!(body["order"]["status"], "shipped");

    let (_, body) = app.send(Call::new("GET", "/api/user").token(&token)).await;
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(
            Call::new("PUT", &format!("/api/admin/users/{user_id}/role"))
                .token(&admin)
                .json(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The role is re-read on every admin request, so the old token works.
    let (status, _) = app
        .send(Call::new("GET", "/api/admin/users").token(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    // A product referenced by an order cannot be deleted.
    let (status, _) = app
        .send(Call::new("DELETE", &format!("/api/admin/products/{product}")).token(&admin))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_product_lifecycle() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 5).await;

    let (status, _) = app
        .send(Call::new("POST", "/api/admin/products").token(&admin).json(json!({
            "name": "Headphones",
            "price": 90,
            "category": "Electronics",
        })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(
            Call::new("PUT", &format!("/api/admin/products/{product}"))
                .token(&admin)
                .json(json!({ "price": 120 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["price"], 120);
    assert_eq!(body["product"]["stock"], 5);

    let (status, _) = app
        .send(
            Call::new("PUT", &format!("/api/admin/products/{product}"))
                .token(&admin)
                .json(json!({ "price": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Call::new("DELETE", &format!("/api/admin/products/{product}")).token(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Call::new("GET", &format!("/api/admin/products/{product}")).token(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_listing_and_similar() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let cheap = app.create_product(&admin, "Earbuds", 50, 5).await;
    app.create_product(&admin, "Speaker", 300, 5).await;
    app.create_product(&admin, "Headphones", 150, 5).await;

    let (status, body) = app
        .send(Call::new("GET", "/api/products?sort=price_desc"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["products"][0]["name"], "Speaker");
    assert_eq!(body["categories"], json!(["Electronics"]));

    let (_, body) = app
        .send(Call::new("GET", "/api/products?search=head&category=all"))
        .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["products"][0]["name"], "Headphones");

    let (_, body) = app
        .send(Call::new("GET", "/api/products?category=Books"))
        .await;
    assert_eq!(body["total"], 0);

    let (status, body) = app
        .send(Call::new("GET", &format!("/api/products/{cheap}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["name"], "Earbuds");
    let similar = body["similarProducts"].as_array().unwrap();
    assert_eq!(similar.len(), 2);
    assert!(similar.iter().all(|p| p["id"] != cheap.as_str()));
}

#[tokio::test]
async fn test_malformed_order_body_is_rejected() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 5).await;
    let token = app.register("aida@example.com", None).await;
    app.send(
        Call::new("POST", "/api/cart/add")
            .token(&token)
            .json(json!({ "productId": product })),
    )
    .await;

    let (status, body) = app
        .send(
            Call::new("POST", "/api/orders/create")
                .token(&token)
                .json(json!({ "address": 42, "comment": "leave at door" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // Nothing was ordered, so the cart and stock are untouched.
    let (_, body) = app.send(Call::new("GET", "/api/cart").token(&token)).await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 1);
    let (_, body) = app.send(Call::new("GET", "/api/orders/my").token(&token)).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_login_ignores_stale_bearer_token() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 5).await;
    app.register("aida@example.com", None).await;
    app.send(
        Call::new("POST", "/api/cart/add")
            .session("guest-3")
            .json(json!({ "productId": product, "quantity": 2 })),
    )
    .await;

    let (status, body) = app
        .send(
            Call::new("POST", "/api/login")
                .token("expired.or.garbage")
                .session("guest-3")
                .json(json!({ "email": "aida@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let token = body["token"].as_str().unwrap().to_string();
    let (_, body) = app.send(Call::new("GET", "/api/cart").token(&token)).await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn test_cart_quantity_is_bounded() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let product = app.create_product(&admin, "Headphones", 100, 5).await;
    app.send(
        Call::new("POST", "/api/cart/add")
            .session("guest-1")
            .json(json!({ "productId": product })),
    )
    .await;

    let (status, _) = app
        .send(
            Call::new("PUT", &format!("/api/cart/update/{product}"))
                .session("guest-1")
                .json(json!({ "quantity": i32::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.send(Call::new("GET", "/api/cart").session("guest-1")).await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 1);
}
