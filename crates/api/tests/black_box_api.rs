use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use storefront_api::app::{AppServices, build_app};
use storefront_auth::{Permission, Role, StorefrontClaims};
use storefront_cart::{DiscountPolicy, ListingStatus, SupplierListing};
use storefront_core::{BasisPoints, ListingId, ProductId, SupplierId, UserId};
use storefront_infra::StorefrontConfig;

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: AppServices,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let services = AppServices::in_memory(StorefrontConfig::default());
        let app = build_app(SECRET, services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn list(&self, listing: u64, product: u64, available: u32, price: u64) {
        self.services
            .stock
            .upsert(SupplierListing {
                listing_id: ListingId::new(listing),
                supplier_id: SupplierId::new(listing),
                product_id: ProductId::new(product),
                available_quantity: available,
                unit_price: price,
                min_order_qty: 1,
                status: ListingStatus::Active,
            })
            .unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(role: &str, permissions: Vec<Permission>) -> String {
    let now = Utc::now();
    let claims = StorefrontClaims {
        sub: UserId::new(),
        role: Role::new(role.to_string()),
        permissions,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn body(res: reqwest::Response) -> Value {
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn cart_requires_authentication() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/cart")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let json = body(res).await;
    assert_eq!(json["succeeded"], false);

    let res = client
        .get(srv.url("/cart"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_without_permission_are_forbidden() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt("Supplier", vec![]);

    let res = reqwest::Client::new()
        .post(srv.url("/cart/checkout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let json = body(res).await;
    assert!(json["message"].as_str().unwrap().contains("checkout.create"));
}

#[tokio::test]
async fn permission_claims_extend_the_role() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt("Supplier", vec![Permission::new("cart.manage")]);

    let res = reqwest::Client::new()
        .get(srv.url("/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body(res).await;
    assert!(json["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn checkout_at_live_prices() {
    let srv = TestServer::spawn().await;
    srv.services
        .stock
        .register_product(ProductId::new(1), "Red Rose")
        .unwrap();
    srv.list(1, 1, 10, 100_000);

    let token = mint_jwt("User", vec![]);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/cart/items"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": 1, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let cart = body(res).await;
    assert_eq!(cart["data"]["total"], 200_000);

    // The supplier drops its price after the rose was added.
    srv.list(1, 1, 10, 90_000);

    let res = client
        .post(srv.url("/cart/price"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let priced = body(res).await;
    assert_eq!(priced["data"]["items"][0]["calculated_unit_price"], 90_000);
    assert_eq!(priced["data"]["items"][0]["price_difference"], -10_000);

    let res = client
        .post(srv.url("/cart/checkout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order = body(res).await;
    assert_eq!(order["succeeded"], true);
    assert_eq!(order["data"]["subtotal"], 180_000);
    assert_eq!(order["data"]["shipping_fee"], 20_000);
    assert_eq!(order["data"]["total_amount"], 200_000);
    assert_eq!(order["data"]["lines"][0]["unit_price"], 90_000);

    let stock = srv.services.stock.listing(ListingId::new(1)).unwrap();
    assert_eq!(stock.available_quantity, 8);

    // The checked-out cart is gone; the next view is a fresh, empty cart.
    let res = client
        .get(srv.url("/cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let cart = body(res).await;
    assert!(cart["data"]["cart_id"].is_null());

    let order_id = order["data"]["order_id"].as_u64().unwrap();
    let res = client
        .get(srv.url(&format!("/orders/{order_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_carts_report_every_issue() {
    let srv = TestServer::spawn().await;
    srv.services
        .stock
        .register_product(ProductId::new(1), "Red Rose")
        .unwrap();
    srv.list(1, 1, 5, 90_000);

    let token = mint_jwt("User", vec![]);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/cart/checkout"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await["errors"][0], "cart is empty");

    client
        .post(srv.url("/cart/items"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": 1, "quantity": 5 }))
        .send()
        .await
        .unwrap();
    srv.list(1, 1, 3, 90_000);

    let res = client
        .post(srv.url("/cart/validate"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let validation = body(res).await;
    assert_eq!(validation["data"]["is_valid"], false);
    assert_eq!(validation["data"]["max_quantity_allowed"], 3);

    let res = client
        .post(srv.url("/cart/checkout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body(res).await;
    assert_eq!(
        json["errors"][0],
        "Only 3 of 'Red Rose' available (requested 5)"
    );
}

#[tokio::test]
async fn malformed_bodies_get_an_enveloped_400() {
    let srv = TestServer::spawn().await;
    srv.services
        .stock
        .register_product(ProductId::new(1), "Red Rose")
        .unwrap();
    srv.list(1, 1, 10, 90_000);

    let token = mint_jwt("User", vec![]);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/cart/items"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": 1, "quantity": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body(res).await;
    assert_eq!(json["succeeded"], false);
    assert_eq!(json["message"], "invalid request body");
    assert!(json["errors"][0].as_str().unwrap().contains("quantity"));

    let res = client
        .post(srv.url("/cart/items"))
        .bearer_auth(&token)
        .body("product_id=1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await["succeeded"], false);
}

#[tokio::test]
async fn checkout_rejects_a_mistyped_promo_code_without_placing_an_order() {
    let srv = TestServer::spawn().await;
    srv.services
        .stock
        .register_product(ProductId::new(1), "Red Rose")
        .unwrap();
    srv.list(1, 1, 10, 90_000);
    srv.services
        .promotions
        .insert(
            "SPRING10",
            DiscountPolicy::Percentage(BasisPoints::from_percent(10)),
        )
        .unwrap();

    let token = mint_jwt("User", vec![]);
    let client = reqwest::Client::new();
    client
        .post(srv.url("/cart/items"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": 1, "quantity": 2 }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(srv.url("/cart/checkout"))
        .bearer_auth(&token)
        .json(&json!({ "promo_code": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await["message"], "invalid request body");

    let stock = srv.services.stock.listing(ListingId::new(1)).unwrap();
    assert_eq!(stock.available_quantity, 10);
    let res = client
        .get(srv.url("/orders"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(body(res).await["data"].as_array().unwrap().len(), 0);

    let res = client
        .post(srv.url("/cart/checkout"))
        .bearer_auth(&token)
        .json(&json!({ "promo_code": "spring10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order = body(res).await;
    assert_eq!(order["data"]["discount_amount"], 18_000);
}

#[tokio::test]
async fn cart_items_can_be_updated_and_removed() {
    let srv = TestServer::spawn().await;
    srv.services
        .stock
        .register_product(ProductId::new(1), "Red Rose")
        .unwrap();
    srv.list(1, 1, 10, 90_000);

    let token = mint_jwt("User", vec![]);
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/cart/items"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": 1, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    let item_id = body(res).await["data"]["items"][0]["id"].as_u64().unwrap();

    let res = client
        .patch(srv.url(&format!("/cart/items/{item_id}")))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await["data"]["items"][0]["quantity"], 4);

    let res = client
        .delete(srv.url(&format!("/cart/items/{item_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body(res).await["data"]["items"].as_array().unwrap().is_empty());

    let res = client
        .delete(srv.url(&format!("/cart/items/{item_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url("/cart/items/not-a-number"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn whoami_lists_effective_permissions() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt("User", vec![]);
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json = body(res).await;
    let perms = json["data"]["permissions"].as_array().unwrap();
    assert!(perms.iter().any(|p| p == "checkout.create"));

    let res = client
        .get(srv.url("/whoami/can/orders.delete"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let json = body(res).await;
    assert_eq!(json["data"]["granted"], false);
    assert!(!json["data"]["denial"]["suggestions"]
        .as_array()
        .unwrap()
        .is_empty());
}
