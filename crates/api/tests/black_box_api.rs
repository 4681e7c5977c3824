use bazaar_api::app::services::AppServices;
use bazaar_auth::JwtClaims;
use bazaar_core::UserId;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = bazaar_api::app::build_app(JWT_SECRET.to_string(), AppServices::in_memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct User {
    token: String,
}

fn mint_jwt(username: &str, name: &str) -> User {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        username: username.to_string(),
        name: name.to_string(),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt");

    User { token }
}

fn product_body(name: &str, stock: i64, tags: &[&str]) -> Value {
    json!({
        "name": name,
        "price": 150000,
        "imageUrl": "https://img.example.com/product.png",
        "stock": stock,
        "condition": "second",
        "tags": tags,
        "isPurchasable": true
    })
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, user: &User, body: Value) -> String {
    let res = client
        .post(srv.url("/product"))
        .bearer_auth(&user.token)
        .json(&body)
        .send()
        .await
        .unwrap();
    if res.status() != StatusCode::OK {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 200 OK from create, got {status} body={body}");
    }
    let created: Value = res.json().await.unwrap();
    created["data"]["productId"].as_str().unwrap().to_string()
}

async fn create_bank_account(client: &reqwest::Client, srv: &TestServer, user: &User) -> String {
    let res = client
        .post(srv.url("/bank/account"))
        .bearer_auth(&user.token)
        .json(&json!({
            "bankName": "Bank Jago",
            "bankAccountName": "Seller Alpha",
            "bankAccountNumber": "1234567890"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["data"]["bankAccountId"].as_str().unwrap().to_string()
}

async fn buy(
    client: &reqwest::Client,
    srv: &TestServer,
    user: &User,
    product_id: &str,
    account_id: &str,
    quantity: i64,
) -> (StatusCode, Value) {
    let res = client
        .post(srv.url(&format!("/product/{product_id}/buy")))
        .bearer_auth(&user.token)
        .json(&json!({
            "bankAccountId": account_id,
            "paymentProofImageUrl": "https://img.example.com/proof.png",
            "quantity": quantity
        }))
        .send()
        .await
        .unwrap();
    (res.status(), res.json().await.unwrap())
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/product"))
        .json(&product_body("Vintage lamp", 1, &[]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "unauthenticated");

    let res = client.get(srv.url("/bank/account")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Listing is public, but a bad token is still rejected.
    let res = client.get(srv.url("/product")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .get(srv.url("/product"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn seller_and_buyer_scenario() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt("alpha", "Seller Alpha");
    let buyer = mint_jwt("bravo", "Buyer Bravo");

    let account_id = create_bank_account(&client, &srv, &seller).await;
    let product_id = create_product(&client, &srv, &seller, product_body("Film camera", 5, &["camera", "vintage"])).await;

    // The buyer's own account does not belong to the seller.
    let buyer_account = create_bank_account(&client, &srv, &buyer).await;
    let (status, body) = buy(&client, &srv, &buyer, &product_id, &buyer_account, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "incompatible_bank_account");

    let (status, body) = buy(&client, &srv, &seller, &product_id, &account_id, 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "self_purchase_forbidden");

    let (status, body) = buy(&client, &srv, &buyer, &product_id, &account_id, 6).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "insufficient_stock");

    let (status, body) = buy(&client, &srv, &buyer, &product_id, &account_id, 2).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["quantity"], 2);
    assert_eq!(body["data"]["productId"], product_id.as_str());
    assert_eq!(body["data"]["bankAccountId"], account_id.as_str());
    assert_eq!(body["data"]["paymentProofImageUrl"], "https://img.example.com/proof.png");
    assert!(body["data"]["orderId"].is_string());

    let res = client.get(srv.url(&format!("/product/{product_id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let detail: Value = res.json().await.unwrap();
    assert_eq!(detail["data"]["product"]["stock"], 3);
    assert_eq!(detail["data"]["product"]["purchaseCount"], 2);
    assert_eq!(detail["data"]["product"]["tags"], json!(["camera", "vintage"]));
    assert_eq!(detail["data"]["seller"]["name"], "Seller Alpha");
    assert_eq!(detail["data"]["seller"]["productSoldTotal"], 2);
    assert_eq!(detail["data"]["seller"]["bankAccounts"][0]["bankAccountId"], account_id.as_str());
}

#[tokio::test]
async fn owner_only_mutations_leave_state_unchanged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt("alpha", "Seller Alpha");
    let other = mint_jwt("charlie", "Charlie");

    let product_id = create_product(&client, &srv, &seller, product_body("Desk fan", 4, &["home"])).await;

    let res = client
        .patch(srv.url(&format!("/product/{product_id}")))
        .bearer_auth(&other.token)
        .json(&json!({ "name": "Stolen listing", "tags": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url(&format!("/product/{product_id}/stock")))
        .bearer_auth(&other.token)
        .json(&json!({ "stock": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&format!("/product/{product_id}")))
        .bearer_auth(&other.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let detail: Value = client
        .get(srv.url(&format!("/product/{product_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["product"]["name"], "Desk fan");
    assert_eq!(detail["data"]["product"]["stock"], 4);
    assert_eq!(detail["data"]["product"]["tags"], json!(["home"]));
}

#[tokio::test]
async fn patch_reconciles_tags_and_keeps_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt("alpha", "Seller Alpha");
    let product_id = create_product(&client, &srv, &seller, product_body("Old guitar", 2, &["music", "wood"])).await;

    let res = client
        .patch(srv.url(&format!("/product/{product_id}")))
        .bearer_auth(&seller.token)
        .json(&json!({ "price": 99000, "tags": ["music", "strings"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["price"], 99000);
    assert_eq!(body["data"]["stock"], 2);

    let mut tags: Vec<String> = serde_json::from_value(body["data"]["tags"].clone()).unwrap();
    tags.sort();
    assert_eq!(tags, vec!["music", "strings"]);

    let res = client
        .post(srv.url(&format!("/product/{product_id}/stock")))
        .bearer_auth(&seller.token)
        .json(&json!({ "stock": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(srv.url(&format!("/product/{product_id}")))
        .bearer_auth(&seller.token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url(&format!("/product/{product_id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn listing_filters_and_envelope_meta() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alpha = mint_jwt("alpha", "Seller Alpha");
    let bravo = mint_jwt("bravo", "Seller Bravo");

    create_product(&client, &srv, &alpha, product_body("Red bicycle", 3, &["bike", "red"])).await;
    create_product(&client, &srv, &alpha, product_body("Sold out bike", 0, &["bike"])).await;
    create_product(&client, &srv, &bravo, product_body("Blue scooter", 1, &["scooter"])).await;

    let body: Value = client
        .get(srv.url("/product"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "ok");
    assert_eq!(body["meta"], json!({ "limit": 10, "offset": 0, "total": 2 }));

    let body: Value = client
        .get(srv.url("/product?tags=bike&showEmptyStock=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["total"], 2);

    let res = client.get(srv.url("/product?userOnly=true")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = client
        .get(srv.url("/product?userOnly=true"))
        .bearer_auth(&bravo.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Blue scooter");

    let res = client.get(srv.url("/product?condition=mint")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "query_construction_error");
}

#[tokio::test]
async fn invalid_bodies_are_rejected_with_field_detail() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let seller = mint_jwt("alpha", "Seller Alpha");

    let res = client
        .post(srv.url("/product"))
        .bearer_auth(&seller.token)
        .json(&product_body("abc", 1, &[]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "validation_error");
    assert!(body["message"].as_str().unwrap().starts_with("name:"));

    let res = client
        .post(srv.url("/bank/account"))
        .bearer_auth(&seller.token)
        .json(&json!({ "bankName": "BCA" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/product/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
