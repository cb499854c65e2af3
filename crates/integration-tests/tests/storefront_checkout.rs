//! Cart and checkout flows.
//!
//! Requires a running storefront (cargo run -p ebano-storefront) and its
//! migrated database; products are inserted directly.

use ebano_integration_tests::{Browser, TEST_PASSWORD, insert_product, pool, unique_email};
use uuid::Uuid;

async fn logged_in_customer() -> Browser {
    let browser = Browser::new().expect("client");
    let email = unique_email("shopper");
    browser.register(&email, "Shopper").await.expect("register");
    browser.login(&email, TEST_PASSWORD).await.expect("login");
    browser
}

fn product_name() -> String {
    format!("Test coffee {}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_guest_cannot_add_to_cart() {
    let pool = pool().await.expect("database");
    let id = insert_product(&pool, &product_name(), 5).await.expect("product");

    let browser = Browser::new().expect("client");
    let resp = browser
        .post(&format!("/cart/add/{id}"), &[("quantity", "1")])
        .await
        .expect("add");
    assert!(resp.url().path().ends_with("/login"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_decrements_stock() {
    let pool = pool().await.expect("database");
    let name = product_name();
    let id = insert_product(&pool, &name, 3).await.expect("product");
    let browser = logged_in_customer().await;

    let body = browser
        .post(&format!("/cart/add/{id}"), &[("quantity", "2")])
        .await
        .expect("add")
        .text()
        .await
        .expect("body");
    assert!(body.contains(&format!("2 x {name} added to the cart.")));

    let resp = browser.post("/checkout", &[]).await.expect("checkout");
    assert!(resp.url().path().ends_with("/checkout/success"));
    let body = resp.text().await.expect("body");
    assert!(body.contains("placed."));

    let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .expect("stock");
    assert_eq!(stock, Some(1));

    // The cart is emptied by a successful order.
    let body = browser.get("/cart").await.expect("cart").text().await.expect("body");
    assert!(!body.contains(&name));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_add_clamps_to_stock() {
    let pool = pool().await.expect("database");
    let name = product_name();
    let id = insert_product(&pool, &name, 2).await.expect("product");
    let browser = logged_in_customer().await;

    let body = browser
        .post(&format!("/cart/add/{id}"), &[("quantity", "10")])
        .await
        .expect("add")
        .text()
        .await
        .expect("body");
    assert!(body.contains(&format!("2 x {name} added to the cart.")));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_with_insufficient_stock_fails() {
    let pool = pool().await.expect("database");
    let name = product_name();
    let id = insert_product(&pool, &name, 1).await.expect("product");
    let browser = logged_in_customer().await;

    browser
        .post(&format!("/cart/add/{id}"), &[("quantity", "1")])
        .await
        .expect("add");

    // Someone else buys the last unit between add and checkout.
    sqlx::query("UPDATE products SET stock = 0 WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .expect("update stock");

    let resp = browser.post("/checkout", &[]).await.expect("checkout");
    assert!(resp.url().path().ends_with("/cart"));
    let body = resp.text().await.expect("body");
    assert!(body.contains(&format!("Not enough stock of {name}. Available: 0.")));

    let orders: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM order_lines WHERE product_id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(orders, 0);
}
