//! Registration and login flows.
//!
//! Requires a running storefront (cargo run -p ebano-storefront) and its
//! migrated database.

use ebano_integration_tests::{Browser, TEST_PASSWORD, unique_email};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_then_login() {
    let browser = Browser::new().expect("client");
    let email = unique_email("customer");

    let body = browser.register(&email, "Ana Gómez").await.expect("register");
    assert!(body.contains("Account created, you can log in."));

    let body = browser.login(&email, TEST_PASSWORD).await.expect("login");
    assert!(body.contains("Login successful."));
    assert!(body.contains("My account"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_duplicate_registration_rejected() {
    let browser = Browser::new().expect("client");
    let email = unique_email("duplicate");

    browser.register(&email, "First").await.expect("register");
    let body = browser.register(&email, "Second").await.expect("register again");
    assert!(body.contains("An account with this email already exists."));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_wrong_password_rejected() {
    let browser = Browser::new().expect("client");
    let email = unique_email("wrongpass");

    browser.register(&email, "Luis").await.expect("register");
    let body = browser.login(&email, "not-the-password").await.expect("login");
    assert!(body.contains("Incorrect email or password."));
    assert!(!body.contains("My account"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_unknown_email_gets_same_message() {
    let browser = Browser::new().expect("client");
    let body = browser
        .login(&unique_email("nobody"), TEST_PASSWORD)
        .await
        .expect("login");
    assert!(body.contains("Incorrect email or password."));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_logout_ends_session() {
    let browser = Browser::new().expect("client");
    let email = unique_email("logout");

    browser.register(&email, "Sofía").await.expect("register");
    browser.login(&email, TEST_PASSWORD).await.expect("login");

    let body = browser
        .post("/logout", &[])
        .await
        .expect("logout")
        .text()
        .await
        .expect("body");
    assert!(body.contains("You have been logged out."));

    // Customer pages now bounce to the login form.
    let resp = browser.get("/dashboard").await.expect("dashboard");
    assert!(resp.url().path().ends_with("/login"));
}
