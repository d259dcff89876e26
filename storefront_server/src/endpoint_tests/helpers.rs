use chrono::Utc;
use spg_common::Money;
use storefront_engine::{
    db_types::{NewUser, Product, Role},
    events::EventProducers,
    AuthManagement,
    CatalogApi,
    FileStoreDatabase,
    StoreBackend,
};
use tempfile::TempDir;

use crate::{
    auth::TokenIssuer,
    config::{PayFastConfig, ServerConfig},
    server::AppContext,
};

/// Spins up an application context over a fresh file-store. The PayFast block is configured with sandbox
/// credentials so the signed-redirect and ITN paths are exercised end to end; Stripe is left unconfigured.
pub fn test_ctx(dir: &TempDir) -> AppContext {
    let payfast = PayFastConfig {
        merchant_id: "10000100".to_string(),
        merchant_key: "46f0cd694581a".to_string(),
        passphrase: None,
        process_url: "https://sandbox.payfast.co.za/eng/process".to_string(),
        return_url: "http://localhost:8740/payment/payfast/return".to_string(),
        cancel_url: "http://localhost:8740/payment/payfast/cancel".to_string(),
        notify_url: "http://localhost:8740/webhook/payfast/itn".to_string(),
    };
    let config = ServerConfig { payfast, ..ServerConfig::default() };
    let backend = StoreBackend::Files(FileStoreDatabase::new(dir.path().join("store")));
    AppContext::new(backend, EventProducers::default(), config)
}

pub fn product(id: &str, name: &str, category: &str, price_major: i64, featured: bool) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{name}, as worn in Lahore"),
        price: Money::from_major(price_major),
        category: category.to_string(),
        sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
        colors: vec!["black".to_string(), "white".to_string()],
        image: None,
        featured,
        created_at: Utc::now(),
    }
}

pub async fn seed_products(ctx: &AppContext) {
    let catalog = CatalogApi::new(ctx.backend.clone());
    catalog.upsert_product(product("p-1", "Lawn Suit", "clothing", 4800, true)).await.unwrap();
    catalog.upsert_product(product("p-2", "Khussa", "shoes", 150, false)).await.unwrap();
    catalog.upsert_product(product("p-3", "Silk Dupatta", "clothing", 2600, false)).await.unwrap();
}

/// Creates a user directly in the backend and returns a bearer token for them.
pub async fn token_for(ctx: &AppContext, email: &str, role: Role) -> String {
    let password_hash = storefront_engine::sfe_api::auth_api::hash_password("test-password-1").unwrap();
    let user = ctx
        .backend
        .create_user(NewUser { name: "Test Account".to_string(), email: email.to_string(), password_hash, role })
        .await
        .unwrap();
    TokenIssuer::new(&ctx.config.auth).issue_token(&user).unwrap()
}

pub fn checkout_body(payment_method: &str) -> serde_json::Value {
    serde_json::json!({
        "customer": {
            "name": "Ayesha Khan",
            "email": "ayesha@example.com",
            "phone": "+92-300-1234567",
            "address": "14-B Gulberg III, Lahore"
        },
        "items": [ { "product_id": "p-1", "quantity": 1 } ],
        "payment_method": payment_method
    })
}
