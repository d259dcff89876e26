use actix_web::{test, App};
use spg_common::Money;
use storefront_engine::db_types::{Order, OrderStatusType, Role};
use tempfile::TempDir;

use crate::{
    endpoint_tests::helpers::{checkout_body, seed_products, test_ctx, token_for},
    server::configure_app,
};

#[actix_web::test]
async fn guest_cod_checkout_creates_an_order_with_server_side_totals() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/checkout").set_json(&checkout_body("cod")).to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let order: Order = test::read_body_json(resp).await;
    assert!(order.owner_id.is_none());
    // p-1 costs 4800: below the free-shipping threshold, so 200 shipping applies.
    assert_eq!(order.subtotal, Money::from_major(4800));
    assert_eq!(order.shipping, Money::from_major(200));
    assert_eq!(order.total, Money::from_major(5000));
    assert_eq!(order.status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn checkout_with_an_empty_cart_is_rejected() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    let mut body = checkout_body("cod");
    body["items"] = serde_json::json!([]);
    let resp =
        test::call_service(&app, test::TestRequest::post().uri("/api/checkout").set_json(&body).to_request()).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn checkout_ignores_client_supplied_prices() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    // A hostile client claims the product costs one rupee. The stored price wins.
    let mut body = checkout_body("cod");
    body["items"] = serde_json::json!([{ "product_id": "p-1", "quantity": 1, "price": 100 }]);
    let resp =
        test::call_service(&app, test::TestRequest::post().uri("/api/checkout").set_json(&body).to_request()).await;
    assert_eq!(resp.status().as_u16(), 201);
    let order: Order = test::read_body_json(resp).await;
    assert_eq!(order.subtotal, Money::from_major(4800));
}

#[actix_web::test]
async fn owners_see_their_orders_and_strangers_do_not() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let owner_token = token_for(&ctx, "owner@example.com", Role::User).await;
    let stranger_token = token_for(&ctx, "stranger@example.com", Role::User).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/checkout")
            .insert_header(("Authorization", format!("Bearer {owner_token}")))
            .set_json(&checkout_body("cod"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let order: Order = test::read_body_json(resp).await;

    let mine: Vec<Order> = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/orders/mine")
            .insert_header(("Authorization", format!("Bearer {owner_token}")))
            .to_request(),
    )
    .await;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, order.id);

    // A stranger asking for the same order gets a 404, not a 403 that confirms it exists.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/orders/{}", order.id))
            .insert_header(("Authorization", format!("Bearer {stranger_token}")))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn admins_walk_orders_through_the_fulfilment_table() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let admin_token = token_for(&ctx, "admin@example.com", Role::Admin).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/checkout").set_json(&checkout_body("cod")).to_request(),
    )
    .await;
    let order: Order = test::read_body_json(resp).await;

    // Pending -> Delivered skips a step.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{}/status", order.id))
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .set_json(&serde_json::json!({ "status": "Delivered" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    let updated: Order = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/orders/{}/status", order.id))
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .set_json(&serde_json::json!({ "status": "Shipped" }))
            .to_request(),
    )
    .await;
    assert_eq!(updated.status, OrderStatusType::Shipped);
}

#[actix_web::test]
async fn cart_round_trip_recomputes_totals() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    let body = serde_json::json!({ "items": [
        { "product_id": "p-1", "quantity": 1, "size": "M" },
        { "product_id": "p-2", "quantity": 2 }
    ]});
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri("/api/cart")
            .insert_header(("X-Session-Id", "sess-abc-123"))
            .set_json(&body)
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let cart: storefront_engine::db_types::Cart = test::read_body_json(resp).await;
    // 4800 + 2 * 150 = 5100 > 5000, so shipping is free.
    assert_eq!(cart.subtotal, Money::from_major(5100));
    assert_eq!(cart.shipping, Money::default());
    assert_eq!(cart.total, Money::from_major(5100));

    let fetched: storefront_engine::db_types::Cart = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/api/cart")
            .insert_header(("X-Session-Id", "sess-abc-123"))
            .to_request(),
    )
    .await;
    assert_eq!(fetched.items.len(), 2);
    assert_eq!(fetched.total, Money::from_major(5100));
}

#[actix_web::test]
async fn catalog_search_filters_and_sorts() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    let clothing: Vec<storefront_engine::db_types::Product> = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/products?category=clothing&sort=price-asc").to_request(),
    )
    .await;
    assert_eq!(clothing.len(), 2);
    assert!(clothing[0].price <= clothing[1].price);

    let hits: Vec<storefront_engine::db_types::Product> = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/products?q=khussa").to_request(),
    )
    .await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "p-2");

    let featured: Vec<storefront_engine::db_types::Product> = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/api/products/featured").to_request(),
    )
    .await;
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0].id, "p-1");
}
