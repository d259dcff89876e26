use std::collections::HashMap;

use actix_web::{test, App};
use storefront_engine::{
    db_types::PaymentStatus,
    OrderManagement,
    PaymentManagement,
};
use tempfile::TempDir;

use crate::{
    data_objects::{JsonResponse, PayFastCheckoutResponse},
    endpoint_tests::helpers::{checkout_body, seed_products, test_ctx},
    integrations::payfast::PayFastApi,
    server::{configure_app, AppContext},
};

/// Initiates a PayFast checkout through the API and fabricates the gateway's ITN for it, signed with the same
/// canonicalization the server verifies.
async fn initiate_and_build_itn(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    ctx: &AppContext,
    status: &str,
    txid: &str,
) -> (String, HashMap<String, String>) {
    let resp = test::call_service(
        app,
        test::TestRequest::post().uri("/api/checkout/payfast").set_json(&checkout_body("payfast")).to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let checkout: PayFastCheckoutResponse = test::read_body_json(resp).await;
    let custom_str1 =
        checkout.fields.iter().find(|(k, _)| k == "custom_str1").map(|(_, v)| v.clone()).expect("embedded payload");

    let gateway = PayFastApi::new(ctx.config.payfast.clone());
    let mut fields = vec![
        ("m_payment_id".to_string(), checkout.merchant_payment_id.clone()),
        ("pf_payment_id".to_string(), txid.to_string()),
        ("payment_status".to_string(), status.to_string()),
        ("amount_gross".to_string(), "5000.00".to_string()),
        ("custom_str1".to_string(), custom_str1),
    ];
    let signature = gateway.signature_for(&fields);
    fields.push(("signature".to_string(), signature));
    (checkout.merchant_payment_id, fields.into_iter().collect())
}

#[actix_web::test]
async fn itn_promotes_the_initiated_payment_into_an_order() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx.clone()))).await;

    let (mpid, itn) = initiate_and_build_itn(&app, &ctx, "COMPLETE", "1089250").await;

    // The initiation recorded a pending payment, and no order exists yet.
    let payment = ctx.backend.fetch_payment_by_merchant_id(&mpid).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Initiated);
    assert!(ctx.backend.fetch_all_orders().await.unwrap().is_empty());

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/webhook/payfast/itn").set_form(&itn).to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let ack: JsonResponse = test::read_body_json(resp).await;
    assert!(ack.success);

    let orders = ctx.backend.fetch_all_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].external_txid.as_deref(), Some("1089250"));
    let payment = ctx.backend.fetch_payment_by_merchant_id(&mpid).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.order_id.as_ref(), Some(&orders[0].id));
}

#[actix_web::test]
async fn repeated_itn_deliveries_leave_exactly_one_order() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx.clone()))).await;

    let (_, itn) = initiate_and_build_itn(&app, &ctx, "COMPLETE", "1089251").await;
    for _ in 0..3 {
        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/webhook/payfast/itn").set_form(&itn).to_request(),
        )
        .await;
        // Every delivery is acknowledged, first or not.
        assert!(resp.status().is_success());
        let ack: JsonResponse = test::read_body_json(resp).await;
        assert!(ack.success);
    }
    assert_eq!(ctx.backend.fetch_all_orders().await.unwrap().len(), 1);
}

#[actix_web::test]
async fn failed_itn_is_acknowledged_without_creating_an_order() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx.clone()))).await;

    let (mpid, itn) = initiate_and_build_itn(&app, &ctx, "FAILED", "1089252").await;
    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/webhook/payfast/itn").set_form(&itn).to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    assert!(ctx.backend.fetch_all_orders().await.unwrap().is_empty());
    let payment = ctx.backend.fetch_payment_by_merchant_id(&mpid).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
}

#[actix_web::test]
async fn tampered_itn_is_acknowledged_but_never_processed() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx.clone()))).await;

    let (_, mut itn) = initiate_and_build_itn(&app, &ctx, "COMPLETE", "1089253").await;
    itn.insert("amount_gross".to_string(), "1.00".to_string());
    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/webhook/payfast/itn").set_form(&itn).to_request(),
    )
    .await;
    // Still a 200 (the gateway must not retry), but flagged as a failure and nothing was created.
    assert!(resp.status().is_success());
    let ack: JsonResponse = test::read_body_json(resp).await;
    assert!(!ack.success);
    assert!(ctx.backend.fetch_all_orders().await.unwrap().is_empty());
}

#[actix_web::test]
async fn stripe_checkout_without_credentials_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let ctx = test_ctx(&dir);
    seed_products(&ctx).await;
    let app = test::init_service(App::new().configure(configure_app(ctx))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/checkout/stripe").set_json(&checkout_body("stripe")).to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 500);
}
