use std::time::Duration;

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use storefront_engine::{
    db_types::Role,
    events::EventProducers,
    AuthApi,
    CartApi,
    CatalogApi,
    FileStoreDatabase,
    OrdersApi,
    ReconciliationApi,
    SqliteDatabase,
    StoreBackend,
    StorefrontDatabase,
};

use crate::{
    auth::{TokenIssuer, TokenVerifier},
    config::ServerConfig,
    errors::ServerError,
    gateway_routes::{payfast_itn, stripe_return},
    integrations::{
        mailer::{create_mailer_event_handlers, Mailer},
        payfast::PayFastApi,
        stripe::StripeApi,
    },
    middleware::AclMiddlewareFactory,
    routes::{
        add_review,
        all_orders,
        all_payments,
        categories,
        checkout,
        checkout_payfast,
        checkout_stripe,
        delete_order,
        delete_product,
        featured_products,
        get_cart,
        health,
        login,
        my_orders,
        order_by_id,
        product_detail,
        product_reviews,
        products,
        put_cart,
        register,
        related_products,
        update_order_status,
        upsert_product,
    },
};

/// Everything a worker needs to assemble the app: the storage backend chosen at startup, the event producers for
/// the reconciliation hooks, and the full configuration.
#[derive(Clone)]
pub struct AppContext {
    pub backend: StoreBackend,
    pub producers: EventProducers,
    pub config: ServerConfig,
}

impl AppContext {
    pub fn new(backend: StoreBackend, producers: EventProducers, config: ServerConfig) -> Self {
        Self { backend, producers, config }
    }
}

/// Selects the storage backend: the database when a URL is configured, the flat-file store otherwise. This choice
/// is made exactly once per process; everything downstream works against [`StoreBackend`].
pub async fn select_backend(config: &ServerConfig) -> Result<StoreBackend, ServerError> {
    match &config.database_url {
        Some(url) => {
            let db = SqliteDatabase::new_with_url(url, 25)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            Ok(StoreBackend::Db(db))
        },
        None => {
            warn!("🗃️ No database configured. Using the flat-file store at '{}'.", config.data_dir);
            Ok(StoreBackend::Files(FileStoreDatabase::new(config.data_dir.as_str())))
        },
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let backend = select_backend(&config).await?;
    info!("🗃️ Storage backend: {}", backend.url());
    let handlers = create_mailer_event_handlers(Mailer::new("orders@storefront.local"));
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let ctx = AppContext::new(backend, producers, config);
    let srv = create_server_instance(ctx)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(ctx: AppContext) -> Result<actix_web::dev::Server, ServerError> {
    let host = ctx.config.host.clone();
    let port = ctx.config.port;
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .configure(configure_app(ctx.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Assembles the full route tree. Shared with the endpoint tests, which run it against a file-store backend in a
/// scratch directory.
pub fn configure_app(ctx: AppContext) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let recon = ReconciliationApi::new(ctx.backend.clone(), ctx.producers.clone(), ctx.config.shipping);
        let orders_api = OrdersApi::new(ctx.backend.clone());
        let catalog_api = CatalogApi::new(ctx.backend.clone());
        let cart_api = CartApi::new(ctx.backend.clone(), ctx.config.shipping);
        let auth_api = AuthApi::new(ctx.backend.clone());
        let jwt_signer = TokenIssuer::new(&ctx.config.auth);
        let jwt_verifier = TokenVerifier::new(&ctx.config.auth);
        let payfast = PayFastApi::new(ctx.config.payfast.clone());
        let stripe = StripeApi::new(ctx.config.stripe.clone()).expect("Failed to build the Stripe HTTP client");

        cfg.app_data(web::Data::new(recon))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(jwt_verifier))
            .app_data(web::Data::new(payfast))
            .app_data(web::Data::new(stripe))
            .service(health)
            .service(
                web::scope("/auth")
                    .service(web::resource("/register").route(web::post().to(register)))
                    .service(web::resource("/login").route(web::post().to(login))),
            )
            .service(web::scope("/webhook").service(web::resource("/payfast/itn").route(web::post().to(payfast_itn))))
            .service(web::scope("/payment").service(web::resource("/stripe/return").route(web::get().to(stripe_return))))
            .service(
                web::scope("/api")
                    // Literal paths must be registered before their parameterised siblings.
                    .service(web::resource("/products/featured").route(web::get().to(featured_products)))
                    .service(web::resource("/products/{id}/related").route(web::get().to(related_products)))
                    .service(
                        web::resource("/products/{id}/reviews")
                            .route(web::get().to(product_reviews))
                            .route(web::post().to(add_review)),
                    )
                    .service(
                        web::resource("/products/{id}")
                            .route(web::get().to(product_detail))
                            .route(web::delete().to(delete_product)),
                    )
                    .service(
                        web::resource("/products").route(web::get().to(products)).route(web::post().to(upsert_product)),
                    )
                    .service(web::resource("/categories").route(web::get().to(categories)))
                    .service(web::resource("/cart").route(web::get().to(get_cart)).route(web::put().to(put_cart)))
                    .service(web::resource("/checkout").route(web::post().to(checkout)))
                    .service(web::resource("/checkout/payfast").route(web::post().to(checkout_payfast)))
                    .service(web::resource("/checkout/stripe").route(web::post().to(checkout_stripe)))
                    .service(web::resource("/orders/mine").route(web::get().to(my_orders)))
                    .service(
                        web::resource("/orders/{id}/status")
                            .wrap(AclMiddlewareFactory::new(&[Role::Admin]))
                            .route(web::post().to(update_order_status)),
                    )
                    .service(
                        web::resource("/orders/{id}")
                            .route(web::get().to(order_by_id))
                            .route(web::delete().to(delete_order)),
                    )
                    .service(
                        web::resource("/orders")
                            .wrap(AclMiddlewareFactory::new(&[Role::Admin]))
                            .route(web::get().to(all_orders)),
                    )
                    .service(
                        web::resource("/payments")
                            .wrap(AclMiddlewareFactory::new(&[Role::Admin]))
                            .route(web::get().to(all_payments)),
                    ),
            );
    }
}
