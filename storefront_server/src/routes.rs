//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! Handlers are concrete over [`StoreBackend`]: the backend was chosen once at startup, so there is nothing left
//! to be generic about. Admin-gated routes are wrapped with the ACL middleware in
//! [`crate::server::configure_app`]; everything else extracts [`JwtClaims`] (or `Option<JwtClaims>` for flows
//! that allow guests) directly.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use storefront_engine::{
    db_types::{NewPayment, NewReview, OrderStatusType, PaymentGateway, Product},
    helpers::new_merchant_payment_id,
    order_objects::CheckoutDraft,
    AuthApi,
    CartApi,
    CatalogApi,
    OrdersApi,
    ReconciliationApi,
    StoreBackend,
};

use crate::{
    auth::{JwtClaims, TokenIssuer},
    data_objects::{
        AuthResponse,
        CartUpdateRequest,
        CheckoutRequest,
        LoginRequest,
        PayFastCheckoutResponse,
        ProductQueryParams,
        ProductUpsertRequest,
        PublicUser,
        RegisterRequest,
        ReviewRequest,
        StatusUpdateRequest,
        StripeCheckoutResponse,
    },
    errors::ServerError,
    helpers::{cart_owner, resolve_line_items},
    integrations::{payfast::PayFastApi, stripe::StripeApi},
};

type Recon = web::Data<ReconciliationApi<StoreBackend>>;
type Orders = web::Data<OrdersApi<StoreBackend>>;
type Catalog = web::Data<CatalogApi<StoreBackend>>;
type Carts = web::Data<CartApi<StoreBackend>>;
type Auth = web::Data<AuthApi<StoreBackend>>;

// ----------------------------------------------   Health   ---------------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Auth   -----------------------------------------------------------
pub async fn register(
    body: web::Json<RegisterRequest>,
    api: Auth,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let user = api.register(&req.name, &req.email, &req.password).await?;
    let token = signer.issue_token(&user)?;
    info!("💻️ New account registered: {}", user.id);
    Ok(HttpResponse::Created().json(AuthResponse { token, user: PublicUser::from(user) }))
}

pub async fn login(
    body: web::Json<LoginRequest>,
    api: Auth,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let user = api.login(&req.email, &req.password).await?;
    let token = signer.issue_token(&user)?;
    debug!("💻️ Issued access token for {}", user.id);
    Ok(HttpResponse::Ok().json(AuthResponse { token, user: PublicUser::from(user) }))
}

// ----------------------------------------------   Catalog   --------------------------------------------------------
pub async fn products(query: web::Query<ProductQueryParams>, catalog: Catalog) -> Result<HttpResponse, ServerError> {
    let products = catalog.products(query.into_inner().into_filter()).await?;
    Ok(HttpResponse::Ok().json(products))
}

pub async fn product_detail(path: web::Path<String>, catalog: Catalog) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let detail = catalog.product_detail(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Product {id}")))?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn categories(catalog: Catalog) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(catalog.categories().await?))
}

pub async fn featured_products(catalog: Catalog) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(catalog.featured(8).await?))
}

pub async fn related_products(path: web::Path<String>, catalog: Catalog) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(catalog.related(&path.into_inner(), 4).await?))
}

pub async fn product_reviews(path: web::Path<String>, catalog: Catalog) -> Result<HttpResponse, ServerError> {
    let detail = catalog
        .product_detail(&path.into_inner())
        .await?
        .ok_or_else(|| ServerError::NoRecordFound("Product".to_string()))?;
    Ok(HttpResponse::Ok().json(detail.reviews))
}

pub async fn add_review(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<ReviewRequest>,
    catalog: Catalog,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let review = catalog
        .add_review(NewReview {
            product_id: path.into_inner(),
            owner_id: Some(claims.sub),
            author: claims.name,
            rating: req.rating,
            comment: req.comment,
        })
        .await?;
    Ok(HttpResponse::Created().json(review))
}

pub async fn upsert_product(
    claims: JwtClaims,
    body: web::Json<ProductUpsertRequest>,
    catalog: Catalog,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let req = body.into_inner();
    let id = req.id.unwrap_or_else(|| new_merchant_payment_id("prd"));
    let product = catalog
        .upsert_product(Product {
            id,
            name: req.name,
            description: req.description,
            price: req.price,
            category: req.category,
            sizes: req.sizes,
            colors: req.colors,
            image: req.image,
            featured: req.featured,
            created_at: Utc::now(),
        })
        .await?;
    Ok(HttpResponse::Ok().json(product))
}

pub async fn delete_product(
    claims: JwtClaims,
    path: web::Path<String>,
    catalog: Catalog,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    catalog.delete_product(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ----------------------------------------------   Cart   -----------------------------------------------------------
pub async fn get_cart(claims: Option<JwtClaims>, req: HttpRequest, carts: Carts) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&claims, &req)?;
    Ok(HttpResponse::Ok().json(carts.cart_for(&owner).await?))
}

pub async fn put_cart(
    claims: Option<JwtClaims>,
    req: HttpRequest,
    body: web::Json<CartUpdateRequest>,
    carts: Carts,
    catalog: Catalog,
) -> Result<HttpResponse, ServerError> {
    let owner = cart_owner(&claims, &req)?;
    let items = resolve_line_items(&catalog, &body.into_inner().items).await?;
    Ok(HttpResponse::Ok().json(carts.save_items(&owner, items).await?))
}

// ----------------------------------------------   Checkout   -------------------------------------------------------
async fn draft_from_request(
    claims: &Option<JwtClaims>,
    request: &CheckoutRequest,
    catalog: &CatalogApi<StoreBackend>,
) -> Result<CheckoutDraft, ServerError> {
    if request.items.is_empty() {
        return Err(ServerError::ValidationError("The cart is empty.".to_string()));
    }
    let items = resolve_line_items(catalog, &request.items).await?;
    Ok(CheckoutDraft {
        owner_id: claims.as_ref().map(|c| c.sub.clone()),
        customer: request.customer.clone(),
        items,
    })
}

async fn convert_cart(claims: &Option<JwtClaims>, req: &HttpRequest, carts: &CartApi<StoreBackend>) {
    if let Ok(owner) = cart_owner(claims, req) {
        if let Err(e) = carts.mark_converted(&owner).await {
            warn!("💻️ Could not mark the cart for {owner} as converted. {e}");
        }
    }
}

/// The cash-on-delivery checkout: creates the order synchronously. Non-cash methods must use their
/// gateway-specific endpoints.
pub async fn checkout(
    claims: Option<JwtClaims>,
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    recon: Recon,
    catalog: Catalog,
    carts: Carts,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    let method = request
        .payment_method
        .parse::<PaymentGateway>()
        .map_err(|e| ServerError::ValidationError(e.to_string()))?;
    match method {
        PaymentGateway::Cod => {},
        PaymentGateway::PayFast | PaymentGateway::Stripe => {
            return Err(ServerError::ValidationError(format!(
                "Use the {method}-specific checkout endpoint for this payment method."
            )));
        },
        other => {
            return Err(ServerError::ValidationError(format!("The {other} gateway is not enabled.")));
        },
    }
    let draft = draft_from_request(&claims, &request, &catalog).await?;
    let order = recon.checkout_cod(draft).await?;
    convert_cart(&claims, &req, &carts).await;
    Ok(HttpResponse::Created().json(order))
}

/// Builds the signed PayFast redirect and records the initiated payment. The order itself is only created later,
/// by the ITN handler.
pub async fn checkout_payfast(
    claims: Option<JwtClaims>,
    body: web::Json<CheckoutRequest>,
    recon: Recon,
    catalog: Catalog,
    payfast: web::Data<PayFastApi>,
) -> Result<HttpResponse, ServerError> {
    if !payfast.is_configured() {
        return Err(ServerError::ConfigurationError("PayFast credentials are missing.".to_string()));
    }
    let draft = draft_from_request(&claims, &body.into_inner(), &catalog).await?;
    let (_, _, total) = recon.totals_for(&draft);
    let merchant_payment_id = new_merchant_payment_id("pf");
    let redirect = payfast
        .build_redirect(&draft, total, &merchant_payment_id)
        .map_err(ServerError::Unspecified)?;
    let mut payment = NewPayment::new(merchant_payment_id.clone(), PaymentGateway::PayFast, total, "PKR".to_string());
    payment.owner_id = draft.owner_id.clone();
    recon.record_initiated_payment(payment).await?;
    Ok(HttpResponse::Ok().json(PayFastCheckoutResponse {
        redirect_url: redirect.redirect_url,
        fields: redirect.fields,
        merchant_payment_id,
    }))
}

/// Creates a hosted Stripe checkout session and records the initiated payment. Order materialization happens on
/// the return-URL visit.
pub async fn checkout_stripe(
    claims: Option<JwtClaims>,
    body: web::Json<CheckoutRequest>,
    recon: Recon,
    catalog: Catalog,
    stripe: web::Data<StripeApi>,
) -> Result<HttpResponse, ServerError> {
    if !stripe.is_configured() {
        return Err(ServerError::ConfigurationError("Stripe credentials are missing.".to_string()));
    }
    let draft = draft_from_request(&claims, &body.into_inner(), &catalog).await?;
    let (_, shipping, total) = recon.totals_for(&draft);
    let merchant_payment_id = new_merchant_payment_id("st");
    let session = stripe.create_checkout_session(&draft, shipping, &merchant_payment_id).await?;
    let mut payment = NewPayment::new(merchant_payment_id.clone(), PaymentGateway::Stripe, total, "PKR".to_string());
    payment.owner_id = draft.owner_id.clone();
    recon.record_initiated_payment(payment).await?;
    Ok(HttpResponse::Ok().json(StripeCheckoutResponse {
        session_id: session.id,
        session_url: session.url,
        merchant_payment_id,
    }))
}

// ----------------------------------------------   Orders   ---------------------------------------------------------
pub async fn my_orders(claims: JwtClaims, orders: Orders) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(orders.orders_for_owner(&claims.sub).await?))
}

pub async fn order_by_id(
    claims: JwtClaims,
    path: web::Path<String>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner().into();
    let order = orders.order_by_id(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id}")))?;
    let is_owner = order.owner_id.as_deref() == Some(claims.sub.as_str());
    if !is_owner && !claims.is_admin() {
        // Not leaking the order's existence to other users.
        return Err(ServerError::NoRecordFound(format!("Order {id}")));
    }
    Ok(HttpResponse::Ok().json(order))
}

pub async fn delete_order(
    claims: JwtClaims,
    path: web::Path<String>,
    orders: Orders,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let id = path.into_inner().into();
    orders.delete_order(&id).await?;
    info!("💻️ Order [{id}] deleted by admin {}.", claims.sub);
    Ok(HttpResponse::NoContent().finish())
}

// Admin listings; role-gated by the ACL middleware.
pub async fn all_orders(orders: Orders) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(orders.all_orders().await?))
}

pub async fn all_payments(orders: Orders) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(orders.all_payments().await?))
}

pub async fn update_order_status(
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    recon: Recon,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner().into();
    let status = body
        .into_inner()
        .status
        .parse::<OrderStatusType>()
        .map_err(|e| ServerError::ValidationError(e.to_string()))?;
    let order = recon.modify_status_for_order(&id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}
