use std::fmt::Display;

use serde::{Deserialize, Serialize};
use spg_common::Money;
use storefront_engine::{
    db_types::{CustomerInfo, Role, User},
    traits::{ProductQueryFilter, ProductSort},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------        Auth          --------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The user as exposed over HTTP. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self { id: u.id, name: u.name, email: u.email, role: u.role }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

//--------------------------------------     Cart/Checkout     -------------------------------------------------------
/// A client-side cart line. Deliberately carries no price: the server resolves prices from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartUpdateRequest {
    pub items: Vec<CartItemRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub customer: CustomerInfo,
    pub items: Vec<CartItemRequest>,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayFastCheckoutResponse {
    /// The hosted payment page to redirect the customer to.
    pub redirect_url: String,
    /// The signed form fields, in case the client posts them itself.
    pub fields: Vec<(String, String)>,
    pub merchant_payment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCheckoutResponse {
    pub session_id: String,
    pub session_url: Option<String>,
    pub merchant_payment_id: String,
}

//--------------------------------------        Orders         -------------------------------------------------------
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub rating: i64,
    pub comment: String,
}

//--------------------------------------       Catalog         -------------------------------------------------------
/// Admin product create/replace payload. The id is optional on create; prices arrive in minor units.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpsertRequest {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
}


/// Query-string shape of the product listing endpoint. Prices arrive in major units ("4999.50").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQueryParams {
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub featured: Option<bool>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductQueryParams {
    pub fn into_filter(self) -> ProductQueryFilter {
        let sort = match self.sort.as_deref() {
            Some("price-asc") => ProductSort::PriceAsc,
            Some("price-desc") => ProductSort::PriceDesc,
            Some("name") => ProductSort::Name,
            _ => ProductSort::Newest,
        };
        ProductQueryFilter {
            category: self.category,
            search: self.q,
            min_price: self.min_price.and_then(|s| s.parse::<Money>().ok()),
            max_price: self.max_price.and_then(|s| s.parse::<Money>().ok()),
            featured: self.featured,
            sort,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
