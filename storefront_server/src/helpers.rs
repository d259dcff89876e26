use actix_web::HttpRequest;
use storefront_engine::{db_types::LineItem, CatalogApi, StoreBackend};

use crate::{auth::JwtClaims, data_objects::CartItemRequest, errors::ServerError};

/// Resolves client-submitted cart lines against the catalog. Prices and names always come from the stored
/// products — nothing monetary is trusted from the client.
pub async fn resolve_line_items(
    catalog: &CatalogApi<StoreBackend>,
    items: &[CartItemRequest],
) -> Result<Vec<LineItem>, ServerError> {
    let mut resolved = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(ServerError::ValidationError("Line item quantities must be positive.".to_string()));
        }
        let product = catalog
            .product(&item.product_id)
            .await?
            .ok_or_else(|| ServerError::ValidationError(format!("Unknown product: {}", item.product_id)))?;
        resolved.push(LineItem {
            product_id: product.id,
            name: product.name,
            price: product.price,
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
        });
    }
    Ok(resolved)
}

/// The cart's owner key: the authenticated user id, or the `X-Session-Id` header for guests.
pub fn cart_owner(claims: &Option<JwtClaims>, req: &HttpRequest) -> Result<String, ServerError> {
    if let Some(claims) = claims {
        return Ok(claims.sub.clone());
    }
    req.headers()
        .get("X-Session-Id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("sess-{s}"))
        .ok_or_else(|| {
            ServerError::ValidationError("Provide an access token or an X-Session-Id header.".to_string())
        })
}
