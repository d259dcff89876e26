//! The Stripe-style gateway adapter: hosted checkout sessions created over the REST API, with a one-shot
//! currency-conversion fallback for storefront currencies the processor will not charge directly.

use std::collections::HashMap;

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use spg_common::Money;
use storefront_engine::{
    db_types::PaymentGateway,
    order_objects::{CheckoutDraft, GatewayPaymentStatus, VerifiedNotification},
};
use thiserror::Error;

use crate::config::StripeConfig;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Stripe is not configured (missing secret key).")]
    NotConfigured,
    #[error("Could not reach Stripe. {0}")]
    Transport(String),
    #[error("Stripe rejected the request. {0}")]
    Api(String),
    #[error("The checkout currency is not chargeable. {0}")]
    UnsupportedCurrency(String),
    #[error("Could not (de)serialize a Stripe payload. {0}")]
    Serialization(String),
}

/// The slice of a Checkout Session this server cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Client,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StripeApiError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Creates a hosted checkout session for the draft. The first attempt uses the storefront currency; if the
    /// processor rejects that currency, the amounts are converted with the configured exchange rate (floored at
    /// the minimum charge) and the creation is retried exactly once in the fallback currency.
    pub async fn create_checkout_session(
        &self,
        draft: &CheckoutDraft,
        shipping: Money,
        merchant_payment_id: &str,
    ) -> Result<CheckoutSession, StripeApiError> {
        if !self.is_configured() {
            return Err(StripeApiError::NotConfigured);
        }
        let params = self.session_params(draft, shipping, merchant_payment_id, &self.config.currency, None)?;
        match self.post_session(&params).await {
            Err(StripeApiError::UnsupportedCurrency(msg)) => {
                info!(
                    "💠️ {} is not chargeable ({msg}). Retrying once in {} at a rate of {}.",
                    self.config.currency, self.config.fallback_currency, self.config.exchange_rate
                );
                let params = self.session_params(
                    draft,
                    shipping,
                    merchant_payment_id,
                    &self.config.fallback_currency,
                    Some(self.config.exchange_rate),
                )?;
                self.post_session(&params).await
            },
            other => other,
        }
    }

    pub async fn fetch_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError> {
        if !self.is_configured() {
            return Err(StripeApiError::NotConfigured);
        }
        let url = format!("{}/v1/checkout/sessions/{session_id}", self.config.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.reveal())
            .send()
            .await
            .map_err(map_transport)?;
        Self::parse_session_response(response).await
    }

    /// Maps a fetched session onto the engine's notification type. Only sessions whose payment status is `paid`
    /// come out as `Complete`; everything else is `Pending` and will not create an order.
    pub fn to_verified_notification(session: CheckoutSession) -> Result<VerifiedNotification, StripeApiError> {
        let merchant_payment_id = session
            .metadata
            .get("m_payment_id")
            .cloned()
            .ok_or_else(|| StripeApiError::Serialization("The session carries no m_payment_id metadata.".to_string()))?;
        let draft: CheckoutDraft = session
            .metadata
            .get("purchase")
            .ok_or_else(|| StripeApiError::Serialization("The session carries no purchase metadata.".to_string()))
            .and_then(|raw| serde_json::from_str(raw).map_err(|e| StripeApiError::Serialization(e.to_string())))?;
        let status = match session.payment_status.as_deref() {
            Some("paid") => GatewayPaymentStatus::Complete,
            Some(other) => GatewayPaymentStatus::Other(other.to_string()),
            None => GatewayPaymentStatus::Pending,
        };
        let external_txid = session.payment_intent.clone().unwrap_or_else(|| session.id.clone());
        let amount = Money::from_cents(session.amount_total.unwrap_or_default());
        let currency = session.currency.clone().unwrap_or_default().to_uppercase();
        let raw = serde_json::to_value(&session).map_err(|e| StripeApiError::Serialization(e.to_string()))?;
        Ok(VerifiedNotification {
            gateway: PaymentGateway::Stripe,
            merchant_payment_id,
            external_txid,
            status,
            amount,
            currency,
            draft,
            raw,
        })
    }

    async fn post_session(&self, params: &[(String, String)]) -> Result<CheckoutSession, StripeApiError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.reveal())
            .form(&params)
            .send()
            .await
            .map_err(map_transport)?;
        Self::parse_session_response(response).await
    }

    async fn parse_session_response(response: reqwest::Response) -> Result<CheckoutSession, StripeApiError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<CheckoutSession>().await.map_err(|e| StripeApiError::Serialization(e.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => {
                let message = envelope.error.message.unwrap_or_else(|| format!("HTTP {status}"));
                if envelope.error.param.as_deref() == Some("currency")
                    || message.to_lowercase().contains("currency")
                {
                    Err(StripeApiError::UnsupportedCurrency(message))
                } else {
                    warn!("💠️ Stripe API error: {message}");
                    Err(StripeApiError::Api(message))
                }
            },
            Err(_) => Err(StripeApiError::Api(format!("HTTP {status}: {body}"))),
        }
    }

    /// Builds the form-encoded session parameters. When `conversion_rate` is set, every amount is divided by it
    /// (rounding up to a whole minor unit) and the total is floored at the configured minimum charge via a
    /// synthesized adjustment line.
    fn session_params(
        &self,
        draft: &CheckoutDraft,
        shipping: Money,
        merchant_payment_id: &str,
        currency: &str,
        conversion_rate: Option<f64>,
    ) -> Result<Vec<(String, String)>, StripeApiError> {
        let embedded = serde_json::to_string(draft).map_err(|e| StripeApiError::Serialization(e.to_string()))?;
        let mut params: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("client_reference_id".to_string(), merchant_payment_id.to_string()),
            (
                "success_url".to_string(),
                format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.config.success_url),
            ),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
            ("customer_email".to_string(), draft.customer.email.clone()),
            ("metadata[m_payment_id]".to_string(), merchant_payment_id.to_string()),
            ("metadata[purchase]".to_string(), embedded),
        ];
        let mut index = 0usize;
        let mut total = Money::default();
        for item in &draft.items {
            let unit_amount = convert(item.price, conversion_rate);
            push_line(&mut params, &mut index, &mut total, currency, &item.name, unit_amount, item.quantity);
        }
        if !shipping.is_zero() {
            let fee = convert(shipping, conversion_rate);
            push_line(&mut params, &mut index, &mut total, currency, "Shipping", fee, 1);
        }
        // The fallback processor refuses totals below its minimum charge; pad with an explicit adjustment line
        // rather than failing the checkout.
        if conversion_rate.is_some() && total < self.config.min_charge {
            let adjustment = self.config.min_charge - total;
            push_line(&mut params, &mut index, &mut total, currency, "Minimum charge adjustment", adjustment, 1);
        }
        debug!("💠️ Built {index}-line session params for m_payment_id {merchant_payment_id} in {currency}.");
        Ok(params)
    }
}

#[allow(clippy::too_many_arguments)]
fn push_line(
    params: &mut Vec<(String, String)>,
    index: &mut usize,
    total: &mut Money,
    currency: &str,
    name: &str,
    unit_amount: Money,
    quantity: i64,
) {
    params.push((format!("line_items[{index}][quantity]"), quantity.to_string()));
    params.push((format!("line_items[{index}][price_data][currency]"), currency.to_string()));
    params.push((format!("line_items[{index}][price_data][unit_amount]"), unit_amount.value().to_string()));
    params.push((format!("line_items[{index}][price_data][product_data][name]"), name.to_string()));
    *total = *total + unit_amount * quantity;
    *index += 1;
}

/// Divides a storefront amount by the exchange rate, rounding up to the next minor unit. No rate means no
/// conversion.
fn convert(amount: Money, rate: Option<f64>) -> Money {
    match rate {
        #[allow(clippy::cast_possible_truncation)]
        Some(rate) => Money::from_cents((amount.value() as f64 / rate).ceil() as i64),
        None => amount,
    }
}

fn map_transport(e: reqwest::Error) -> StripeApiError {
    if e.is_timeout() {
        StripeApiError::Transport("The request to Stripe timed out.".to_string())
    } else {
        StripeApiError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use spg_common::{Money, Secret};
    use storefront_engine::{
        db_types::{CustomerInfo, LineItem},
        order_objects::GatewayPaymentStatus,
    };

    use super::{convert, CheckoutSession, StripeApi};
    use crate::{config::StripeConfig, integrations::stripe::StripeApiError};

    fn config() -> StripeConfig {
        StripeConfig { secret_key: Secret::new("sk_test_123".to_string()), ..StripeConfig::default() }
    }

    fn draft() -> storefront_engine::order_objects::CheckoutDraft {
        storefront_engine::order_objects::CheckoutDraft {
            owner_id: Some("usr-3".to_string()),
            customer: CustomerInfo {
                name: "Hassan Raza".to_string(),
                email: "hassan@example.com".to_string(),
                phone: "+92-300-9999999".to_string(),
                address: "DHA Phase 5, Karachi".to_string(),
            },
            items: vec![LineItem {
                product_id: "p-1".to_string(),
                name: "Shalwar Kameez".to_string(),
                price: Money::from_major(2400),
                quantity: 2,
                size: Some("L".to_string()),
                color: None,
            }],
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn session_params_include_a_shipping_line_when_the_fee_is_positive() {
        let api = StripeApi::new(config()).unwrap();
        let params = api.session_params(&draft(), Money::from_major(200), "st-mp-1", "pkr", None).unwrap();
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("240000"));
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(param(&params, "line_items[1][price_data][product_data][name]"), Some("Shipping"));
        assert_eq!(param(&params, "line_items[1][price_data][unit_amount]"), Some("20000"));
        assert_eq!(param(&params, "metadata[m_payment_id]"), Some("st-mp-1"));
        assert!(param(&params, "metadata[purchase]").unwrap().contains("Shalwar Kameez"));
    }

    #[test]
    fn session_params_skip_shipping_when_free() {
        let api = StripeApi::new(config()).unwrap();
        let params = api.session_params(&draft(), Money::default(), "st-mp-1", "pkr", None).unwrap();
        assert!(params.iter().all(|(_, v)| v != "Shipping"));
    }

    #[test]
    fn conversion_rounds_up_and_respects_the_floor() {
        assert_eq!(convert(Money::from_cents(500_000), Some(280.0)), Money::from_cents(1786));
        assert_eq!(convert(Money::from_cents(500_000), None), Money::from_cents(500_000));

        // A tiny basket converted to the fallback currency gets padded up to the minimum charge.
        let api = StripeApi::new(config()).unwrap();
        let mut tiny = draft();
        tiny.items[0].price = Money::from_major(10);
        tiny.items[0].quantity = 1;
        let params = api.session_params(&tiny, Money::default(), "st-mp-2", "usd", Some(280.0)).unwrap();
        // 1000 / 280 -> 4 cents; adjustment brings the total to the 50 cent minimum.
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("4"));
        assert_eq!(param(&params, "line_items[1][price_data][product_data][name]"), Some("Minimum charge adjustment"));
        assert_eq!(param(&params, "line_items[1][price_data][unit_amount]"), Some("46"));
    }

    #[test]
    fn paid_sessions_become_complete_notifications() {
        let mut metadata = HashMap::new();
        metadata.insert("m_payment_id".to_string(), "st-mp-9".to_string());
        metadata.insert("purchase".to_string(), serde_json::to_string(&draft()).unwrap());
        let session = CheckoutSession {
            id: "cs_test_1".to_string(),
            url: None,
            payment_status: Some("paid".to_string()),
            payment_intent: Some("pi_123".to_string()),
            currency: Some("pkr".to_string()),
            amount_total: Some(500_000),
            metadata,
        };
        let n = StripeApi::to_verified_notification(session).unwrap();
        assert_eq!(n.status, GatewayPaymentStatus::Complete);
        assert_eq!(n.external_txid, "pi_123");
        assert_eq!(n.merchant_payment_id, "st-mp-9");
        assert_eq!(n.amount, Money::from_cents(500_000));
    }

    #[test]
    fn unpaid_sessions_do_not_come_out_complete() {
        let mut metadata = HashMap::new();
        metadata.insert("m_payment_id".to_string(), "st-mp-9".to_string());
        metadata.insert("purchase".to_string(), serde_json::to_string(&draft()).unwrap());
        let session = CheckoutSession {
            id: "cs_test_2".to_string(),
            url: None,
            payment_status: Some("unpaid".to_string()),
            payment_intent: None,
            currency: None,
            amount_total: None,
            metadata,
        };
        let n = StripeApi::to_verified_notification(session).unwrap();
        assert_ne!(n.status, GatewayPaymentStatus::Complete);
        assert_eq!(n.external_txid, "cs_test_2");
    }

    #[test]
    fn sessions_without_metadata_are_rejected() {
        let session = CheckoutSession {
            id: "cs_test_3".to_string(),
            url: None,
            payment_status: Some("paid".to_string()),
            payment_intent: None,
            currency: None,
            amount_total: None,
            metadata: HashMap::new(),
        };
        assert!(matches!(StripeApi::to_verified_notification(session), Err(StripeApiError::Serialization(_))));
    }
}
