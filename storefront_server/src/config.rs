use std::{env, time::Duration};

use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use spg_common::{Money, Secret};
use storefront_engine::shipping::ShippingPolicy;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8740;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When unset, the server falls back to the flat-file store rooted at `data_dir`.
    pub database_url: Option<String>,
    pub data_dir: String,
    pub auth: AuthConfig,
    pub payfast: PayFastConfig,
    pub stripe: StripeConfig,
    pub shipping: ShippingPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: None,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            auth: AuthConfig::default(),
            payfast: PayFastConfig::default(),
            stripe: StripeConfig::default(),
            shipping: ShippingPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead.");
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        if database_url.is_none() {
            warn!(
                "🪛️ SPG_DATABASE_URL is not set. The server will run against the flat-file store. This is fine for \
                 development; set a database URL for production."
            );
        }
        let data_dir = env::var("SPG_DATA_DIR").ok().unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let auth = AuthConfig::from_env_or_default();
        let payfast = PayFastConfig::from_env_or_default();
        let stripe = StripeConfig::from_env_or_default();
        let shipping = configure_shipping_policy();
        Self { host, port, database_url, data_dir, auth, payfast, stripe, shipping }
    }
}

fn configure_shipping_policy() -> ShippingPolicy {
    let defaults = ShippingPolicy::default();
    let free_shipping_threshold = env::var("SPG_FREE_SHIPPING_THRESHOLD")
        .ok()
        .and_then(|s| s.parse::<Money>().map_err(|e| warn!("🪛️ Invalid SPG_FREE_SHIPPING_THRESHOLD. {e}")).ok())
        .unwrap_or(defaults.free_shipping_threshold);
    let default_fee = env::var("SPG_DEFAULT_SHIPPING_FEE")
        .ok()
        .and_then(|s| s.parse::<Money>().map_err(|e| warn!("🪛️ Invalid SPG_DEFAULT_SHIPPING_FEE. {e}")).ok())
        .unwrap_or(defaults.default_fee);
    ShippingPolicy { free_shipping_threshold, default_fee }
}

//-------------------------------------------------  AuthConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens.
    pub jwt_secret: Secret<String>,
    pub token_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ SPG_JWT_SECRET has not been set. I'm using a random value for this session. Every restart will \
             invalidate all issued tokens. DO NOT operate a production instance like this. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret), token_ttl: DEFAULT_TOKEN_TTL }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let token_ttl = env::var("SPG_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid SPG_TOKEN_TTL_HOURS. {e}")).ok())
            .map(|h| Duration::from_secs(h * 3600))
            .unwrap_or(DEFAULT_TOKEN_TTL);
        match env::var("SPG_JWT_SECRET") {
            Ok(secret) if secret.len() >= 32 => Self { jwt_secret: Secret::new(secret), token_ttl },
            Ok(_) => {
                warn!("🪛️ SPG_JWT_SECRET is too short (need at least 32 bytes). Falling back to a random secret.");
                Self { token_ttl, ..Self::default() }
            },
            Err(_) => Self { token_ttl, ..Self::default() },
        }
    }
}

//-------------------------------------------------  PayFastConfig  ---------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct PayFastConfig {
    pub merchant_id: String,
    pub merchant_key: String,
    /// Optional shared-secret passphrase appended to the signature base string.
    pub passphrase: Option<Secret<String>>,
    /// The hosted payment page the customer is redirected to.
    pub process_url: String,
    pub return_url: String,
    pub cancel_url: String,
    /// Where the gateway posts its asynchronous ITN callbacks.
    pub notify_url: String,
}

impl PayFastConfig {
    pub fn is_configured(&self) -> bool {
        !self.merchant_id.is_empty() && !self.merchant_key.is_empty()
    }

    pub fn from_env_or_default() -> Self {
        let merchant_id = env::var("SPG_PAYFAST_MERCHANT_ID").unwrap_or_default();
        let merchant_key = env::var("SPG_PAYFAST_MERCHANT_KEY").unwrap_or_default();
        if merchant_id.is_empty() || merchant_key.is_empty() {
            warn!(
                "🪛️ SPG_PAYFAST_MERCHANT_ID / SPG_PAYFAST_MERCHANT_KEY are not set. PayFast checkouts will be \
                 rejected with a configuration error."
            );
        }
        let passphrase = env::var("SPG_PAYFAST_PASSPHRASE").ok().filter(|s| !s.is_empty()).map(Secret::new);
        let process_url = env::var("SPG_PAYFAST_PROCESS_URL")
            .ok()
            .unwrap_or_else(|| "https://sandbox.payfast.co.za/eng/process".to_string());
        let base = env::var("SPG_PUBLIC_URL").ok().unwrap_or_else(|| "http://localhost:8740".to_string());
        let return_url = env::var("SPG_PAYFAST_RETURN_URL").ok().unwrap_or_else(|| format!("{base}/payment/payfast/return"));
        let cancel_url = env::var("SPG_PAYFAST_CANCEL_URL").ok().unwrap_or_else(|| format!("{base}/payment/payfast/cancel"));
        let notify_url = env::var("SPG_PAYFAST_NOTIFY_URL").ok().unwrap_or_else(|| format!("{base}/webhook/payfast/itn"));
        Self { merchant_id, merchant_key, passphrase, process_url, return_url, cancel_url, notify_url }
    }
}

//-------------------------------------------------  StripeConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub api_base: String,
    /// The storefront's own currency, used for the first session attempt.
    pub currency: String,
    /// Currency used for the one-shot retry when `currency` is not chargeable.
    pub fallback_currency: String,
    /// How many units of `currency` buy one unit of `fallback_currency`.
    pub exchange_rate: f64,
    /// Smallest chargeable total in the fallback currency, in minor units.
    pub min_charge: Money,
    pub success_url: String,
    pub cancel_url: String,
    pub timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: Secret::default(),
            api_base: "https://api.stripe.com".to_string(),
            currency: "pkr".to_string(),
            fallback_currency: "usd".to_string(),
            exchange_rate: 280.0,
            min_charge: Money::from_cents(50),
            success_url: "http://localhost:8740/payment/stripe/return".to_string(),
            cancel_url: "http://localhost:8740/payment/stripe/cancel".to_string(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl StripeConfig {
    pub fn is_configured(&self) -> bool {
        !self.secret_key.reveal().is_empty()
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let secret_key = match env::var("SPG_STRIPE_SECRET_KEY") {
            Ok(key) if !key.is_empty() => Secret::new(key),
            _ => {
                warn!("🪛️ SPG_STRIPE_SECRET_KEY is not set. Stripe checkouts will be rejected with a configuration error.");
                Secret::default()
            },
        };
        let api_base = env::var("SPG_STRIPE_API_BASE").ok().unwrap_or(defaults.api_base);
        let currency = env::var("SPG_CURRENCY").map(|s| s.to_lowercase()).ok().unwrap_or(defaults.currency);
        let fallback_currency =
            env::var("SPG_STRIPE_FALLBACK_CURRENCY").map(|s| s.to_lowercase()).ok().unwrap_or(defaults.fallback_currency);
        let exchange_rate = env::var("SPG_STRIPE_EXCHANGE_RATE")
            .ok()
            .and_then(|s| s.parse::<f64>().map_err(|e| warn!("🪛️ Invalid SPG_STRIPE_EXCHANGE_RATE. {e}")).ok())
            .filter(|r| *r > 0.0)
            .unwrap_or(defaults.exchange_rate);
        let min_charge = env::var("SPG_STRIPE_MIN_CHARGE_CENTS")
            .ok()
            .and_then(|s| s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid SPG_STRIPE_MIN_CHARGE_CENTS. {e}")).ok())
            .map(Money::from_cents)
            .unwrap_or(defaults.min_charge);
        let base = env::var("SPG_PUBLIC_URL").ok().unwrap_or_else(|| "http://localhost:8740".to_string());
        let success_url =
            env::var("SPG_STRIPE_SUCCESS_URL").ok().unwrap_or_else(|| format!("{base}/payment/stripe/return"));
        let cancel_url = env::var("SPG_STRIPE_CANCEL_URL").ok().unwrap_or_else(|| format!("{base}/payment/stripe/cancel"));
        let timeout = env::var("SPG_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid SPG_GATEWAY_TIMEOUT_SECS. {e}")).ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT);
        Self { secret_key, api_base, currency, fallback_currency, exchange_rate, min_charge, success_url, cancel_url, timeout }
    }
}
