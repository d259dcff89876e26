//! The PayFast-style gateway adapter: a signed redirect to the hosted payment page on the way out, and ITN
//! (Instant Transaction Notification) verification on the way back.
//!
//! The signature canonicalization must be reproduced bit-for-bit or the gateway rejects the request: MD5 over
//! `key=value` pairs with keys sorted ascending, values URL-encoded (uppercase hex, `+` for space), empty fields
//! and the signature field itself excluded, and the optional passphrase appended last.

use std::collections::HashMap;

use log::{debug, warn};
use md5::{Digest, Md5};
use spg_common::Money;
use storefront_engine::{
    db_types::PaymentGateway,
    order_objects::{CheckoutDraft, GatewayPaymentStatus, VerifiedNotification},
};

use crate::config::PayFastConfig;

/// Outcome of ITN verification. `Invalid` notifications are never processed, but the HTTP layer still
/// acknowledges them so the gateway stops retrying.
#[derive(Debug)]
pub enum ItnVerification {
    Verified(VerifiedNotification),
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct PayFastRedirect {
    pub redirect_url: String,
    pub fields: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct PayFastApi {
    config: PayFastConfig,
}

impl PayFastApi {
    pub fn new(config: PayFastConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Builds the signed redirect for a checkout. The full draft purchase is serialized into `custom_str1` so it
    /// survives the round trip through the gateway without server-side session state.
    pub fn build_redirect(
        &self,
        draft: &CheckoutDraft,
        total: Money,
        merchant_payment_id: &str,
    ) -> Result<PayFastRedirect, String> {
        let embedded = serde_json::to_string(draft).map_err(|e| e.to_string())?;
        let item_name = match draft.items.as_slice() {
            [only] => only.name.clone(),
            [first, rest @ ..] => format!("{} (+{} more)", first.name, rest.len()),
            [] => "Order".to_string(),
        };
        let mut fields: Vec<(String, String)> = vec![
            ("merchant_id".to_string(), self.config.merchant_id.clone()),
            ("merchant_key".to_string(), self.config.merchant_key.clone()),
            ("return_url".to_string(), self.config.return_url.clone()),
            ("cancel_url".to_string(), self.config.cancel_url.clone()),
            ("notify_url".to_string(), self.config.notify_url.clone()),
            ("name_first".to_string(), draft.customer.name.clone()),
            ("email_address".to_string(), draft.customer.email.clone()),
            ("cell_number".to_string(), draft.customer.phone.clone()),
            ("m_payment_id".to_string(), merchant_payment_id.to_string()),
            ("amount".to_string(), total.to_decimal_string()),
            ("item_name".to_string(), item_name),
            ("custom_str1".to_string(), embedded),
        ];
        let signature = self.signature_for(&fields);
        fields.push(("signature".to_string(), signature));
        debug!("🅿️ Built PayFast redirect for m_payment_id {merchant_payment_id}.");
        Ok(PayFastRedirect { redirect_url: self.config.process_url.clone(), fields })
    }

    /// Verifies an incoming ITN payload and reconstructs the purchase it refers to. Field names are the gateway's
    /// own: `payment_status`, `m_payment_id`, `pf_payment_id`, `custom_str1`, `amount_gross`, `signature`.
    pub fn verify_itn(&self, payload: &HashMap<String, String>) -> ItnVerification {
        let Some(provided_signature) = payload.get("signature") else {
            return ItnVerification::Invalid("The notification carries no signature.".to_string());
        };
        let fields: Vec<(String, String)> =
            payload.iter().filter(|(k, _)| k.as_str() != "signature").map(|(k, v)| (k.clone(), v.clone())).collect();
        let expected = self.signature_for(&fields);
        if !expected.eq_ignore_ascii_case(provided_signature) {
            warn!("🅿️ ITN signature mismatch.");
            return ItnVerification::Invalid("The notification signature does not verify.".to_string());
        }
        let Some(merchant_payment_id) = payload.get("m_payment_id").filter(|s| !s.is_empty()) else {
            return ItnVerification::Invalid("The notification carries no m_payment_id.".to_string());
        };
        let Some(external_txid) = payload.get("pf_payment_id").filter(|s| !s.is_empty()) else {
            return ItnVerification::Invalid("The notification carries no pf_payment_id.".to_string());
        };
        let status = match payload.get("payment_status").map(String::as_str) {
            Some("COMPLETE") => GatewayPaymentStatus::Complete,
            Some("FAILED") => GatewayPaymentStatus::Failed,
            Some("CANCELLED") => GatewayPaymentStatus::Cancelled,
            Some("PENDING") => GatewayPaymentStatus::Pending,
            Some(other) => GatewayPaymentStatus::Other(other.to_string()),
            None => return ItnVerification::Invalid("The notification carries no payment_status.".to_string()),
        };
        let draft: CheckoutDraft = match payload.get("custom_str1") {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(draft) => draft,
                Err(e) => {
                    return ItnVerification::Invalid(format!("The embedded order payload does not parse. {e}"));
                },
            },
            None => return ItnVerification::Invalid("The notification carries no embedded order payload.".to_string()),
        };
        let amount = payload
            .get("amount_gross")
            .and_then(|s| s.parse::<Money>().ok())
            .unwrap_or_default();
        let raw = serde_json::to_value(payload).unwrap_or(serde_json::Value::Null);
        ItnVerification::Verified(VerifiedNotification {
            gateway: PaymentGateway::PayFast,
            merchant_payment_id: merchant_payment_id.clone(),
            external_txid: external_txid.clone(),
            status,
            amount,
            currency: "PKR".to_string(),
            draft,
            raw,
        })
    }

    /// The canonical signature: pairs sorted ascending by key, empty values dropped, URL-encoded, passphrase
    /// appended last. Sorting makes the digest independent of the order fields arrive in.
    pub(crate) fn signature_for(&self, fields: &[(String, String)]) -> String {
        let mut pairs: Vec<&(String, String)> = fields.iter().filter(|(_, v)| !v.is_empty()).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let mut base = pairs.iter().map(|(k, v)| format!("{k}={}", urlencode(v))).collect::<Vec<_>>().join("&");
        if let Some(passphrase) = &self.config.passphrase {
            base.push_str(&format!("&passphrase={}", urlencode(passphrase.reveal())));
        }
        let mut hasher = Md5::new();
        hasher.update(base.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// URL-encoding the way the gateway canonicalizes it: uppercase hex, spaces as `+`.
fn urlencode(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use spg_common::{Money, Secret};
    use storefront_engine::{
        db_types::{CustomerInfo, LineItem},
        order_objects::{CheckoutDraft, GatewayPaymentStatus},
    };

    use super::{ItnVerification, PayFastApi};
    use crate::config::PayFastConfig;

    fn config(passphrase: Option<&str>) -> PayFastConfig {
        PayFastConfig {
            merchant_id: "10000100".to_string(),
            merchant_key: "46f0cd694581a".to_string(),
            passphrase: passphrase.map(|p| Secret::new(p.to_string())),
            process_url: "https://sandbox.payfast.co.za/eng/process".to_string(),
            return_url: "http://localhost:8740/payment/payfast/return".to_string(),
            cancel_url: "http://localhost:8740/payment/payfast/cancel".to_string(),
            notify_url: "http://localhost:8740/webhook/payfast/itn".to_string(),
        }
    }

    fn draft() -> CheckoutDraft {
        CheckoutDraft {
            owner_id: None,
            customer: CustomerInfo {
                name: "Sana Mir".to_string(),
                email: "sana@example.com".to_string(),
                phone: "+92-333-0000000".to_string(),
                address: "Model Town, Lahore".to_string(),
            },
            items: vec![LineItem {
                product_id: "p-9".to_string(),
                name: "Cricket Bat".to_string(),
                price: Money::from_major(4800),
                quantity: 1,
                size: None,
                color: None,
            }],
        }
    }

    fn itn_fields(api: &PayFastApi, status: &str) -> HashMap<String, String> {
        let redirect = api.build_redirect(&draft(), Money::from_major(5000), "pf-mp-1").unwrap();
        let custom_str1 = redirect.fields.iter().find(|(k, _)| k == "custom_str1").unwrap().1.clone();
        let mut fields = vec![
            ("m_payment_id".to_string(), "pf-mp-1".to_string()),
            ("pf_payment_id".to_string(), "1089250".to_string()),
            ("payment_status".to_string(), status.to_string()),
            ("amount_gross".to_string(), "5000.00".to_string()),
            ("custom_str1".to_string(), custom_str1),
        ];
        let signature = api.signature_for(&fields);
        fields.push(("signature".to_string(), signature));
        fields.into_iter().collect()
    }

    #[test]
    fn signature_is_order_independent() {
        let api = PayFastApi::new(config(Some("jt7NOE43FZPn")));
        let forward = vec![
            ("merchant_id".to_string(), "10000100".to_string()),
            ("amount".to_string(), "100.00".to_string()),
            ("item_name".to_string(), "Test Item".to_string()),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(api.signature_for(&forward), api.signature_for(&reversed));
    }

    #[test]
    fn signature_depends_on_the_passphrase() {
        let fields = vec![("amount".to_string(), "100.00".to_string())];
        let with = PayFastApi::new(config(Some("jt7NOE43FZPn")));
        let without = PayFastApi::new(config(None));
        assert_ne!(with.signature_for(&fields), without.signature_for(&fields));
    }

    #[test]
    fn empty_fields_are_excluded_from_the_signature() {
        let api = PayFastApi::new(config(None));
        let with_empty = vec![
            ("amount".to_string(), "100.00".to_string()),
            ("custom_str2".to_string(), String::new()),
        ];
        let without_empty = vec![("amount".to_string(), "100.00".to_string())];
        assert_eq!(api.signature_for(&with_empty), api.signature_for(&without_empty));
    }

    #[test]
    fn itn_round_trip_verifies_and_reconstructs_the_purchase() {
        let api = PayFastApi::new(config(Some("jt7NOE43FZPn")));
        let fields = itn_fields(&api, "COMPLETE");
        match api.verify_itn(&fields) {
            ItnVerification::Verified(n) => {
                assert_eq!(n.merchant_payment_id, "pf-mp-1");
                assert_eq!(n.external_txid, "1089250");
                assert_eq!(n.status, GatewayPaymentStatus::Complete);
                assert_eq!(n.amount, Money::from_major(5000));
                assert_eq!(n.draft.customer.email, "sana@example.com");
                assert_eq!(n.draft.items.len(), 1);
            },
            ItnVerification::Invalid(reason) => panic!("Expected a verified ITN, got: {reason}"),
        }
    }

    #[test]
    fn tampered_itn_fails_verification() {
        let api = PayFastApi::new(config(Some("jt7NOE43FZPn")));
        let mut fields = itn_fields(&api, "COMPLETE");
        fields.insert("amount_gross".to_string(), "1.00".to_string());
        assert!(matches!(api.verify_itn(&fields), ItnVerification::Invalid(_)));
    }

    #[test]
    fn failed_status_still_verifies() {
        let api = PayFastApi::new(config(None));
        let fields = itn_fields(&api, "FAILED");
        match api.verify_itn(&fields) {
            ItnVerification::Verified(n) => assert_eq!(n.status, GatewayPaymentStatus::Failed),
            ItnVerification::Invalid(reason) => panic!("Expected a verified ITN, got: {reason}"),
        }
    }
}
