use crate::config::GatewayConfig;
use crate::errors::ServiceError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Provider status code for a completed payment.
pub const STATUS_PAID: i32 = 2;

/// Client for the external payment provider (Flow-compatible wire protocol).
///
/// Every request carries an `s` parameter: the lowercase hex HMAC-SHA256 of
/// the remaining parameters concatenated as `key` + `value` in lexicographic
/// key order. The canonicalization is part of the wire contract.
pub struct PaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

/// Successful response of `payment/create`.
#[derive(Debug, Deserialize)]
pub struct PaymentCreated {
    pub url: String,
    pub token: String,
}

impl PaymentCreated {
    /// Hosted payment page the buyer is redirected to.
    pub fn redirect_url(&self) -> String {
        format!("{}?token={}", self.url, self.token)
    }
}

/// Response of `payment/getStatus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub status: i32,
    #[serde(rename = "commerceOrder")]
    pub commerce_order: String,
    pub amount: i64,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        self.status == STATUS_PAID
    }
}

/// Parameters for initiating a payment.
#[derive(Debug)]
pub struct CreatePaymentRequest {
    pub commerce_order: String,
    pub subject: String,
    /// Integer currency units; the provider rejects fractional amounts
    pub amount: i64,
    pub email: String,
    pub url_return: String,
    pub url_confirmation: String,
}

impl PaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Signs a parameter map: keys sorted lexicographically, `key` + `value`
    /// concatenated, HMAC-SHA256 under the shared secret, hex digest.
    pub fn sign(&self, params: &BTreeMap<String, String>) -> String {
        let string_to_sign: String = params
            .iter()
            .map(|(k, v)| format!("{}{}", k, v))
            .collect();

        let mut mac = HmacSha256::new_from_slice(self.config.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(string_to_sign.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// POSTs a payment-creation request. Success is a JSON body carrying both
    /// `url` and `token`; anything else is a `Gateway` error.
    #[instrument(skip(self, request), fields(commerce_order = %request.commerce_order))]
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentCreated, ServiceError> {
        let mut params = BTreeMap::new();
        params.insert("apiKey".to_string(), self.config.api_key.clone());
        params.insert("commerceOrder".to_string(), request.commerce_order);
        params.insert("subject".to_string(), request.subject);
        params.insert("currency".to_string(), self.config.currency.clone());
        params.insert("amount".to_string(), request.amount.to_string());
        params.insert("email".to_string(), request.email);
        params.insert("urlReturn".to_string(), request.url_return);
        params.insert("urlConfirmation".to_string(), request.url_confirmation);
        params.insert("s".to_string(), self.sign(&params));

        let url = format!("{}/payment/create", self.config.base_url);
        debug!(%url, "creating payment");

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(format!("payment creation failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "provider rejected payment creation");
            return Err(ServiceError::Gateway(format!(
                "provider returned {} on payment creation",
                status
            )));
        }

        response.json::<PaymentCreated>().await.map_err(|e| {
            ServiceError::Gateway(format!("malformed payment creation response: {}", e))
        })
    }

    /// Queries the authoritative payment status for a token. Webhook handling
    /// never trusts the webhook body; it always goes through this call.
    #[instrument(skip(self))]
    pub async fn get_status(&self, token: &str) -> Result<PaymentStatus, ServiceError> {
        let mut params = BTreeMap::new();
        params.insert("apiKey".to_string(), self.config.api_key.clone());
        params.insert("token".to_string(), token.to_string());
        params.insert("s".to_string(), self.sign(&params));

        let url = format!("{}/payment/getStatus", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ServiceError::Gateway(format!("status lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::Gateway(format!(
                "provider returned {} on status lookup",
                response.status()
            )));
        }

        response
            .json::<PaymentStatus>()
            .await
            .map_err(|e| ServiceError::Gateway(format!("malformed status response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> PaymentGateway {
        PaymentGateway::new(GatewayConfig {
            api_key: "test-key".to_string(),
            secret_key: "test-secret".to_string(),
            base_url: "http://localhost:9".to_string(),
            timeout_secs: 1,
            currency: "CLP".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn sign_matches_known_vector() {
        // Independently computed: HMAC-SHA256("test-secret",
        // "apiKeytest-keytokentok-abc123")
        let mut params = BTreeMap::new();
        params.insert("apiKey".to_string(), "test-key".to_string());
        params.insert("token".to_string(), "tok-abc123".to_string());

        assert_eq!(
            gateway().sign(&params),
            "c61d5ef80eebdaf14910ceaaf2fd491f146198d45c183f862df2602d2a1a12f3"
        );
    }

    #[test]
    fn sign_orders_keys_lexicographically() {
        // Full create-payment parameter set; expected digest computed
        // independently over the sorted key+value concatenation.
        let mut params = BTreeMap::new();
        params.insert("apiKey".to_string(), "test-key".to_string());
        params.insert("commerceOrder".to_string(), "42".to_string());
        params.insert("subject".to_string(), "order".to_string());
        params.insert("currency".to_string(), "CLP".to_string());
        params.insert("amount".to_string(), "5690".to_string());
        params.insert("email".to_string(), "buyer@example.com".to_string());
        params.insert(
            "urlReturn".to_string(),
            "https://shop.test/api/v1/payments/return/42".to_string(),
        );
        params.insert(
            "urlConfirmation".to_string(),
            "https://shop.test/api/v1/payments/confirmation".to_string(),
        );

        assert_eq!(
            gateway().sign(&params),
            "a1897ae413eaec7b084e0b4e8466388b848e284265289776eaac79ce85894ee0"
        );
    }

    #[test]
    fn sign_is_deterministic() {
        let mut params = BTreeMap::new();
        params.insert("token".to_string(), "abc".to_string());
        params.insert("apiKey".to_string(), "k".to_string());
        assert_eq!(gateway().sign(&params), gateway().sign(&params));
    }

    #[test]
    fn redirect_url_carries_token() {
        let created = PaymentCreated {
            url: "https://pay.example.com/session".to_string(),
            token: "tok-1".to_string(),
        };
        assert_eq!(
            created.redirect_url(),
            "https://pay.example.com/session?token=tok-1"
        );
    }

    #[test]
    fn paid_status_code() {
        let status = PaymentStatus {
            status: STATUS_PAID,
            commerce_order: "x".to_string(),
            amount: 100,
        };
        assert!(status.is_paid());
        assert!(!PaymentStatus { status: 3, ..status }.is_paid());
    }
}
