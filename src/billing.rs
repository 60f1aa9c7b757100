//! Payment-intent creation at an external payment provider.
//!
//! Only the client secret of a new intent is used; confirming the payment
//! happens between the client and the provider.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::Config;
use crate::error::BillingError;

/// Stripe API base URL.
const STRIPE_API: &str = "https://api.stripe.com/v1";

/// Provider and currency used for new payment intents.
#[derive(Clone)]
pub struct Billing {
    pub provider: Arc<dyn PaymentProvider>,
    pub currency: String,
}

impl Billing {
    pub fn new(provider: Arc<dyn PaymentProvider>, currency: impl Into<String>) -> Billing {
        Billing {
            provider,
            currency: currency.into(),
        }
    }

    pub async fn create_intent(&self, price: f64) -> Result<Option<String>, BillingError> {
        match minor_units(price) {
            Some(amount) => Ok(Some(
                self.provider.create_intent(amount, &self.currency).await?,
            )),
            None => Ok(None),
        }
    }
}

#[rocket::async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates an intent for `amount` minor currency units and returns its client secret.
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<String, BillingError>;
}

/// Converts a price in major units into minor units (cents).
pub fn minor_units(price: f64) -> Option<i64> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }

    let cents = (price * 100.0).round();
    if cents < 1.0 || cents > i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

pub fn from_config(config: &Config) -> Billing {
    let provider: Arc<dyn PaymentProvider> = match &config.stripe_secret_key {
        Some(key) => {
            tracing::info!("Payment intents are created with Stripe.");
            Arc::new(StripeProvider::new(key.clone()))
        }
        None => {
            tracing::warn!("No payment provider key configured. Payment intents are disabled.");
            Arc::new(DisabledProvider)
        }
    };

    Billing::new(provider, config.currency.clone())
}

#[derive(Clone)]
pub struct StripeProvider {
    client: reqwest::Client,
    secret_key: String,
}

impl std::fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProvider")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: String,
}

impl StripeProvider {
    pub fn new(secret_key: String) -> StripeProvider {
        StripeProvider {
            client: reqwest::Client::new(),
            secret_key,
        }
    }
}

#[rocket::async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_intent(&self, amount: i64, currency: &str) -> Result<String, BillingError> {
        let amount = amount.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .client
            .post(format!("{STRIPE_API}/payment_intents"))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorResponse>()
                .await
                .map(|it| it.error.message)
                .unwrap_or_default();
            return Err(BillingError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let intent: PaymentIntentResponse = response.json().await?;
        Ok(intent.client_secret)
    }
}

/// Refuses every intent; used when no provider key is configured.
#[derive(Debug, Clone, Copy)]
pub struct DisabledProvider;

#[rocket::async_trait]
impl PaymentProvider for DisabledProvider {
    async fn create_intent(&self, _amount: i64, _currency: &str) -> Result<String, BillingError> {
        Err(BillingError::Unconfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_convert_to_cents() {
        assert_eq!(minor_units(49.99), Some(4999));
        assert_eq!(minor_units(10.0), Some(1000));
        assert_eq!(minor_units(0.0), None);
        assert_eq!(minor_units(-3.0), None);
        assert_eq!(minor_units(f64::NAN), None);
    }

    #[rocket::async_test]
    async fn disabled_provider_refuses() {
        let result = DisabledProvider.create_intent(100, "usd").await;
        assert!(matches!(result, Err(BillingError::Unconfigured)));
    }
}
