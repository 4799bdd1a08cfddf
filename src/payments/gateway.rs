//! Hosted checkout gateway client
//!
//! The LMS never handles card data. It asks the gateway for a hosted
//! checkout page and hands the returned URL to the browser.

use crate::config::PaymentsSection;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Everything the gateway needs to open a checkout page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub product_id: String,
    pub description: String,
    /// Whole shekels, after any coupon
    pub amount: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub coupon_code: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session and return its URL.
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<String>;
}

pub struct HostedCheckoutGateway {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    currency: String,
    success_url: String,
    cancel_url: String,
}

impl HostedCheckoutGateway {
    /// Gateway from config, or `None` when no endpoint is configured.
    pub fn from_config(config: &PaymentsSection) -> Option<Self> {
        if config.endpoint.trim().is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        })
    }

    fn payload(&self, request: &CheckoutRequest) -> serde_json::Value {
        serde_json::json!({
            "productId": request.product_id,
            "description": request.description,
            "amount": request.amount,
            "currency": self.currency,
            "customer": {
                "firstName": request.first_name,
                "lastName": request.last_name,
                "email": request.email,
                "phone": request.phone,
            },
            "couponCode": request.coupon_code,
            "successUrl": self.success_url,
            "cancelUrl": self.cancel_url,
        })
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<String> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(request))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("gateway returned {}: {}", status.as_u16(), body)));
        }

        let body: serde_json::Value = resp.json().await?;
        body.get("url")
            .or_else(|| body.get("paymentUrl"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Upstream("gateway response has no checkout url".to_string()))
    }
}
