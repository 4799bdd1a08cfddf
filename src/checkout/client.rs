//! Payment API used by the checkout session

use crate::config::LmsSection;
use crate::payments::{CouponValidation, CreateLinkRequest, CreateLinkResponse, ValidateCouponRequest};
use crate::Result;
use async_trait::async_trait;

/// The two LMS payment endpoints, as seen from the buyer's side
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn validate_coupon(&self, request: &ValidateCouponRequest) -> Result<CouponValidation>;

    async fn create_link(&self, request: &CreateLinkRequest) -> Result<CreateLinkResponse>;
}

/// `PaymentApi` over HTTP against a running LMS API
pub struct HttpPaymentApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPaymentApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client for the LMS API at `[lms] public_url`.
    pub fn from_config(config: &LmsSection) -> Self {
        Self::new(config.public_url.as_str())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/lms/api/payments/{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl PaymentApi for HttpPaymentApi {
    async fn validate_coupon(&self, request: &ValidateCouponRequest) -> Result<CouponValidation> {
        let resp = self.http.post(self.url("validate-coupon")).json(request).send().await?;
        // Error statuses still carry a `{valid, error}` body.
        Ok(resp.json().await?)
    }

    async fn create_link(&self, request: &CreateLinkRequest) -> Result<CreateLinkResponse> {
        let resp = self.http.post(self.url("create-link")).json(request).send().await?;
        Ok(resp.json().await?)
    }
}
