//! Checkout Session - the payment modal's state and behaviour
//!
//! Holds what the buyer is about to pay for, applies coupons through the
//! validation endpoint and turns a submitted form into a hosted checkout
//! URL. Every failure path leaves the session ready for another attempt:
//! `submitting` is never left set.

pub mod client;

pub use crate::payments::Discount;
pub use client::{HttpPaymentApi, PaymentApi};

use crate::payments::{CreateLinkRequest, ValidateCouponRequest};

pub const MSG_NAME_REQUIRED: &str = "נא להזין שם מלא";
pub const MSG_EMAIL_INVALID: &str = "נא להזין כתובת אימייל תקינה";
pub const MSG_COUPON_REQUIRED: &str = "נא להזין קוד קופון";
pub const MSG_COUPON_INVALID: &str = "קופון לא תקין";
pub const MSG_COUPON_FAILED: &str = "שגיאה בבדיקת הקופון";
pub const MSG_LINK_FAILED: &str = "אירעה שגיאה ביצירת קישור התשלום, נסו שוב";
pub const MSG_NETWORK: &str = "אירעה שגיאה, נסו שוב";

/// Feedback shown under the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Success(s) | Notice::Error(s) => s,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// Buyer details collected by the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuyerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl BuyerDetails {
    fn validate(&self) -> Result<(), &'static str> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(MSG_NAME_REQUIRED);
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(MSG_EMAIL_INVALID);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Navigate the browser here
    Redirect(String),
    /// Stay on the form; `notice` explains why
    Rejected,
}

pub struct CheckoutSession<A: PaymentApi> {
    api: A,
    pub product_id: String,
    pub course_name: String,
    pub base_price: i64,
    pub discounted_price: Option<i64>,
    pub applied_coupon: Option<String>,
    submitting: bool,
    notice: Option<Notice>,
}

impl<A: PaymentApi> CheckoutSession<A> {
    pub fn new(api: A, product_id: impl Into<String>, course_name: impl Into<String>, base_price: i64) -> Self {
        Self {
            api,
            product_id: product_id.into(),
            course_name: course_name.into(),
            base_price,
            discounted_price: None,
            applied_coupon: None,
            submitting: false,
            notice: None,
        }
    }

    /// Price that will be charged right now
    pub fn effective_price(&self) -> i64 {
        self.discounted_price.unwrap_or(self.base_price)
    }

    pub fn submit_enabled(&self) -> bool {
        !self.submitting
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn clear_discount(&mut self) {
        self.discounted_price = None;
        self.applied_coupon = None;
    }

    /// Validate `code` with the server and apply it to the base price.
    pub async fn apply_coupon(&mut self, code: &str) -> Option<i64> {
        let code = code.trim();
        if code.is_empty() {
            self.notice = Some(Notice::Error(MSG_COUPON_REQUIRED.to_string()));
            return None;
        }

        let request = ValidateCouponRequest {
            code: code.to_string(),
            product_id: Some(self.product_id.clone()),
        };

        match self.api.validate_coupon(&request).await {
            Ok(result) if result.valid => {
                let Some(coupon) = result.coupon else {
                    self.clear_discount();
                    self.notice = Some(Notice::Error(MSG_COUPON_INVALID.to_string()));
                    return None;
                };
                let price = coupon.discount().apply(self.base_price);
                self.discounted_price = Some(price);
                self.applied_coupon = Some(code.to_string());
                self.notice = Some(Notice::Success(format!("הקופון הופעל! מחיר חדש: ₪{}", price)));
                Some(price)
            }
            Ok(result) => {
                self.clear_discount();
                let message = result.error.unwrap_or_else(|| MSG_COUPON_INVALID.to_string());
                self.notice = Some(Notice::Error(message));
                None
            }
            Err(e) => {
                tracing::warn!("Coupon validation failed: {}", e);
                self.clear_discount();
                self.notice = Some(Notice::Error(MSG_COUPON_FAILED.to_string()));
                None
            }
        }
    }

    /// Validate the form and request a payment link.
    pub async fn submit(&mut self, buyer: &BuyerDetails) -> SubmitOutcome {
        if let Err(message) = buyer.validate() {
            self.notice = Some(Notice::Error(message.to_string()));
            return SubmitOutcome::Rejected;
        }

        self.submitting = true;
        self.notice = None;

        let request = CreateLinkRequest {
            product_id: self.product_id.clone(),
            course_name: self.course_name.clone(),
            price: self.effective_price(),
            first_name: buyer.first_name.trim().to_string(),
            last_name: buyer.last_name.trim().to_string(),
            email: buyer.email.trim().to_string(),
            phone: buyer.phone.clone().filter(|p| !p.trim().is_empty()),
            coupon_code: self.applied_coupon.clone(),
        };

        let outcome = match self.api.create_link(&request).await {
            Ok(resp) => match resp.payment_url {
                Some(url) if !url.is_empty() => return SubmitOutcome::Redirect(url),
                _ => {
                    let message = resp.error.unwrap_or_else(|| MSG_LINK_FAILED.to_string());
                    self.notice = Some(Notice::Error(message));
                    SubmitOutcome::Rejected
                }
            },
            Err(e) => {
                tracing::warn!("Payment link request failed: {}", e);
                self.notice = Some(Notice::Error(MSG_NETWORK.to_string()));
                SubmitOutcome::Rejected
            }
        };

        self.submitting = false;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{CouponInfo, CouponValidation, CreateLinkResponse, DiscountType};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        coupon: Option<CouponValidation>,
        link: Option<CreateLinkResponse>,
        fail_transport: bool,
        link_requests: Mutex<Vec<CreateLinkRequest>>,
        coupon_calls: Mutex<usize>,
    }

    #[async_trait]
    impl PaymentApi for FakeApi {
        async fn validate_coupon(&self, _request: &ValidateCouponRequest) -> Result<CouponValidation> {
            *self.coupon_calls.lock().unwrap() += 1;
            if self.fail_transport {
                return Err(Error::Upstream("connection refused".to_string()));
            }
            Ok(self.coupon.clone().unwrap_or_else(|| CouponValidation::invalid("קוד קופון לא תקין")))
        }

        async fn create_link(&self, request: &CreateLinkRequest) -> Result<CreateLinkResponse> {
            self.link_requests.lock().unwrap().push(request.clone());
            if self.fail_transport {
                return Err(Error::Upstream("connection refused".to_string()));
            }
            Ok(self.link.clone().unwrap_or(CreateLinkResponse {
                payment_url: None,
                error: Some("server error".to_string()),
            }))
        }
    }

    fn percent(value: f64) -> CouponValidation {
        CouponValidation::valid(CouponInfo {
            discount_type: DiscountType::Percent,
            discount_value: value,
        })
    }

    fn flat(value: f64) -> CouponValidation {
        CouponValidation::valid(CouponInfo {
            discount_type: DiscountType::Flat,
            discount_value: value,
        })
    }

    fn buyer() -> BuyerDetails {
        BuyerDetails {
            first_name: "Dana".to_string(),
            last_name: "Levi".to_string(),
            email: "dana@example.com".to_string(),
            phone: Some("050-0000000".to_string()),
        }
    }

    fn session(api: FakeApi) -> CheckoutSession<FakeApi> {
        CheckoutSession::new(api, "minecraft", "קורס מיינקראפט", 497)
    }

    #[tokio::test]
    async fn test_percent_coupon() {
        let mut s = session(FakeApi { coupon: Some(percent(20.0)), ..Default::default() });
        assert_eq!(s.apply_coupon("SUMMER20").await, Some(398));
        assert_eq!(s.effective_price(), 398);
        assert_eq!(s.applied_coupon.as_deref(), Some("SUMMER20"));
        assert!(!s.notice().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_flat_coupons() {
        let mut s = session(FakeApi { coupon: Some(flat(50.0)), ..Default::default() });
        assert_eq!(s.apply_coupon("FIFTY").await, Some(447));

        let mut s = session(FakeApi { coupon: Some(flat(1000.0)), ..Default::default() });
        assert_eq!(s.apply_coupon("HUGE").await, Some(0));
    }

    #[tokio::test]
    async fn test_coupon_is_idempotent() {
        let mut s = session(FakeApi { coupon: Some(percent(20.0)), ..Default::default() });
        let first = s.apply_coupon("SUMMER20").await;
        let second = s.apply_coupon("SUMMER20").await;
        assert_eq!(first, second);
        assert_eq!(s.effective_price(), 398);
    }

    #[tokio::test]
    async fn test_invalid_coupon_clears_previous_discount() {
        let mut s = session(FakeApi { coupon: Some(percent(20.0)), ..Default::default() });
        s.apply_coupon("SUMMER20").await;

        s.api.coupon.take();
        assert_eq!(s.apply_coupon("BOGUS").await, None);
        assert_eq!(s.discounted_price, None);
        assert_eq!(s.applied_coupon, None);
        assert_eq!(s.effective_price(), 497);
        assert_eq!(s.notice(), Some(&Notice::Error("קוד קופון לא תקין".to_string())));
    }

    #[tokio::test]
    async fn test_empty_coupon_makes_no_call() {
        let mut s = session(FakeApi::default());
        assert_eq!(s.apply_coupon("   ").await, None);
        assert_eq!(*s.api().coupon_calls.lock().unwrap(), 0);
        assert_eq!(s.notice().unwrap().text(), MSG_COUPON_REQUIRED);
    }

    #[tokio::test]
    async fn test_empty_email_rejected_without_network_call() {
        let mut s = session(FakeApi::default());
        let details = BuyerDetails { email: String::new(), ..buyer() };

        assert_eq!(s.submit(&details).await, SubmitOutcome::Rejected);
        assert!(s.submit_enabled());
        assert_eq!(s.notice().unwrap().text(), "נא להזין כתובת אימייל תקינה");
        assert!(s.api().link_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_without_at_rejected() {
        let mut s = session(FakeApi::default());
        let details = BuyerDetails { email: "dana.example.com".to_string(), ..buyer() };
        assert_eq!(s.submit(&details).await, SubmitOutcome::Rejected);
        assert_eq!(s.notice().unwrap().text(), MSG_EMAIL_INVALID);
    }

    #[tokio::test]
    async fn test_missing_name_rejected() {
        let mut s = session(FakeApi::default());
        let details = BuyerDetails { first_name: " ".to_string(), ..buyer() };
        assert_eq!(s.submit(&details).await, SubmitOutcome::Rejected);
        assert_eq!(s.notice().unwrap().text(), MSG_NAME_REQUIRED);
    }

    #[tokio::test]
    async fn test_submit_sends_discounted_price_and_redirects() {
        let mut s = session(FakeApi {
            coupon: Some(percent(20.0)),
            link: Some(CreateLinkResponse {
                payment_url: Some("https://pay.test/s/1".to_string()),
                error: None,
            }),
            ..Default::default()
        });
        s.apply_coupon("SUMMER20").await;

        let outcome = s.submit(&buyer()).await;
        assert_eq!(outcome, SubmitOutcome::Redirect("https://pay.test/s/1".to_string()));

        let sent = s.api().link_requests.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].price, 398);
        assert_eq!(sent[0].coupon_code.as_deref(), Some("SUMMER20"));
        assert_eq!(sent[0].course_name, "קורס מיינקראפט");
    }

    #[tokio::test]
    async fn test_submit_without_coupon_uses_base_price() {
        let mut s = session(FakeApi {
            link: Some(CreateLinkResponse {
                payment_url: Some("https://pay.test/s/2".to_string()),
                error: None,
            }),
            ..Default::default()
        });
        s.submit(&buyer()).await;
        assert_eq!(s.api().link_requests.lock().unwrap()[0].price, 497);
    }

    #[tokio::test]
    async fn test_application_error_reenables_submit() {
        let mut s = session(FakeApi::default());
        assert_eq!(s.submit(&buyer()).await, SubmitOutcome::Rejected);
        assert!(s.submit_enabled());
        assert_eq!(s.notice(), Some(&Notice::Error("server error".to_string())));
    }

    #[tokio::test]
    async fn test_network_error_reenables_submit() {
        let mut s = session(FakeApi { fail_transport: true, ..Default::default() });
        assert_eq!(s.submit(&buyer()).await, SubmitOutcome::Rejected);
        assert!(s.submit_enabled());
        assert_eq!(s.notice().unwrap().text(), MSG_NETWORK);
    }

    #[tokio::test]
    async fn test_coupon_transport_error_clears_discount() {
        let mut s = session(FakeApi { fail_transport: true, ..Default::default() });
        assert_eq!(s.apply_coupon("SUMMER20").await, None);
        assert_eq!(s.effective_price(), 497);
        assert_eq!(s.notice().unwrap().text(), MSG_COUPON_FAILED);
    }
}
