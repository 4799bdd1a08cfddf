//! Payments - coupon discounts and hosted checkout links
//!
//! Wire types shared by the LMS payment endpoints and the checkout client:
//! - `POST /lms/api/payments/validate-coupon` ([`ValidateCouponRequest`] → [`CouponValidation`])
//! - `POST /lms/api/payments/create-link` ([`CreateLinkRequest`] → [`CreateLinkResponse`])

pub mod coupons;
pub mod gateway;

pub use coupons::{Coupon, validate_coupon};
pub use gateway::{CheckoutRequest, HostedCheckoutGateway, PaymentGateway};

use serde::{Deserialize, Serialize};

/// How a coupon reduces the price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percent,
    Flat,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percent => "percent",
            DiscountType::Flat => "flat",
        }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "percent" | "percentage" | "%" => Ok(DiscountType::Percent),
            "flat" | "fixed" | "amount" => Ok(DiscountType::Flat),
            _ => Err(crate::Error::Validation(format!("Unknown discount type: {}", s))),
        }
    }
}

/// A concrete discount that can be applied to a price
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Discount {
    /// Percent off, rounded to the nearest whole unit
    Percent(f64),
    /// Fixed amount off, floored at zero
    Flat(f64),
}

impl Discount {
    pub fn new(kind: DiscountType, value: f64) -> Self {
        match kind {
            DiscountType::Percent => Discount::Percent(value),
            DiscountType::Flat => Discount::Flat(value),
        }
    }

    /// Discounted price for a whole-shekel base price.
    ///
    /// Percent: `round(price × (1 − p/100))`. Flat: `max(0, price − amount)`.
    pub fn apply(&self, price: i64) -> i64 {
        let discounted = match *self {
            Discount::Percent(percent) => (price as f64 * (1.0 - percent / 100.0)).round(),
            Discount::Flat(amount) => (price as f64 - amount).round(),
        };
        (discounted as i64).max(0)
    }
}

/// Coupon details as returned by the validation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInfo {
    pub discount_type: DiscountType,
    pub discount_value: f64,
}

impl CouponInfo {
    pub fn discount(&self) -> Discount {
        Discount::new(self.discount_type, self.discount_value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CouponValidation {
    pub fn valid(coupon: CouponInfo) -> Self {
        Self {
            valid: true,
            coupon: Some(coupon),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            coupon: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
