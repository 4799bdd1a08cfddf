//! Coupon records and the validation rules applied to them

use super::{CouponInfo, CouponValidation, DiscountType};
use serde::{Deserialize, Serialize};

pub const ERR_EMPTY_CODE: &str = "נא להזין קוד קופון";
pub const ERR_UNKNOWN: &str = "קוד קופון לא תקין";
pub const ERR_EXPIRED: &str = "תוקף הקופון פג";
pub const ERR_WRONG_PRODUCT: &str = "הקופון אינו תקף עבור קורס זה";
pub const ERR_EXHAUSTED: &str = "הקופון כבר נוצל במלואו";

/// A row of the `coupons` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    #[serde(alias = "discountType")]
    pub discount_type: DiscountType,
    #[serde(alias = "discountValue")]
    pub discount_value: f64,
    /// Restricts the coupon to one course when set
    #[serde(default, alias = "productId")]
    pub product_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, alias = "maxUses")]
    pub max_uses: Option<i64>,
    #[serde(default, alias = "timesUsed")]
    pub times_used: i64,
    /// SQLite datetime text (`YYYY-MM-DD HH:MM:SS`, UTC)
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<String>,
    /// Computed by the store against the database clock
    #[serde(skip)]
    pub expired: bool,
}

fn default_active() -> bool {
    true
}

/// Coupon codes are matched case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Decide whether `coupon` (looked up by the code the buyer typed) applies
/// to `product_id`.
pub fn validate_coupon(code: &str, coupon: Option<&Coupon>, product_id: Option<&str>) -> CouponValidation {
    if code.trim().is_empty() {
        return CouponValidation::invalid(ERR_EMPTY_CODE);
    }

    let Some(coupon) = coupon.filter(|c| c.active) else {
        return CouponValidation::invalid(ERR_UNKNOWN);
    };

    if coupon.expired {
        return CouponValidation::invalid(ERR_EXPIRED);
    }

    if let Some(max) = coupon.max_uses {
        if coupon.times_used >= max {
            return CouponValidation::invalid(ERR_EXHAUSTED);
        }
    }

    if let (Some(required), Some(requested)) = (coupon.product_id.as_deref(), product_id) {
        if required != requested {
            return CouponValidation::invalid(ERR_WRONG_PRODUCT);
        }
    }

    CouponValidation::valid(CouponInfo {
        discount_type: coupon.discount_type,
        discount_value: coupon.discount_value,
    })
}
