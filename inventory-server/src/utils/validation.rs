//! Input validation helpers
//!
//! Centralized length limits and field checks. Every repository runs these
//! before touching storage, so invalid input never opens a transaction.

use crate::db::repository::{RepoError, RepoResult};
use crate::utils::money::round_price;

// ── Text length limits ──────────────────────────────────────────────

/// Product names
pub const MAX_NAME_LEN: usize = 200;

/// Product descriptions
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Category labels
pub const MAX_CATEGORY_LEN: usize = 100;

/// Customer names (inclusive range, in characters)
pub const MIN_CUSTOMER_NAME_LEN: usize = 2;
pub const MAX_CUSTOMER_NAME_LEN: usize = 150;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Addresses
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Numeric bounds ──────────────────────────────────────────────────

/// Maximum unit price
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Maximum on-hand quantity, also the cap on a single order line
pub const MAX_QUANTITY: i64 = 1_000_000_000;

// ── Identifiers and numbers ─────────────────────────────────────────

/// Ids are server-assigned positive integers.
pub fn validate_id(id: i64, field: &str) -> RepoResult<()> {
    if id <= 0 {
        return Err(RepoError::Validation(format!(
            "{field} must be positive, got {id}"
        )));
    }
    Ok(())
}

/// Prices must be finite, within [`MAX_PRICE`] and still positive after
/// rounding to storage precision. Returns the rounded price.
pub fn validate_price(price: f64) -> RepoResult<f64> {
    if !price.is_finite() || price <= 0.0 || price > MAX_PRICE {
        return Err(RepoError::Validation(format!(
            "price must be between 0.01 and {MAX_PRICE}, got {price}"
        )));
    }
    match round_price(price) {
        Some(rounded) if rounded > 0.0 => Ok(rounded),
        _ => Err(RepoError::Validation(format!(
            "price {price} rounds to zero"
        ))),
    }
}

/// On-hand quantity: `0..=MAX_QUANTITY`
pub fn validate_stock_quantity(quantity: i64) -> RepoResult<()> {
    if !(0..=MAX_QUANTITY).contains(&quantity) {
        return Err(RepoError::Validation(format!(
            "quantity must be between 0 and {MAX_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}

/// Ordered quantity per line: `1..=MAX_QUANTITY`
pub fn validate_line_quantity(quantity: i64, product_id: i64) -> RepoResult<()> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(RepoError::Validation(format!(
            "quantity for product {product_id} must be between 1 and {MAX_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}

// ── Text ────────────────────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> RepoResult<()> {
    if value.trim().is_empty() {
        return Err(RepoError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(RepoError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> RepoResult<()> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(RepoError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        )));
    }
    Ok(())
}

/// Trim a category label; blank labels mean "no category".
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// ── Customer fields ─────────────────────────────────────────────────

pub fn validate_customer_name(name: &str) -> RepoResult<()> {
    let len = name.trim().chars().count();
    if !(MIN_CUSTOMER_NAME_LEN..=MAX_CUSTOMER_NAME_LEN).contains(&len) {
        return Err(RepoError::Validation(format!(
            "name must be {MIN_CUSTOMER_NAME_LEN}-{MAX_CUSTOMER_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Minimal structural email check: `local@domain.tld`, no whitespace.
pub fn validate_email(email: &str) -> RepoResult<()> {
    let invalid = || RepoError::Validation("invalid email format".into());

    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

/// E.164: `+`, then 2 to 15 digits, no leading zero.
pub fn validate_e164(phone: &str) -> RepoResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or_default();
    let valid = (2..=15).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0');
    if !valid {
        return Err(RepoError::Validation(
            "phone_number must be in E.164 format (+79161234567)".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1, "product_id").is_ok());
        assert!(matches!(
            validate_id(0, "product_id"),
            Err(RepoError::Validation(_))
        ));
        assert!(validate_id(-5, "order_id").is_err());
    }

    #[test]
    fn test_validate_price() {
        assert_eq!(validate_price(0.01).unwrap(), 0.01);
        assert_eq!(validate_price(9.999).unwrap(), 10.0);
        assert_eq!(validate_price(MAX_PRICE).unwrap(), MAX_PRICE);
        assert!(validate_price(0.0).is_err());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_price_bounds_apply_to_stored_value() {
        assert!(matches!(
            validate_price(0.004),
            Err(RepoError::Validation(msg)) if msg.contains("rounds to zero")
        ));
        assert!(validate_price(MAX_PRICE + 0.01).is_err());
        assert!(validate_price(1e30).is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_stock_quantity(0).is_ok());
        assert!(validate_stock_quantity(MAX_QUANTITY).is_ok());
        assert!(validate_stock_quantity(-1).is_err());
        assert!(validate_stock_quantity(MAX_QUANTITY + 1).is_err());

        assert!(validate_line_quantity(1, 7).is_ok());
        assert!(validate_line_quantity(MAX_QUANTITY, 7).is_ok());
        assert!(validate_line_quantity(0, 7).is_err());
        assert!(validate_line_quantity(MAX_QUANTITY + 1, 7).is_err());
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Widget", "name", 10).is_ok());
        assert!(validate_required_text("   ", "name", 10).is_err());
        assert!(validate_required_text("abcdefghijk", "name", 10).is_err());
    }

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(Some(" tools ".into())), Some("tools".into()));
        assert_eq!(normalize_category(Some("  ".into())), None);
        assert_eq!(normalize_category(None), None);
    }

    #[test]
    fn test_customer_name_bounds() {
        assert!(validate_customer_name("Al").is_ok());
        assert!(validate_customer_name("A").is_err());
        assert!(validate_customer_name(&"x".repeat(150)).is_ok());
        assert!(validate_customer_name(&"x".repeat(151)).is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("ivan@example.com").is_ok());
        assert!(validate_email("a.b+tag@mail.example.org").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ivan@localhost").is_err());
        assert!(validate_email("ivan@example..com").is_err());
        assert!(validate_email("iv an@example.com").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_e164() {
        assert!(validate_e164("+79161234567").is_ok());
        assert!(validate_e164("+12").is_ok());
        assert!(validate_e164("79161234567").is_err());
        assert!(validate_e164("+0123456").is_err());
        assert!(validate_e164("+7916-123").is_err());
        assert!(validate_e164("+1234567890123456").is_err());
        assert!(validate_e164("+").is_err());
    }
}
