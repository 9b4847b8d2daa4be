//! Validation utilities for the warehouse platform
//!
//! Includes Uzbekistan phone number rules used for employee and supplier contacts.

// ============================================================================
// Name Validations
// ============================================================================

/// Length bounds for warehouse names
pub const WAREHOUSE_NAME: (usize, usize) = (4, 100);
/// Length bounds for category names
pub const CATEGORY_NAME: (usize, usize) = (4, 100);
/// Length bounds for measurement names
pub const MEASUREMENT_NAME: (usize, usize) = (2, 100);
/// Length bounds for product, supplier, currency and person names
pub const GENERIC_NAME: (usize, usize) = (1, 100);

/// Validate a display name against character-count bounds after trimming
pub fn validate_name(value: &str, bounds: (usize, usize)) -> Result<(), String> {
    let (min, max) = bounds;
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(format!("Name must be between {} and {} characters", min, max));
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

// ============================================================================
// Uzbekistan-Specific Validations
// ============================================================================

/// Mobile operator codes accepted after the +998 country code
pub const UZ_OPERATOR_CODES: &[&str] = &["90", "91", "93", "94", "95", "97", "98", "99", "33", "50", "88"];

/// Validate Uzbek mobile number format: `+998` + operator code + 7 digits
/// Accepts: +998901234567
pub fn validate_phone_number(phone: &str) -> Result<(), &'static str> {
    let rest = phone
        .strip_prefix("+998")
        .ok_or("Phone number must start with +998")?;

    if rest.len() != 9 || !rest.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number must have 9 digits after +998");
    }

    if !UZ_OPERATOR_CODES.contains(&&rest[..2]) {
        return Err("Unknown mobile operator code");
    }

    Ok(())
}
