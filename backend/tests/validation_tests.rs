//! Input validation tests
//!
//! Name bounds for catalog entities, password strength and Uzbek mobile numbers.

use proptest::prelude::*;
use shared::validation::{CATEGORY_NAME, GENERIC_NAME, MEASUREMENT_NAME, WAREHOUSE_NAME};
use shared::{validate_name, validate_password, validate_phone_number, Pagination, MAX_PER_PAGE};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_warehouse_name_bounds() {
        assert!(validate_name("Main", WAREHOUSE_NAME).is_ok());
        assert!(validate_name("Mai", WAREHOUSE_NAME).is_err());
        assert!(validate_name(&"w".repeat(101), WAREHOUSE_NAME).is_err());
    }

    #[test]
    fn test_names_are_trimmed_before_counting() {
        assert!(validate_name("   ab   ", CATEGORY_NAME).is_err());
        assert!(validate_name("  kg ", MEASUREMENT_NAME).is_ok());
        assert!(validate_name("   ", GENERIC_NAME).is_err());
    }

    #[test]
    fn test_names_count_characters_not_bytes() {
        assert!(validate_name("Ombor", WAREHOUSE_NAME).is_ok());
        assert!(validate_name("Склад", WAREHOUSE_NAME).is_ok());
        assert!(validate_name(&"ш".repeat(100), GENERIC_NAME).is_ok());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_phone_numbers() {
        assert!(validate_phone_number("+998901234567").is_ok());
        assert!(validate_phone_number("+998331234567").is_ok());
        assert!(validate_phone_number("998901234567").is_err());
        assert!(validate_phone_number("+99890123456").is_err());
        assert!(validate_phone_number("+9989012345678").is_err());
        assert!(validate_phone_number("+998901234a67").is_err());
        assert!(validate_phone_number("+998111234567").is_err());
    }

    #[test]
    fn test_pagination_clamps_input() {
        let p = Pagination::new(Some(0), Some(1000));
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PER_PAGE);
        assert_eq!(Pagination::new(Some(3), Some(25)).offset(), 50);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every known operator code followed by seven digits is accepted
        #[test]
        fn prop_valid_phone_numbers_accepted(
            operator in prop::sample::select(vec!["90", "91", "93", "94", "95", "97", "98", "99", "33", "50", "88"]),
            subscriber in "[0-9]{7}",
        ) {
            let phone = format!("+998{}{}", operator, subscriber);
            prop_assert!(validate_phone_number(&phone).is_ok());
        }

        /// Numbers without the country prefix are always rejected
        #[test]
        fn prop_local_numbers_rejected(digits in "[0-9]{9,12}") {
            prop_assert!(validate_phone_number(&digits).is_err());
        }

        /// Generic names inside the bounds pass
        #[test]
        fn prop_generic_names_accepted(name in "[A-Za-z][A-Za-z0-9 ]{0,98}[A-Za-z]") {
            prop_assert!(validate_name(&name, GENERIC_NAME).is_ok());
        }

        /// Offsets never skip or repeat rows between consecutive pages
        #[test]
        fn prop_pages_are_contiguous(page in 1u32..1000, per_page in 1u32..=100) {
            let current = Pagination::new(Some(page), Some(per_page));
            let next = Pagination::new(Some(page + 1), Some(per_page));
            prop_assert_eq!(next.offset() - current.offset(), current.limit());
        }
    }
}
