//! Field validators used by `#[derive(Validate)]` request bodies

use std::borrow::Cow;

use validator::ValidationError;

fn invalid(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message.into()));
    err
}

pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    shared::validate_phone_number(value).map_err(|msg| invalid("phone_number", msg))
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    shared::validate_password(value).map_err(|msg| invalid("password", msg))
}

pub fn warehouse_name(value: &str) -> Result<(), ValidationError> {
    shared::validate_name(value, shared::validation::WAREHOUSE_NAME)
        .map_err(|msg| invalid("name", msg))
}

pub fn category_name(value: &str) -> Result<(), ValidationError> {
    shared::validate_name(value, shared::validation::CATEGORY_NAME)
        .map_err(|msg| invalid("name", msg))
}

pub fn measurement_name(value: &str) -> Result<(), ValidationError> {
    shared::validate_name(value, shared::validation::MEASUREMENT_NAME)
        .map_err(|msg| invalid("name", msg))
}

pub fn generic_name(value: &str) -> Result<(), ValidationError> {
    shared::validate_name(value, shared::validation::GENERIC_NAME)
        .map_err(|msg| invalid("name", msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_carried() {
        let err = phone_number("12345").unwrap_err();
        assert_eq!(err.code, "phone_number");
        assert_eq!(
            err.message.as_deref(),
            Some("Phone number must start with +998")
        );
    }

    #[test]
    fn test_name_bridges() {
        assert!(warehouse_name("Main").is_ok());
        assert!(warehouse_name("Abc").is_err());
        assert!(measurement_name("kg").is_ok());
        assert!(generic_name("   ").is_err());
        assert!(category_name("Food").is_ok());
    }
}
