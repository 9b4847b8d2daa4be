//! Generated identifiers: document unique numbers, attachment hashes and product numbers

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated alphanumeric codes
pub const CODE_LENGTH: usize = 10;

/// Smallest product number handed out
pub const MIN_PRODUCT_NUMBER: i32 = 10_000;

/// Random alphanumeric code used for unique numbers and attachment hashes
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Random product number in `[MIN_PRODUCT_NUMBER, i32::MAX)`
pub fn generate_product_number<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(MIN_PRODUCT_NUMBER..i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let code = generate_code(&mut rng);
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_codes_differ() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_ne!(generate_code(&mut rng), generate_code(&mut rng));
    }

    #[test]
    fn test_product_number_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let n = generate_product_number(&mut rng);
            assert!(n >= MIN_PRODUCT_NUMBER);
        }
    }
}
