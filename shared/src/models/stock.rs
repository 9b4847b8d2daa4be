//! Stock movement rules
//!
//! Balance arithmetic for stock-in and stock-out documents. The backend
//! applies these rules against rows locked inside a transaction, so the
//! functions here decide the outcome and the database only stores it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a stock movement is rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("measurement count must be positive, got {0}")]
    NonPositiveCount(i32),

    #[error("price cannot be negative")]
    NegativePrice,

    #[error("price can have at most 2 decimal places")]
    PriceScale,

    #[error("price cannot exceed 9999999999999999.99")]
    PriceTooLarge,

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("balance would overflow")]
    Overflow,

    #[error("amount cannot exceed 9999999999999999.99")]
    AmountTooLarge,
}

/// Decimal places kept by money columns
pub const MONEY_SCALE: u32 = 2;

/// Largest value a `NUMERIC(18, 2)` money column holds
pub fn max_money() -> Decimal {
    Decimal::new(999_999_999_999_999_999, MONEY_SCALE)
}

/// Quantity of one product requested by a document line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: i64,
    pub measurement_count: i32,
}

/// Check a single document line before it touches any balance
pub fn validate_line(measurement_count: i32, price: Decimal) -> Result<(), StockError> {
    if measurement_count <= 0 {
        return Err(StockError::NonPositiveCount(measurement_count));
    }
    if price < Decimal::ZERO {
        return Err(StockError::NegativePrice);
    }
    if price.normalize().scale() > MONEY_SCALE {
        return Err(StockError::PriceScale);
    }
    if price > max_money() {
        return Err(StockError::PriceTooLarge);
    }
    Ok(())
}

/// New balance after receiving `count` units
pub fn apply_stock_in(balance: i32, count: i32) -> Result<i32, StockError> {
    if count <= 0 {
        return Err(StockError::NonPositiveCount(count));
    }
    balance.checked_add(count).ok_or(StockError::Overflow)
}

/// New balance after issuing `count` units; the balance may reach zero but never go below it
pub fn apply_stock_out(balance: i32, count: i32) -> Result<i32, StockError> {
    if count <= 0 {
        return Err(StockError::NonPositiveCount(count));
    }
    if count > balance {
        return Err(StockError::InsufficientStock {
            available: balance,
            requested: count,
        });
    }
    Ok(balance - count)
}

/// Monetary value of one line; fails when it does not fit a money column
pub fn line_amount(price: Decimal, measurement_count: i32) -> Result<Decimal, StockError> {
    price
        .checked_mul(Decimal::from(measurement_count))
        .filter(|amount| *amount <= max_money())
        .ok_or(StockError::AmountTooLarge)
}

/// Sum of line amounts for a document header
pub fn document_total<I>(amounts: I) -> Result<Decimal, StockError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .filter(|total| *total <= max_money())
        .ok_or(StockError::AmountTooLarge)
}

/// Combine lines for the same product, ordered by product id.
///
/// The ordering doubles as the lock order when balances are updated, so
/// two documents touching the same products never lock them in opposite order.
pub fn merge_lines(lines: &[StockLine]) -> Result<Vec<StockLine>, StockError> {
    let mut merged: BTreeMap<i64, i32> = BTreeMap::new();
    for line in lines {
        if line.measurement_count <= 0 {
            return Err(StockError::NonPositiveCount(line.measurement_count));
        }
        let total = merged.entry(line.product_id).or_insert(0);
        *total = total
            .checked_add(line.measurement_count)
            .ok_or(StockError::Overflow)?;
    }

    Ok(merged
        .into_iter()
        .map(|(product_id, measurement_count)| StockLine {
            product_id,
            measurement_count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_stock_in_adds_to_balance() {
        assert_eq!(apply_stock_in(0, 5), Ok(5));
        assert_eq!(apply_stock_in(10, 5), Ok(15));
    }

    #[test]
    fn test_stock_in_rejects_non_positive_and_overflow() {
        assert_eq!(apply_stock_in(10, 0), Err(StockError::NonPositiveCount(0)));
        assert_eq!(apply_stock_in(i32::MAX, 1), Err(StockError::Overflow));
    }

    #[test]
    fn test_stock_out_allows_exact_balance() {
        assert_eq!(apply_stock_out(7, 7), Ok(0));
    }

    #[test]
    fn test_stock_out_rejects_shortage() {
        assert_eq!(
            apply_stock_out(3, 4),
            Err(StockError::InsufficientStock {
                available: 3,
                requested: 4
            })
        );
    }

    #[test]
    fn test_line_amount_and_total() {
        let a = line_amount(dec("12.50"), 4).unwrap();
        let b = line_amount(dec("0.99"), 3).unwrap();
        assert_eq!(a, dec("50.00"));
        assert_eq!(document_total([a, b]), Ok(dec("52.97")));
        assert_eq!(document_total(Vec::<Decimal>::new()), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_huge_price_is_rejected_not_multiplied() {
        let huge = dec("50000000000000000000000000000");
        assert_eq!(validate_line(2, huge), Err(StockError::PriceTooLarge));
        assert_eq!(line_amount(huge, 2), Err(StockError::AmountTooLarge));
        assert_eq!(line_amount(Decimal::MAX, 2), Err(StockError::AmountTooLarge));
    }

    #[test]
    fn test_amount_must_fit_money_column() {
        assert_eq!(line_amount(max_money(), 1), Ok(max_money()));
        assert_eq!(line_amount(max_money(), 2), Err(StockError::AmountTooLarge));
        assert_eq!(
            document_total([max_money(), dec("0.01")]),
            Err(StockError::AmountTooLarge)
        );
        assert_eq!(
            document_total([Decimal::MAX, Decimal::MAX]),
            Err(StockError::AmountTooLarge)
        );
    }

    #[test]
    fn test_price_scale_matches_money_column() {
        assert!(validate_line(3, dec("0.01")).is_ok());
        assert!(validate_line(3, dec("1.500")).is_ok());
        assert_eq!(validate_line(3, dec("0.004")), Err(StockError::PriceScale));
        assert!(validate_line(1, max_money()).is_ok());
        assert_eq!(
            validate_line(1, dec("10000000000000000")),
            Err(StockError::PriceTooLarge)
        );
    }

    #[test]
    fn test_merge_lines_sums_and_sorts() {
        let lines = [
            StockLine { product_id: 9, measurement_count: 2 },
            StockLine { product_id: 3, measurement_count: 1 },
            StockLine { product_id: 9, measurement_count: 5 },
        ];
        let merged = merge_lines(&lines).unwrap();
        assert_eq!(
            merged,
            vec![
                StockLine { product_id: 3, measurement_count: 1 },
                StockLine { product_id: 9, measurement_count: 7 },
            ]
        );
    }

    #[test]
    fn test_validate_line() {
        assert!(validate_line(1, Decimal::ZERO).is_ok());
        assert_eq!(validate_line(-2, dec("1")), Err(StockError::NonPositiveCount(-2)));
        assert_eq!(validate_line(1, dec("-0.01")), Err(StockError::NegativePrice));
    }
}
