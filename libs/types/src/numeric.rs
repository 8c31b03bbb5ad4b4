//! Fixed-point amounts for trade display
//!
//! Uses rust_decimal so that dividing a smallest-unit amount by 10^9 and
//! rounding to two places never shows binary floating-point artifacts.
//! Display rounding is half away from zero.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PayloadError;

/// Number of decimal places between the native smallest unit and one whole coin.
pub const NATIVE_DECIMALS: u32 = 9;

/// Places shown for every numeric column.
pub const DISPLAY_DECIMALS: u32 = 2;

/// An amount of the chain's native coin, held in its smallest unit.
///
/// `NativeAmount::from_units(1_500_000_000)` is one and a half coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeAmount(Decimal);

impl NativeAmount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create from an integer count of smallest units.
    pub fn from_units(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// Create from a decimal count of smallest units.
    ///
    /// Returns `None` for negative amounts.
    pub fn try_new(units: Decimal) -> Option<Self> {
        if units.is_sign_negative() && !units.is_zero() {
            None
        } else {
            Some(Self(units))
        }
    }

    /// Raw smallest-unit value.
    pub fn units(&self) -> Decimal {
        self.0
    }

    /// Value in whole coins (`units / 10^9`).
    pub fn to_display_units(&self) -> Decimal {
        self.0 / Decimal::from(10u64.pow(NATIVE_DECIMALS))
    }

    /// Whole-coin value formatted to two decimals.
    pub fn format_display(&self) -> String {
        format_fixed2(self.to_display_units())
    }
}

impl fmt::Display for NativeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format a value with exactly two decimal places, rounding half away from zero.
pub fn format_fixed2(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Read a decimal out of a JSON value.
///
/// Accepts JSON numbers (integer or float) and numeric strings. Floats keep
/// their exact binary value, so `1.005` (stored just below 1.005) rounds to
/// `1.00` on display. Numeric strings are taken as written.
pub fn decimal_from_json(field: &'static str, value: &Value) -> Result<Decimal, PayloadError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Decimal::from(u))
            } else {
                let f = n.as_f64().ok_or_else(|| PayloadError::InvalidNumber {
                    field,
                    reason: format!("unrepresentable number {}", n),
                })?;
                Decimal::from_f64_retain(f).ok_or_else(|| PayloadError::InvalidNumber {
                    field,
                    reason: format!("out of decimal range {}", f),
                })
            }
        }
        Value::String(s) => Decimal::from_str(s.trim()).map_err(|e| PayloadError::InvalidNumber {
            field,
            reason: e.to_string(),
        }),
        other => Err(PayloadError::InvalidNumber {
            field,
            reason: format!("expected a number, got {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_native_amount_display_units() {
        let amount = NativeAmount::from_units(1_234_567_890);
        assert_eq!(amount.format_display(), "1.23");
    }

    #[test]
    fn test_native_amount_rounds_half_away_from_zero() {
        // 0.125 whole coins
        let amount = NativeAmount::from_units(125_000_000);
        assert_eq!(amount.format_display(), "0.13");
    }

    #[test]
    fn test_native_amount_zero() {
        assert_eq!(NativeAmount::ZERO.format_display(), "0.00");
    }

    #[test]
    fn test_native_amount_rejects_negative() {
        assert!(NativeAmount::try_new(Decimal::from(-1)).is_none());
        assert!(NativeAmount::try_new(Decimal::ZERO).is_some());
    }

    #[test]
    fn test_format_fixed2_pads() {
        assert_eq!(format_fixed2(Decimal::from(42)), "42.00");
        assert_eq!(format_fixed2(Decimal::from_str("31.5").unwrap()), "31.50");
        assert_eq!(format_fixed2(Decimal::from_str("-2.005").unwrap()), "-2.01");
    }

    #[test]
    fn test_decimal_from_json_variants() {
        assert_eq!(decimal_from_json("x", &json!(7)).unwrap(), Decimal::from(7));
        assert_eq!(
            decimal_from_json("x", &json!(30.25)).unwrap(),
            Decimal::from_str("30.25").unwrap()
        );
        assert_eq!(
            decimal_from_json("x", &json!("12.5")).unwrap(),
            Decimal::from_str("12.5").unwrap()
        );
    }

    #[test]
    fn test_float_amounts_round_on_their_binary_value() {
        let from_float = decimal_from_json("market_cap", &json!(1.005)).unwrap();
        assert_eq!(format_fixed2(from_float), "1.00");

        let from_text = decimal_from_json("market_cap", &json!("1.005")).unwrap();
        assert_eq!(format_fixed2(from_text), "1.01");

        let exact = decimal_from_json("market_cap", &json!(2.125)).unwrap();
        assert_eq!(format_fixed2(exact), "2.13");
    }

    #[test]
    fn test_decimal_from_json_rejects_non_numeric() {
        let err = decimal_from_json("market_cap", &json!(true)).unwrap_err();
        assert_eq!(
            err,
            PayloadError::InvalidNumber {
                field: "market_cap",
                reason: "expected a number, got bool".to_string(),
            }
        );
        assert!(decimal_from_json("market_cap", &json!("abc")).is_err());
    }

    proptest! {
        #[test]
        fn prop_display_always_two_decimals(units in 0u64..u64::MAX) {
            let rendered = NativeAmount::from_units(units).format_display();
            let (_, frac) = rendered.split_once('.').unwrap();
            prop_assert_eq!(frac.len(), 2);
        }
    }
}
