//! Amounts are stored as integer cents and exchanged as two-place decimals.
//!
//! Use on `i64` fields with `#[serde(with = "crate::money")]`, or on
//! `Option<i64>` fields with `#[serde(default, with = "crate::money::option")]`.

use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

// Largest cent count an f64 carries without losing whole cents (2^53).
const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_992.0;

pub fn to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Rounds to the nearest cent; rejects NaN, infinities and out-of-range amounts.
pub fn from_decimal(amount: f64) -> Result<i64, String> {
    if !amount.is_finite() {
        return Err(format!("amount must be a finite number, got {amount}"));
    }
    let cents = (amount * 100.0).round();
    if cents.abs() > MAX_EXACT_CENTS {
        return Err(format!("amount {amount} is out of range"));
    }
    Ok(cents as i64)
}

pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(to_decimal(*cents))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let amount = f64::deserialize(deserializer)?;
    from_decimal(amount).map_err(D::Error::custom)
}

pub mod option {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(cents: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match cents {
            Some(cents) => serializer.serialize_some(&super::to_decimal(*cents)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(super::from_decimal)
            .transpose()
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Priced {
        #[serde(with = "crate::money")]
        price: i64,
        #[serde(default, with = "crate::money::option")]
        oldprice: Option<i64>,
    }

    #[test]
    fn cents_go_out_as_decimals() {
        let body = serde_json::to_value(Priced {
            price: 1999,
            oldprice: Some(2500),
        })
        .unwrap();
        assert_eq!(body, json!({ "price": 19.99, "oldprice": 25.0 }));

        let body = serde_json::to_value(Priced {
            price: 5,
            oldprice: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "price": 0.05, "oldprice": null }));
    }

    #[test]
    fn decimals_come_in_as_rounded_cents() {
        let parsed: Priced = serde_json::from_value(json!({ "price": 12.3456 })).unwrap();
        assert_eq!(parsed.price, 1235);
        assert_eq!(parsed.oldprice, None);

        let parsed: Priced = serde_json::from_value(json!({ "price": 40, "oldprice": 0.1 })).unwrap();
        assert_eq!(parsed.price, 4000);
        assert_eq!(parsed.oldprice, Some(10));
    }

    #[test]
    fn unusable_amounts_are_rejected() {
        assert!(from_decimal(f64::NAN).is_err());
        assert!(from_decimal(f64::INFINITY).is_err());
        assert!(from_decimal(1e300).is_err());
        assert!(serde_json::from_value::<Priced>(json!({ "price": "ten" })).is_err());
    }
}
