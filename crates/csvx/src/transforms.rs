//! 🔄 Row Validator/Transformer: [`RawRow`] in, [`DeviceRecord`] out (or a reason why not).
//!
//! Source schema, 0-indexed:
//!
//! ```text
//!  0 id (ignored)   1 device name   2 device type   3 brand
//!  4 model          5 os            6 os version    7 purchase date
//!  8 warranty end   9 status       10 price (unsigned integer, as text)
//! ```
//!
//! Prices land in a signed 64-bit column, so the ceiling is `i64::MAX`.
//!
//! Pure function, no I/O. The caller decides what to do with a rejection;
//! the worker logs it and moves on without the row.

use std::num::ParseIntError;

use thiserror::Error;

use crate::common::{DeviceRecord, EXPECTED_FIELD_COUNT, RawRow};

/// 🏷️ Index of the only field that has to be more than a string.
pub const PRICE_FIELD: usize = 10;

/// 🚫 Why a row did not make it into the insert set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid price value {literal:?}: {reason}")]
    Price {
        literal: String,
        #[source]
        reason: ParseIntError,
    },
    #[error("price {literal:?} is larger than the store can hold (max {max})")]
    PriceTooLarge { literal: String, max: i64 },
}

/// 🔄 Check the field count, coerce the price, copy the rest verbatim.
///
/// Takes the row by value so the strings move into the record instead of
/// being cloned. Grab `row_number` first if you need it for a log line.
pub fn validate_row(row: RawRow) -> Result<DeviceRecord, RowRejection> {
    let fields: [String; EXPECTED_FIELD_COUNT] =
        row.fields
            .try_into()
            .map_err(|fields: Vec<String>| RowRejection::FieldCount {
                expected: EXPECTED_FIELD_COUNT,
                found: fields.len(),
            })?;

    let [
        _id,
        device_name,
        device_type,
        brand,
        model,
        os,
        os_version,
        purchase_date,
        warranty_end,
        status,
        price_literal,
    ] = fields;

    let price = price_literal
        .parse::<u64>()
        .map_err(|reason| RowRejection::Price {
            literal: price_literal.clone(),
            reason,
        })?;
    let price = i64::try_from(price).map_err(|_| RowRejection::PriceTooLarge {
        literal: price_literal.clone(),
        max: i64::MAX,
    })?;

    Ok(DeviceRecord {
        device_name,
        device_type,
        brand,
        model,
        os,
        os_version,
        purchase_date,
        warranty_end,
        status,
        price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_row(price: &str) -> RawRow {
        let fields = [
            "17",
            "Work Laptop",
            "Laptop",
            "Lenovo",
            "ThinkPad X1",
            "Windows",
            "11",
            "2023-01-15",
            "2026-01-15",
            "Active",
            price,
        ];
        RawRow::new(1, fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn the_one_where_a_good_row_becomes_a_record() {
        let record = validate_row(device_row("1299")).expect("valid row");
        assert_eq!(
            record,
            DeviceRecord {
                device_name: "Work Laptop".into(),
                device_type: "Laptop".into(),
                brand: "Lenovo".into(),
                model: "ThinkPad X1".into(),
                os: "Windows".into(),
                os_version: "11".into(),
                purchase_date: "2023-01-15".into(),
                warranty_end: "2026-01-15".into(),
                status: "Active".into(),
                price: 1299,
            }
        );
    }

    #[test]
    fn the_one_where_ten_fields_is_one_too_few() {
        let mut row = device_row("10");
        row.fields.pop();
        assert_eq!(
            validate_row(row),
            Err(RowRejection::FieldCount {
                expected: 11,
                found: 10
            })
        );
    }

    #[test]
    fn the_one_where_twelve_fields_is_one_too_many() {
        let mut row = device_row("10");
        row.fields.push("bonus".into());
        assert!(matches!(
            validate_row(row),
            Err(RowRejection::FieldCount { found: 12, .. })
        ));
    }

    #[test]
    fn the_one_where_prices_must_be_unsigned_integers() {
        for literal in ["free", "", "-5", "12.50", " 42", "99999999999999999999"] {
            match validate_row(device_row(literal)) {
                Err(RowRejection::Price { literal: seen, .. }) => assert_eq!(seen, literal),
                other => panic!("💀 expected a price rejection for {literal:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn the_one_where_a_price_past_four_billion_is_still_a_price() {
        let record = validate_row(device_row("5000000000")).expect("fits in BIGINT");
        assert_eq!(record.price, 5_000_000_000);

        let record = validate_row(device_row("9223372036854775807")).expect("the ceiling itself");
        assert_eq!(record.price, i64::MAX);
    }

    #[test]
    fn the_one_where_a_price_past_the_column_ceiling_is_turned_away() {
        assert_eq!(
            validate_row(device_row("9223372036854775808")),
            Err(RowRejection::PriceTooLarge {
                literal: "9223372036854775808".into(),
                max: i64::MAX,
            })
        );
    }

    #[test]
    fn the_one_where_the_diagnostic_names_the_offending_literal() {
        let err = validate_row(device_row("lots")).expect_err("not a number");
        assert!(err.to_string().contains("\"lots\""), "{err}");
    }

    #[test]
    fn the_one_where_text_fields_are_copied_without_judgement() {
        let mut row = device_row("0");
        row.fields[1] = "  spaced out  ".into();
        row.fields[7] = "not-a-date".into();
        let record = validate_row(row).expect("text fields are not validated");
        assert_eq!(record.device_name, "  spaced out  ");
        assert_eq!(record.purchase_date, "not-a-date");
        assert_eq!(record.price, 0);
    }
}
