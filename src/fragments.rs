//! Argument types for the SQL fragment generators on [`SqlDialect`](crate::provider::SqlDialect).

use crate::error::ProviderError;
use crate::types::{DateTimeKind, ParamValue};

const ORIGIN: &str = "RowLimit";

/// Cardinality cap applied by `max_rows_rewrite`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowLimit {
    /// Leave the statement untouched
    #[default]
    Unlimited,
    /// Constant row cap
    Fixed(u64),
    /// Cap read from a bind variable at run time
    BindVariable(String),
}

impl From<u64> for RowLimit {
    fn from(value: u64) -> Self {
        if value == 0 {
            RowLimit::Unlimited
        } else {
            RowLimit::Fixed(value)
        }
    }
}

impl From<&str> for RowLimit {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            RowLimit::Unlimited
        } else {
            RowLimit::BindVariable(value.to_string())
        }
    }
}

impl TryFrom<&ParamValue> for RowLimit {
    type Error = ProviderError;

    /// Only integers and text describe a row cap; `0`, `""` and `DbNull` mean unlimited.
    fn try_from(value: &ParamValue) -> Result<Self, Self::Error> {
        match value {
            ParamValue::DbNull => Ok(RowLimit::Unlimited),
            ParamValue::Text(s) => Ok(RowLimit::from(s.as_str())),
            ParamValue::TinyInt(_)
            | ParamValue::SmallInt(_)
            | ParamValue::Int(_)
            | ParamValue::BigInt(_) => {
                let n = value.as_i64().unwrap_or_default();
                u64::try_from(n).map(RowLimit::from).map_err(|_| {
                    ProviderError::invalid_argument(ORIGIN, format!("negative row limit {n}"))
                })
            }
            other => Err(ProviderError::invalid_argument(
                ORIGIN,
                format!("row limit must be an integer or a bind variable name, got {other:?}"),
            )),
        }
    }
}

/// Unit of a date-add expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateInterval {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// Amount added by a date-add expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOffset {
    Literal(i64),
    BindVariable(String),
}

impl Default for DateOffset {
    fn default() -> Self {
        DateOffset::Literal(0)
    }
}

impl From<i64> for DateOffset {
    fn from(value: i64) -> Self {
        DateOffset::Literal(value)
    }
}

impl From<i32> for DateOffset {
    fn from(value: i32) -> Self {
        DateOffset::Literal(i64::from(value))
    }
}

impl From<&str> for DateOffset {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            DateOffset::default()
        } else {
            DateOffset::BindVariable(value.to_string())
        }
    }
}

/// Starting point of a date-add expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateStart {
    /// Current server time on the given clock
    Now(DateTimeKind),
    /// Raw column expression
    Column(String),
}

impl From<DateTimeKind> for DateStart {
    fn from(kind: DateTimeKind) -> Self {
        DateStart::Now(kind)
    }
}

impl From<&str> for DateStart {
    fn from(column: &str) -> Self {
        DateStart::Column(column.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_empty_mean_unlimited() {
        assert_eq!(RowLimit::try_from(&ParamValue::DbNull).unwrap(), RowLimit::Unlimited);
        assert_eq!(RowLimit::try_from(&ParamValue::Int(0)).unwrap(), RowLimit::Unlimited);
        assert_eq!(
            RowLimit::try_from(&ParamValue::Text(String::new())).unwrap(),
            RowLimit::Unlimited
        );
        assert_eq!(RowLimit::try_from(&ParamValue::BigInt(25)).unwrap(), RowLimit::Fixed(25));
        assert_eq!(
            RowLimit::try_from(&ParamValue::Text("maxRows".into())).unwrap(),
            RowLimit::BindVariable("maxRows".into())
        );
    }

    #[test]
    fn blank_variable_names_are_ignored() {
        assert_eq!(RowLimit::from("   "), RowLimit::Unlimited);
        assert_eq!(
            RowLimit::try_from(&ParamValue::Text(" \t".into())).unwrap(),
            RowLimit::Unlimited
        );
        assert_eq!(
            RowLimit::from(" maxRows "),
            RowLimit::BindVariable("maxRows".into())
        );
        assert_eq!(DateOffset::from("  "), DateOffset::Literal(0));
        assert_eq!(
            DateOffset::from(" days "),
            DateOffset::BindVariable("days".into())
        );
    }

    #[test]
    fn rejects_unsupported_limit_types() {
        for value in [
            ParamValue::Float(2.5),
            ParamValue::Bool(true),
            ParamValue::SmallInt(-1),
        ] {
            let err = RowLimit::try_from(&value).unwrap_err();
            assert!(matches!(err, ProviderError::InvalidArgument { .. }), "{value:?}");
        }
    }

    #[test]
    fn offset_and_start_conversions() {
        assert_eq!(DateOffset::from(""), DateOffset::Literal(0));
        assert_eq!(DateOffset::from("3"), DateOffset::BindVariable("3".into()));
        assert_eq!(DateStart::from("CreatedAt"), DateStart::Column("CreatedAt".into()));
    }
}
