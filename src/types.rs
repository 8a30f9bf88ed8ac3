use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Family of database back-ends a provider can speak to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    /// Microsoft SQL Server
    SqlServer,
    /// Oracle
    Oracle,
    /// IBM DB2
    Db2,
}

/// Driver family a provider is implemented on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendName {
    SqlClient,
    OracleClient,
    Db2Client,
}

impl BackendName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BackendName::SqlClient => "SqlClient",
            BackendName::OracleClient => "OracleClient",
            BackendName::Db2Client => "Db2Client",
        }
    }
}

/// Backend-neutral description of a parameter or column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericType {
    AnsiString,
    AnsiStringFixedLength,
    String,
    StringFixedLength,
    Xml,
    Binary,
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Decimal,
    Currency,
    Single,
    Double,
    Date,
    Time,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Guid,
    Object,
}

/// Coarse category shared by generic and runtime types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeFamily {
    Text,
    Integer,
    /// Fixed-point numbers (decimal, money)
    Exact,
    /// Floating-point numbers
    Approximate,
    Temporal,
    Boolean,
    Binary,
    Guid,
    Xml,
    Other,
}

impl GenericType {
    #[must_use]
    pub fn family(self) -> TypeFamily {
        match self {
            GenericType::AnsiString
            | GenericType::AnsiStringFixedLength
            | GenericType::String
            | GenericType::StringFixedLength => TypeFamily::Text,
            GenericType::Xml => TypeFamily::Xml,
            GenericType::Binary => TypeFamily::Binary,
            GenericType::Boolean => TypeFamily::Boolean,
            GenericType::Byte | GenericType::Int16 | GenericType::Int32 | GenericType::Int64 => {
                TypeFamily::Integer
            }
            GenericType::Decimal | GenericType::Currency => TypeFamily::Exact,
            GenericType::Single | GenericType::Double => TypeFamily::Approximate,
            GenericType::Date
            | GenericType::Time
            | GenericType::DateTime
            | GenericType::DateTime2
            | GenericType::DateTimeOffset => TypeFamily::Temporal,
            GenericType::Guid => TypeFamily::Guid,
            GenericType::Object => TypeFamily::Other,
        }
    }

    /// The Rust type a value of this generic type materializes as.
    #[must_use]
    pub fn runtime_type(self) -> RuntimeType {
        match self {
            GenericType::AnsiString
            | GenericType::AnsiStringFixedLength
            | GenericType::String
            | GenericType::StringFixedLength => RuntimeType::String,
            GenericType::Xml => RuntimeType::Xml,
            GenericType::Binary => RuntimeType::Bytes,
            GenericType::Boolean => RuntimeType::Bool,
            GenericType::Byte => RuntimeType::U8,
            GenericType::Int16 => RuntimeType::I16,
            GenericType::Int32 => RuntimeType::I32,
            GenericType::Int64 => RuntimeType::I64,
            GenericType::Decimal | GenericType::Currency => RuntimeType::Decimal,
            GenericType::Single => RuntimeType::F32,
            GenericType::Double => RuntimeType::F64,
            GenericType::Date => RuntimeType::Date,
            GenericType::Time => RuntimeType::Time,
            GenericType::DateTime | GenericType::DateTime2 => RuntimeType::DateTime,
            GenericType::DateTimeOffset => RuntimeType::DateTimeOffset,
            GenericType::Guid => RuntimeType::Uuid,
            GenericType::Object => RuntimeType::Value,
        }
    }

    /// Unicode text types get an `N` literal prefix in SQL Server scripts.
    #[must_use]
    pub fn is_unicode(self) -> bool {
        matches!(
            self,
            GenericType::String | GenericType::StringFixedLength | GenericType::Xml
        )
    }
}

/// Runtime representation of a generic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeType {
    String,
    /// A `String` holding an XML document
    Xml,
    Bytes,
    Bool,
    U8,
    I16,
    I32,
    I64,
    Decimal,
    F32,
    F64,
    Date,
    Time,
    DateTime,
    DateTimeOffset,
    Uuid,
    /// Any [`ParamValue`]
    Value,
}

impl RuntimeType {
    #[must_use]
    pub fn family(self) -> TypeFamily {
        match self {
            RuntimeType::String => TypeFamily::Text,
            RuntimeType::Xml => TypeFamily::Xml,
            RuntimeType::Bytes => TypeFamily::Binary,
            RuntimeType::Bool => TypeFamily::Boolean,
            RuntimeType::U8 | RuntimeType::I16 | RuntimeType::I32 | RuntimeType::I64 => {
                TypeFamily::Integer
            }
            RuntimeType::Decimal => TypeFamily::Exact,
            RuntimeType::F32 | RuntimeType::F64 => TypeFamily::Approximate,
            RuntimeType::Date
            | RuntimeType::Time
            | RuntimeType::DateTime
            | RuntimeType::DateTimeOffset => TypeFamily::Temporal,
            RuntimeType::Uuid => TypeFamily::Guid,
            RuntimeType::Value => TypeFamily::Other,
        }
    }
}

/// Direction of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl ParameterDirection {
    /// Output-like directions receive a value from the server.
    #[must_use]
    pub fn is_output(self) -> bool {
        matches!(
            self,
            ParameterDirection::Output
                | ParameterDirection::InputOutput
                | ParameterDirection::ReturnValue
        )
    }

    /// Directions whose value is sent to the server.
    #[must_use]
    pub fn is_input(self) -> bool {
        matches!(
            self,
            ParameterDirection::Input | ParameterDirection::InputOutput
        )
    }
}

/// Which version of a source row a parameter is bound from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowVersion {
    Original,
    #[default]
    Current,
    Proposed,
    Default,
}

/// How command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
}

/// Which clock a "current server time" expression reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateTimeKind {
    Local,
    Utc,
    Unspecified,
}

/// Values bound to parameters or read back from result sets.
///
/// `DbNull` is the database null; a missing value is never represented by an absent
/// field:
/// ```rust
/// use sql_provider::prelude::*;
///
/// let values = vec![ParamValue::Int(5), ParamValue::Text("abc".into()), ParamValue::DbNull];
/// assert!(values[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    #[default]
    DbNull,
    Bool(bool),
    TinyInt(u8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Guid(Uuid),
    Xml(String),
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

impl ParamValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::DbNull)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) | ParamValue::Xml(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => match self.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
        }
    }

    /// Integer view of the value; text is parsed.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::TinyInt(v) => Some(i64::from(*v)),
            ParamValue::SmallInt(v) => Some(i64::from(*v)),
            ParamValue::Int(v) => Some(i64::from(*v)),
            ParamValue::BigInt(v) => Some(*v),
            ParamValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating-point view of the value; text is parsed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Real(v) => Some(f64::from(*v)),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Decimal(d) => d.to_f64(),
            ParamValue::Text(s) => s.trim().parse().ok(),
            _ => self.as_i64().map(|i| i as f64),
        }
    }

    /// Fixed-point view of the value; text is parsed.
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParamValue::Decimal(d) => Some(*d),
            ParamValue::Real(v) => Decimal::try_from(*v).ok(),
            ParamValue::Float(v) => Decimal::try_from(*v).ok(),
            ParamValue::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => self.as_i64().map(Decimal::from),
        }
    }

    /// Date-time view of the value; dates get midnight, times get 1900-01-01.
    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            ParamValue::DateTime(dt) => Some(*dt),
            ParamValue::Date(d) => Some(d.and_time(NaiveTime::MIN)),
            ParamValue::Time(t) => NaiveDate::from_ymd_opt(1900, 1, 1).map(|d| d.and_time(*t)),
            ParamValue::DateTimeOffset(dto) => Some(dto.naive_utc()),
            ParamValue::Text(s) => {
                let s = s.trim();
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                    .or_else(|| {
                        NaiveDate::parse_from_str(s, "%Y-%m-%d")
                            .ok()
                            .map(|d| d.and_time(NaiveTime::MIN))
                    })
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        if let ParamValue::Binary(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

macro_rules! param_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::$variant(value)
                }
            }
        )*
    };
}

param_value_from!(
    bool => Bool,
    u8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Real,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Binary,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    Uuid => Guid,
);

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::DbNull, Into::into)
    }
}
