use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::types::GenericType;

/// SQL Server native column and parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDbType {
    BigInt,
    Binary,
    Bit,
    Char,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Decimal,
    Float,
    Image,
    Int,
    Money,
    NChar,
    NText,
    NVarChar,
    Real,
    SmallDateTime,
    SmallInt,
    SmallMoney,
    Text,
    Time,
    Timestamp,
    TinyInt,
    UniqueIdentifier,
    VarBinary,
    VarChar,
    Variant,
    Xml,
}

impl SqlDbType {
    /// Lower-case T-SQL spelling.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            SqlDbType::BigInt => "bigint",
            SqlDbType::Binary => "binary",
            SqlDbType::Bit => "bit",
            SqlDbType::Char => "char",
            SqlDbType::Date => "date",
            SqlDbType::DateTime => "datetime",
            SqlDbType::DateTime2 => "datetime2",
            SqlDbType::DateTimeOffset => "datetimeoffset",
            SqlDbType::Decimal => "decimal",
            SqlDbType::Float => "float",
            SqlDbType::Image => "image",
            SqlDbType::Int => "int",
            SqlDbType::Money => "money",
            SqlDbType::NChar => "nchar",
            SqlDbType::NText => "ntext",
            SqlDbType::NVarChar => "nvarchar",
            SqlDbType::Real => "real",
            SqlDbType::SmallDateTime => "smalldatetime",
            SqlDbType::SmallInt => "smallint",
            SqlDbType::SmallMoney => "smallmoney",
            SqlDbType::Text => "text",
            SqlDbType::Time => "time",
            SqlDbType::Timestamp => "timestamp",
            SqlDbType::TinyInt => "tinyint",
            SqlDbType::UniqueIdentifier => "uniqueidentifier",
            SqlDbType::VarBinary => "varbinary",
            SqlDbType::VarChar => "varchar",
            SqlDbType::Variant => "sql_variant",
            SqlDbType::Xml => "xml",
        }
    }

    /// Types whose declaration takes a length, `(n)` or `(max)`.
    #[must_use]
    pub fn is_sized(self) -> bool {
        matches!(
            self,
            SqlDbType::Binary
                | SqlDbType::Char
                | SqlDbType::NChar
                | SqlDbType::NVarChar
                | SqlDbType::VarBinary
                | SqlDbType::VarChar
        )
    }

    /// Types that accept `(max)`.
    #[must_use]
    pub fn allows_max(self) -> bool {
        matches!(
            self,
            SqlDbType::NVarChar | SqlDbType::VarBinary | SqlDbType::VarChar
        )
    }

    /// Variable-length type of the same kind; `self` for anything that is not fixed-length.
    #[must_use]
    pub fn variable_counterpart(self) -> Self {
        match self {
            SqlDbType::Char => SqlDbType::VarChar,
            SqlDbType::NChar => SqlDbType::NVarChar,
            SqlDbType::Binary => SqlDbType::VarBinary,
            other => other,
        }
    }

    /// Types storing two bytes per character.
    #[must_use]
    pub fn is_wide(self) -> bool {
        matches!(
            self,
            SqlDbType::NChar | SqlDbType::NText | SqlDbType::NVarChar
        )
    }
}

lazy_static! {
    static ref NATIVE_TYPES: HashMap<&'static str, (SqlDbType, GenericType)> = {
        let mut m = HashMap::new();
        m.insert("bigint", (SqlDbType::BigInt, GenericType::Int64));
        m.insert("binary", (SqlDbType::Binary, GenericType::Binary));
        m.insert("bit", (SqlDbType::Bit, GenericType::Boolean));
        m.insert("char", (SqlDbType::Char, GenericType::AnsiStringFixedLength));
        m.insert("date", (SqlDbType::Date, GenericType::Date));
        m.insert("datetime", (SqlDbType::DateTime, GenericType::DateTime));
        m.insert("datetime2", (SqlDbType::DateTime2, GenericType::DateTime2));
        m.insert(
            "datetimeoffset",
            (SqlDbType::DateTimeOffset, GenericType::DateTimeOffset),
        );
        m.insert("decimal", (SqlDbType::Decimal, GenericType::Decimal));
        m.insert("numeric", (SqlDbType::Decimal, GenericType::Decimal));
        m.insert("float", (SqlDbType::Float, GenericType::Double));
        m.insert("image", (SqlDbType::Image, GenericType::Binary));
        m.insert("int", (SqlDbType::Int, GenericType::Int32));
        m.insert("money", (SqlDbType::Money, GenericType::Currency));
        m.insert("nchar", (SqlDbType::NChar, GenericType::StringFixedLength));
        m.insert("ntext", (SqlDbType::NText, GenericType::String));
        m.insert("nvarchar", (SqlDbType::NVarChar, GenericType::String));
        m.insert("real", (SqlDbType::Real, GenericType::Single));
        m.insert("smalldatetime", (SqlDbType::SmallDateTime, GenericType::DateTime));
        m.insert("smallint", (SqlDbType::SmallInt, GenericType::Int16));
        m.insert("smallmoney", (SqlDbType::SmallMoney, GenericType::Currency));
        m.insert("sql_variant", (SqlDbType::Variant, GenericType::Object));
        m.insert("sysname", (SqlDbType::NVarChar, GenericType::String));
        m.insert("text", (SqlDbType::Text, GenericType::AnsiString));
        m.insert("time", (SqlDbType::Time, GenericType::Time));
        m.insert("timestamp", (SqlDbType::Timestamp, GenericType::Binary));
        m.insert("rowversion", (SqlDbType::Timestamp, GenericType::Binary));
        m.insert("tinyint", (SqlDbType::TinyInt, GenericType::Byte));
        m.insert("uniqueidentifier", (SqlDbType::UniqueIdentifier, GenericType::Guid));
        m.insert("varbinary", (SqlDbType::VarBinary, GenericType::Binary));
        m.insert("varchar", (SqlDbType::VarChar, GenericType::AnsiString));
        m.insert("xml", (SqlDbType::Xml, GenericType::Xml));
        m
    };
    static ref DEFAULT_NATIVE: HashMap<GenericType, SqlDbType> = {
        let mut m = HashMap::new();
        m.insert(GenericType::AnsiString, SqlDbType::VarChar);
        m.insert(GenericType::AnsiStringFixedLength, SqlDbType::Char);
        m.insert(GenericType::String, SqlDbType::NVarChar);
        m.insert(GenericType::StringFixedLength, SqlDbType::NChar);
        m.insert(GenericType::Xml, SqlDbType::Xml);
        m.insert(GenericType::Binary, SqlDbType::VarBinary);
        m.insert(GenericType::Boolean, SqlDbType::Bit);
        m.insert(GenericType::Byte, SqlDbType::TinyInt);
        m.insert(GenericType::Int16, SqlDbType::SmallInt);
        m.insert(GenericType::Int32, SqlDbType::Int);
        m.insert(GenericType::Int64, SqlDbType::BigInt);
        m.insert(GenericType::Decimal, SqlDbType::Decimal);
        m.insert(GenericType::Currency, SqlDbType::Money);
        m.insert(GenericType::Single, SqlDbType::Real);
        m.insert(GenericType::Double, SqlDbType::Float);
        m.insert(GenericType::Date, SqlDbType::Date);
        m.insert(GenericType::Time, SqlDbType::Time);
        m.insert(GenericType::DateTime, SqlDbType::DateTime);
        m.insert(GenericType::DateTime2, SqlDbType::DateTime2);
        m.insert(GenericType::DateTimeOffset, SqlDbType::DateTimeOffset);
        m.insert(GenericType::Guid, SqlDbType::UniqueIdentifier);
        m.insert(GenericType::Object, SqlDbType::Variant);
        m
    };
}

/// Resolve a native type name such as `NVarChar` or `decimal(10, 2)`.
#[must_use]
pub fn lookup_native(name: &str) -> Option<(SqlDbType, GenericType)> {
    let base = name.split('(').next().unwrap_or(name).trim();
    NATIVE_TYPES.get(base.to_ascii_lowercase().as_str()).copied()
}

/// Native type used for a parameter that only declares `generic`.
#[must_use]
pub fn default_native(generic: GenericType) -> SqlDbType {
    DEFAULT_NATIVE
        .get(&generic)
        .copied()
        .unwrap_or(SqlDbType::Variant)
}
