use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::xml::XmlData;
use tiberius::{ColumnData, FromSql, Query};
use uuid::Uuid;

use crate::error::ProviderError;
use crate::parameters::DbParameter;
use crate::types::{GenericType, ParamValue};

const ORIGIN: &str = "MssqlProvider";

/// Bind a parameter's value as the next positional `@Pn` argument of `query`.
///
/// Nulls are bound with a type matching the parameter's generic type so the server can
/// still convert them to the declared native type.
pub(crate) fn bind_value(query: &mut Query<'_>, parameter: &DbParameter) {
    match parameter.value() {
        ParamValue::DbNull => bind_null(query, parameter.generic_type()),
        ParamValue::Bool(b) => query.bind(*b),
        ParamValue::TinyInt(v) => query.bind(*v),
        ParamValue::SmallInt(v) => query.bind(*v),
        ParamValue::Int(v) => query.bind(*v),
        ParamValue::BigInt(v) => query.bind(*v),
        ParamValue::Real(v) => query.bind(*v),
        ParamValue::Float(v) => query.bind(*v),
        ParamValue::Decimal(d) => query.bind(*d),
        ParamValue::Text(s) | ParamValue::Xml(s) => query.bind(s.clone()),
        ParamValue::Binary(bytes) => query.bind(bytes.clone()),
        ParamValue::Date(d) => query.bind(*d),
        ParamValue::Time(t) => query.bind(*t),
        ParamValue::DateTime(dt) => query.bind(*dt),
        ParamValue::DateTimeOffset(dto) => query.bind(*dto),
        ParamValue::Guid(g) => query.bind(*g),
    }
}

fn bind_null(query: &mut Query<'_>, generic_type: GenericType) {
    match generic_type {
        GenericType::Boolean => query.bind(Option::<bool>::None),
        GenericType::Byte => query.bind(Option::<u8>::None),
        GenericType::Int16 => query.bind(Option::<i16>::None),
        GenericType::Int32 => query.bind(Option::<i32>::None),
        GenericType::Int64 => query.bind(Option::<i64>::None),
        GenericType::Decimal | GenericType::Currency => query.bind(Option::<Decimal>::None),
        GenericType::Single => query.bind(Option::<f32>::None),
        GenericType::Double => query.bind(Option::<f64>::None),
        GenericType::Binary => query.bind(Option::<Vec<u8>>::None),
        GenericType::Date => query.bind(Option::<NaiveDate>::None),
        GenericType::Time => query.bind(Option::<NaiveTime>::None),
        GenericType::DateTime | GenericType::DateTime2 | GenericType::DateTimeOffset => {
            query.bind(Option::<NaiveDateTime>::None);
        }
        GenericType::Guid => query.bind(Option::<Uuid>::None),
        GenericType::AnsiString
        | GenericType::AnsiStringFixedLength
        | GenericType::String
        | GenericType::StringFixedLength
        | GenericType::Xml
        | GenericType::Object => query.bind(Option::<String>::None),
    }
}

/// Convert a column read from the wire into a [`ParamValue`].
pub(crate) fn column_value(data: &ColumnData<'static>) -> Result<ParamValue, ProviderError> {
    let decode = |e: tiberius::error::Error| ProviderError::execution(ORIGIN, e);
    let value: ParamValue = match data {
        ColumnData::U8(v) => (*v).into(),
        ColumnData::I16(v) => (*v).into(),
        ColumnData::I32(v) => (*v).into(),
        ColumnData::I64(v) => (*v).into(),
        ColumnData::F32(v) => (*v).into(),
        ColumnData::F64(v) => (*v).into(),
        ColumnData::Bit(v) => (*v).into(),
        ColumnData::Guid(v) => (*v).into(),
        ColumnData::String(v) => v.as_deref().map(str::to_string).into(),
        ColumnData::Binary(v) => v.as_deref().map(<[u8]>::to_vec).into(),
        ColumnData::Xml(v) => v.as_ref().map_or(ParamValue::DbNull, |xml| {
            let xml: &XmlData = xml;
            ParamValue::Xml(xml.clone().into_string())
        }),
        ColumnData::Numeric(_) => Decimal::from_sql(data).map_err(decode)?.into(),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data).map_err(decode)?.into()
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data).map_err(decode)?.into(),
        ColumnData::Time(_) => NaiveTime::from_sql(data).map_err(decode)?.into(),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)
            .map_err(decode)?
            .into(),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(ProviderError::execution(
                ORIGIN,
                format!("unsupported column data {data:?}"),
            ));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn primitive_columns_convert() {
        assert_eq!(
            column_value(&ColumnData::I32(Some(7))).unwrap(),
            ParamValue::Int(7)
        );
        assert_eq!(
            column_value(&ColumnData::I64(None)).unwrap(),
            ParamValue::DbNull
        );
        assert_eq!(
            column_value(&ColumnData::String(Some(Cow::Borrowed("abc")))).unwrap(),
            ParamValue::Text("abc".into())
        );
        assert_eq!(
            column_value(&ColumnData::Binary(Some(Cow::Owned(vec![1, 2])))).unwrap(),
            ParamValue::Binary(vec![1, 2])
        );
        assert_eq!(
            column_value(&ColumnData::Bit(Some(true))).unwrap(),
            ParamValue::Bool(true)
        );
    }

    #[test]
    fn numeric_columns_become_decimals() {
        let numeric = tiberius::numeric::Numeric::new_with_scale(12345, 2);
        assert_eq!(
            column_value(&ColumnData::Numeric(Some(numeric))).unwrap(),
            ParamValue::Decimal(Decimal::new(12345, 2))
        );
    }
}
