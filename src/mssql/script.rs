//! T-SQL rendering of parameters: type declarations, literals and debug scripts.

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};

use super::dialect::MssqlDialect;
use super::typemap::{SqlDbType, default_native, lookup_native};
use crate::command::DbCommand;
use crate::error::ProviderError;
use crate::parameters::DbParameter;
use crate::provider::SqlDialect;
use crate::types::{ParamValue, TypeFamily};

const ORIGIN: &str = "MssqlDialect";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const TIME_FORMAT: &str = "%H:%M:%S%.3f";
const DEFAULT_PRECISION: u8 = 18;
const MAX_PRECISION: u8 = 38;

/// Native type of `parameter`, falling back to its generic type's default.
pub(crate) fn native_of(parameter: &DbParameter) -> Result<SqlDbType, ProviderError> {
    if parameter.native_type().trim().is_empty() {
        return Ok(default_native(parameter.generic_type()));
    }
    lookup_native(parameter.native_type())
        .map(|(native, _)| native)
        .ok_or_else(|| ProviderError::UnmappedType {
            origin: ORIGIN,
            type_name: parameter.native_type().to_string(),
        })
}

/// Type as written in a `declare` statement, e.g. `nvarchar(10)` or `decimal(18,2)`.
pub(crate) fn type_declaration(parameter: &DbParameter) -> Result<String, ProviderError> {
    let native = native_of(parameter)?;
    let name = native.type_name();
    let declaration = match native {
        SqlDbType::Decimal => {
            let (precision, scale) = decimal_shape(parameter);
            format!("{name}({precision},{scale})")
        }
        n if n.is_sized() => match parameter.size().filter(|len| *len > 0) {
            Some(len) if len <= max_length(n) => format!("{name}({len})"),
            _ if n.allows_max() => format!("{name}(max)"),
            Some(_) => format!("{}(max)", n.variable_counterpart().type_name()),
            // Fixed-length inputs without a declared size are sized by their value.
            None if parameter.value().is_null() => name.to_string(),
            None => match value_length(parameter.value()) {
                Some(len) if len > 0 && len <= max_length(n) => format!("{name}({len})"),
                _ => format!("{}(max)", n.variable_counterpart().type_name()),
            },
        },
        _ => name.to_string(),
    };
    Ok(declaration)
}

fn max_length(native: SqlDbType) -> usize {
    if native.is_wide() { 4000 } else { 8000 }
}

/// Declared precision and scale, or the widest precision at the value's own scale.
fn decimal_shape(parameter: &DbParameter) -> (u8, u8) {
    if let Some(precision) = parameter.precision() {
        return (precision, parameter.scale().unwrap_or(0));
    }
    match parameter.value().as_decimal() {
        Some(d) => {
            let scale = u8::try_from(d.scale()).unwrap_or(MAX_PRECISION).min(MAX_PRECISION);
            (MAX_PRECISION, scale)
        }
        None => (DEFAULT_PRECISION, parameter.scale().unwrap_or(0)),
    }
}

/// Characters of a text value or bytes of a binary one.
fn value_length(value: &ParamValue) -> Option<usize> {
    match value {
        ParamValue::Text(s) | ParamValue::Xml(s) => Some(s.chars().count()),
        ParamValue::Binary(bytes) => Some(bytes.len()),
        ParamValue::Guid(_) => Some(36),
        _ => None,
    }
}

/// T-SQL literal for the parameter's current value.
pub(crate) fn literal(parameter: &DbParameter) -> Result<String, ProviderError> {
    let value = parameter.value();
    if value.is_null() {
        return Ok("null".to_string());
    }
    let not_valid = || {
        ProviderError::invalid_argument(
            ORIGIN,
            format!(
                "value {value:?} is not a valid {:?} for {}",
                parameter.generic_type(),
                parameter.name()
            ),
        )
    };

    match parameter.generic_type().family() {
        TypeFamily::Integer => value.as_i64().map(|v| v.to_string()).ok_or_else(not_valid),
        TypeFamily::Exact => value.as_decimal().map(|d| d.to_string()).ok_or_else(not_valid),
        TypeFamily::Approximate => value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.to_string())
            .ok_or_else(not_valid),
        TypeFamily::Boolean => value.as_bool().map(bit).ok_or_else(not_valid),
        TypeFamily::Binary => value.as_binary().map(hex).ok_or_else(not_valid),
        TypeFamily::Temporal => temporal(value)
            .map(|s| quote(&s, false))
            .ok_or_else(not_valid),
        _ => {
            let unicode = parameter.generic_type().is_unicode()
                || native_of(parameter).is_ok_and(|n| n.is_wide() || n == SqlDbType::Xml);
            value_literal(value, unicode).ok_or_else(not_valid)
        }
    }
}

/// Literal chosen by the value alone, for text, guid, xml and variant parameters.
fn value_literal(value: &ParamValue, unicode: bool) -> Option<String> {
    match value {
        ParamValue::DbNull => Some("null".to_string()),
        ParamValue::Bool(b) => Some(bit(*b)),
        ParamValue::TinyInt(_)
        | ParamValue::SmallInt(_)
        | ParamValue::Int(_)
        | ParamValue::BigInt(_) => value.as_i64().map(|v| v.to_string()),
        ParamValue::Real(_) | ParamValue::Float(_) => value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.to_string()),
        ParamValue::Decimal(d) => Some(d.to_string()),
        ParamValue::Binary(bytes) => Some(hex(bytes)),
        ParamValue::Date(_)
        | ParamValue::Time(_)
        | ParamValue::DateTime(_)
        | ParamValue::DateTimeOffset(_) => temporal(value).map(|s| quote(&s, false)),
        ParamValue::Guid(g) => Some(quote(&g.to_string(), false)),
        ParamValue::Text(s) | ParamValue::Xml(s) => Some(quote(s, unicode)),
    }
}

fn temporal(value: &ParamValue) -> Option<String> {
    match value {
        ParamValue::Time(t) => Some(format_time(*t)),
        ParamValue::DateTimeOffset(dto) => Some(format_offset(dto)),
        other => other.as_datetime().map(|dt| format_datetime(&dt)),
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn format_time(t: NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn format_offset(dto: &DateTime<FixedOffset>) -> String {
    format!("{} {}", format_datetime(&dto.naive_local()), dto.format("%:z"))
}

fn bit(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out
}

/// Single-quoted literal with embedded quotes doubled.
pub(crate) fn quote(text: &str, unicode: bool) -> String {
    let escaped = text.replace('\'', "''");
    if unicode {
        format!("N'{escaped}'")
    } else {
        format!("'{escaped}'")
    }
}

/// Script reproducing `command`; degrades to a comment plus the raw text on failure.
pub(crate) fn debug_script(dialect: &MssqlDialect, command: &DbCommand) -> String {
    match build_script(dialect, command) {
        Ok(script) => script,
        Err(err) => format!(
            "/* debug script unavailable: {} */\n{}",
            err.to_string().replace("*/", "* /"),
            command.text
        ),
    }
}

fn build_script(dialect: &MssqlDialect, command: &DbCommand) -> Result<String, ProviderError> {
    let mut sorted: Vec<&DbParameter> = command.parameters.iter().collect();
    sorted.sort_by_cached_key(|p| p.name().to_lowercase());

    let mut lines = Vec::with_capacity(sorted.len() * 2 + 1);
    for parameter in &sorted {
        lines.push(format!(
            "declare {} {}",
            parameter.name(),
            type_declaration(parameter)?
        ));
    }
    for parameter in &sorted {
        if parameter.direction().is_input() && !parameter.value().is_null() {
            lines.push(format!("set {} = {}", parameter.name(), literal(parameter)?));
        }
    }
    if command.is_stored_procedure() {
        lines.push(dialect.stored_procedure_call_text(&command.text, &command.parameters));
    } else {
        lines.push(command.text.clone());
    }
    Ok(lines.join("\n"))
}
