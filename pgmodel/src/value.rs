//! # Row Decoding
//!
//! Converts PostgreSQL rows into [`Record`]s: ordered maps of column name to
//! `serde_json::Value`. Models are hydrated from the same representation, so a
//! field receives exactly what an ad-hoc query would return.
//!
//! Values that have no JSON counterpart are rendered the way `psql` prints
//! them: `NUMERIC` keeps its scale, intervals use the `postgres` output style
//! and `inet` drops a full-length prefix.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{
    postgres::{
        types::{Oid, PgInterval, PgMoney, PgTimeTz},
        PgRow, PgTypeInfo, PgTypeKind,
    },
    types::{ipnetwork::IpNetwork, BigDecimal, Decimal},
    Column, Decode, Postgres, Row, Type, TypeInfo, ValueRef,
};
use uuid::Uuid;

use crate::Error;

/// An associative row, keyed by column name in select order.
pub type Record = Map<String, Value>;

/// Fractional digits of `MONEY` under the usual `lc_monetary` locales.
const MONEY_FRAC_DIGITS: u32 = 2;

/// Decodes every column of `row` into a [`Record`].
pub fn decode_row(row: &PgRow) -> Result<Record, Error> {
    let mut record = Map::with_capacity(row.len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.name(), column.type_info())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(row: &PgRow, index: usize, name: &str, type_info: &PgTypeInfo) -> Result<Value, Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_info.name() {
        "BOOL" => Value::Bool(row.try_get(index)?),
        "\"CHAR\"" => Value::String(char::from(row.try_get::<i8, _>(index)? as u8).to_string()),
        "INT2" => Value::from(row.try_get::<i16, _>(index)?),
        "INT4" => Value::from(row.try_get::<i32, _>(index)?),
        "INT8" => Value::from(row.try_get::<i64, _>(index)?),
        "OID" => Value::from(row.try_get::<Oid, _>(index)?.0),
        "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(index)?),
        "NUMERIC" => Value::String(numeric_text(row, index)?),
        "MONEY" => Value::String(row.try_get::<PgMoney, _>(index)?.to_decimal(MONEY_FRAC_DIGITS).to_string()),
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" => Value::String(row.try_get(index)?),
        "UUID" => Value::String(row.try_get::<Uuid, _>(index)?.to_string()),
        "JSON" | "JSONB" => row.try_get::<Value, _>(index)?,
        "TIMESTAMPTZ" => serialized::<DateTime<Utc>>(row, index)?,
        "TIMESTAMP" => serialized::<NaiveDateTime>(row, index)?,
        "DATE" => serialized::<NaiveDate>(row, index)?,
        "TIME" => serialized::<NaiveTime>(row, index)?,
        "TIMETZ" => Value::String(time_tz_text(&row.try_get(index)?)),
        "INTERVAL" => Value::String(interval_text(&row.try_get(index)?)),
        "INET" => Value::String(inet_text(&row.try_get(index)?)),
        "CIDR" => Value::String(row.try_get::<IpNetwork, _>(index)?.to_string()),
        "BYTEA" => Value::String(hex_bytes(&row.try_get::<Vec<u8>, _>(index)?)),

        "BOOL[]" => serialized::<Vec<bool>>(row, index)?,
        "INT2[]" => serialized::<Vec<i16>>(row, index)?,
        "INT4[]" => serialized::<Vec<i32>>(row, index)?,
        "INT8[]" => serialized::<Vec<i64>>(row, index)?,
        "FLOAT4[]" => serialized::<Vec<f32>>(row, index)?,
        "FLOAT8[]" => serialized::<Vec<f64>>(row, index)?,
        "NUMERIC[]" => strings(numeric_array_text(row, index)?),
        "MONEY[]" => strings(
            row.try_get::<Vec<PgMoney>, _>(index)?
                .into_iter()
                .map(|money| money.to_decimal(MONEY_FRAC_DIGITS).to_string()),
        ),
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => serialized::<Vec<String>>(row, index)?,
        "UUID[]" => serialized::<Vec<Uuid>>(row, index)?,
        "JSON[]" | "JSONB[]" => serialized::<Vec<Value>>(row, index)?,
        "TIMESTAMPTZ[]" => serialized::<Vec<DateTime<Utc>>>(row, index)?,
        "TIMESTAMP[]" => serialized::<Vec<NaiveDateTime>>(row, index)?,
        "DATE[]" => serialized::<Vec<NaiveDate>>(row, index)?,
        "TIME[]" => serialized::<Vec<NaiveTime>>(row, index)?,
        "INTERVAL[]" => strings(row.try_get::<Vec<PgInterval>, _>(index)?.iter().map(interval_text)),
        "INET[]" => strings(row.try_get::<Vec<IpNetwork>, _>(index)?.iter().map(inet_text)),
        "CIDR[]" => strings(row.try_get::<Vec<IpNetwork>, _>(index)?.iter().map(IpNetwork::to_string)),
        "BYTEA[]" => strings(row.try_get::<Vec<Vec<u8>>, _>(index)?.iter().map(|bytes| hex_bytes(bytes))),

        // citext, enums and domains over text send their text form
        _ if is_text_backed(type_info) => Value::String(row.try_get_unchecked::<String, _>(index)?),
        other => {
            return Err(Error::Database(sqlx::Error::ColumnDecode {
                index: format!("{:?}", name),
                source: format!("unsupported PostgreSQL type {}", other).into(),
            }));
        }
    };
    Ok(value)
}

fn is_text_backed(type_info: &PgTypeInfo) -> bool {
    match type_info.kind() {
        PgTypeKind::Enum(_) => true,
        PgTypeKind::Domain(base) => is_text_backed(base),
        _ => matches!(type_info.name().to_ascii_uppercase().as_str(), "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "CITEXT" | "UNKNOWN"),
    }
}

fn serialized<'r, T>(row: &'r PgRow, index: usize) -> Result<Value, Error>
where
    T: Decode<'r, Postgres> + Type<Postgres> + Serialize,
{
    let decoded: T = row.try_get(index)?;
    Ok(serde_json::to_value(decoded)?)
}

fn strings(values: impl IntoIterator<Item = String>) -> Value {
    Value::Array(values.into_iter().map(Value::String).collect())
}

/// `Decimal` keeps the column's scale but stops at 28 digits; wider values
/// fall back to `BigDecimal`.
fn numeric_text(row: &PgRow, index: usize) -> Result<String, Error> {
    match row.try_get::<Decimal, _>(index) {
        Ok(decimal) => Ok(decimal.to_string()),
        Err(_) => Ok(row.try_get::<BigDecimal, _>(index)?.to_string()),
    }
}

fn numeric_array_text(row: &PgRow, index: usize) -> Result<Vec<String>, Error> {
    match row.try_get::<Vec<Decimal>, _>(index) {
        Ok(decimals) => Ok(decimals.iter().map(Decimal::to_string).collect()),
        Err(_) => Ok(row.try_get::<Vec<BigDecimal>, _>(index)?.iter().map(BigDecimal::to_string).collect()),
    }
}

/// Formats bytes the way PostgreSQL prints `bytea` in hex output mode.
fn hex_bytes(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

/// `inet` omits the prefix length when it covers the whole address.
fn inet_text(network: &IpNetwork) -> String {
    let full = match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    if network.prefix() == full { network.ip().to_string() } else { network.to_string() }
}

fn time_tz_text(value: &PgTimeTz<NaiveTime, FixedOffset>) -> String {
    let seconds = value.offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let (hours, minutes) = (seconds.abs() / 3600, seconds.abs() % 3600 / 60);

    if minutes == 0 {
        format!("{}{}{:02}", value.time, sign, hours)
    } else {
        format!("{}{}{:02}:{:02}", value.time, sign, hours, minutes)
    }
}

/// Renders an interval in PostgreSQL's default `postgres` output style,
/// e.g. `1 year 2 mons -3 days +04:05:06.5`.
fn interval_text(interval: &PgInterval) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut negative_before = false;

    let years = interval.months / 12;
    let months = interval.months % 12;
    for (value, unit) in [(years, "year"), (months, "mon"), (interval.days, "day")] {
        if value == 0 {
            continue;
        }
        let sign = if negative_before && value > 0 { "+" } else { "" };
        let plural = if value == 1 { "" } else { "s" };
        parts.push(format!("{}{} {}{}", sign, value, unit, plural));
        negative_before = value < 0;
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 {
            "-"
        } else if negative_before {
            "+"
        } else {
            ""
        };
        let micros = interval.microseconds.unsigned_abs();
        let seconds = micros / 1_000_000;
        let mut time = format!("{}{:02}:{:02}:{:02}", sign, seconds / 3600, seconds / 60 % 60, seconds % 60);

        let fraction = micros % 1_000_000;
        if fraction != 0 {
            let digits = format!("{:06}", fraction);
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}
