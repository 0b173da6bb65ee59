//! Conversion of PostgreSQL rows into tablesync values
//!
//! Results arrive in the binary wire format. Every column type we can render
//! faithfully has a decoder below; anything else is refused up front instead
//! of being reinterpreted as text.

use std::net::{Ipv4Addr, Ipv6Addr};

use tablesync_core::{QueryError, Value};
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Column as PgColumn, Row as PgRow};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// One non-null cell of a supported type
#[derive(Debug)]
struct PgCell(Value);

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

const PGSQL_AF_INET: u8 = 2;
const PGSQL_AF_INET6: u8 = 3;

/// Built-in scalar types with a decoder, by catalog name
const SCALAR_TYPES: &[&str] = &[
    "bool",
    "char",
    "int2",
    "int4",
    "int8",
    "oid",
    "float4",
    "float8",
    "numeric",
    "money",
    "text",
    "varchar",
    "bpchar",
    "name",
    "citext",
    "unknown",
    "bytea",
    "uuid",
    "json",
    "jsonb",
    "date",
    "time",
    "timetz",
    "timestamp",
    "timestamptz",
    "interval",
    "inet",
    "cidr",
    "macaddr",
    "macaddr8",
    "bit",
    "varbit",
];

/// Whether cells of `ty` can be converted without loss of meaning
pub(crate) fn is_supported(ty: &Type) -> bool {
    match ty.kind() {
        Kind::Enum(_) => true,
        Kind::Array(member) => is_supported(member),
        Kind::Domain(base) => is_supported(base),
        Kind::Simple | Kind::Pseudo => SCALAR_TYPES.contains(&ty.name()),
        _ => false,
    }
}

/// Refuse a result set before any row is decoded if a column has no decoder
pub(crate) fn check_columns(columns: &[PgColumn]) -> Result<(), QueryError> {
    match columns.iter().find(|column| !is_supported(column.type_())) {
        Some(column) => Err(unsupported(column.name(), column.type_())),
        None => Ok(()),
    }
}

fn unsupported(column: &str, ty: &Type) -> QueryError {
    QueryError::ExecutionFailed(format!(
        "unsupported column type `{}` for column `{}`",
        ty.name(),
        column
    ))
}

impl<'a> FromSql<'a> for PgCell {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        decode_raw(ty, raw).map(Self)
    }

    fn accepts(ty: &Type) -> bool {
        is_supported(ty)
    }
}

fn decode_raw(ty: &Type, raw: &[u8]) -> Result<Value, BoxError> {
    match ty.kind() {
        Kind::Enum(_) => return Ok(Value::String(std::str::from_utf8(raw)?.to_string())),
        Kind::Domain(base) => return decode_raw(base, raw),
        Kind::Array(_) => {
            let items = Vec::<Option<PgCell>>::from_sql(ty, raw)?;
            return Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| item.map_or(Value::Null, |cell| cell.0))
                    .collect(),
            ));
        }
        Kind::Simple | Kind::Pseudo => {}
        _ => return Err(format!("unsupported type `{}`", ty.name()).into()),
    }

    let value = match ty.name() {
        "bool" => Value::Bool(bool::from_sql(ty, raw)?),
        "char" => Value::Int16(i8::from_sql(ty, raw)? as i16),
        "int2" => Value::Int16(i16::from_sql(ty, raw)?),
        "int4" => Value::Int32(i32::from_sql(ty, raw)?),
        "int8" => Value::Int64(i64::from_sql(ty, raw)?),
        "oid" => Value::Int64(u32::from_sql(ty, raw)? as i64),
        "float4" => Value::Float32(f32::from_sql(ty, raw)?),
        "float8" => Value::Float64(f64::from_sql(ty, raw)?),
        "numeric" => Value::Decimal(decode_numeric(raw)?),
        "money" => Value::Decimal(format_money(read_i64(raw, 0)?)),
        "text" | "varchar" | "bpchar" | "name" | "citext" | "unknown" => {
            Value::String(std::str::from_utf8(raw)?.to_string())
        }
        "bytea" => Value::Bytes(raw.to_vec()),
        "uuid" => Value::Uuid(uuid::Uuid::from_sql(ty, raw)?),
        "json" | "jsonb" => Value::Json(serde_json::Value::from_sql(ty, raw)?),
        "date" => Value::Date(chrono::NaiveDate::from_sql(ty, raw)?),
        "time" => Value::Time(chrono::NaiveTime::from_sql(ty, raw)?),
        "timestamp" => Value::DateTime(chrono::NaiveDateTime::from_sql(ty, raw)?),
        "timestamptz" => Value::DateTimeUtc(chrono::DateTime::<chrono::Utc>::from_sql(ty, raw)?),
        "timetz" => Value::String(decode_timetz(raw)?),
        "interval" => Value::String(decode_interval(raw)?),
        "inet" | "cidr" => Value::String(decode_inet(raw)?),
        "macaddr" | "macaddr8" => Value::String(decode_macaddr(raw)?),
        "bit" | "varbit" => Value::String(decode_bits(raw)?),
        other => return Err(format!("unsupported type `{}`", other).into()),
    };
    Ok(value)
}

fn read_i64(raw: &[u8], at: usize) -> Result<i64, BoxError> {
    raw.get(at..at + 8)
        .and_then(|bytes| bytes.try_into().ok())
        .map(i64::from_be_bytes)
        .ok_or_else(|| "payload too short".into())
}

fn read_i32(raw: &[u8], at: usize) -> Result<i32, BoxError> {
    raw.get(at..at + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(i32::from_be_bytes)
        .ok_or_else(|| "payload too short".into())
}

/// Decode the binary NUMERIC wire format: a header of ndigits, weight,
/// sign and display scale followed by base-10000 digit groups.
fn decode_numeric(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() < 8 {
        return Err("invalid NUMERIC payload: too short".into());
    }

    let ndigits = u16::from_be_bytes([raw[0], raw[1]]) as usize;
    let weight = i16::from_be_bytes([raw[2], raw[3]]) as i32;
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    let dscale = u16::from_be_bytes([raw[6], raw[7]]) as usize;

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid NUMERIC sign {:#06x}", other).into()),
    }

    if raw.len() < 8 + ndigits * 2 {
        return Err("invalid NUMERIC payload: truncated digits".into());
    }

    let digits = raw[8..8 + ndigits * 2]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect::<Vec<_>>();
    if digits.iter().any(|group| *group > 9999) {
        return Err("invalid NUMERIC payload: group out of range".into());
    }

    let group_at = |index: i32| -> u16 {
        usize::try_from(index)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut output = String::new();
    if weight < 0 {
        output.push('0');
    } else {
        output.push_str(&group_at(0).to_string());
        for index in 1..=weight {
            output.push_str(&format!("{:04}", group_at(index)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        for offset in 0..dscale.div_ceil(4) {
            fraction.push_str(&format!("{:04}", group_at(weight + 1 + offset as i32)));
        }
        fraction.truncate(dscale);
        output.push('.');
        output.push_str(&fraction);
    }

    if sign == NUMERIC_NEG && digits.iter().any(|group| *group != 0) {
        output.insert(0, '-');
    }

    Ok(output)
}

/// MONEY is an int8 count of cents (two fractional digits, as with the
/// default `lc_monetary`), rendered without currency symbol or grouping.
fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}

/// `HH:MM:SS` with a trimmed microsecond fraction
fn format_clock(micros: u64) -> String {
    let seconds = micros / 1_000_000;
    let fraction = micros % 1_000_000;
    let mut text = format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    );
    if fraction != 0 {
        text.push('.');
        text.push_str(format!("{:06}", fraction).trim_end_matches('0'));
    }
    text
}

/// INTERVAL is int8 microseconds, int4 days, int4 months. Rendered the way
/// the server does with `IntervalStyle = postgres`.
fn decode_interval(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 16 {
        return Err("invalid INTERVAL payload".into());
    }
    Ok(format_interval(
        read_i64(raw, 0)?,
        read_i32(raw, 8)?,
        read_i32(raw, 12)?,
    ))
}

fn format_interval(micros: i64, days: i32, months: i32) -> String {
    fn unit(amount: i32, name: &str) -> String {
        let plural = if amount == 1 { "" } else { "s" };
        format!("{} {}{}", amount, name, plural)
    }

    let mut parts = Vec::new();
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "mon"));
    }
    if days != 0 {
        parts.push(unit(days, "day"));
    }

    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 {
            "-"
        } else if years < 0 || months < 0 || days < 0 {
            "+"
        } else {
            ""
        };
        parts.push(format!("{}{}", sign, format_clock(micros.unsigned_abs())));
    }

    parts.join(" ")
}

/// TIMETZ is int8 microseconds since midnight and an int4 zone offset in
/// seconds west of UTC.
fn decode_timetz(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 12 {
        return Err("invalid TIMETZ payload".into());
    }
    let micros = u64::try_from(read_i64(raw, 0)?)?;
    let east = -read_i32(raw, 8)?;

    let sign = if east < 0 { '-' } else { '+' };
    let offset = east.unsigned_abs();
    let mut zone = format!("{}{:02}", sign, offset / 3600);
    if offset % 3600 != 0 {
        zone.push_str(&format!(":{:02}", (offset / 60) % 60));
    }
    if offset % 60 != 0 {
        zone.push_str(&format!(":{:02}", offset % 60));
    }
    Ok(format!("{}{}", format_clock(micros), zone))
}

/// INET and CIDR share a layout: family, prefix bits, cidr flag, address
/// length, address bytes.
fn decode_inet(raw: &[u8]) -> Result<String, BoxError> {
    let [family, bits, is_cidr, length, address @ ..] = raw else {
        return Err("invalid INET payload".into());
    };
    if *length as usize != address.len() {
        return Err("invalid INET payload: address length".into());
    }

    let (text, full_bits) = match (*family, address.len()) {
        (PGSQL_AF_INET, 4) => {
            let octets: [u8; 4] = address.try_into()?;
            (Ipv4Addr::from(octets).to_string(), 32)
        }
        (PGSQL_AF_INET6, 16) => {
            let octets: [u8; 16] = address.try_into()?;
            (Ipv6Addr::from(octets).to_string(), 128)
        }
        (other, _) => return Err(format!("invalid INET address family {}", other).into()),
    };

    if *is_cidr != 0 || *bits != full_bits {
        Ok(format!("{}/{}", text, bits))
    } else {
        Ok(text)
    }
}

fn decode_macaddr(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 6 && raw.len() != 8 {
        return Err("invalid MACADDR payload".into());
    }
    Ok(raw
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(":"))
}

/// BIT and VARBIT are an int4 bit count followed by the bits, most
/// significant first.
fn decode_bits(raw: &[u8]) -> Result<String, BoxError> {
    let count = usize::try_from(read_i32(raw, 0)?)?;
    let bytes = &raw[4..];
    if bytes.len() != count.div_ceil(8) {
        return Err("invalid BIT payload".into());
    }
    Ok((0..count)
        .map(|i| {
            if bytes[i / 8] & (0x80 >> (i % 8)) != 0 {
                '1'
            } else {
                '0'
            }
        })
        .collect())
}

/// Convert one cell of a PostgreSQL row into a `Value`
pub(crate) fn postgres_to_value(row: &PgRow, idx: usize) -> Result<Value, QueryError> {
    let column = &row.columns()[idx];
    if !is_supported(column.type_()) {
        return Err(unsupported(column.name(), column.type_()));
    }

    row.try_get::<_, Option<PgCell>>(idx)
        .map(|cell| cell.map_or(Value::Null, |cell| cell.0))
        .map_err(|e| {
            QueryError::ExecutionFailed(format!(
                "failed to decode column `{}` of type {}: {}",
                column.name(),
                column.type_().name(),
                e
            ))
        })
}
