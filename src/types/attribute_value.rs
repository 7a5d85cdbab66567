//! Typed attribute values.
//!
//! Canonical lexical forms follow XML Schema: `2024-05-01` for dates,
//! `P1DT2H` for day-time durations, `C0FFEE` for hex binary. Parsing accepts
//! any lexically valid form; equality is data-type-specific (two
//! differently-written but equal instants compare equal).

use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::net::IpAddr;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use num_bigint::BigInt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::identifier::{Identifier, ids};
use super::status::Status;

/// An RFC 2821 mailbox name. The local part is case-sensitive, the domain
/// part is not.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Rfc822Name {
    local: String,
    domain: String,
}

impl Rfc822Name {
    pub fn new(local: impl Into<String>, domain: impl Into<String>) -> Self {
        Rfc822Name {
            local: local.into(),
            domain: domain.into(),
        }
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl PartialEq for Rfc822Name {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.domain.eq_ignore_ascii_case(&other.domain)
    }
}

impl FromStr for Rfc822Name {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Rfc822Name::new(local, domain))
            }
            _ => Err(format!("'{s}' is not a valid rfc822Name")),
        }
    }
}

impl Display for Rfc822Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

/// An X.500 distinguished name, compared case-insensitively RDN by RDN.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct X500Name(String);

impl X500Name {
    pub fn new(name: impl Into<String>) -> Self {
        X500Name(name.into())
    }

    /// The RDN sequence, outermost last, lowercased and whitespace-trimmed.
    pub(crate) fn rdns(&self) -> Vec<String> {
        self.0
            .split(',')
            .map(|rdn| rdn.trim().to_lowercase())
            .collect()
    }
}

impl PartialEq for X500Name {
    fn eq(&self, other: &Self) -> bool {
        self.rdns() == other.rdns()
    }
}

impl Display for X500Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// An xs:dayTimeDuration, stored as signed milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DayTimeDuration {
    millis: i64,
}

static DAY_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d{1,3}))?S)?)?$")
        .unwrap()
});

impl DayTimeDuration {
    pub fn from_millis(millis: i64) -> Self {
        DayTimeDuration { millis }
    }

    pub fn as_millis(&self) -> i64 {
        self.millis
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let caps = DAY_TIME_RE
            .captures(s)
            .ok_or_else(|| format!("'{s}' is not a valid dayTimeDuration"))?;
        if caps.iter().skip(2).all(|c| c.is_none()) {
            return Err(format!("'{s}' has no duration components"));
        }
        let field = |i: usize| -> Result<i128, String> {
            match caps.get(i) {
                None => Ok(0),
                Some(m) => m
                    .as_str()
                    .parse::<i128>()
                    .map_err(|_| format!("'{s}' has an out-of-range component")),
            }
        };
        // fractional seconds are right-padded: ".5" means 500ms
        let millis = caps.get(6).map_or(0, |m| {
            let digits = format!("{:0<3}", m.as_str());
            digits.parse::<i128>().unwrap_or(0)
        });
        let total = ((field(2)? * 24 + field(3)?) * 60 + field(4)?) * 60_000
            + field(5)? * 1_000
            + millis;
        let total = if caps.get(1).is_some() { -total } else { total };
        let millis =
            i64::try_from(total).map_err(|_| format!("'{s}' is out of range"))?;
        Ok(DayTimeDuration { millis })
    }
}

impl Display for DayTimeDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut left = self.millis;
        if left < 0 {
            write!(f, "-")?;
            left = -left;
        }
        let millis = left % 1_000;
        let seconds = (left / 1_000) % 60;
        let minutes = (left / 60_000) % 60;
        let hours = (left / 3_600_000) % 24;
        let days = left / 86_400_000;
        write!(f, "P{days}DT{hours}H{minutes}M{seconds}")?;
        if millis != 0 {
            write!(f, ".{millis:03}")?;
        }
        write!(f, "S")
    }
}

/// An xs:yearMonthDuration, stored as signed months.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct YearMonthDuration {
    months: i64,
}

static YEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?$").unwrap());

impl YearMonthDuration {
    pub fn from_months(months: i64) -> Self {
        YearMonthDuration { months }
    }

    pub fn as_months(&self) -> i64 {
        self.months
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let caps = YEAR_MONTH_RE
            .captures(s)
            .ok_or_else(|| format!("'{s}' is not a valid yearMonthDuration"))?;
        if caps.get(2).is_none() && caps.get(3).is_none() {
            return Err(format!("'{s}' has no duration components"));
        }
        let field = |i: usize| -> Result<i128, String> {
            match caps.get(i) {
                None => Ok(0),
                Some(m) => m
                    .as_str()
                    .parse::<i128>()
                    .map_err(|_| format!("'{s}' has an out-of-range component")),
            }
        };
        let total = field(2)? * 12 + field(3)?;
        let total = if caps.get(1).is_some() { -total } else { total };
        let months =
            i64::try_from(total).map_err(|_| format!("'{s}' is out of range"))?;
        Ok(YearMonthDuration { months })
    }
}

impl Display for YearMonthDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut months = self.months;
        if months < 0 {
            write!(f, "-")?;
            months = -months;
        }
        write!(f, "P{}Y{}M", months / 12, months % 12)
    }
}

/// The underlying representation of an attribute value, one variant per
/// supported data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(BigInt),
    Double(f64),
    Time(NaiveTime),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    DayTimeDuration(DayTimeDuration),
    YearMonthDuration(YearMonthDuration),
    AnyUri(String),
    IpAddress(IpAddr),
    DnsName(String),
    X500Name(X500Name),
    Rfc822Name(Rfc822Name),
    HexBinary(Vec<u8>),
    Base64Binary(Vec<u8>),
}

impl Value {
    /// The canonical data-type identifier for this representation.
    pub fn type_id(&self) -> Identifier {
        let id = match self {
            Value::String(_) => ids::DT_STRING,
            Value::Boolean(_) => ids::DT_BOOLEAN,
            Value::Integer(_) => ids::DT_INTEGER,
            Value::Double(_) => ids::DT_DOUBLE,
            Value::Time(_) => ids::DT_TIME,
            Value::Date(_) => ids::DT_DATE,
            Value::DateTime(_) => ids::DT_DATE_TIME,
            Value::DayTimeDuration(_) => ids::DT_DAY_TIME_DURATION,
            Value::YearMonthDuration(_) => ids::DT_YEAR_MONTH_DURATION,
            Value::AnyUri(_) => ids::DT_ANY_URI,
            Value::IpAddress(_) => ids::DT_IP_ADDRESS,
            Value::DnsName(_) => ids::DT_DNS_NAME,
            Value::X500Name(_) => ids::DT_X500_NAME,
            Value::Rfc822Name(_) => ids::DT_RFC822_NAME,
            Value::HexBinary(_) => ids::DT_HEX_BINARY,
            Value::Base64Binary(_) => ids::DT_BASE64_BINARY,
        };
        Identifier::from(id)
    }

    /// Data-type-specific ordering, defined only between values of the same
    /// orderable type.
    pub fn partial_cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::DayTimeDuration(a), Value::DayTimeDuration(b)) => Some(a.cmp(b)),
            (Value::YearMonthDuration(a), Value::YearMonthDuration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Value::String(v) | Value::AnyUri(v) | Value::DnsName(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Value::DayTimeDuration(v) => write!(f, "{v}"),
            Value::YearMonthDuration(v) => write!(f, "{v}"),
            Value::IpAddress(v) => write!(f, "{v}"),
            Value::X500Name(v) => write!(f, "{v}"),
            Value::Rfc822Name(v) => write!(f, "{v}"),
            Value::HexBinary(v) => {
                for byte in v {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            Value::Base64Binary(v) => write!(f, "{}", BASE64.encode(v)),
        }
    }
}

/// A `(data type, underlying value)` pair, immutable once constructed.
///
/// The per-type constructors pin the canonical data-type id; [`Self::new`]
/// admits profile-defined ids over a standard representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    data_type: Identifier,
    value: Value,
}

impl AttributeValue {
    pub fn new(data_type: impl Into<Identifier>, value: Value) -> Self {
        AttributeValue {
            data_type: data_type.into(),
            value,
        }
    }

    fn typed(value: Value) -> Self {
        AttributeValue {
            data_type: value.type_id(),
            value,
        }
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::typed(Value::String(v.into()))
    }

    pub fn boolean(v: bool) -> Self {
        Self::typed(Value::Boolean(v))
    }

    pub fn integer(v: impl Into<BigInt>) -> Self {
        Self::typed(Value::Integer(v.into()))
    }

    pub fn double(v: f64) -> Self {
        Self::typed(Value::Double(v))
    }

    pub fn time(v: NaiveTime) -> Self {
        Self::typed(Value::Time(v))
    }

    pub fn date(v: NaiveDate) -> Self {
        Self::typed(Value::Date(v))
    }

    pub fn date_time(v: DateTime<FixedOffset>) -> Self {
        Self::typed(Value::DateTime(v))
    }

    pub fn day_time_duration(v: DayTimeDuration) -> Self {
        Self::typed(Value::DayTimeDuration(v))
    }

    pub fn year_month_duration(v: YearMonthDuration) -> Self {
        Self::typed(Value::YearMonthDuration(v))
    }

    pub fn any_uri(v: impl Into<String>) -> Self {
        Self::typed(Value::AnyUri(v.into()))
    }

    pub fn ip_address(v: IpAddr) -> Self {
        Self::typed(Value::IpAddress(v))
    }

    pub fn dns_name(v: impl Into<String>) -> Self {
        Self::typed(Value::DnsName(v.into()))
    }

    pub fn x500_name(v: X500Name) -> Self {
        Self::typed(Value::X500Name(v))
    }

    pub fn rfc822_name(v: Rfc822Name) -> Self {
        Self::typed(Value::Rfc822Name(v))
    }

    pub fn hex_binary(v: Vec<u8>) -> Self {
        Self::typed(Value::HexBinary(v))
    }

    pub fn base64_binary(v: Vec<u8>) -> Self {
        Self::typed(Value::Base64Binary(v))
    }

    pub fn data_type(&self) -> &Identifier {
        &self.data_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_type(&self, data_type: &str) -> bool {
        self.data_type.as_str() == data_type
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match &self.value {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a value of the given data type from its lexical form, as used
    /// by attribute selectors coercing structured content.
    pub fn from_lexical(data_type: &Identifier, lexical: &str) -> Result<Self, Status> {
        let syntax = |detail: String| Status::syntax_error(detail);
        let value = match data_type.as_str() {
            ids::DT_STRING => Value::String(lexical.to_string()),
            ids::DT_BOOLEAN => match lexical {
                "true" | "1" => Value::Boolean(true),
                "false" | "0" => Value::Boolean(false),
                _ => return Err(syntax(format!("'{lexical}' is not a valid boolean"))),
            },
            ids::DT_INTEGER => Value::Integer(
                BigInt::from_str(lexical)
                    .map_err(|e| syntax(format!("'{lexical}' is not a valid integer: {e}")))?,
            ),
            ids::DT_DOUBLE => match lexical {
                "INF" => Value::Double(f64::INFINITY),
                "-INF" => Value::Double(f64::NEG_INFINITY),
                _ => Value::Double(
                    lexical
                        .parse::<f64>()
                        .map_err(|e| syntax(format!("'{lexical}' is not a valid double: {e}")))?,
                ),
            },
            ids::DT_TIME => Value::Time(
                NaiveTime::parse_from_str(lexical, "%H:%M:%S%.f")
                    .map_err(|e| syntax(format!("'{lexical}' is not a valid time: {e}")))?,
            ),
            ids::DT_DATE => Value::Date(
                NaiveDate::parse_from_str(lexical, "%Y-%m-%d")
                    .map_err(|e| syntax(format!("'{lexical}' is not a valid date: {e}")))?,
            ),
            ids::DT_DATE_TIME => Value::DateTime(parse_date_time(lexical).map_err(syntax)?),
            ids::DT_DAY_TIME_DURATION => {
                Value::DayTimeDuration(DayTimeDuration::parse(lexical).map_err(syntax)?)
            }
            ids::DT_YEAR_MONTH_DURATION => {
                Value::YearMonthDuration(YearMonthDuration::parse(lexical).map_err(syntax)?)
            }
            ids::DT_ANY_URI => Value::AnyUri(lexical.to_string()),
            ids::DT_IP_ADDRESS => Value::IpAddress(
                lexical
                    .parse::<IpAddr>()
                    .map_err(|e| syntax(format!("'{lexical}' is not a valid ipAddress: {e}")))?,
            ),
            ids::DT_DNS_NAME => Value::DnsName(lexical.to_string()),
            ids::DT_X500_NAME => Value::X500Name(X500Name::new(lexical)),
            ids::DT_RFC822_NAME => {
                Value::Rfc822Name(Rfc822Name::from_str(lexical).map_err(syntax)?)
            }
            ids::DT_HEX_BINARY => Value::HexBinary(decode_hex(lexical).map_err(syntax)?),
            ids::DT_BASE64_BINARY => Value::Base64Binary(
                BASE64
                    .decode(lexical)
                    .map_err(|e| syntax(format!("'{lexical}' is not valid base64: {e}")))?,
            ),
            other => {
                return Err(syntax(format!("unsupported data type '{other}'")));
            }
        };
        Ok(AttributeValue::typed(value))
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.value)
    }
}

/// xs:dateTime admits an offset-free form; those are taken as UTC.
fn parse_date_time(lexical: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(zoned) = DateTime::parse_from_rfc3339(lexical) {
        return Ok(zoned);
    }
    chrono::NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|e| format!("'{lexical}' is not a valid dateTime: {e}"))
}

fn decode_hex(lexical: &str) -> Result<Vec<u8>, String> {
    if lexical.len() % 2 != 0 {
        return Err(format!("'{lexical}' is not valid hex: odd length"));
    }
    (0..lexical.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&lexical[i..i + 2], 16)
                .map_err(|e| format!("'{lexical}' is not valid hex: {e}"))
        })
        .collect()
}
