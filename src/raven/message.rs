//! # RAVEn Message Classification
//!
//! Classifies decoded documents by their top-level element and extracts the
//! typed fields of the readings the bridge publishes.
//!
//! ## Field encodings
//!
//! - `TimeStamp`: seconds since 2000-01-01T00:00:00Z. Decimal, or hexadecimal
//!   with a `0x` prefix (what the dongle actually sends).
//! - `Demand`: hexadecimal, a 32-bit two's-complement value. Values at or
//!   above `0x80000000` are feed-in and come out negative.
//! - `SummationDelivered` / `SummationReceived`: hexadecimal magnitudes.

use crate::constants::*;
use crate::error::RavenError;
use crate::raven::xml::{self, XmlDocument, XmlElement};
use chrono::{DateTime, Utc};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{digit1, hex_digit1},
    combinator::{all_consuming, map_res, opt},
    sequence::preceded,
    IResult,
};

/// An instantaneous power reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandReading {
    pub timestamp: DateTime<Utc>,
    /// Negative while feeding in.
    pub demand_watts: i64,
}

/// A cumulative energy reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummationReading {
    pub timestamp: DateTime<Utc>,
    pub delivered_watt_hours: u64,
    pub received_watt_hours: u64,
}

impl SummationReading {
    /// Delivered minus received. Both sides are bounded by `i64::MAX` at
    /// classification time, so this cannot overflow. Differences of two
    /// nets can; see [`AggregateTracker::update`](crate::raven::tracker::AggregateTracker::update).
    pub fn net_watt_hours(&self) -> i64 {
        self.delivered_watt_hours as i64 - self.received_watt_hours as i64
    }
}

/// A classified document from the dongle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReading {
    ConnectionStatus { status: String },
    InstantaneousDemand(DemandReading),
    CurrentSummationDelivered(SummationReading),
    /// Anything else: replies to device info, time, price and message polls,
    /// or elements this crate does not know.
    Unrecognized { raw: XmlElement },
}

impl ParsedReading {
    /// Short name of the message kind for logs.
    pub fn kind(&self) -> &str {
        match self {
            ParsedReading::ConnectionStatus { .. } => TAG_CONNECTION_STATUS,
            ParsedReading::InstantaneousDemand(_) => TAG_INSTANTANEOUS_DEMAND,
            ParsedReading::CurrentSummationDelivered(_) => TAG_CURRENT_SUMMATION_DELIVERED,
            ParsedReading::Unrecognized { raw } => &raw.name,
        }
    }
}

/// Decodes and classifies an accumulated fragment.
///
/// Any error, XML or field level, carries `raw` for diagnostics.
pub fn parse_document(raw: &str) -> Result<ParsedReading, RavenError> {
    let doc = xml::decode(raw)?;
    classify(&doc).map_err(|err| match err {
        RavenError::DecodeError { reason, .. } => RavenError::decode(reason, raw),
        RavenError::MissingField { message, field } => {
            RavenError::decode(format!("{message} is missing field {field}"), raw)
        }
        other => other,
    })
}

/// Classifies a decoded document.
///
/// Precedence: `InstantaneousDemand`, `CurrentSummationDelivered`,
/// `ConnectionStatus`, otherwise `Unrecognized`.
pub fn classify(doc: &XmlDocument) -> Result<ParsedReading, RavenError> {
    if let Some(el) = doc.top(TAG_INSTANTANEOUS_DEMAND) {
        let timestamp = decode_timestamp_field(el, TAG_INSTANTANEOUS_DEMAND)?;
        let raw_demand = parse_hex_field(el, TAG_INSTANTANEOUS_DEMAND, FIELD_DEMAND)?;
        let raw_demand = u32::try_from(raw_demand).map_err(|_| {
            RavenError::decode(
                format!("Demand 0x{raw_demand:x} exceeds 32 bits"),
                el.summary(),
            )
        })?;
        return Ok(ParsedReading::InstantaneousDemand(DemandReading {
            timestamp,
            demand_watts: decode_signed_demand(raw_demand),
        }));
    }

    if let Some(el) = doc.top(TAG_CURRENT_SUMMATION_DELIVERED) {
        let timestamp = decode_timestamp_field(el, TAG_CURRENT_SUMMATION_DELIVERED)?;
        let delivered =
            parse_magnitude_field(el, TAG_CURRENT_SUMMATION_DELIVERED, FIELD_SUMMATION_DELIVERED)?;
        let received =
            parse_magnitude_field(el, TAG_CURRENT_SUMMATION_DELIVERED, FIELD_SUMMATION_RECEIVED)?;
        return Ok(ParsedReading::CurrentSummationDelivered(SummationReading {
            timestamp,
            delivered_watt_hours: delivered,
            received_watt_hours: received,
        }));
    }

    if let Some(el) = doc.top(TAG_CONNECTION_STATUS) {
        let status = required_field(el, TAG_CONNECTION_STATUS, FIELD_STATUS)?;
        return Ok(ParsedReading::ConnectionStatus {
            status: status.to_string(),
        });
    }

    Ok(ParsedReading::Unrecognized {
        raw: doc.root.clone(),
    })
}

/// Folds a raw 32-bit demand into its signed value.
///
/// `raw - 0x100000000` for raw values at or above `0x80000000`, identity
/// otherwise.
pub fn decode_signed_demand(raw: u32) -> i64 {
    let raw = raw as u64;
    if raw < DEMAND_SIGN_THRESHOLD {
        raw as i64
    } else {
        raw as i64 - DEMAND_WRAP
    }
}

/// Converts device seconds since 2000-01-01 UTC into an absolute instant.
pub fn decode_timestamp(device_secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(device_secs).ok()?;
    let millis = RAVEN_EPOCH_UNIX_SECS.checked_add(secs)?.checked_mul(1000)?;
    DateTime::from_timestamp_millis(millis)
}

/// Parses a hexadecimal field value, with or without a `0x` prefix.
pub fn parse_hex(value: &str) -> Option<u64> {
    all_consuming(hex_u64)(value.trim()).ok().map(|(_, v)| v)
}

/// Parses a timestamp value: `0x`-prefixed hexadecimal or plain decimal.
pub fn parse_timestamp_secs(value: &str) -> Option<u64> {
    all_consuming(alt((prefixed_hex_u64, decimal_u64)))(value.trim())
        .ok()
        .map(|(_, v)| v)
}

fn hex_u64(input: &str) -> IResult<&str, u64> {
    map_res(preceded(opt(tag_no_case("0x")), hex_digit1), |digits: &str| {
        u64::from_str_radix(digits, 16)
    })(input)
}

fn prefixed_hex_u64(input: &str) -> IResult<&str, u64> {
    map_res(preceded(tag_no_case("0x"), hex_digit1), |digits: &str| {
        u64::from_str_radix(digits, 16)
    })(input)
}

fn decimal_u64(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>())(input)
}

fn required_field<'a>(
    el: &'a XmlElement,
    message: &'static str,
    field: &'static str,
) -> Result<&'a str, RavenError> {
    el.child_text(field)
        .ok_or(RavenError::MissingField { message, field })
}

fn decode_timestamp_field(
    el: &XmlElement,
    message: &'static str,
) -> Result<DateTime<Utc>, RavenError> {
    let value = required_field(el, message, FIELD_TIMESTAMP)?;
    parse_timestamp_secs(value)
        .and_then(decode_timestamp)
        .ok_or_else(|| RavenError::decode(format!("invalid TimeStamp {value:?}"), el.summary()))
}

fn parse_hex_field(
    el: &XmlElement,
    message: &'static str,
    field: &'static str,
) -> Result<u64, RavenError> {
    let value = required_field(el, message, field)?;
    parse_hex(value)
        .ok_or_else(|| RavenError::decode(format!("invalid {field} {value:?}"), el.summary()))
}

fn parse_magnitude_field(
    el: &XmlElement,
    message: &'static str,
    field: &'static str,
) -> Result<u64, RavenError> {
    let value = parse_hex_field(el, message, field)?;
    if value > i64::MAX as u64 {
        return Err(RavenError::decode(
            format!("{field} 0x{value:x} out of range"),
            el.summary(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn demand_doc(timestamp: &str, demand: &str) -> String {
        format!(
            "<InstantaneousDemand>\r\n<TimeStamp>{timestamp}</TimeStamp>\r\n<Demand>{demand}</Demand>\r\n</InstantaneousDemand>\r\n"
        )
    }

    #[test]
    fn test_signed_demand_boundaries() {
        assert_eq!(decode_signed_demand(0), 0);
        assert_eq!(decode_signed_demand(0x7FFF_FFFF), 0x7FFF_FFFF);
        assert_eq!(decode_signed_demand(0x8000_0000), -0x8000_0000);
        assert_eq!(decode_signed_demand(0xFFFF_FFFF), -1);
        assert_eq!(decode_signed_demand(0xFFFF_FF38), -200);
    }

    #[test]
    fn test_parse_hex_prefixes() {
        assert_eq!(parse_hex("0x0004f4"), Some(0x4f4));
        assert_eq!(parse_hex("0X1A"), Some(0x1a));
        assert_eq!(parse_hex("ff"), Some(0xff));
        assert_eq!(parse_hex("0"), Some(0));
        assert_eq!(parse_hex(""), None);
        assert_eq!(parse_hex("0x"), None);
        assert_eq!(parse_hex("12zz"), None);
    }

    #[test]
    fn test_parse_timestamp_decimal_and_hex() {
        assert_eq!(parse_timestamp_secs("86400"), Some(86_400));
        assert_eq!(parse_timestamp_secs("0x15180"), Some(86_400));
        assert_eq!(parse_timestamp_secs("15180"), Some(15_180));
        assert_eq!(parse_timestamp_secs("-5"), None);
    }

    #[test]
    fn test_decode_timestamp_epoch() {
        assert_eq!(
            decode_timestamp(0),
            Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            decode_timestamp(86_400 + 3_600),
            Some(Utc.with_ymd_and_hms(2000, 1, 2, 1, 0, 0).unwrap())
        );
        assert_eq!(decode_timestamp(u64::MAX), None);
    }

    #[test]
    fn test_classify_demand_feed_in() {
        let reading = parse_document(&demand_doc("0", "0xFFFFFF38")).unwrap();
        match reading {
            ParsedReading::InstantaneousDemand(d) => {
                assert_eq!(d.demand_watts, -200);
                assert_eq!(d.timestamp, Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn test_classify_demand_too_wide() {
        let err = parse_document(&demand_doc("0", "0x100000000")).unwrap_err();
        assert!(matches!(err, RavenError::DecodeError { .. }));
    }

    #[test]
    fn test_classify_summation() {
        let raw = "<CurrentSummationDelivered>\r\n<TimeStamp>0x1c8f4a3b</TimeStamp>\r\n<SummationDelivered>0x0000000001321a5f</SummationDelivered>\r\n<SummationReceived>0x00000000003f8240</SummationReceived>\r\n</CurrentSummationDelivered>\r\n";
        match parse_document(raw).unwrap() {
            ParsedReading::CurrentSummationDelivered(s) => {
                assert_eq!(s.delivered_watt_hours, 0x1321a5f);
                assert_eq!(s.received_watt_hours, 0x3f8240);
                assert_eq!(s.net_watt_hours(), 0x1321a5f - 0x3f8240);
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn test_classify_summation_net_negative() {
        let raw = "<CurrentSummationDelivered><TimeStamp>10</TimeStamp><SummationDelivered>0x10</SummationDelivered><SummationReceived>0x30</SummationReceived></CurrentSummationDelivered>";
        match parse_document(raw).unwrap() {
            ParsedReading::CurrentSummationDelivered(s) => assert_eq!(s.net_watt_hours(), -0x20),
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn test_classify_connection_status() {
        let raw = "<ConnectionStatus><Status>Connected</Status></ConnectionStatus>";
        assert_eq!(
            parse_document(raw).unwrap(),
            ParsedReading::ConnectionStatus {
                status: "Connected".into()
            }
        );
    }

    #[test]
    fn test_classify_unrecognized() {
        let raw = "<DeviceInfo><FWVersion>2.0.0</FWVersion></DeviceInfo>";
        let reading = parse_document(raw).unwrap();
        assert_eq!(reading.kind(), "DeviceInfo");
        assert!(matches!(reading, ParsedReading::Unrecognized { .. }));
    }

    #[test]
    fn test_missing_field_carries_raw() {
        let raw = "<InstantaneousDemand><TimeStamp>1</TimeStamp></InstantaneousDemand>";
        match parse_document(raw).unwrap_err() {
            RavenError::DecodeError { reason, raw: carried } => {
                assert!(reason.contains("Demand"));
                assert_eq!(carried, raw);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bad_hex_carries_raw() {
        let raw = demand_doc("1", "0xZZ");
        match parse_document(&raw).unwrap_err() {
            RavenError::DecodeError { raw: carried, .. } => assert_eq!(carried, raw),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
