//! RAVEn Protocol Constants
//!
//! This module defines the constants used by the RAVEn XML protocol and the
//! ThingSpeak channel layout the bridge publishes into.

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z.
///
/// The dongle reports every `TimeStamp` as seconds since this instant.
pub const RAVEN_EPOCH_UNIX_SECS: i64 = 946_684_800;

/// Raw 32-bit demand values at or above this threshold are negative (feed-in).
pub const DEMAND_SIGN_THRESHOLD: u64 = 0x8000_0000;

/// Modulus used to fold a raw 32-bit demand value into its signed form.
pub const DEMAND_WRAP: i64 = 0x1_0000_0000;

/// Line terminator used on the serial link in both directions.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Prefix of the line that terminates a complete XML fragment.
pub const CLOSING_TAG_PREFIX: &str = "</";

/// Default serial device for the dongle.
pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyUSB0";

/// The RFA-Z106 talks 115200 8N1.
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Default ThingSpeak update endpoint.
pub const DEFAULT_THINGSPEAK_ENDPOINT: &str = "https://api.thingspeak.com/update";

// Top-level element names of inbound documents
pub const TAG_INSTANTANEOUS_DEMAND: &str = "InstantaneousDemand";
pub const TAG_CURRENT_SUMMATION_DELIVERED: &str = "CurrentSummationDelivered";
pub const TAG_CONNECTION_STATUS: &str = "ConnectionStatus";

// Field names inside inbound documents
pub const FIELD_TIMESTAMP: &str = "TimeStamp";
pub const FIELD_DEMAND: &str = "Demand";
pub const FIELD_SUMMATION_DELIVERED: &str = "SummationDelivered";
pub const FIELD_SUMMATION_RECEIVED: &str = "SummationReceived";
pub const FIELD_STATUS: &str = "Status";

// Poll command names
pub const CMD_GET_CONNECTION_STATUS: &str = "get_connection_status";
pub const CMD_GET_DEVICE_INFO: &str = "get_device_info";
pub const CMD_GET_CURRENT_SUMMATION_DELIVERED: &str = "get_current_summation_delivered";
pub const CMD_GET_INSTANTANEOUS_DEMAND: &str = "get_instantaneous_demand";
pub const CMD_GET_MESSAGE: &str = "get_message";
pub const CMD_GET_TIME: &str = "get_time";
pub const CMD_GET_CURRENT_PRICE: &str = "get_current_price";
