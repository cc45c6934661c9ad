//! The raven module contains the components of the dongle's XML line protocol:
//! fragment accumulation, decoding and classification, daily aggregates,
//! poll commands, and the serial transport.

pub mod accumulator;
pub mod command;
pub mod message;
pub mod serial;
pub mod serial_mock;
pub mod tracker;
pub mod xml;

pub use accumulator::FragmentAccumulator;
pub use command::{CommandIssuer, RavenCommand};
pub use message::{classify, parse_document, DemandReading, ParsedReading, SummationReading};
pub use serial::{LineReader, RavenHandle, SerialConfig, SerialPort};
pub use tracker::{AggregateTracker, DailyAggregateState, DayBoundary};
pub use xml::{decode, XmlDocument, XmlElement};
