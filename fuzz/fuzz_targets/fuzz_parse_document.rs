#![no_main]

use libfuzzer_sys::fuzz_target;
use raven_rs::raven::message::{parse_document, parse_hex, parse_timestamp_secs};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    // Arbitrary documents must decode or fail cleanly
    let _ = parse_document(&text);

    // Field parsers on arbitrary input
    let _ = parse_hex(&text);
    let _ = parse_timestamp_secs(&text);

    // Arbitrary field values inside otherwise valid envelopes
    let demand = format!(
        "<InstantaneousDemand><TimeStamp>{text}</TimeStamp><Demand>{text}</Demand></InstantaneousDemand>"
    );
    let _ = parse_document(&demand);
});
