#![no_main]

use libfuzzer_sys::fuzz_target;
use raven_rs::raven::message::parse_document;
use raven_rs::{AggregateTracker, DayBoundary, FragmentAccumulator, ParsedReading};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut acc = FragmentAccumulator::new();
    let mut tracker = AggregateTracker::new(DayBoundary::utc());

    for line in text.lines() {
        if let Some(doc) = acc.feed(line) {
            assert!(acc.is_empty());
            if let Ok(ParsedReading::CurrentSummationDelivered(s)) = parse_document(&doc) {
                let _ = tracker.update(&s);
            }
        }
    }
});
