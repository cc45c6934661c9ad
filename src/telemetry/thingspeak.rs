//! ThingSpeak channel sink.
//!
//! Updates go to the channel's update endpoint as a JSON body:
//!
//! ```json
//! { "api_key": "XXXXXXXXXXXXXXXX", "field1": 1268, "field5": 9120 }
//! ```
//!
//! ThingSpeak answers with the new entry id, or `0` when it rejects the
//! update (bad key, or faster than the channel's rate limit).

use super::{MetricUpdate, TelemetrySink};
use crate::config::WriteKey;
use crate::error::RavenError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// Sink that writes to one ThingSpeak channel.
#[derive(Debug, Clone)]
pub struct ThingSpeakSink {
    client: reqwest::Client,
    endpoint: String,
    write_key: WriteKey,
}

impl ThingSpeakSink {
    pub fn new(endpoint: impl Into<String>, write_key: WriteKey) -> Result<Self, RavenError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(ThingSpeakSink {
            client,
            endpoint: endpoint.into(),
            write_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for `update`.
    pub fn body(&self, update: &MetricUpdate) -> Value {
        let mut body = Map::new();
        body.insert(
            "api_key".to_string(),
            Value::String(self.write_key.expose().to_string()),
        );
        for (field, value) in update.iter() {
            body.insert(field.channel_field().to_string(), Value::from(value));
        }
        Value::Object(body)
    }
}

#[async_trait]
impl TelemetrySink for ThingSpeakSink {
    async fn update_channel(
        &self,
        channel_id: u64,
        update: &MetricUpdate,
    ) -> Result<(), RavenError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.body(update))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RavenError::PublishError(format!(
                "channel {channel_id}: HTTP {status}"
            )));
        }

        let entry = response.text().await?;
        if entry.trim() == "0" {
            return Err(RavenError::PublishError(format!(
                "channel {channel_id}: update rejected"
            )));
        }

        log::debug!("channel {channel_id}: entry {} <- {update}", entry.trim());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MetricField;

    #[test]
    fn test_body_uses_channel_fields() {
        let sink = ThingSpeakSink::new("http://localhost/update", WriteKey::new("KEY123")).unwrap();
        let mut update = MetricUpdate::new();
        update.set(MetricField::CumulativeNetUsage, 42);
        update.set(MetricField::DailyNetEnergy, -7);

        let body = sink.body(&update);
        assert_eq!(body["api_key"], "KEY123");
        assert_eq!(body["field2"], 42);
        assert_eq!(body["field5"], -7);
        assert!(body.get("field1").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_publish_error() {
        let sink = ThingSpeakSink::new("http://127.0.0.1:9/update", WriteKey::new("KEY")).unwrap();
        let mut update = MetricUpdate::new();
        update.set(MetricField::InstantaneousUsage, 1);
        let err = sink.update_channel(1, &update).await.unwrap_err();
        assert!(matches!(err, RavenError::PublishError(_)));
    }
}
