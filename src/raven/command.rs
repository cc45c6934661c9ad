//! # RAVEn Poll Commands
//!
//! Commands are single-line envelopes:
//!
//! ```text
//! <Command><Name>get_instantaneous_demand</Name></Command>\r\n
//! ```
//!
//! Replies are not correlated with requests. They come back through the
//! normal read path and are told apart by their top-level element.

use crate::constants::*;
use crate::error::RavenError;
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// The poll queries the dongle understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RavenCommand {
    ConnectionStatus,
    DeviceInfo,
    CurrentSummationDelivered,
    InstantaneousDemand,
    Message,
    Time,
    CurrentPrice,
}

impl RavenCommand {
    pub const ALL: [RavenCommand; 7] = [
        RavenCommand::ConnectionStatus,
        RavenCommand::DeviceInfo,
        RavenCommand::CurrentSummationDelivered,
        RavenCommand::InstantaneousDemand,
        RavenCommand::Message,
        RavenCommand::Time,
        RavenCommand::CurrentPrice,
    ];

    /// The query name sent inside `<Name>`.
    pub fn name(&self) -> &'static str {
        match self {
            RavenCommand::ConnectionStatus => CMD_GET_CONNECTION_STATUS,
            RavenCommand::DeviceInfo => CMD_GET_DEVICE_INFO,
            RavenCommand::CurrentSummationDelivered => CMD_GET_CURRENT_SUMMATION_DELIVERED,
            RavenCommand::InstantaneousDemand => CMD_GET_INSTANTANEOUS_DEMAND,
            RavenCommand::Message => CMD_GET_MESSAGE,
            RavenCommand::Time => CMD_GET_TIME,
            RavenCommand::CurrentPrice => CMD_GET_CURRENT_PRICE,
        }
    }

    /// The full envelope including the line terminator.
    pub fn envelope(&self) -> String {
        format!(
            "<Command><Name>{}</Name></Command>{LINE_TERMINATOR}",
            self.name()
        )
    }
}

impl fmt::Display for RavenCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Writes poll commands to the transport, one write per call.
pub struct CommandIssuer<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> CommandIssuer<W> {
    pub fn new(writer: W) -> Self {
        CommandIssuer { writer }
    }

    /// Sends `command` and flushes.
    pub async fn issue(&mut self, command: RavenCommand) -> Result<(), RavenError> {
        log::debug!("-> {command}");
        self.writer
            .write_all(command.envelope().as_bytes())
            .await
            .map_err(|e| RavenError::SerialPortError(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| RavenError::SerialPortError(e.to_string()))
    }

    /// Get the connection status between the dongle and the meter.
    pub async fn connection_status(&mut self) -> Result<(), RavenError> {
        self.issue(RavenCommand::ConnectionStatus).await
    }

    /// Get information about the dongle.
    pub async fn device_info(&mut self) -> Result<(), RavenError> {
        self.issue(RavenCommand::DeviceInfo).await
    }

    /// Query the energy used or fed in.
    pub async fn current_summation_delivered(&mut self) -> Result<(), RavenError> {
        self.issue(RavenCommand::CurrentSummationDelivered).await
    }

    /// Query the power currently used (or fed in).
    pub async fn instantaneous_demand(&mut self) -> Result<(), RavenError> {
        self.issue(RavenCommand::InstantaneousDemand).await
    }

    pub async fn message(&mut self) -> Result<(), RavenError> {
        self.issue(RavenCommand::Message).await
    }

    pub async fn time(&mut self) -> Result<(), RavenError> {
        self.issue(RavenCommand::Time).await
    }

    pub async fn current_price(&mut self) -> Result<(), RavenError> {
        self.issue(RavenCommand::CurrentPrice).await
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raven::serial_mock::MockSerialPort;

    #[test]
    fn test_envelope_format() {
        assert_eq!(
            RavenCommand::InstantaneousDemand.envelope(),
            "<Command><Name>get_instantaneous_demand</Name></Command>\r\n"
        );
        assert_eq!(
            RavenCommand::CurrentPrice.envelope(),
            "<Command><Name>get_current_price</Name></Command>\r\n"
        );
    }

    #[test]
    fn test_command_names() {
        let names: Vec<&str> = RavenCommand::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "get_connection_status",
                "get_device_info",
                "get_current_summation_delivered",
                "get_instantaneous_demand",
                "get_message",
                "get_time",
                "get_current_price",
            ]
        );
    }

    #[tokio::test]
    async fn test_each_operation_writes_one_envelope() {
        let mock = MockSerialPort::new();
        let mut issuer = CommandIssuer::new(mock.clone());

        issuer.connection_status().await.unwrap();
        issuer.device_info().await.unwrap();
        issuer.current_summation_delivered().await.unwrap();
        issuer.instantaneous_demand().await.unwrap();
        issuer.message().await.unwrap();
        issuer.time().await.unwrap();
        issuer.current_price().await.unwrap();

        let expected: String = RavenCommand::ALL.iter().map(|c| c.envelope()).collect();
        assert_eq!(mock.get_tx_string(), expected);
    }

    #[tokio::test]
    async fn test_write_failure_is_transport_error() {
        let mock = MockSerialPort::new();
        mock.set_next_error(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "unplugged",
        ));
        let mut issuer = CommandIssuer::new(mock);
        let err = issuer.time().await.unwrap_err();
        assert!(matches!(err, RavenError::SerialPortError(_)));
        assert!(err.is_fatal());
    }
}
