//! # RAVEn Serial Communication
//!
//! Opening the dongle's serial port and splitting it into a line reader and
//! a command writer. The RFA-Z106 runs at 115200 baud, 8 data bits, 1 stop
//! bit, no parity, and terminates lines with CRLF.
//!
//! Everything above the port is generic over [`SerialPort`], so tests run
//! against [`MockSerialPort`](crate::raven::serial_mock::MockSerialPort).

use crate::constants::DEFAULT_BAUDRATE;
use crate::error::RavenError;
use crate::raven::command::CommandIssuer;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, ReadHalf, WriteHalf};
use tokio_serial::SerialPortBuilderExt;

/// Anything the bridge can use as its transport.
pub trait SerialPort: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPort for T {}

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: DEFAULT_BAUDRATE,
        }
    }
}

/// Represents a handle to the dongle's serial connection.
pub struct RavenHandle<P> {
    port: P,
}

impl RavenHandle<tokio_serial::SerialStream> {
    /// Opens `port_name` with the default configuration.
    pub async fn connect(port_name: &str) -> Result<Self, RavenError> {
        Self::connect_with_config(port_name, SerialConfig::default()).await
    }

    /// Opens `port_name` with a custom configuration.
    pub async fn connect_with_config(
        port_name: &str,
        config: SerialConfig,
    ) -> Result<Self, RavenError> {
        let port = tokio_serial::new(port_name, config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| RavenError::SerialPortError(format!("{port_name}: {e}")))?;

        log::info!("serial device open: {port_name} @ {}", config.baudrate);
        Ok(RavenHandle { port })
    }
}

impl<P: SerialPort> RavenHandle<P> {
    /// Wraps an already open port.
    pub fn new(port: P) -> Self {
        RavenHandle { port }
    }

    /// Splits into the inbound line stream and the outbound command writer.
    ///
    /// Dropping both halves closes the port.
    pub fn into_split(self) -> (LineReader<ReadHalf<P>>, CommandIssuer<WriteHalf<P>>) {
        let (read, write) = tokio::io::split(self.port);
        (LineReader::new(read), CommandIssuer::new(write))
    }
}

/// Yields newline-delimited lines in arrival order.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        LineReader {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Next line without its `\n` / `\r\n` terminator, or `None` at end of
    /// stream.
    ///
    /// Cancel safe: a partially read line is kept for the next call, so this
    /// can sit in a `tokio::select!` next to a poll timer. Invalid UTF-8 is
    /// replaced rather than rejected; the XML decoder will flag it.
    pub async fn next_line(&mut self) -> Result<Option<String>, RavenError> {
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let mut end = self.buf.len();
        if end > 0 && self.buf[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && self.buf[end - 1] == b'\r' {
            end -= 1;
        }
        let line = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.clear();
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raven::serial_mock::MockSerialPort;

    #[tokio::test]
    async fn test_lines_strip_terminators() {
        let mock = MockSerialPort::new();
        mock.queue_rx_data(b"<A>\r\n  <B>1</B>\n</A>");

        let (mut lines, _commands) = RavenHandle::new(mock).into_split();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("<A>"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("  <B>1</B>"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("</A>"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let mock = MockSerialPort::new();
        mock.queue_rx_data(b"<A>\xff</A>\r\n");

        let mut lines = LineReader::new(mock);
        let line = lines.next_line().await.unwrap().unwrap();
        assert!(line.starts_with("<A>"));
        assert!(line.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_read_error_is_transport_error() {
        let mock = MockSerialPort::new();
        mock.set_next_error(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "unplugged",
        ));
        let mut lines = LineReader::new(mock);
        let err = lines.next_line().await.unwrap_err();
        assert!(matches!(err, RavenError::SerialPortError(_)));
    }

    #[tokio::test]
    async fn test_split_halves_share_port() {
        let mock = MockSerialPort::new();
        let (_lines, mut commands) = RavenHandle::new(mock.clone()).into_split();
        commands.connection_status().await.unwrap();
        assert_eq!(
            mock.get_tx_string(),
            "<Command><Name>get_connection_status</Name></Command>\r\n"
        );
    }
}
