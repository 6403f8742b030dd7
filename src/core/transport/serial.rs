//! Serial port transport implementation
//!
//! Request/response over a newline-terminated ASCII line protocol:
//!
//! | command                     | reply                         |
//! |-----------------------------|-------------------------------|
//! | `ping`                      | anything (liveness only)      |
//! | `getconfig`                 | `config:<ssid>:<port>:...`    |
//! | `setconfig:<ssid>:<pw>:...` | device acknowledgement        |
//! | `save`                      | device acknowledgement        |

use super::TransportError;
use crate::core::cancel::{CancelToken, Deadline};
use crate::core::codec::DeviceConfig;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits};
use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Line speed of the configuration UART
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Per-read timeout of the OS handle; the line reader loops over it
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Serial port configuration
///
/// Framing is fixed at 8N1 without flow control. Only the speed and the
/// response deadline are adjustable.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name (e.g., /dev/ttyUSB0, /dev/cu.usbserial-0001)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Give up waiting for a reply after this long; `None` waits forever
    pub response_timeout: Option<Duration>,
}

impl SerialConfig {
    /// Create a new serial configuration with default settings
    pub fn new(port: &str) -> Self {
        Self {
            port: port.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout: None,
        }
    }

    /// Set baud rate
    #[must_use]
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Bound every request by a response deadline
    #[must_use]
    pub fn response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }
}

/// Commands understood by the device's configuration console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Liveness probe
    Ping,
    /// Read the active configuration
    GetConfig,
    /// Replace the active configuration; payload is the `setconfig` argument list
    SetConfig(String),
    /// Persist the active configuration to flash
    Save,
    /// Anything else, sent verbatim
    Raw(String),
}

impl DeviceCommand {
    /// Exact command text, without the line terminator
    pub fn to_line(&self) -> String {
        match self {
            Self::Ping => "ping".to_string(),
            Self::GetConfig => "getconfig".to_string(),
            Self::SetConfig(args) => format!("setconfig:{args}"),
            Self::Save => "save".to_string(),
            Self::Raw(cmd) => cmd.clone(),
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Line-oriented serial transport
///
/// Generic over the byte stream so it can run over an OS serial handle, a
/// PTY, or an in-memory buffer.
pub struct SerialTransport<S = Box<dyn SerialPort>> {
    stream: S,
    name: String,
    pending: Vec<u8>,
    response_timeout: Option<Duration>,
    cancel: CancelToken,
}

impl SerialTransport {
    /// Open the port and check that the device answers
    pub fn open(config: &SerialConfig, cancel: CancelToken) -> Result<Self, TransportError> {
        info!("Open device {}", config.port);

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::PortNotFound(config.port.clone()),
                serialport::ErrorKind::Io(ErrorKind::NotFound) => {
                    TransportError::PortNotFound(config.port.clone())
                }
                serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied(config.port.clone())
                }
                _ => TransportError::ConnectionFailed(e.to_string()),
            })?;

        SerialTransport::from_stream(port, &config.port, config.response_timeout, cancel)
    }
}

impl<S: Read + Write> SerialTransport<S> {
    /// Wrap an already open stream and ping the device
    pub fn from_stream(
        stream: S,
        name: &str,
        response_timeout: Option<Duration>,
        cancel: CancelToken,
    ) -> Result<Self, TransportError> {
        let mut transport = Self {
            stream,
            name: name.to_string(),
            pending: Vec::new(),
            response_timeout,
            cancel,
        };
        let resp = transport.send(&DeviceCommand::Ping)?;
        debug!("Ping reply from {}: {:?}", transport.name, resp);
        Ok(transport)
    }

    /// Name of the underlying port
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send a raw command line and return the reply, newline included
    ///
    /// Nothing is written once the cancel token has fired.
    pub fn command(&mut self, cmd: &str) -> Result<String, TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        debug!("< {}", cmd);
        let mut line = Vec::with_capacity(cmd.len() + 1);
        line.extend_from_slice(cmd.as_bytes());
        line.push(b'\n');
        self.stream.write_all(&line)?;
        self.stream.flush()?;

        let resp = self.read_line()?;
        debug!("> {:?}", resp);
        Ok(resp)
    }

    /// Send a typed command
    pub fn send(&mut self, cmd: &DeviceCommand) -> Result<String, TransportError> {
        self.command(&cmd.to_line())
    }

    /// Fetch and decode the device configuration
    pub fn read_config(&mut self) -> Result<DeviceConfig, TransportError> {
        let resp = self.send(&DeviceCommand::GetConfig)?;
        Ok(DeviceConfig::parse(&resp)?)
    }

    /// Push a configuration; returns the device acknowledgement
    pub fn write_config(
        &mut self,
        config: &DeviceConfig,
        password: &str,
    ) -> Result<String, TransportError> {
        self.send(&DeviceCommand::SetConfig(config.serialize_for_write(password)))
    }

    /// Ask the device to persist its active configuration
    pub fn save_config(&mut self) -> Result<String, TransportError> {
        self.send(&DeviceCommand::Save)
    }

    /// Release the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        let deadline = self.response_timeout.map(Deadline::after);
        let mut buf = [0u8; 256];

        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            if self.cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            if let Some(deadline) = deadline {
                if deadline.is_expired() {
                    return Err(TransportError::Timeout(deadline.timeout()));
                }
            }

            match self.stream.read(&mut buf) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::IoError(e)),
            }
        }
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::IoError(e.into()))
}

/// Pick the first port that looks like the device's USB-serial bridge
pub fn find_device() -> Result<String, TransportError> {
    let ports = list_ports()?;
    debug!("Found ports {:?}", ports.iter().map(|p| &p.port_name).collect::<Vec<_>>());
    select_device(&ports)
        .map(str::to_string)
        .ok_or_else(|| TransportError::PortNotFound("no USB serial device".to_string()))
}

/// Choose a port from an enumeration
///
/// macOS call-out devices named `cu.*usbserial*` win, then any other port with
/// `usbserial` in its name, then the first USB port.
pub fn select_device(ports: &[SerialPortInfo]) -> Option<&str> {
    let is_usbserial = |p: &&SerialPortInfo| p.port_name.contains("usbserial");

    ports
        .iter()
        .filter(is_usbserial)
        .find(|p| p.port_name.contains("/cu."))
        .or_else(|| ports.iter().find(is_usbserial))
        .or_else(|| {
            ports
                .iter()
                .find(|p| matches!(p.port_type, SerialPortType::UsbPort(_)))
        })
        .map(|p| p.port_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Scripted device: reads come from `input`, writes land in `output`
    struct ScriptedPort {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl ScriptedPort {
        fn new(replies: &str) -> Self {
            Self {
                input: Cursor::new(replies.as_bytes().to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Never produces data, like an unplugged device behind an open handle
    struct SilentPort;

    impl Read for SilentPort {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(Duration::from_millis(5));
            Err(ErrorKind::TimedOut.into())
        }
    }

    impl Write for SilentPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn transport(replies: &str) -> SerialTransport<ScriptedPort> {
        SerialTransport::from_stream(ScriptedPort::new(replies), "test", None, CancelToken::new())
            .unwrap()
    }

    fn ports(names: &[&str]) -> Vec<SerialPortInfo> {
        names
            .iter()
            .map(|n| SerialPortInfo {
                port_name: n.to_string(),
                port_type: SerialPortType::Unknown,
            })
            .collect()
    }

    #[test]
    fn test_open_pings_device() {
        let t = transport("pong\n");
        assert_eq!(t.into_inner().output, b"ping\n");
    }

    #[test]
    fn test_command_keeps_newline() {
        let mut t = transport("pong\nok\r\n");
        assert_eq!(t.command("reboot").unwrap(), "ok\r\n");
        assert_eq!(t.into_inner().output, b"ping\nreboot\n");
    }

    #[test]
    fn test_replies_split_across_reads() {
        let mut t = transport("pong\nfirst\nsecond\n");
        assert_eq!(t.command("a").unwrap(), "first\n");
        assert_eq!(t.command("b").unwrap(), "second\n");
    }

    #[test]
    fn test_read_config() {
        let mut t = transport("pong\nconfig:MyWifi:8080:65535:511:1023\n");
        let cfg = t.read_config().unwrap();
        assert_eq!(cfg.ssid, "MyWifi");
        assert_eq!(cfg.uarts, [255, 255, 0]);
        assert_eq!(t.into_inner().output, b"ping\ngetconfig\n");
    }

    #[test]
    fn test_read_config_rejects_error_reply() {
        let mut t = transport("pong\nerror:Unknown command getconfig\n");
        assert!(matches!(t.read_config(), Err(TransportError::Codec(_))));
    }

    #[test]
    fn test_write_and_save_config() {
        let mut t = transport("pong\nok\nok\n");
        let cfg = DeviceConfig::parse("config:MyWifi:8080:65535:511:1023").unwrap();
        assert_eq!(t.write_config(&cfg, "secret").unwrap(), "ok\n");
        assert_eq!(t.save_config().unwrap(), "ok\n");
        assert_eq!(
            String::from_utf8(t.into_inner().output).unwrap(),
            "ping\nsetconfig:MyWifi:secret:8080:65535:511:1023\nsave\n"
        );
    }

    #[test]
    fn test_closed_line_is_disconnect() {
        let mut t = transport("pong\npartial");
        assert!(matches!(t.command("x"), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_deadline_bounds_silent_device() {
        let result = SerialTransport::from_stream(
            SilentPort,
            "silent",
            Some(Duration::from_millis(30)),
            CancelToken::new(),
        );
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[test]
    fn test_cancel_aborts_wait() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = SerialTransport::from_stream(SilentPort, "silent", None, cancel);
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[test]
    fn test_cancelled_write_never_reaches_device() {
        let cancel = CancelToken::new();
        let mut t = SerialTransport::from_stream(
            ScriptedPort::new("pong\nok\n"),
            "test",
            None,
            cancel.clone(),
        )
        .unwrap();
        let cfg = DeviceConfig::parse("config:MyWifi:8080:65535:511:1023").unwrap();

        cancel.cancel();
        assert!(matches!(
            t.write_config(&cfg, "partial"),
            Err(TransportError::Cancelled)
        ));
        assert!(matches!(t.save_config(), Err(TransportError::Cancelled)));
        assert_eq!(t.into_inner().output, b"ping\n");
    }

    #[test]
    fn test_command_lines() {
        assert_eq!(DeviceCommand::Ping.to_line(), "ping");
        assert_eq!(DeviceCommand::GetConfig.to_line(), "getconfig");
        assert_eq!(DeviceCommand::SetConfig("a:b".into()).to_line(), "setconfig:a:b");
        assert_eq!(DeviceCommand::Save.to_string(), "save");
        assert_eq!(DeviceCommand::Raw("reset".into()).to_line(), "reset");
    }

    #[test]
    fn test_select_device_prefers_callout_usbserial() {
        let list = ports(&[
            "/dev/tty.Bluetooth",
            "/dev/tty.usbserial-0001",
            "/dev/cu.usbserial-0001",
        ]);
        assert_eq!(select_device(&list), Some("/dev/cu.usbserial-0001"));

        let list = ports(&["/dev/ttyS0", "/dev/tty.usbserial-9"]);
        assert_eq!(select_device(&list), Some("/dev/tty.usbserial-9"));

        assert_eq!(select_device(&ports(&["/dev/ttyS0"])), None);
        assert_eq!(select_device(&[]), None);
    }

    #[test]
    fn test_serial_config_builder() {
        let cfg = SerialConfig::new("/dev/ttyUSB0")
            .baud_rate(9600)
            .response_timeout(Some(Duration::from_secs(2)));
        assert_eq!(cfg.port, "/dev/ttyUSB0");
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.response_timeout, Some(Duration::from_secs(2)));
        assert_eq!(SerialConfig::new("x").baud_rate, DEFAULT_BAUD_RATE);
    }
}
