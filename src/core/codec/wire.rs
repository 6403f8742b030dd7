//! Colon-delimited configuration frames

use super::{pack_le, unpack_le, CodecError};
use serde::{Deserialize, Serialize};

/// Leading literal of a `getconfig` reply
pub const CONFIG_LITERAL: &str = "config";

/// Field separator on the wire
const SEPARATOR: char = ':';

/// Persistent device settings
///
/// `port` is carried as a plain integer. The device stores it as a `u16` but
/// nothing on this side range-checks it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// WiFi network name
    pub ssid: String,
    /// UDP service port
    pub port: i64,
    /// GPIO pins of the three logged UARTs
    pub uarts: [u8; 3],
    /// I2C pins of the display (SDA, SCL)
    pub screen: [u8; 2],
    /// I2C pins of the INA power monitor (SDA, SCL)
    pub ina: [u8; 2],
}

impl DeviceConfig {
    /// Parse a `getconfig` reply
    ///
    /// A trailing line terminator is ignored. Fields past the sixth are
    /// ignored as well.
    pub fn parse(wire: &str) -> Result<Self, CodecError> {
        let line = wire.trim_end_matches(['\r', '\n']);
        let mut fields = line.split(SEPARATOR);

        if fields.next() != Some(CONFIG_LITERAL) {
            return Err(CodecError::malformed("not a config reply", wire));
        }
        let ssid = fields
            .next()
            .ok_or_else(|| CodecError::malformed("missing ssid", wire))?;

        let mut number = |name: &str| -> Result<i64, CodecError> {
            let field = fields
                .next()
                .ok_or_else(|| CodecError::malformed(format!("missing {name}"), wire))?;
            field
                .trim()
                .parse::<i64>()
                .map_err(|e| CodecError::malformed(format!("invalid {name} ({e})"), wire))
        };

        let port = number("port")?;
        let uarts = number("uarts")?;
        let screen = number("screen")?;
        let ina = number("ina")?;

        Ok(Self {
            ssid: ssid.to_string(),
            port,
            uarts: unpack_le(uarts),
            screen: unpack_le(screen),
            ina: unpack_le(ina),
        })
    }

    /// Render the argument list of a `setconfig` command
    ///
    /// The frame has no leading literal and carries the password right after
    /// the ssid, unlike the `getconfig` reply.
    pub fn serialize_for_write(&self, password: &str) -> String {
        format!(
            "{ssid}{s}{password}{s}{port}{s}{uarts}{s}{screen}{s}{ina}",
            ssid = self.ssid,
            port = self.port,
            uarts = pack_le(&self.uarts),
            screen = pack_le(&self.screen),
            ina = pack_le(&self.ina),
            s = SEPARATOR,
        )
    }

    /// Human-readable dump, 4-space indented JSON
    pub fn to_display_text(&self) -> String {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        match self.serialize(&mut ser) {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => format!("{self:#?}"),
        }
    }

    /// Integer form of the UART pin bytes
    pub fn uarts_value(&self) -> u32 {
        pack_le(&self.uarts)
    }

    /// Integer form of the screen pin bytes
    pub fn screen_value(&self) -> u32 {
        pack_le(&self.screen)
    }

    /// Integer form of the INA pin bytes
    pub fn ina_value(&self) -> u32 {
        pack_le(&self.ina)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeviceConfig {
        DeviceConfig::parse("config:MyWifi:8080:65535:511:1023").unwrap()
    }

    #[test]
    fn test_parse_reply() {
        let cfg = sample();
        assert_eq!(cfg.ssid, "MyWifi");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.uarts, [255, 255, 0]);
        assert_eq!(cfg.screen, [255, 1]);
        assert_eq!(cfg.ina, [255, 3]);
    }

    #[test]
    fn test_serialize_inserts_password_and_drops_literal() {
        assert_eq!(
            sample().serialize_for_write("secret"),
            "MyWifi:secret:8080:65535:511:1023"
        );
    }

    #[test]
    fn test_parse_strips_serial_line_ending() {
        let cfg = DeviceConfig::parse("config:lab:60606:1050628:8452:4625\r\n").unwrap();
        assert_eq!(cfg.ssid, "lab");
        assert_eq!(cfg.port, 60606);
        assert_eq!(cfg.uarts, [4, 8, 16]);
        assert_eq!(cfg.screen, [4, 33]);
        assert_eq!(cfg.ina, [17, 18]);
        assert_eq!(cfg.serialize_for_write("pw"), "lab:pw:60606:1050628:8452:4625");
    }

    #[test]
    fn test_parse_empty_ssid() {
        let cfg = DeviceConfig::parse("config::0:0:0:0").unwrap();
        assert_eq!(cfg, DeviceConfig::default());
    }

    #[test]
    fn test_port_is_not_range_checked() {
        let cfg = DeviceConfig::parse("config:x:70000:0:0:0").unwrap();
        assert_eq!(cfg.port, 70000);
        assert_eq!(cfg.serialize_for_write("p"), "x:p:70000:0:0:0");
    }

    #[test]
    fn test_oversized_pin_values_truncate() {
        let cfg = DeviceConfig::parse("config:x:1:4294967295:70000:65536").unwrap();
        assert_eq!(cfg.uarts, [255, 255, 255]);
        assert_eq!(cfg.screen, [0x70, 0x11]);
        assert_eq!(cfg.ina, [0, 0]);
        assert_eq!(cfg.uarts_value(), 0xFF_FF_FF);
        assert_eq!(cfg.screen_value(), 0x1170);
        assert_eq!(cfg.ina_value(), 0);
    }

    #[test]
    fn test_wrong_literal_is_malformed() {
        let err = DeviceConfig::parse("notconfig:MyWifi:8080:65535:511:1023").unwrap_err();
        assert!(matches!(err, CodecError::MalformedWireFormat { .. }));
        assert!(DeviceConfig::parse("error:Unknown command foo").is_err());
        assert!(DeviceConfig::parse("").is_err());
    }

    #[test]
    fn test_non_numeric_fields_are_malformed() {
        let err = DeviceConfig::parse("config:a:b:c:d:e").unwrap_err();
        assert!(matches!(err, CodecError::MalformedWireFormat { .. }));
        assert!(DeviceConfig::parse("config:a:1:2:3:x").is_err());
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        assert!(DeviceConfig::parse("config").is_err());
        assert!(DeviceConfig::parse("config:a").is_err());
        assert!(DeviceConfig::parse("config:a:1:2:3").is_err());
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let cfg = DeviceConfig::parse("config:MyWifi:8080:65535:511:1023:extra").unwrap();
        assert_eq!(cfg, sample());
    }

    #[test]
    fn test_display_text_lists_fields() {
        let text = sample().to_display_text();
        assert!(text.starts_with("{\n    \"ssid\": \"MyWifi\""));
        assert!(text.contains("\"port\": 8080"));
        assert!(text.contains("\"uarts\": [\n        255,\n        255,\n        0\n    ]"));
    }

    #[test]
    fn test_display_text_is_not_a_wire_form() {
        let text = sample().to_display_text();
        assert!(DeviceConfig::parse(&text).is_err());
    }
}
