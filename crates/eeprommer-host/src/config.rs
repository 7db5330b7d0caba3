//! Host configuration.
//!
//! Loaded from an optional YAML file; every field has a default so an empty
//! file (or no file) gives the programmer's stock 115200 8N1 setup.
//!
//! ```yaml
//! serial:
//!   baud_rate: 115200
//!   parity: none
//!   stop_bits: 1
//! start_dir: /home/me/roms
//! hexdump: true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HostError, HostResult};

/// Default line rate of the programmer.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Parity setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParitySetting {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Flow control setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlSetting {
    /// No flow control.
    #[default]
    None,
    /// XON/XOFF.
    Software,
    /// RTS/CTS.
    Hardware,
}

/// Serial line parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Line rate in bits per second.
    pub baud_rate: u32,
    /// Bits per character, 5-8.
    pub data_bits: u8,
    /// Parity bit.
    pub parity: ParitySetting,
    /// Stop bits, 1 or 2.
    pub stop_bits: u8,
    /// Flow control.
    pub flow_control: FlowControlSetting,
    /// Read timeout; only bounds how quickly an interrupt is noticed.
    pub poll_interval_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: ParitySetting::None,
            stop_bits: 1,
            flow_control: FlowControlSetting::None,
            poll_interval_ms: 100,
        }
    }
}

impl SerialSettings {
    /// Read timeout as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Data bits for the serial builder.
    pub fn data_bits(&self) -> HostResult<serialport::DataBits> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            n => Err(HostError::Config(format!("data_bits must be 5-8, got {}", n))),
        }
    }

    /// Parity for the serial builder.
    pub fn parity(&self) -> serialport::Parity {
        match self.parity {
            ParitySetting::None => serialport::Parity::None,
            ParitySetting::Odd => serialport::Parity::Odd,
            ParitySetting::Even => serialport::Parity::Even,
        }
    }

    /// Stop bits for the serial builder.
    pub fn stop_bits(&self) -> HostResult<serialport::StopBits> {
        match self.stop_bits {
            1 => Ok(serialport::StopBits::One),
            2 => Ok(serialport::StopBits::Two),
            n => Err(HostError::Config(format!("stop_bits must be 1 or 2, got {}", n))),
        }
    }

    /// Flow control for the serial builder.
    pub fn flow_control(&self) -> serialport::FlowControl {
        match self.flow_control {
            FlowControlSetting::None => serialport::FlowControl::None,
            FlowControlSetting::Software => serialport::FlowControl::Software,
            FlowControlSetting::Hardware => serialport::FlowControl::Hardware,
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> HostResult<()> {
        if self.baud_rate == 0 {
            return Err(HostError::Config("baud_rate must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(HostError::Config("poll_interval_ms must be positive".into()));
        }
        self.data_bits()?;
        self.stop_bits()?;
        Ok(())
    }
}

/// Top-level host configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Serial line parameters.
    pub serial: SerialSettings,
    /// Initial text of the path prompt.
    pub start_dir: Option<PathBuf>,
    /// Dump read and written payloads in the log.
    pub hexdump: bool,
}

impl HostConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> HostResult<Self> {
        // An empty document parses as null rather than an empty mapping.
        let config: HostConfig = if text.trim().is_empty() {
            HostConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: &Path) -> HostResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Check every section.
    pub fn validate(&self) -> HostResult<()> {
        self.serial.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.data_bits().unwrap(), serialport::DataBits::Eight);
        assert_eq!(config.serial.parity(), serialport::Parity::None);
        assert_eq!(config.serial.stop_bits().unwrap(), serialport::StopBits::One);
        assert_eq!(config.serial.poll_interval(), Duration::from_millis(100));
        assert!(config.start_dir.is_none());
        assert!(!config.hexdump);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(HostConfig::from_yaml("").unwrap(), HostConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let yaml = "serial:\n  baud_rate: 9600\n  parity: even\n  flow_control: hardware\nhexdump: true\n";
        let config = HostConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.parity(), serialport::Parity::Even);
        assert_eq!(config.serial.flow_control(), serialport::FlowControl::Hardware);
        assert_eq!(config.serial.data_bits, 8);
        assert!(config.hexdump);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            HostConfig::from_yaml("serial:\n  baud_rate: 0\n"),
            Err(HostError::Config(_))
        ));
        assert!(matches!(
            HostConfig::from_yaml("serial:\n  data_bits: 9\n"),
            Err(HostError::Config(_))
        ));
        assert!(matches!(
            HostConfig::from_yaml("serial:\n  stop_bits: 3\n"),
            Err(HostError::Config(_))
        ));
        assert!(matches!(
            HostConfig::from_yaml("serial:\n  parity: mark\n"),
            Err(HostError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.yaml");
        std::fs::write(&path, "start_dir: /tmp/roms\n").unwrap();
        let config = HostConfig::load(&path).unwrap();
        assert_eq!(config.start_dir, Some(PathBuf::from("/tmp/roms")));

        let missing = HostConfig::load(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(HostError::ConfigIo { .. })));
    }
}
