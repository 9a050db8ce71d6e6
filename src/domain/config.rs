use crate::domain::error::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_DATA_BITS: u8 = 8;

/// Connection parameters resolved from the command line and the config file.
///
/// Immutable once the session starts. Every field already holds a typed value;
/// validation of raw option strings happens before this struct is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Port to open. `None` means the port is chosen interactively.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub handshake: Handshake,
    /// Exit the terminal when the device disappears.
    pub disconnect_exit: bool,
    /// Pulse the reset line after every successful open.
    pub reset_on_connect: bool,
    pub dtr_enabled: bool,
    pub rts_enabled: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            handshake: Handshake::None,
            disconnect_exit: false,
            reset_on_connect: false,
            dtr_enabled: true,
            rts_enabled: true,
        }
    }
}

/// Contents of the optional configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub logging: LoggingConfig,
    pub defaults: ConnectionDefaults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither `RUST_LOG` nor `--verbose` is given
    pub level: Option<String>,
    /// Write logs to this file instead of stderr
    pub file: Option<String>,
}

/// Connection defaults applied beneath command-line values.
///
/// Enum-like values stay strings here; they go through the same validation as
/// the command line when the connection config is resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub data_bits: Option<u8>,
    pub parity: Option<String>,
    pub stop_bits: Option<String>,
    pub handshake: Option<String>,
    pub disconnect_exit: Option<bool>,
    pub reset_esp32: Option<bool>,
    pub dtr: Option<bool>,
    pub rts: Option<bool>,
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub const ALL: [DataBits; 4] = [DataBits::Five, DataBits::Six, DataBits::Seven, DataBits::Eight];

    pub fn from_count(bits: u8) -> Option<Self> {
        match bits {
            5 => Some(DataBits::Five),
            6 => Some(DataBits::Six),
            7 => Some(DataBits::Seven),
            8 => Some(DataBits::Eight),
            _ => None,
        }
    }

    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = ConfigValidationError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::from_count(bits)
            .ok_or_else(|| ConfigValidationError::new("data-bits", bits.to_string(), "5..[8]"))
    }
}

impl FromStr for DataBits {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::from_count)
            .ok_or_else(|| ConfigValidationError::new("data-bits", s, "5..[8]"))
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    pub const ALL: [Parity; 5] = [Parity::None, Parity::Odd, Parity::Even, Parity::Mark, Parity::Space];
    const EXPECTED: &'static str = "[none] | mark | even | odd | space";

    /// Case-insensitive name lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Parity::None),
            "odd" => Some(Parity::Odd),
            "even" => Some(Parity::Even),
            "mark" => Some(Parity::Mark),
            "space" => Some(Parity::Space),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Parity::None => "None",
            Parity::Odd => "Odd",
            Parity::Even => "Even",
            Parity::Mark => "Mark",
            Parity::Space => "Space",
        }
    }
}

impl FromStr for Parity {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ConfigValidationError::new("parity", s, Self::EXPECTED))
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

impl StopBits {
    pub const ALL: [StopBits; 3] = [StopBits::One, StopBits::OnePointFive, StopBits::Two];
    const EXPECTED: &'static str = "[one] | onepointfive | two";

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "one" => Some(StopBits::One),
            "onepointfive" => Some(StopBits::OnePointFive),
            "two" => Some(StopBits::Two),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StopBits::One => "One",
            StopBits::OnePointFive => "OnePointFive",
            StopBits::Two => "Two",
        }
    }
}

impl FromStr for StopBits {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ConfigValidationError::new("stop-bits", s, Self::EXPECTED))
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flow control scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handshake {
    None,
    Rts,
    XonXoff,
    RtsXonXoff,
}

impl Handshake {
    pub const ALL: [Handshake; 4] = [
        Handshake::None,
        Handshake::Rts,
        Handshake::XonXoff,
        Handshake::RtsXonXoff,
    ];
    const EXPECTED: &'static str = "[none] | xonxoff | rts | rtsxonxoff";

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Handshake::None),
            "rts" => Some(Handshake::Rts),
            "xonxoff" => Some(Handshake::XonXoff),
            "rtsxonxoff" => Some(Handshake::RtsXonXoff),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Handshake::None => "None",
            Handshake::Rts => "RTS",
            Handshake::XonXoff => "XonXoff",
            Handshake::RtsXonXoff => "RTSXonXoff",
        }
    }

    /// Whether the driver owns the RTS line for hardware flow control.
    pub fn drives_rts(self) -> bool {
        matches!(self, Handshake::Rts | Handshake::RtsXonXoff)
    }
}

impl FromStr for Handshake {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ConfigValidationError::new("handshake", s, Self::EXPECTED))
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.handshake, Handshake::None);
        assert!(config.dtr_enabled && config.rts_enabled);
        assert!(!config.disconnect_exit && !config.reset_on_connect);
        assert!(config.port.is_none());
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(Parity::from_name("EVEN"), Some(Parity::Even));
        assert_eq!(Parity::from_name("sPaCe"), Some(Parity::Space));
        assert_eq!(StopBits::from_name("OnePointFive"), Some(StopBits::OnePointFive));
        assert_eq!(Handshake::from_name("RTSXonXoff"), Some(Handshake::RtsXonXoff));
        assert_eq!(Handshake::from_name("xonxoff"), Some(Handshake::XonXoff));
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        assert_eq!(Parity::from_name("parity"), None);
        let err = "1.5".parse::<StopBits>().unwrap_err();
        assert_eq!(err.option, "stop-bits");
        assert_eq!(err.value, "1.5");
        assert!("hardware".parse::<Handshake>().is_err());
    }

    #[test]
    fn test_data_bits_range() {
        assert_eq!("5".parse::<DataBits>().unwrap(), DataBits::Five);
        assert_eq!(DataBits::try_from(7).unwrap(), DataBits::Seven);
        assert!("4".parse::<DataBits>().is_err());
        assert!(DataBits::try_from(9).is_err());
        assert!("eight".parse::<DataBits>().is_err());
    }

    #[test]
    fn test_rts_handshake_ownership() {
        assert!(Handshake::Rts.drives_rts());
        assert!(Handshake::RtsXonXoff.drives_rts());
        assert!(!Handshake::XonXoff.drives_rts());
        assert!(!Handshake::None.drives_rts());
    }

    #[test]
    fn test_file_config_sections_are_optional() {
        let config: FileConfig = toml::from_str("[defaults]\nbaud = 9600\n").unwrap();
        assert_eq!(config.defaults.baud, Some(9600));
        assert_eq!(config.defaults.parity, None);
        assert_eq!(config.logging, LoggingConfig::default());

        let empty: FileConfig = toml::from_str("").unwrap();
        assert_eq!(empty, FileConfig::default());
    }

    proptest! {
        #[test]
        fn prop_display_names_map_back(idx in 0usize..5, upper in any::<bool>()) {
            let parity = Parity::ALL[idx];
            let name = if upper { parity.name().to_uppercase() } else { parity.name().to_lowercase() };
            prop_assert_eq!(Parity::from_name(&name), Some(parity));
        }

        #[test]
        fn prop_name_lookup_never_panics(input in ".*") {
            let _ = Parity::from_name(&input);
            let _ = StopBits::from_name(&input);
            let _ = Handshake::from_name(&input);
            let _ = input.parse::<DataBits>();
        }

        #[test]
        fn prop_data_bits_accepts_only_five_to_eight(bits in any::<u8>()) {
            prop_assert_eq!(DataBits::from_count(bits).is_some(), (5..=8).contains(&bits));
        }
    }
}
