//! Signal type enumeration.
//!
//! Point tables name the I/O category of a row with a short tag. The built-in
//! generators cover hard-wired analog and digital I/O plus the two kinds of
//! signals mapped over a TCP link.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in signal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalKind {
    /// AI: hard-wired analog input.
    AnalogInput,
    /// AO: hard-wired analog output.
    AnalogOutput,
    /// DI: hard-wired digital input.
    DigitalInput,
    /// DO: hard-wired digital output.
    DigitalOutput,
    /// TCP_AI: analog value received over a TCP link.
    TcpAnalog,
    /// TCP_DI: digital value received over a TCP link.
    TcpDigital,
}

impl SignalKind {
    pub const ALL: [SignalKind; 6] = [
        SignalKind::AnalogInput,
        SignalKind::AnalogOutput,
        SignalKind::DigitalInput,
        SignalKind::DigitalOutput,
        SignalKind::TcpAnalog,
        SignalKind::TcpDigital,
    ];

    /// Canonical type tag, also the template directory name.
    pub fn tag(&self) -> &'static str {
        match self {
            SignalKind::AnalogInput => "AI",
            SignalKind::AnalogOutput => "AO",
            SignalKind::DigitalInput => "DI",
            SignalKind::DigitalOutput => "DO",
            SignalKind::TcpAnalog => "TCP_AI",
            SignalKind::TcpDigital => "TCP_DI",
        }
    }

    /// Alternate spellings accepted by the dispatcher.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            SignalKind::AnalogInput => &["ANALOG_INPUT"],
            SignalKind::AnalogOutput => &["ANALOG_OUTPUT"],
            SignalKind::DigitalInput => &["DIGITAL_INPUT"],
            SignalKind::DigitalOutput => &["DIGITAL_OUTPUT"],
            SignalKind::TcpAnalog => &["TCP_ANALOG", "TCPAI"],
            SignalKind::TcpDigital => &["TCP_DIGITAL", "TCPDI"],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalKind::AnalogInput => "Analog input",
            SignalKind::AnalogOutput => "Analog output",
            SignalKind::DigitalInput => "Digital input",
            SignalKind::DigitalOutput => "Digital output",
            SignalKind::TcpAnalog => "TCP-mapped analog",
            SignalKind::TcpDigital => "TCP-mapped digital",
        }
    }

    /// Inputs fall back to `input_channel`, outputs to `output_channel`.
    /// TCP signals are read from the link and count as inputs.
    pub fn is_input(&self) -> bool {
        !matches!(self, SignalKind::AnalogOutput | SignalKind::DigitalOutput)
    }

    pub fn is_analog(&self) -> bool {
        matches!(
            self,
            SignalKind::AnalogInput | SignalKind::AnalogOutput | SignalKind::TcpAnalog
        )
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, SignalKind::TcpAnalog | SignalKind::TcpDigital)
    }

    /// Looks a tag up case-insensitively; `-` and spaces count as `_`.
    pub fn from_tag(tag: &str) -> Option<SignalKind> {
        let normalized = normalize_tag(tag);
        SignalKind::ALL.into_iter().find(|kind| {
            kind.tag() == normalized || kind.aliases().iter().any(|alias| *alias == normalized)
        })
    }
}

/// Uppercases a type tag and folds separators to `_`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .chars()
        .map(|ch| match ch {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for SignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::from_tag(s).ok_or_else(|| format!("Unknown signal type: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in SignalKind::ALL {
            assert_eq!(SignalKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn lookup_ignores_case_and_separators() {
        assert_eq!(SignalKind::from_tag("ai"), Some(SignalKind::AnalogInput));
        assert_eq!(SignalKind::from_tag(" tcp-ai "), Some(SignalKind::TcpAnalog));
        assert_eq!(SignalKind::from_tag("tcp digital"), Some(SignalKind::TcpDigital));
        assert_eq!(SignalKind::from_tag("AX"), None);
        assert!("do".parse::<SignalKind>().is_ok());
    }

    #[test]
    fn direction_and_family() {
        assert!(SignalKind::TcpDigital.is_input());
        assert!(!SignalKind::DigitalOutput.is_input());
        assert!(SignalKind::AnalogOutput.is_analog());
        assert!(!SignalKind::DigitalInput.is_analog());
    }
}
