//! Channel address resolution.
//!
//! Point tables give a module position as `<rack>_<slot>_<module>_<channel>`
//! (for example `1_3_AI_0`) with the channel numbered from zero as printed on
//! the terminal block. The controller addresses the same point as
//! `DPIO_<rack>_<slot>_<channel + 1>`. The module token is only checked for
//! shape. `-`, `.` and `/` are accepted as separators, and the module token
//! may be left out.
//!
//! Resolution never fails: anything that cannot be mapped becomes
//! [`SENTINEL_CHANNEL`].

use std::fmt;

use tracing::warn;

/// Placeholder for points without a usable address.
pub const SENTINEL_CHANNEL: &str = "DPIO_0_0_0";

const CANONICAL_PREFIX: &str = "DPIO";
const SEPARATORS: [char; 4] = ['_', '-', '.', '/'];

/// A parsed hardware address. `channel` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HardChannel {
    pub rack: u32,
    pub slot: u32,
    pub channel: u32,
}

impl HardChannel {
    /// Parses a raw module position or an already canonical address.
    pub fn parse(raw: &str) -> Option<HardChannel> {
        let parts: Vec<&str> = raw.trim().split(SEPARATORS).collect();
        if parts.iter().any(|part| part.is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [prefix, rack, slot, channel] if prefix.eq_ignore_ascii_case(CANONICAL_PREFIX) => {
                Some(HardChannel {
                    rack: rack.parse().ok()?,
                    slot: slot.parse().ok()?,
                    channel: channel.parse().ok()?,
                })
            }
            [rack, slot, module, channel] if is_module_token(module) => {
                Self::from_position(rack, slot, channel)
            }
            [rack, slot, channel] => Self::from_position(rack, slot, channel),
            _ => None,
        }
    }

    fn from_position(rack: &str, slot: &str, channel: &str) -> Option<HardChannel> {
        let rack: u32 = rack.parse().ok()?;
        let slot: u32 = slot.parse().ok()?;
        let channel: u32 = channel.parse().ok()?;
        if rack == 0 || slot == 0 {
            return None;
        }
        Some(HardChannel {
            rack,
            slot,
            channel: channel.checked_add(1)?,
        })
    }

    pub fn is_sentinel(&self) -> bool {
        self.rack == 0 && self.slot == 0 && self.channel == 0
    }
}

impl fmt::Display for HardChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CANONICAL_PREFIX}_{}_{}_{}", self.rack, self.slot, self.channel)
    }
}

fn is_module_token(token: &str) -> bool {
    token.len() <= 8 && token.chars().all(|ch| ch.is_ascii_alphabetic())
}

/// Maps a raw position to the controller address.
///
/// A non-empty `raw` wins. When it is empty the trimmed `fallback` is used
/// verbatim, and when both are empty the sentinel is returned.
pub fn resolve_channel(raw: &str, fallback: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        let fallback = fallback.trim();
        return if fallback.is_empty() {
            SENTINEL_CHANNEL.to_string()
        } else {
            fallback.to_string()
        };
    }
    match HardChannel::parse(raw) {
        Some(address) => address.to_string(),
        None => {
            warn!(position = raw, "unrecognized channel position, using sentinel");
            SENTINEL_CHANNEL.to_string()
        }
    }
}
