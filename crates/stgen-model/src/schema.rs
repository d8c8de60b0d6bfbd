//! Field naming conventions shared by the generators and the template
//! validator.
//!
//! A template may only rely on fields the generator guarantees to put into
//! the rendering context, so both sides read the per-type tables in this
//! module rather than keeping their own lists.

use std::collections::BTreeSet;

use crate::signal::SignalKind;

pub const SIGNAL_TYPE: &str = "signal_type";
pub const VARIABLE_NAME: &str = "variable_name";
pub const DESCRIPTION: &str = "description";
pub const UNIT: &str = "unit";
pub const CHANNEL_POSITION: &str = "channel_position";
pub const INPUT_CHANNEL: &str = "input_channel";
pub const OUTPUT_CHANNEL: &str = "output_channel";
/// Derived by preprocessing, never read from input.
pub const HARD_CHANNEL: &str = "hard_channel";
pub const RANGE_LOW: &str = "range_low";
pub const RANGE_HIGH: &str = "range_high";
pub const ALARM_HH: &str = "alarm_hh";
pub const ALARM_H: &str = "alarm_h";
pub const ALARM_L: &str = "alarm_l";
pub const ALARM_LL: &str = "alarm_ll";
pub const HMI_TAG: &str = "hmi_tag";
pub const TAG: &str = "tag";

/// Column spellings lifted onto the canonical field names when a record is
/// built from a loose field map.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    (SIGNAL_TYPE, &["type", "point_type", "module_type"]),
    (VARIABLE_NAME, &["variable", "var_name", "hmi_name"]),
    (DESCRIPTION, &["desc", "variable_description"]),
    (UNIT, &["units", "engineering_unit"]),
    (CHANNEL_POSITION, &["position", "channel"]),
    (INPUT_CHANNEL, &["in_channel"]),
    (OUTPUT_CHANNEL, &["out_channel"]),
    (RANGE_LOW, &["range_lo", "range_low_limit", "low"]),
    (RANGE_HIGH, &["range_hi", "range_high_limit", "high"]),
    (ALARM_HH, &["hh", "shh"]),
    (ALARM_H, &["h", "sh"]),
    (ALARM_L, &["l", "sl"]),
    (ALARM_LL, &["ll", "sll"]),
];

/// Returns the aliases registered for a canonical field.
pub fn aliases_for(field: &str) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// Numeric range and alarm limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThresholdField {
    RangeLow,
    RangeHigh,
    AlarmHh,
    AlarmH,
    AlarmL,
    AlarmLl,
}

impl ThresholdField {
    pub const ALL: [ThresholdField; 6] = [
        ThresholdField::RangeLow,
        ThresholdField::RangeHigh,
        ThresholdField::AlarmHh,
        ThresholdField::AlarmH,
        ThresholdField::AlarmL,
        ThresholdField::AlarmLl,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            ThresholdField::RangeLow => RANGE_LOW,
            ThresholdField::RangeHigh => RANGE_HIGH,
            ThresholdField::AlarmHh => ALARM_HH,
            ThresholdField::AlarmH => ALARM_H,
            ThresholdField::AlarmL => ALARM_L,
            ThresholdField::AlarmLl => ALARM_LL,
        }
    }

    pub fn from_field_name(name: &str) -> Option<ThresholdField> {
        ThresholdField::ALL
            .into_iter()
            .find(|field| field.field_name() == name)
    }
}

/// A field that must be non-empty before generation. The first non-empty
/// value among `name` and `alternates` satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredField {
    pub name: &'static str,
    pub alternates: &'static [&'static str],
}

impl RequiredField {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            alternates: &[],
        }
    }

    pub const fn with_alternates(name: &'static str, alternates: &'static [&'static str]) -> Self {
        Self { name, alternates }
    }

    /// Primary name followed by alternates, in lookup order.
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.alternates.iter().copied())
    }
}

const HARDWIRED_REQUIRED: &[RequiredField] = &[RequiredField::new(VARIABLE_NAME)];

const TCP_REQUIRED: &[RequiredField] =
    &[RequiredField::with_alternates(VARIABLE_NAME, &[HMI_TAG, TAG])];

const ANALOG_DEFAULTS: &[(ThresholdField, f64)] = &[
    (ThresholdField::RangeLow, 0.0),
    (ThresholdField::RangeHigh, 100.0),
    (ThresholdField::AlarmLl, 5.0),
    (ThresholdField::AlarmL, 10.0),
    (ThresholdField::AlarmH, 90.0),
    (ThresholdField::AlarmHh, 95.0),
];

/// Digital points have no scaling; the limits are still carried as zero.
const DIGITAL_DEFAULTS: &[(ThresholdField, f64)] = &[
    (ThresholdField::RangeLow, 0.0),
    (ThresholdField::RangeHigh, 0.0),
    (ThresholdField::AlarmLl, 0.0),
    (ThresholdField::AlarmL, 0.0),
    (ThresholdField::AlarmH, 0.0),
    (ThresholdField::AlarmHh, 0.0),
];

/// Required fields per built-in kind.
pub fn required_fields(kind: SignalKind) -> &'static [RequiredField] {
    if kind.is_tcp() {
        TCP_REQUIRED
    } else {
        HARDWIRED_REQUIRED
    }
}

/// Threshold defaults per built-in kind. Every kind defaults all six
/// fields, so a preprocessed record always carries the full set.
pub fn threshold_defaults(kind: SignalKind) -> &'static [(ThresholdField, f64)] {
    if kind.is_analog() {
        ANALOG_DEFAULTS
    } else {
        DIGITAL_DEFAULTS
    }
}

/// Field the channel resolver falls back to when no position is given.
pub fn fallback_channel_field(kind: SignalKind) -> &'static str {
    if kind.is_input() {
        INPUT_CHANNEL
    } else {
        OUTPUT_CHANNEL
    }
}

/// Fields every rendering context carries regardless of type.
pub const COMMON_FIELDS: &[&str] = &[
    SIGNAL_TYPE,
    VARIABLE_NAME,
    DESCRIPTION,
    UNIT,
    CHANNEL_POSITION,
    HARD_CHANNEL,
];

/// Builds the set of field names a template for this configuration may
/// reference: common fields, the fallback channel, alternates of required
/// fields and every defaulted threshold.
pub fn known_fields_for(
    fallback_channel: &str,
    required: &[RequiredField],
    defaults: &[(ThresholdField, f64)],
) -> BTreeSet<String> {
    let mut fields: BTreeSet<String> = COMMON_FIELDS.iter().map(|f| (*f).to_string()).collect();
    fields.insert(fallback_channel.to_string());
    for field in required {
        fields.extend(field.candidates().map(str::to_string));
    }
    for (threshold, _) in defaults {
        fields.insert(threshold.field_name().to_string());
    }
    fields
}

/// Known fields for a built-in kind.
pub fn known_fields(kind: SignalKind) -> BTreeSet<String> {
    known_fields_for(
        fallback_channel_field(kind),
        required_fields(kind),
        threshold_defaults(kind),
    )
}
