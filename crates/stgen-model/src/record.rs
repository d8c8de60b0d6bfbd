//! Point records: one row of a point table.

use serde::{Deserialize, Serialize};

use crate::schema::{self, ThresholdField};
use crate::value::{FieldMap, FieldValue};

/// Range and alarm limits. `None` means the cell was empty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    pub alarm_hh: Option<f64>,
    pub alarm_h: Option<f64>,
    pub alarm_l: Option<f64>,
    pub alarm_ll: Option<f64>,
}

impl Thresholds {
    pub fn get(&self, field: ThresholdField) -> Option<f64> {
        match field {
            ThresholdField::RangeLow => self.range_low,
            ThresholdField::RangeHigh => self.range_high,
            ThresholdField::AlarmHh => self.alarm_hh,
            ThresholdField::AlarmH => self.alarm_h,
            ThresholdField::AlarmL => self.alarm_l,
            ThresholdField::AlarmLl => self.alarm_ll,
        }
    }

    pub fn set(&mut self, field: ThresholdField, value: Option<f64>) {
        let slot = match field {
            ThresholdField::RangeLow => &mut self.range_low,
            ThresholdField::RangeHigh => &mut self.range_high,
            ThresholdField::AlarmHh => &mut self.alarm_hh,
            ThresholdField::AlarmH => &mut self.alarm_h,
            ThresholdField::AlarmL => &mut self.alarm_l,
            ThresholdField::AlarmLl => &mut self.alarm_ll,
        };
        *slot = value;
    }

    /// Absent and zero are both unset.
    pub fn is_unset(&self, field: ThresholdField) -> bool {
        self.get(field).is_none_or(|value| value == 0.0)
    }
}

/// One I/O point as read from a point table.
///
/// The fields the pipeline validates or normalizes are typed; anything else
/// the row carries stays in `extra` and is passed to templates untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FieldMap", into = "FieldMap")]
pub struct PointRecord {
    pub signal_type: String,
    pub variable_name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub channel_position: Option<String>,
    pub input_channel: Option<String>,
    pub output_channel: Option<String>,
    pub thresholds: Thresholds,
    pub extra: FieldMap,
}

impl PointRecord {
    pub fn new(signal_type: impl Into<String>, variable_name: impl Into<String>) -> Self {
        Self {
            signal_type: signal_type.into(),
            variable_name: variable_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_channel_position(mut self, position: impl Into<String>) -> Self {
        self.channel_position = Some(position.into());
        self
    }

    #[must_use]
    pub fn with_input_channel(mut self, channel: impl Into<String>) -> Self {
        self.input_channel = Some(channel.into());
        self
    }

    #[must_use]
    pub fn with_output_channel(mut self, channel: impl Into<String>) -> Self {
        self.output_channel = Some(channel.into());
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, field: ThresholdField, value: f64) -> Self {
        self.thresholds.set(field, Some(value));
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Lifts a loose field map into a record. Known names and their aliases
    /// (matched case-insensitively) become typed fields; the rest is kept in
    /// `extra`. Unparseable numbers are treated as empty cells.
    pub fn from_fields(fields: FieldMap) -> Self {
        let mut remaining = fields;
        let mut record = PointRecord {
            signal_type: take_text(&mut remaining, schema::SIGNAL_TYPE).unwrap_or_default(),
            variable_name: take_text(&mut remaining, schema::VARIABLE_NAME).unwrap_or_default(),
            description: take_text(&mut remaining, schema::DESCRIPTION),
            unit: take_text(&mut remaining, schema::UNIT),
            channel_position: take_text(&mut remaining, schema::CHANNEL_POSITION),
            input_channel: take_text(&mut remaining, schema::INPUT_CHANNEL),
            output_channel: take_text(&mut remaining, schema::OUTPUT_CHANNEL),
            ..PointRecord::default()
        };
        for field in ThresholdField::ALL {
            let value = take(&mut remaining, field.field_name()).and_then(|v| v.as_f64());
            record.thresholds.set(field, value);
        }
        record.extra = remaining;
        record
    }

    /// Text of a named field, typed fields first, then `extra`.
    pub fn field_text(&self, name: &str) -> Option<String> {
        let typed = match name {
            schema::SIGNAL_TYPE => Some(self.signal_type.as_str()),
            schema::VARIABLE_NAME => Some(self.variable_name.as_str()),
            schema::DESCRIPTION => self.description.as_deref(),
            schema::UNIT => self.unit.as_deref(),
            schema::CHANNEL_POSITION => self.channel_position.as_deref(),
            schema::INPUT_CHANNEL => self.input_channel.as_deref(),
            schema::OUTPUT_CHANNEL => self.output_channel.as_deref(),
            _ => None,
        };
        match typed {
            Some(value) => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            None => self.extra.text(name),
        }
    }

    /// Best human-readable identification for log lines and errors.
    pub fn display_name(&self) -> String {
        [schema::VARIABLE_NAME, schema::HMI_TAG, schema::TAG, schema::DESCRIPTION]
            .into_iter()
            .find_map(|name| self.field_text(name))
            .unwrap_or_else(|| "<unnamed>".to_string())
    }

    /// Flattens the record back into a field map; absent optional fields are
    /// omitted.
    pub fn to_field_map(&self) -> FieldMap {
        let mut map = self.extra.clone();
        map.insert(schema::SIGNAL_TYPE, self.signal_type.clone());
        map.insert(schema::VARIABLE_NAME, self.variable_name.clone());
        let optional = [
            (schema::DESCRIPTION, &self.description),
            (schema::UNIT, &self.unit),
            (schema::CHANNEL_POSITION, &self.channel_position),
            (schema::INPUT_CHANNEL, &self.input_channel),
            (schema::OUTPUT_CHANNEL, &self.output_channel),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                map.insert(name, value.clone());
            }
        }
        for field in ThresholdField::ALL {
            if let Some(value) = self.thresholds.get(field) {
                map.insert(field.field_name(), value);
            }
        }
        map
    }
}

fn take(fields: &mut FieldMap, canonical: &str) -> Option<FieldValue> {
    let names = std::iter::once(canonical).chain(schema::aliases_for(canonical).iter().copied());
    let mut found = None;
    for name in names {
        let key = fields
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .map(str::to_string);
        if let Some(key) = key {
            let value = fields.remove(&key);
            if found.as_ref().is_none_or(FieldValue::is_blank) {
                found = value;
            }
        }
    }
    found
}

fn take_text(fields: &mut FieldMap, canonical: &str) -> Option<String> {
    take(fields, canonical)
        .as_ref()
        .and_then(FieldValue::as_text)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl From<FieldMap> for PointRecord {
    fn from(fields: FieldMap) -> Self {
        PointRecord::from_fields(fields)
    }
}

impl From<PointRecord> for FieldMap {
    fn from(record: PointRecord) -> Self {
        record.to_field_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifts_known_fields_and_aliases() {
        let fields = FieldMap::new()
            .with("Type", "AI")
            .with("variable_name", "TI_001")
            .with("position", "1_2_AI_0")
            .with("range_hi", "250")
            .with("HH", 240.0)
            .with("loop", "TIC-001");
        let record = PointRecord::from_fields(fields);
        assert_eq!(record.signal_type, "AI");
        assert_eq!(record.variable_name, "TI_001");
        assert_eq!(record.channel_position.as_deref(), Some("1_2_AI_0"));
        assert_eq!(record.thresholds.range_high, Some(250.0));
        assert_eq!(record.thresholds.alarm_hh, Some(240.0));
        assert_eq!(record.extra.text("loop").as_deref(), Some("TIC-001"));
        assert!(!record.extra.contains_key("HH"));
    }

    #[test]
    fn canonical_name_wins_over_blank_alias() {
        let fields = FieldMap::new()
            .with("channel_position", "")
            .with("position", "2_1_DI_7");
        let record = PointRecord::from_fields(fields);
        assert_eq!(record.channel_position.as_deref(), Some("2_1_DI_7"));
    }

    #[test]
    fn unparseable_threshold_is_empty() {
        let record = PointRecord::from_fields(FieldMap::new().with("range_low", "n/a"));
        assert_eq!(record.thresholds.range_low, None);
        assert!(record.thresholds.is_unset(ThresholdField::RangeLow));
    }

    #[test]
    fn field_text_reads_typed_then_extra() {
        let record = PointRecord::new("TCP_DI", "").with_extra("tag", "XV_100_ZSO");
        assert_eq!(record.field_text("variable_name"), None);
        assert_eq!(record.field_text("tag").as_deref(), Some("XV_100_ZSO"));
        assert_eq!(record.display_name(), "XV_100_ZSO");
    }

    #[test]
    fn deserializes_from_json_object() {
        let record: PointRecord = serde_json::from_str(
            r#"{"signal_type": "DO", "variable_name": "XV_101", "output_channel": "Q1.0", "interlock": true}"#,
        )
        .expect("record");
        assert_eq!(record.output_channel.as_deref(), Some("Q1.0"));
        assert_eq!(record.extra.flag("interlock"), Some(true));
    }

    #[test]
    fn field_map_omits_absent_optionals() {
        let map = PointRecord::new("DI", "LS_001").to_field_map();
        assert!(map.contains_key("signal_type"));
        assert!(!map.contains_key("unit"));
        assert!(!map.contains_key("range_low"));
    }
}
