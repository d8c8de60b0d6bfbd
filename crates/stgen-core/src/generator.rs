//! Per-type point generators.
//!
//! Every signal type runs the same three steps: check required fields,
//! build the rendering context, render the type's template. What differs
//! between types is data, held in a [`GeneratorSpec`].

use std::collections::BTreeSet;

use stgen_model::schema::{self, RequiredField, ThresholdField};
use stgen_model::{FieldMap, GenerationError, PointRecord, Result, SignalKind, normalize_tag};
use stgen_templates::TemplateCache;
use tracing::{debug, error};

use crate::channel::resolve_channel;

/// Rules for one signal type.
///
/// Built-in specs come from [`GeneratorSpec::builtin`]. Types registered at
/// runtime start from [`GeneratorSpec::custom`], which copies the rules of
/// a base kind, and then override what they need.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSpec {
    type_tag: String,
    aliases: Vec<String>,
    kind: SignalKind,
    description: String,
    required: Vec<RequiredField>,
    fallback_channel: &'static str,
    threshold_defaults: Vec<(ThresholdField, f64)>,
}

impl GeneratorSpec {
    pub fn builtin(kind: SignalKind) -> Self {
        Self {
            type_tag: kind.tag().to_string(),
            aliases: kind.aliases().iter().map(|alias| (*alias).to_string()).collect(),
            kind,
            description: kind.description().to_string(),
            required: schema::required_fields(kind).to_vec(),
            fallback_channel: schema::fallback_channel_field(kind),
            threshold_defaults: schema::threshold_defaults(kind).to_vec(),
        }
    }

    /// A new type tag inheriting the rules of `base`. Aliases are not
    /// inherited.
    pub fn custom(type_tag: &str, base: SignalKind) -> Self {
        Self {
            type_tag: normalize_tag(type_tag),
            aliases: Vec::new(),
            description: format!("{} ({})", base.description(), base.tag()),
            ..Self::builtin(base)
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(normalize_tag(alias));
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_required(mut self, field: RequiredField) -> Self {
        self.required.retain(|existing| existing.name != field.name);
        self.required.push(field);
        self
    }

    /// Sets or replaces the default for one threshold.
    #[must_use]
    pub fn with_threshold_default(mut self, field: ThresholdField, value: f64) -> Self {
        match self.threshold_defaults.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.threshold_defaults.push((field, value)),
        }
        self
    }

    #[must_use]
    pub fn without_threshold_defaults(mut self) -> Self {
        self.threshold_defaults.clear();
        self
    }

    #[must_use]
    pub fn with_fallback_channel(mut self, field: &'static str) -> Self {
        self.fallback_channel = field;
        self
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn required_fields(&self) -> &[RequiredField] {
        &self.required
    }

    pub fn fallback_channel(&self) -> &'static str {
        self.fallback_channel
    }

    pub fn threshold_defaults(&self) -> &[(ThresholdField, f64)] {
        &self.threshold_defaults
    }

    /// Every field the rendering context is guaranteed to carry.
    pub fn known_fields(&self) -> BTreeSet<String> {
        schema::known_fields_for(self.fallback_channel, &self.required, &self.threshold_defaults)
    }
}

/// Runs the generation steps for one signal type. Immutable and shareable
/// across threads.
#[derive(Debug, Clone)]
pub struct Generator {
    spec: GeneratorSpec,
}

impl Generator {
    pub fn new(spec: GeneratorSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &GeneratorSpec {
        &self.spec
    }

    pub fn type_tag(&self) -> &str {
        self.spec.type_tag()
    }

    /// Checks required fields and returns the value that satisfied the
    /// first one, the point's variable name.
    fn check_required(&self, record: &PointRecord, fields: &FieldMap) -> Result<Option<String>> {
        let mut primary = None;
        for required in &self.spec.required {
            let candidates: Vec<&str> = required.candidates().collect();
            match fields.first_text(&candidates) {
                Some((_, value)) => {
                    if primary.is_none() {
                        primary = Some(value);
                    }
                }
                None => {
                    return Err(GenerationError::missing_field(
                        required.name,
                        record.display_name(),
                    ));
                }
            }
        }
        Ok(primary)
    }

    /// Builds the rendering context: required fields checked, hardware
    /// address resolved, thresholds defaulted and every known field present.
    ///
    /// Zero thresholds are replaced like missing ones; point tables use `0`
    /// for empty cells.
    pub fn preprocess(&self, record: &PointRecord) -> Result<FieldMap> {
        let mut fields = record.to_field_map();
        let variable = self.check_required(record, &fields)?;

        if let Some(variable) = variable {
            fields.insert(schema::VARIABLE_NAME, variable);
        }
        fields.insert(schema::SIGNAL_TYPE, self.spec.type_tag.clone());

        let position = record.channel_position.as_deref().unwrap_or_default();
        let fallback = record.field_text(self.spec.fallback_channel).unwrap_or_default();
        fields.insert(schema::HARD_CHANNEL, resolve_channel(position, &fallback));

        for &(field, default) in &self.spec.threshold_defaults {
            let explicit_zero = record.thresholds.get(field) == Some(0.0);
            if fields.set_number_default(field.field_name(), default)
                && explicit_zero
                && default != 0.0
            {
                debug!(
                    variable = %record.display_name(),
                    field = field.field_name(),
                    default,
                    "zero threshold treated as unset"
                );
            }
        }

        for name in self.spec.known_fields() {
            fields.set_default(&name, "");
        }
        Ok(fields)
    }

    /// Generates the code fragment for one record using template `version`.
    pub fn generate(
        &self,
        record: &PointRecord,
        cache: &TemplateCache,
        version: &str,
    ) -> Result<String> {
        let variable = record.display_name();
        debug!(signal_type = self.type_tag(), %variable, "generating point");

        let fields = self.preprocess(record).inspect_err(|err| {
            error!(signal_type = self.type_tag(), %variable, error = %err, "point rejected");
        })?;
        let template = cache
            .resolve(self.type_tag(), version)
            .map_err(GenerationError::from)
            .inspect_err(|err| {
                error!(signal_type = self.type_tag(), %variable, error = %err, "template unavailable");
            })?;
        let output = cache
            .render(&template, &fields)
            .map_err(GenerationError::from)
            .inspect_err(|err| {
                error!(signal_type = self.type_tag(), %variable, error = %err, "render failed");
            })?;

        debug!(
            signal_type = self.type_tag(),
            %variable,
            bytes = output.text.len(),
            elapsed_us = output.elapsed.as_micros() as u64,
            "point generated"
        );
        Ok(output.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(kind: SignalKind) -> Generator {
        Generator::new(GeneratorSpec::builtin(kind))
    }

    #[test]
    fn analog_input_defaults_zero_and_missing_thresholds() {
        let record = PointRecord::new("AI", "TI_001")
            .with_channel_position("1_2_AI_3")
            .with_threshold(ThresholdField::RangeHigh, 0.0)
            .with_threshold(ThresholdField::AlarmHh, 240.0);
        let fields = generator(SignalKind::AnalogInput).preprocess(&record).unwrap();
        assert_eq!(fields.text("hard_channel").as_deref(), Some("DPIO_1_2_4"));
        assert_eq!(fields.number("range_high"), Some(100.0));
        assert_eq!(fields.number("alarm_hh"), Some(240.0));
        assert_eq!(fields.number("alarm_ll"), Some(5.0));
        assert_eq!(fields.text("description"), None);
        assert!(fields.contains_key("description"));
    }

    #[test]
    fn outputs_fall_back_to_output_channel() {
        let record = PointRecord::new("DO", "XV_101")
            .with_input_channel("ignored")
            .with_output_channel("%QX1.0");
        let fields = generator(SignalKind::DigitalOutput).preprocess(&record).unwrap();
        assert_eq!(fields.text("hard_channel").as_deref(), Some("%QX1.0"));
        assert_eq!(fields.number("range_high"), Some(0.0));
    }

    #[test]
    fn every_builtin_kind_carries_all_thresholds() {
        for kind in SignalKind::ALL {
            let record = PointRecord::new(kind.tag(), "X_1");
            let fields = generator(kind).preprocess(&record).unwrap();
            let missing: Vec<_> = ThresholdField::ALL
                .into_iter()
                .map(|field| field.field_name())
                .filter(|name| fields.number(name).is_none())
                .collect();
            assert!(missing.is_empty(), "{kind}: missing {missing:?}");
        }
        let record = PointRecord::new("AO", "FV_1");
        let fields = generator(SignalKind::AnalogOutput).preprocess(&record).unwrap();
        assert_eq!(fields.number("alarm_hh"), Some(95.0));
        let fields = generator(SignalKind::TcpDigital).preprocess(&record).unwrap();
        assert_eq!(fields.number("alarm_ll"), Some(0.0));
    }

    #[test]
    fn tcp_variable_name_from_alternate() {
        let record = PointRecord::new("TCP_DI", "").with_extra("hmi_tag", "PUMP_RUN");
        let fields = generator(SignalKind::TcpDigital).preprocess(&record).unwrap();
        assert_eq!(fields.text("variable_name").as_deref(), Some("PUMP_RUN"));
        assert_eq!(fields.text("signal_type").as_deref(), Some("TCP_DI"));
    }

    #[test]
    fn hardwired_types_require_variable_name() {
        let record = PointRecord::new("DI", " ").with_extra("tag", "LS_1");
        let err = generator(SignalKind::DigitalInput).preprocess(&record).unwrap_err();
        assert_eq!(err, GenerationError::missing_field("variable_name", "LS_1"));
    }

    #[test]
    fn custom_spec_inherits_base_rules() {
        let spec = GeneratorSpec::custom("valve-ai", SignalKind::AnalogInput)
            .with_alias("VAI")
            .with_threshold_default(ThresholdField::RangeHigh, 10.0);
        assert_eq!(spec.type_tag(), "VALVE_AI");
        assert_eq!(spec.aliases(), ["VAI".to_string()]);
        assert_eq!(spec.fallback_channel(), "input_channel");
        assert!(spec.threshold_defaults().contains(&(ThresholdField::RangeHigh, 10.0)));
        assert!(spec.known_fields().contains("alarm_hh"));
    }
}
