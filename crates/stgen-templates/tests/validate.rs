use std::collections::BTreeSet;

use stgen_templates::{BuiltinTemplateStore, TemplateValidator, extract_variables};

#[test]
fn builtin_templates_are_clean() {
    let validator = TemplateValidator::new();
    for tag in BuiltinTemplateStore::type_tags() {
        let source = BuiltinTemplateStore::source(tag).expect("source");
        let result = validator.validate(source, tag);
        assert!(result.is_valid(), "{tag}: {:?}", result.errors);
        assert!(result.warnings.is_empty(), "{tag}: {:?}", result.warnings);
        assert!(result.required_fields.contains("hard_channel"));
    }
}

#[test]
fn complexity_counts_loops_conditionals_and_substitutions() {
    let text = "{% for i in interlocks %}{% if i %}{{ i }}{% elif unit %}{{ unit }}{% endif %}{% endfor %}";
    let result = TemplateValidator::new().validate(text, "AI");
    assert!(result.is_valid(), "{:?}", result.errors);
    // 1 loop, if + elif, 2 substitutions
    assert_eq!(result.complexity_score, 3 + 2 * 2 + 2);
    assert_eq!(
        result.required_fields,
        BTreeSet::from(["interlocks".to_string(), "unit".to_string()])
    );
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("`interlocks`"));
}

#[test]
fn set_targets_are_not_inputs() {
    let text = "{% set span = range_high - range_low %}{{ span }}";
    let vars = extract_variables(text);
    assert_eq!(
        vars,
        BTreeSet::from(["range_high".to_string(), "range_low".to_string()])
    );
}

#[test]
fn unknown_type_warns_but_still_extracts() {
    let result = TemplateValidator::new().validate("{{ whatever }}", "VALVE");
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.starts_with("unknown signal type"));
    assert!(result.required_fields.contains("whatever"));
}

#[test]
fn custom_field_sets_apply() {
    let known = BTreeSet::from(["variable_name".to_string(), "hard_channel".to_string()]);
    let result = TemplateValidator::new().validate_with_fields(
        "{{ variable_name }} := {{ hard_channel }} + {{ bias }};",
        "VALVE",
        &known,
    );
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].location.line, Some(1));
}

#[test]
fn engine_rejections_are_errors() {
    let result = TemplateValidator::new().validate("{{ variable_name + }}", "DI");
    assert!(!result.is_valid());
    assert!(result.errors[0].location.is_known());
}

#[test]
fn empty_template_warns() {
    let result = TemplateValidator::new().validate("  \n", "DO");
    assert!(result.is_valid());
    assert_eq!(result.warnings[0].message, "template is empty");
    assert_eq!(result.complexity_score, 0);
}
