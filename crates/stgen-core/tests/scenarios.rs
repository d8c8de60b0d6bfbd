use std::sync::Barrier;
use std::thread;

use stgen_core::{CodeGenerator, GeneratorRegistry, SENTINEL_CHANNEL};
use stgen_model::schema::ThresholdField;
use stgen_model::{GenerationError, PointRecord, SignalKind};
use stgen_templates::{MemoryTemplateStore, TemplateCache};

#[test]
fn analog_input_without_address_or_range() {
    let generator = CodeGenerator::with_builtin_templates();
    let record = PointRecord::new("AI", "TI_001")
        .with_channel_position("")
        .with_input_channel("")
        .with_threshold(ThresholdField::RangeLow, 0.0)
        .with_threshold(ThresholdField::RangeHigh, 0.0);

    let fields = generator
        .registry()
        .dispatch("AI")
        .expect("AI")
        .preprocess(&record)
        .expect("preprocess");
    assert_eq!(fields.text("hard_channel").as_deref(), Some(SENTINEL_CHANNEL));
    assert_eq!(fields.number("range_high"), Some(100.0));
    assert_eq!(fields.number("range_low"), Some(0.0));

    let code = generator.generate(&record).expect("generate");
    assert!(code.contains("IN_RAW := DPIO_0_0_0,"), "{code}");
    assert!(code.contains("ENG_HI := 100.0,"), "{code}");
}

#[test]
fn digital_output_without_variable_name() {
    let generator = CodeGenerator::with_builtin_templates();
    let record = PointRecord::new("DO", "").with_description("Feed valve");
    let err = generator.generate(&record).unwrap_err();
    assert_eq!(
        err,
        GenerationError::MissingField {
            field: "variable_name".to_string(),
            variable: "Feed valve".to_string(),
        }
    );
    let stats = generator.cache().get_statistics();
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.total_entries, 0);
}

#[test]
fn every_type_rejects_a_nameless_point_before_the_cache() {
    let generator = CodeGenerator::with_builtin_templates();
    for kind in SignalKind::ALL {
        let record = PointRecord::new(kind.tag(), " ")
            .with_channel_position("1_1_DI_0")
            .with_extra("hmi_tag", "")
            .with_extra("tag", "  ");
        match generator.generate(&record) {
            Err(GenerationError::MissingField { field, .. }) => {
                assert_eq!(field, "variable_name", "{kind}");
            }
            other => panic!("{kind}: unexpected {other:?}"),
        }
    }
    let stats = generator.cache().get_statistics();
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.lifetime_compilations, 0);
}

#[test]
fn two_threads_on_a_cold_cache_compile_once() {
    let generator = CodeGenerator::with_builtin_templates();
    let barrier = Barrier::new(2);
    thread::scope(|scope| {
        for name in ["TI_001", "TI_002"] {
            let generator = &generator;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                let record = PointRecord::new("AI", name).with_channel_position("1_1_AI_0");
                generator.generate(&record).expect("generate");
            });
        }
    });
    let stats = generator.cache().get_statistics();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.lifetime_compilations, 1);
    assert_eq!(stats.render_samples, 2);
}

#[test]
fn dispatch_ignores_case() {
    let registry = GeneratorRegistry::with_builtin();
    let lower = registry.dispatch("ai").expect("ai");
    let upper = registry.dispatch("AI").expect("AI");
    assert!(std::ptr::eq(lower, upper));
}

#[test]
fn unsupported_type_never_touches_the_cache() {
    let generator = CodeGenerator::new(
        GeneratorRegistry::with_builtin(),
        TemplateCache::new(MemoryTemplateStore::new()),
    );
    let err = generator.generate(&PointRecord::new("VALVE", "XV_1")).unwrap_err();
    assert_eq!(err, GenerationError::unsupported_type("VALVE"));
    assert_eq!(generator.cache().get_statistics().total_requests, 0);
}

#[test]
fn missing_template_is_a_load_error() {
    let generator = CodeGenerator::new(
        GeneratorRegistry::with_builtin(),
        TemplateCache::new(MemoryTemplateStore::new()),
    );
    let err = generator.generate(&PointRecord::new("DI", "LS_1")).unwrap_err();
    assert_eq!(err.kind(), "template_load");
    assert_eq!(generator.cache().get_statistics().misses, 1);
}

#[test]
fn template_referencing_unknown_field_fails_to_render() {
    let generator = CodeGenerator::new(
        GeneratorRegistry::with_builtin(),
        TemplateCache::new(
            MemoryTemplateStore::new().with("DI", "default", "{{ variable_name }} := {{ debounce_ms }};"),
        ),
    );
    let err = generator.generate(&PointRecord::new("DI", "LS_1")).unwrap_err();
    match err {
        GenerationError::Render(render) => {
            assert_eq!(render.template, "DI/default");
            assert!(render.message.contains("debounce_ms"), "{}", render.message);
        }
        other => panic!("unexpected {other:?}"),
    }

    let with_extra = PointRecord::new("DI", "LS_1").with_extra("debounce_ms", 50_i64);
    assert_eq!(generator.generate(&with_extra).expect("generate"), "LS_1 := 50;");
}
