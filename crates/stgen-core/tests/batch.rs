use stgen_core::{CancelFlag, CodeGenerator, GenerationOptions, RecordOutcome};
use stgen_model::PointRecord;

fn records() -> Vec<PointRecord> {
    vec![
        PointRecord::new("DI", "LS_101").with_channel_position("1_2_DI_0"),
        PointRecord::new("DO", "").with_description("orphan"),
        PointRecord::new("AX", "BAD_TYPE"),
        PointRecord::new("DO", "XV_101").with_channel_position("1_3_DO_5"),
        PointRecord::new("TCP_DI", "").with_extra("tag", "PUMP_RUN"),
    ]
}

#[test]
fn failures_are_collected_without_aborting() {
    let generator = CodeGenerator::with_builtin_templates();
    let output = generator.generate_batch(&records(), &CancelFlag::new());
    assert_eq!(output.generated(), 3);
    assert_eq!(output.failed(), 2);
    assert_eq!(output.skipped(), 0);
    assert!(output.has_failures());

    let failed: Vec<_> = output.errors().map(|(result, err)| (result.index, err.kind())).collect();
    assert_eq!(failed, vec![(1, "missing_field"), (2, "unsupported_type")]);

    let code = output.code();
    let fragments: Vec<&str> = code.split("\n\n").collect();
    assert_eq!(fragments.len(), 3);
    assert!(fragments[0].contains("LS_101 := DPIO_1_2_1;"));
    assert!(fragments[1].contains("DPIO_1_3_6 := XV_101;"));
    assert!(fragments[2].contains("PUMP_RUN := DPIO_0_0_0;"));

    let by_type = output.by_type();
    assert_eq!(by_type["DO"].generated, 1);
    assert_eq!(by_type["DO"].failed, 1);
    assert_eq!(by_type["AX"].failed, 1);
}

#[test]
fn fail_fast_skips_the_rest() {
    let generator = CodeGenerator::with_builtin_templates()
        .with_options(GenerationOptions::new().with_fail_fast(true));
    let output = generator.generate_batch(&records(), &CancelFlag::new());
    assert_eq!(output.generated(), 1);
    assert_eq!(output.failed(), 1);
    assert_eq!(output.skipped(), 3);
    assert!(!output.was_cancelled());
}

#[test]
fn cancelled_batch_generates_nothing() {
    let generator = CodeGenerator::with_builtin_templates();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let output = generator.generate_batch(&records(), &cancel);
    assert_eq!(output.skipped(), 5);
    assert!(output.was_cancelled());
    assert!(output.code().is_empty());
    assert_eq!(generator.cache().get_statistics().total_requests, 0);
}

#[test]
fn parallel_output_matches_sequential_order() {
    let mut many = Vec::new();
    for i in 0..40 {
        many.push(
            PointRecord::new(if i % 2 == 0 { "DI" } else { "DO" }, format!("P_{i:03}"))
                .with_channel_position(format!("1_{}_X_{}", i / 8 + 1, i % 8)),
        );
    }
    let generator = CodeGenerator::with_builtin_templates();
    let sequential = generator.generate_batch(&many, &CancelFlag::new());
    let parallel = generator.generate_parallel(&many, 4, &CancelFlag::new());

    assert_eq!(parallel.code(), sequential.code());
    let indices: Vec<usize> = parallel.results().iter().map(|r| r.index).collect();
    assert_eq!(indices, (0..40).collect::<Vec<_>>());
    assert_eq!(generator.cache().get_statistics().lifetime_compilations, 2);
}

#[test]
fn custom_separator_joins_fragments() {
    let generator = CodeGenerator::with_builtin_templates()
        .with_options(GenerationOptions::new().with_separator("\n(* ---- *)\n"));
    let batch = [
        PointRecord::new("DI", "A").with_channel_position("1_1_DI_0"),
        PointRecord::new("DI", "B").with_channel_position("1_1_DI_1"),
    ];
    let output = generator.generate_batch(&batch, &CancelFlag::new());
    assert_eq!(
        output.code(),
        "(* DI A *)\nA := DPIO_1_1_1;\n(* ---- *)\n(* DI B *)\nB := DPIO_1_1_2;"
    );
    assert!(matches!(output.results()[0].outcome, RecordOutcome::Generated(_)));
}
