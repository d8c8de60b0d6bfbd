//! Point files through the full generation path.

use stgen_cli::points::load_points;
use stgen_core::{CancelFlag, CodeGenerator};

#[test]
fn loads_aliased_columns_and_generates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("points.json");
    std::fs::write(
        &path,
        r#"[
            {"type": "DI", "variable_name": "LS_101", "position": "1_2_DI_0", "desc": "Tank high"},
            {"type": "tcp-digital", "tag": "PUMP_RUN", "input_channel": "TCP1.COIL7"},
            {"type": "AO", "variable_name": "FV_201", "position": "1_4_AO_1", "range_hi": "50"}
        ]"#,
    )
    .expect("write");

    let records = load_points(&path).expect("load");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].description.as_deref(), Some("Tank high"));

    let output = CodeGenerator::with_builtin_templates().generate_batch(&records, &CancelFlag::new());
    assert!(!output.has_failures(), "{:?}", output.errors().collect::<Vec<_>>());
    insta::assert_snapshot!(output.code(), @r"
(* DI LS_101 Tank high *)
LS_101 := DPIO_1_2_1;

(* TCP_DI PUMP_RUN *)
PUMP_RUN := TCP1.COIL7;

(* AO FV_201 *)
FV_201_SO(
    IN := FV_201,
    ENG_LO := 0.0,
    ENG_HI := 50.0,
    OUT_RAW => DPIO_1_4_2);
");
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let err = load_points(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}
