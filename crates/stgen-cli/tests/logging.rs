//! Subscriber setup. Lives in its own test binary because the global
//! subscriber can only be installed once per process.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use stgen_cli::logging::{LogConfig, LogFormat, init_logging_with_writer};
use stgen_core::CodeGenerator;
use stgen_model::PointRecord;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    fn events(&self) -> Vec<Value> {
        let text = String::from_utf8(self.0.lock().expect("buffer").clone()).expect("utf8");
        text.lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Buffer {
    type Writer = Buffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn find<'a>(events: &'a [Value], message: &str) -> &'a Value {
    events
        .iter()
        .find(|event| event["message"] == message)
        .unwrap_or_else(|| panic!("no {message:?} event in {events:#?}"))
}

#[test]
fn json_events_carry_point_fields_at_the_top_level() {
    let buffer = Buffer::default();
    let config = LogConfig::default()
        .with_level_filter(LevelFilter::DEBUG)
        .with_env_filter(false)
        .with_timestamps(true)
        .with_format(LogFormat::Json)
        .with_ansi(false);
    init_logging_with_writer(&config, buffer.clone());

    let resolved = stgen_core::resolve_channel("not-a-position", "");
    assert_eq!(resolved, stgen_core::SENTINEL_CHANNEL);

    let generator = CodeGenerator::with_builtin_templates();
    assert!(generator.generate(&PointRecord::new("TCP_DI", " ")).is_err());
    assert!(generator.generate(&PointRecord::new("XYZ", "PUMP_1")).is_err());

    let events = buffer.events();

    let fallback = find(&events, "unrecognized channel position, using sentinel");
    assert_eq!(fallback["level"], "WARN");
    assert_eq!(fallback["position"], "not-a-position");
    assert!(fallback["timestamp"].as_str().is_some_and(|ts| ts.ends_with('Z')));
    assert!(fallback.get("fields").is_none());

    let rejected = find(&events, "point rejected");
    assert_eq!(rejected["level"], "ERROR");
    assert_eq!(rejected["signal_type"], "TCP_DI");
    assert!(rejected["error"].as_str().is_some_and(|err| err.contains("variable_name")));

    let unsupported = find(&events, "no generator for point");
    assert_eq!(unsupported["level"], "ERROR");
    assert_eq!(unsupported["signal_type"], "XYZ");
    assert_eq!(unsupported["variable"], "PUMP_1");
}
