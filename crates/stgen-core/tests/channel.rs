use proptest::prelude::*;
use stgen_core::{HardChannel, SENTINEL_CHANNEL, resolve_channel};

fn separator() -> impl Strategy<Value = char> {
    prop_oneof![Just('_'), Just('-'), Just('.'), Just('/')]
}

fn module() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("AI"), Just("AO"), Just("DI"), Just("DO"), Just("ai")]
}

proptest! {
    #[test]
    fn conforming_positions_resolve_deterministically(
        rack in 1u32..64,
        slot in 1u32..32,
        channel in 0u32..64,
        module in module(),
        sep in separator(),
    ) {
        let raw = format!("{rack}{sep}{slot}{sep}{module}{sep}{channel}");
        let expected = format!("DPIO_{rack}_{slot}_{}", channel + 1);
        let first = resolve_channel(&raw, "");
        prop_assert_eq!(&first, &expected);
        prop_assert_eq!(resolve_channel(&raw, "other"), first);
        prop_assert_eq!(resolve_channel(&expected, ""), expected);
    }

    #[test]
    fn arbitrary_input_never_panics(raw in ".{0,24}", fallback in ".{0,12}") {
        let resolved = resolve_channel(&raw, &fallback);
        if raw.trim().is_empty() {
            let expected = if fallback.trim().is_empty() { SENTINEL_CHANNEL } else { fallback.trim() };
            prop_assert_eq!(resolved.as_str(), expected);
        } else {
            prop_assert!(resolved.starts_with("DPIO_"));
            prop_assert_eq!(HardChannel::parse(&resolved).map(|c| c.to_string()), Some(resolved.clone()));
        }
    }
}
