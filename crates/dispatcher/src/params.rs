//! Directive -> output parameter mapping
//!
//! Only `rate`, `volume` and `voice` are output parameters. A value that
//! does not convert is dropped and the default stays in effect.

use contracts::{Directives, OutputParams, ParamValue};

/// Keys the dispatcher knows how to convert
pub const RATE_KEY: &str = "rate";
pub const VOLUME_KEY: &str = "volume";
pub const VOICE_KEY: &str = "voice";

/// Converted parameters plus the keys that failed conversion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMapping {
    pub params: OutputParams,
    pub rejected: Vec<String>,
}

fn convert(key: &str, raw: &str) -> Option<Option<ParamValue>> {
    let value = match key {
        RATE_KEY => raw.parse::<i64>().ok().map(ParamValue::Int),
        VOLUME_KEY => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(ParamValue::Float),
        VOICE_KEY => Some(ParamValue::Text(raw.to_string())),
        _ => return None,
    };
    Some(value)
}

/// Map recognized directives to typed parameters; unknown keys are ignored
pub fn directives_to_params(directives: &Directives) -> ParamMapping {
    let mut mapping = ParamMapping::default();
    for (key, raw) in directives {
        match convert(key, raw) {
            None => {}
            Some(Some(value)) => {
                mapping.params.insert(key.clone(), value);
            }
            Some(None) => mapping.rejected.push(key.clone()),
        }
    }
    mapping
}

/// `overrides` laid over a full copy of `defaults`
pub fn merge_over_defaults(defaults: &OutputParams, overrides: &OutputParams) -> OutputParams {
    let mut merged = defaults.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
