//! LogOutput - renders messages through tracing
//!
//! Stands in for a speech engine: a render keeps the action busy for as long
//! as speaking the text at the current rate would take.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use contracts::{ContractError, OutputAction, OutputParams, ParamValue};
use tracing::{info, instrument};

/// Accepted rate range (words per minute)
pub const RATE_RANGE: std::ops::RangeInclusive<i64> = 20..=500;

/// One completed render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub text: String,
    pub params: OutputParams,
}

/// Shared history of renders, cloned out of the action for inspection
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    entries: Arc<Mutex<Vec<RenderedMessage>>>,
}

impl RenderLog {
    pub fn entries(&self) -> Vec<RenderedMessage> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, entry: RenderedMessage) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

/// Output action that logs each message
pub struct LogOutput {
    name: String,
    params: OutputParams,
    simulate_speech: bool,
    busy_until: Option<Instant>,
    history: RenderLog,
}

impl LogOutput {
    /// Create a new LogOutput with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: OutputParams::new(),
            simulate_speech: true,
            busy_until: None,
            history: RenderLog::default(),
        }
    }

    /// Idle again immediately after every render
    pub fn without_speech_delay(mut self) -> Self {
        self.simulate_speech = false;
        self
    }

    /// Handle to the render history
    pub fn history(&self) -> RenderLog {
        self.history.clone()
    }

    /// How long speaking `text` takes at the current rate
    pub fn speech_duration(&self, text: &str) -> Duration {
        let rate = match self.params.get("rate") {
            Some(ParamValue::Int(rate)) if *rate > 0 => *rate as f64,
            _ => 135.0,
        };
        let words = text.split_whitespace().count() as f64;
        Duration::from_secs_f64(words * 60.0 / rate)
    }

    fn check(&self, params: &OutputParams) -> Result<(), ContractError> {
        for (key, value) in params {
            match (key.as_str(), value) {
                ("rate", ParamValue::Int(rate)) if !RATE_RANGE.contains(rate) => {
                    return Err(ContractError::output(
                        &self.name,
                        format!("rate {rate} outside {RATE_RANGE:?}"),
                    ));
                }
                ("volume", ParamValue::Float(volume)) if !(0.0..=1.0).contains(volume) => {
                    return Err(ContractError::output(
                        &self.name,
                        format!("volume {volume} outside 0.0..=1.0"),
                    ));
                }
                ("voice", ParamValue::Text(voice)) if voice.trim().is_empty() => {
                    return Err(ContractError::output(&self.name, "empty voice name"));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl OutputAction for LogOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply_parameters(&mut self, params: &OutputParams) -> Result<(), ContractError> {
        self.check(params)?;
        self.params = params.clone();
        Ok(())
    }

    #[instrument(name = "log_output_render", skip(self, text), fields(output = %self.name))]
    fn render(&mut self, text: &str) -> Result<(), ContractError> {
        let params = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!(%params, "say: {text}");

        if self.simulate_speech {
            self.busy_until = Some(Instant::now() + self.speech_duration(text));
        }
        self.history.push(RenderedMessage {
            text: text.to_string(),
            params: self.params.clone(),
        });
        Ok(())
    }

    fn is_idle(&self) -> bool {
        self.busy_until.is_none_or(|until| Instant::now() >= until)
    }
}
