//! Server-side analyzer configuration.
//!
//! The acquisition server hosts cyclic-event analyzers configured remotely
//! with a JSON descriptor. The bridge maintains two instances, one per foot,
//! that differ only in trigger channel and threshold. Field names here are
//! the wire names the server parses.

use crate::config::AnalyzerConfig;
use serde::{Deserialize, Serialize};

/// Comparison operator inside a trigger condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    Less,
}

/// One threshold condition that starts an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    #[serde(rename = "type")]
    pub kind: String,
    pub device: String,
    /// Zero-based channel index on the device.
    pub channel: u32,
    pub comparator: Comparator,
    pub value: f64,
}

/// One cyclic event with its start conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerEvent {
    pub name: String,
    pub previous: String,
    pub start_when: Vec<TriggerCondition>,
}

/// Full analyzer descriptor as pushed to the acquisition server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerDescriptor {
    pub name: String,
    pub analyzer_type: String,
    pub time_reference_device: String,
    pub learning_rate: f64,
    pub initial_phase_durations: Vec<u32>,
    pub events: Vec<AnalyzerEvent>,
}

impl AnalyzerDescriptor {
    /// Build a heel-strike / toe-off gait cycle analyzer.
    ///
    /// `channel` is the 1-based sensor channel; the descriptor stores it
    /// zero-based. Each call builds a fully independent descriptor; the left
    /// and right instances never share sub-structure.
    pub fn foot_cycle(name: &str, settings: &AnalyzerConfig, channel: u32, threshold: f64) -> Self {
        let condition = |comparator: Comparator| TriggerCondition {
            kind: "threshold".to_string(),
            device: settings.device.clone(),
            channel: channel.saturating_sub(1),
            comparator,
            value: threshold,
        };

        Self {
            name: name.to_string(),
            analyzer_type: "cyclic_timed_events".to_string(),
            time_reference_device: settings.time_reference.clone(),
            learning_rate: settings.learning_rate,
            initial_phase_durations: settings.initial_phase_durations.clone(),
            events: vec![
                AnalyzerEvent {
                    name: "heel_strike".to_string(),
                    previous: "toe_off".to_string(),
                    start_when: vec![condition(Comparator::GreaterOrEqual)],
                },
                AnalyzerEvent {
                    name: "toe_off".to_string(),
                    previous: "heel_strike".to_string(),
                    start_when: vec![condition(Comparator::Less)],
                },
            ],
        }
    }

    /// Point every trigger condition at a new 1-based channel.
    pub fn set_trigger_channel(&mut self, channel: u32) {
        for event in &mut self.events {
            for condition in &mut event.start_when {
                condition.channel = channel.saturating_sub(1);
            }
        }
    }

    /// Update every trigger condition's threshold value.
    pub fn set_trigger_threshold(&mut self, value: f64) {
        for event in &mut self.events {
            for condition in &mut event.start_when {
                condition.value = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn settings() -> AnalyzerConfig {
        AppConfig::default().analyzer
    }

    #[test]
    fn wire_shape_matches_the_server_schema() {
        let descriptor = AnalyzerDescriptor::foot_cycle("foot_cycle_left", &settings(), 13, 5.0);
        let json = serde_json::to_value(&descriptor).unwrap();

        assert_eq!(json["name"], "foot_cycle_left");
        assert_eq!(json["analyzer_type"], "cyclic_timed_events");
        assert_eq!(json["time_reference_device"], "DelsysEmgDataCollector");
        assert_eq!(json["learning_rate"], 0.5);
        assert_eq!(json["initial_phase_durations"][1], 600);

        let heel_strike = &json["events"][0];
        assert_eq!(heel_strike["name"], "heel_strike");
        assert_eq!(heel_strike["previous"], "toe_off");
        let condition = &heel_strike["start_when"][0];
        assert_eq!(condition["type"], "threshold");
        assert_eq!(condition["channel"], 12);
        assert_eq!(condition["comparator"], ">=");
        assert_eq!(condition["value"], 5.0);

        assert_eq!(json["events"][1]["start_when"][0]["comparator"], "<");
    }

    #[test]
    fn left_and_right_are_independent() {
        let cfg = settings();
        let mut left = AnalyzerDescriptor::foot_cycle("foot_cycle_left", &cfg, 13, 5.0);
        let right = AnalyzerDescriptor::foot_cycle("foot_cycle_right", &cfg, 14, 5.0);

        left.set_trigger_channel(3);
        left.set_trigger_threshold(9.0);

        for event in &right.events {
            assert_eq!(event.start_when[0].channel, 13);
            assert_eq!(event.start_when[0].value, 5.0);
        }
    }

    #[test]
    fn trigger_updates_touch_every_condition() {
        let mut descriptor = AnalyzerDescriptor::foot_cycle("foot_cycle_left", &settings(), 13, 5.0);
        descriptor.set_trigger_channel(4);
        descriptor.set_trigger_threshold(7.25);

        for event in &descriptor.events {
            for condition in &event.start_when {
                assert_eq!(condition.channel, 3);
                assert_eq!(condition.value, 7.25);
            }
        }
    }
}
