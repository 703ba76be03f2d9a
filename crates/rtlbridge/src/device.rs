//! Identity of a configured sensor and the predicate that recognises it.
//!
//! Matching is a field-by-field wildcard comparison over `id`, `channel`,
//! `rid` and `model`: a field that is unset on either the identity or the
//! record imposes no constraint. An identity with no fields set therefore
//! matches every record, and two identities that only differ in a field the
//! sensor never transmits are indistinguishable. In that case configuration
//! order decides which device receives the readings. Configure enough fields
//! to tell apart every sensor sharing a receiver.

use serde_json::Value;

use crate::record::is_unset;
use crate::record::IncomingRecord;

/// Immutable descriptor of one physical sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    name: String,
    watch_battery: bool,
    id: Option<i64>,
    channel: Option<i64>,
    rid: Option<i64>,
    model: Option<String>,
}

impl DeviceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            watch_battery: false,
            id: None,
            channel: None,
            rid: None,
            model: None,
        }
    }

    pub fn with_watch_battery(mut self, watch_battery: bool) -> Self {
        self.watch_battery = watch_battery;
        self
    }

    /// Set the sensor id. `0` is treated as unset.
    pub fn with_id(mut self, id: Option<i64>) -> Self {
        self.id = id.filter(|v| *v != 0);
        self
    }

    /// Set the channel. `0` is treated as unset.
    pub fn with_channel(mut self, channel: Option<i64>) -> Self {
        self.channel = channel.filter(|v| *v != 0);
        self
    }

    /// Set the radio id. `0` is treated as unset.
    pub fn with_rid(mut self, rid: Option<i64>) -> Self {
        self.rid = rid.filter(|v| *v != 0);
        self
    }

    /// Set the model name. An empty string is treated as unset.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.is_empty());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn watches_battery(&self) -> bool {
        self.watch_battery
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn channel(&self) -> Option<i64> {
        self.channel
    }

    pub fn rid(&self) -> Option<i64> {
        self.rid
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Whether `record` could have been sent by this sensor.
    pub fn matches(&self, record: &IncomingRecord) -> bool {
        integer_matches(self.id, record.id.as_ref())
            && integer_matches(self.channel, record.channel.as_ref())
            && integer_matches(self.rid, record.rid.as_ref())
            && model_matches(self.model.as_deref(), record.model.as_ref())
    }
}

fn integer_matches(expected: Option<i64>, actual: Option<&Value>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    if is_unset(actual) {
        return true;
    }
    // Numbers compare by value (7 == 7.0); nothing else equals an integer.
    match actual {
        Some(Value::Number(n)) => n.as_f64() == Some(expected as f64),
        _ => false,
    }
}

fn model_matches(expected: Option<&str>, actual: Option<&Value>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    if is_unset(actual) {
        return true;
    }
    matches!(actual, Some(Value::String(s)) if s == expected)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> IncomingRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_wildcard_identity_matches_everything() {
        let identity = DeviceIdentity::new("Anything");
        assert!(identity.matches(&record(json!({}))));
        assert!(identity.matches(&record(json!({"id": 1, "channel": 2, "rid": 3, "model": "X"}))));
        assert!(identity.matches(&record(json!({"id": "hex", "model": 12}))));
    }

    #[test]
    fn test_all_fields_equal() {
        let identity = DeviceIdentity::new("Patio")
            .with_id(Some(7))
            .with_channel(Some(1))
            .with_rid(Some(12))
            .with_model(Some("Nexus-TH".to_string()));
        assert!(identity.matches(&record(
            json!({"id": 7, "channel": 1, "rid": 12, "model": "Nexus-TH"})
        )));
    }

    #[test]
    fn test_any_field_mismatch_rejects() {
        let identity = DeviceIdentity::new("Patio")
            .with_id(Some(7))
            .with_channel(Some(1))
            .with_rid(Some(12))
            .with_model(Some("Nexus-TH".to_string()));
        assert!(!identity.matches(&record(json!({"id": 8}))));
        assert!(!identity.matches(&record(json!({"channel": 2}))));
        assert!(!identity.matches(&record(json!({"rid": 13}))));
        assert!(!identity.matches(&record(json!({"model": "Acurite-Tower"}))));
    }

    #[test]
    fn test_field_absent_on_record_is_wildcard() {
        let identity = DeviceIdentity::new("Patio").with_id(Some(7)).with_channel(Some(1));
        assert!(identity.matches(&record(json!({"id": 7}))));
        assert!(identity.matches(&record(json!({"channel": 1}))));
        assert!(identity.matches(&record(json!({"channel": 1, "model": "Whatever"}))));
    }

    #[test]
    fn test_falsy_record_values_are_wildcards() {
        let identity = DeviceIdentity::new("Patio").with_id(Some(7)).with_model(Some("M".into()));
        assert!(identity.matches(&record(json!({"id": 0}))));
        assert!(identity.matches(&record(json!({"id": null}))));
        assert!(identity.matches(&record(json!({"model": ""}))));
        assert!(identity.matches(&record(json!({"id": false}))));
    }

    #[test]
    fn test_falsy_configured_values_are_wildcards() {
        let identity = DeviceIdentity::new("Zero")
            .with_id(Some(0))
            .with_channel(Some(0))
            .with_rid(Some(0))
            .with_model(Some(String::new()));
        assert_eq!(identity.id(), None);
        assert_eq!(identity.channel(), None);
        assert_eq!(identity.rid(), None);
        assert_eq!(identity.model(), None);
        assert!(identity.matches(&record(json!({"id": 99, "model": "Any"}))));
    }

    #[test]
    fn test_strict_equality_across_types() {
        let identity = DeviceIdentity::new("Patio").with_id(Some(7));
        assert!(identity.matches(&record(json!({"id": 7.0}))));
        assert!(!identity.matches(&record(json!({"id": "7"}))));
        assert!(!identity.matches(&record(json!({"id": true}))));

        let identity = DeviceIdentity::new("Patio").with_model(Some("7".into()));
        assert!(!identity.matches(&record(json!({"model": 7}))));
        assert!(identity.matches(&record(json!({"model": "7"}))));
    }
}
