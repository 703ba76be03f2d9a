//! Records emitted by rtl_433 in JSON output mode.
//!
//! Field presence and even field types vary between sensor models, so the
//! identity fields are kept as raw JSON values and interpreted lazily.

use serde::Deserialize;
use serde_json::Value;

/// One decoded radio transmission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IncomingRecord {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default)]
    pub channel: Option<Value>,

    #[serde(default)]
    pub rid: Option<Value>,

    #[serde(default)]
    pub model: Option<Value>,

    #[serde(default, rename = "temperature_C")]
    pub temperature_c: Option<Value>,

    #[serde(default)]
    pub humidity: Option<Value>,

    #[serde(default)]
    pub battery: Option<Value>,
}

impl IncomingRecord {
    /// Parse a single JSON object line.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Temperature in degrees Celsius, if the record carries a numeric one.
    pub fn temperature_c(&self) -> Option<f64> {
        self.temperature_c.as_ref().and_then(Value::as_f64)
    }

    /// Relative humidity in percent, if the record carries a numeric one.
    pub fn humidity(&self) -> Option<f64> {
        self.humidity.as_ref().and_then(Value::as_f64)
    }

    /// `true` only for the literal battery string `"OK"`.
    pub fn battery_ok(&self) -> bool {
        matches!(&self.battery, Some(Value::String(s)) if s == "OK")
    }
}

/// Whether a JSON value counts as "not set" for identity matching.
///
/// rtl_433 emits `0` or `""` for some models that lack a field, so those
/// behave like an absent field.
pub(crate) fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::Number(n)) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(true)) | Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}
