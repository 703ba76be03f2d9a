//! Narrow interface to the home-automation bridge's accessory model.
//!
//! The bridge owns the real service and characteristic objects. rtlbridge only
//! needs to create services and push named characteristic updates into them,
//! so the bridge hands in a [`SinkFactory`] at construction time and every
//! accessory keeps the [`CharacteristicSink`]s it was given.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

/// Services an accessory exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
pub enum ServiceKind {
    AccessoryInformation,
    TemperatureSensor,
    HumiditySensor,
}

/// Characteristics rtlbridge writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString)]
pub enum Characteristic {
    Manufacturer,
    SerialNumber,
    FirmwareRevision,
    CurrentTemperature,
    CurrentRelativeHumidity,
    StatusLowBattery,
}

/// Battery status as understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatteryStatus {
    Normal,
    Low,
}

impl BatteryStatus {
    /// Numeric level used by the `StatusLowBattery` characteristic.
    pub fn level(self) -> u8 {
        match self {
            BatteryStatus::Normal => 0,
            BatteryStatus::Low => 1,
        }
    }
}

/// Value written into a characteristic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    /// The reading was missing from the record
    Null,
    Number(f64),
    Level(u8),
    Text(String),
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacteristicValue::Null => write!(f, "null"),
            CharacteristicValue::Number(n) => write!(f, "{}", n),
            CharacteristicValue::Level(l) => write!(f, "{}", l),
            CharacteristicValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<Option<f64>> for CharacteristicValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CharacteristicValue::Null, CharacteristicValue::Number)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(value: f64) -> Self {
        CharacteristicValue::Number(value)
    }
}

impl From<BatteryStatus> for CharacteristicValue {
    fn from(status: BatteryStatus) -> Self {
        CharacteristicValue::Level(status.level())
    }
}

impl From<&str> for CharacteristicValue {
    fn from(value: &str) -> Self {
        CharacteristicValue::Text(value.to_string())
    }
}

impl From<String> for CharacteristicValue {
    fn from(value: String) -> Self {
        CharacteristicValue::Text(value)
    }
}

/// Describes a service the bridge was asked to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub display_name: String,
    pub subtype: Option<String>,
}

/// Something that accepts characteristic updates, i.e. one bridge service.
pub trait CharacteristicSink: Send {
    fn set_characteristic(&mut self, characteristic: Characteristic, value: CharacteristicValue);
}

/// Creates bridge services on behalf of accessories.
pub trait SinkFactory {
    fn create_service(&self, descriptor: &ServiceDescriptor) -> Box<dyn CharacteristicSink>;
}

/// Sink that reports each update through `tracing`.
///
/// Used by the standalone daemon, where no bridge is attached and the log is
/// the only consumer of readings.
#[derive(Debug)]
pub struct LogSink {
    service: String,
}

impl CharacteristicSink for LogSink {
    fn set_characteristic(&mut self, characteristic: Characteristic, value: CharacteristicValue) {
        info!("[{}] {} = {}", self.service, characteristic, value);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSinkFactory;

impl SinkFactory for LogSinkFactory {
    fn create_service(&self, descriptor: &ServiceDescriptor) -> Box<dyn CharacteristicSink> {
        Box::new(LogSink {
            service: descriptor.display_name.clone(),
        })
    }
}

/// One update recorded by a [`MemorySinkFactory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedUpdate {
    pub service: String,
    pub kind: ServiceKind,
    pub characteristic: Characteristic,
    pub value: CharacteristicValue,
}

/// Sink factory that keeps every update in memory.
///
/// Clones share the same log, so a clone can be handed to the platform while
/// the caller inspects what was written.
#[derive(Debug, Default, Clone)]
pub struct MemorySinkFactory {
    updates: Arc<Mutex<Vec<RecordedUpdate>>>,
}

impl MemorySinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all updates written so far, in order.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Most recent value written to `characteristic` on the named service.
    pub fn latest(&self, service: &str, characteristic: Characteristic) -> Option<CharacteristicValue> {
        self.updates()
            .into_iter()
            .rev()
            .find(|u| u.service == service && u.characteristic == characteristic)
            .map(|u| u.value)
    }

    pub fn clear(&self) {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

struct MemorySink {
    service: String,
    kind: ServiceKind,
    updates: Arc<Mutex<Vec<RecordedUpdate>>>,
}

impl CharacteristicSink for MemorySink {
    fn set_characteristic(&mut self, characteristic: Characteristic, value: CharacteristicValue) {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedUpdate {
                service: self.service.clone(),
                kind: self.kind,
                characteristic,
                value,
            });
    }
}

impl SinkFactory for MemorySinkFactory {
    fn create_service(&self, descriptor: &ServiceDescriptor) -> Box<dyn CharacteristicSink> {
        Box::new(MemorySink {
            service: descriptor.display_name.clone(),
            kind: descriptor.kind,
            updates: self.updates.clone(),
        })
    }
}
