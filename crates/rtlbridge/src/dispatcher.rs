use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::decoder::DecodeEvent;
use crate::record::IncomingRecord;
use crate::registry::DeviceRegistry;

/// What happened to a decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Readings were applied to the named accessory
    Applied { name: String },
    /// No configured device matched and the record was dropped
    Unmatched,
    /// The line was not a record
    Ignored,
}

/// Routes decoded records to the accessory that sent them.
///
/// The dispatcher owns the registry, so every accessory state has exactly one
/// writer.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: DeviceRegistry,
}

impl Dispatcher {
    pub fn new(registry: DeviceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Handle one event from the stream decoder.
    pub fn on_event(&mut self, event: DecodeEvent) -> DispatchOutcome {
        match event {
            DecodeEvent::Record { record, line } => self.on_record(&record, &line),
            DecodeEvent::NonJson { line } => {
                info!("Received non-json message: {}", line);
                DispatchOutcome::Ignored
            }
            DecodeEvent::ParseError { line, error } => {
                error!("JSON Parse Error {} in message: {}", error, line);
                DispatchOutcome::Ignored
            }
            DecodeEvent::Oversized { len } => {
                warn!("Dropped oversized line ({} bytes)", len);
                DispatchOutcome::Ignored
            }
        }
    }

    /// Apply `record` to the first matching accessory. `line` is only used for
    /// diagnostics.
    pub fn on_record(&mut self, record: &IncomingRecord, line: &str) -> DispatchOutcome {
        match self.registry.find_match_mut(record) {
            Some(accessory) => {
                accessory.apply(record);
                debug!("[{}] Applied record: {}", accessory.name(), line);
                DispatchOutcome::Applied {
                    name: accessory.name().to_string(),
                }
            }
            None => {
                info!("Device not found, message: {}", line);
                DispatchOutcome::Unmatched
            }
        }
    }
}
