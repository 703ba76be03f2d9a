//! Entry point used by the bridge host.

use tracing::info;
use tracing::warn;

use crate::accessory::Accessory;
use crate::accessory::AccessorySummary;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::registry::DeviceRegistry;
use crate::sink::SinkFactory;
use crate::supervisor::DecoderCommand;
use crate::supervisor::ProcessSupervisor;
use crate::supervisor::SupervisorHandle;

/// All configured accessories plus the decoder that feeds them.
#[derive(Debug)]
pub struct Platform {
    registry: DeviceRegistry,
    command: DecoderCommand,
}

impl Platform {
    /// Build every configured accessory through `sinks`, in configuration
    /// order.
    pub fn new(config: &Config, sinks: &dyn SinkFactory) -> Self {
        Self::with_command(config, sinks, config.decoder.command())
    }

    /// Like [`Platform::new`] but with an explicit decoder command.
    pub fn with_command(config: &Config, sinks: &dyn SinkFactory, command: DecoderCommand) -> Self {
        let accessories = config
            .identities()
            .into_iter()
            .map(|identity| Accessory::new(identity, &config.translations, sinks))
            .collect::<Vec<_>>();
        let registry = DeviceRegistry::new(accessories);
        if registry.is_empty() {
            warn!("No devices configured, every reading will be dropped");
        } else {
            info!("Configured {} accessories", registry.len());
        }

        Self { registry, command }
    }

    pub fn summaries(&self) -> Vec<AccessorySummary> {
        self.registry.summaries()
    }

    /// Hand the accessory list to the host and start streaming readings.
    ///
    /// Returns without waiting for the decoder. Faults of the decoder process
    /// are logged and reported through the returned handle only.
    pub fn accessories(self) -> (Vec<AccessorySummary>, SupervisorHandle) {
        let summaries = self.registry.summaries();
        let dispatcher = Dispatcher::new(self.registry);
        let handle = ProcessSupervisor::new(self.command).start(dispatcher);
        (summaries, handle)
    }
}
