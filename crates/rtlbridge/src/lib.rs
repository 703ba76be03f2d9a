pub mod accessory;
pub mod config;
pub mod decoder;
pub mod device;
pub mod dispatcher;
pub mod platform;
pub mod record;
pub mod registry;
pub mod sink;
pub mod supervisor;

pub use accessory::Accessory;
pub use accessory::AccessoryState;
pub use accessory::AccessorySummary;
pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use decoder::DecodeEvent;
pub use decoder::DecodedLines;
pub use decoder::StreamDecoder;
pub use device::DeviceIdentity;
pub use dispatcher::DispatchOutcome;
pub use dispatcher::Dispatcher;
pub use platform::Platform;
pub use record::IncomingRecord;
pub use registry::DeviceRegistry;
pub use sink::CharacteristicSink;
pub use sink::SinkFactory;
pub use supervisor::DecoderCommand;
pub use supervisor::ProcessSupervisor;
pub use supervisor::SupervisorHandle;
pub use supervisor::Termination;
