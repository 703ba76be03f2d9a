//! A configured sensor as exposed to the bridge.

use serde::Serialize;
use tracing::debug;

use crate::config::Translations;
use crate::device::DeviceIdentity;
use crate::record::IncomingRecord;
use crate::sink::BatteryStatus;
use crate::sink::Characteristic;
use crate::sink::CharacteristicSink;
use crate::sink::CharacteristicValue;
use crate::sink::ServiceDescriptor;
use crate::sink::ServiceKind;
use crate::sink::SinkFactory;

const MANUFACTURER: &str = "rtlbridge";
const FIRMWARE_REVISION: &str = "1.0";

/// Last readings applied to an accessory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessoryState {
    pub temperature_c: Option<f64>,
    pub humidity: Option<f64>,
    /// `None` until a battery status has been applied
    pub battery: Option<BatteryStatus>,
}

/// Host-facing description of an accessory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessorySummary {
    pub name: String,
    pub serial_number: String,
    pub services: Vec<ServiceDescriptor>,
}

pub struct Accessory {
    identity: DeviceIdentity,
    serial_number: String,
    descriptors: Vec<ServiceDescriptor>,
    #[allow(dead_code)] // Held so the bridge-side service stays alive
    information: Box<dyn CharacteristicSink>,
    temperature: Box<dyn CharacteristicSink>,
    humidity: Box<dyn CharacteristicSink>,
    state: AccessoryState,
}

impl std::fmt::Debug for Accessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessory")
            .field("identity", &self.identity)
            .field("serial_number", &self.serial_number)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Accessory {
    /// Create the accessory's services and publish their initial values.
    pub fn new(
        identity: DeviceIdentity,
        translations: &Translations,
        sinks: &dyn SinkFactory,
    ) -> Self {
        let name = identity.name().to_string();
        let serial_number = serial_number(&identity);

        let descriptors = vec![
            ServiceDescriptor {
                kind: ServiceKind::AccessoryInformation,
                display_name: name.clone(),
                subtype: None,
            },
            ServiceDescriptor {
                kind: ServiceKind::TemperatureSensor,
                display_name: format!("{} {}", name, translations.temperature),
                subtype: Some(translations.temperature.clone()),
            },
            ServiceDescriptor {
                kind: ServiceKind::HumiditySensor,
                display_name: format!("{} {}", name, translations.humidity),
                subtype: Some(translations.humidity.clone()),
            },
        ];

        let mut information = sinks.create_service(&descriptors[0]);
        information.set_characteristic(Characteristic::Manufacturer, MANUFACTURER.into());
        information.set_characteristic(Characteristic::SerialNumber, serial_number.clone().into());
        information.set_characteristic(Characteristic::FirmwareRevision, FIRMWARE_REVISION.into());

        let mut temperature = sinks.create_service(&descriptors[1]);
        temperature.set_characteristic(
            Characteristic::CurrentTemperature,
            CharacteristicValue::Number(0.0),
        );

        let mut humidity = sinks.create_service(&descriptors[2]);
        humidity.set_characteristic(
            Characteristic::CurrentRelativeHumidity,
            CharacteristicValue::Number(0.0),
        );

        Self {
            identity,
            serial_number,
            descriptors,
            information,
            temperature,
            humidity,
            state: AccessoryState::default(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn state(&self) -> &AccessoryState {
        &self.state
    }

    pub fn summary(&self) -> AccessorySummary {
        AccessorySummary {
            name: self.name().to_string(),
            serial_number: self.serial_number.clone(),
            services: self.descriptors.clone(),
        }
    }

    /// Apply the readings carried by `record`.
    ///
    /// Temperature and humidity are always written, even when the record lacks
    /// them. Battery status is only written for devices that watch it.
    pub fn apply(&mut self, record: &IncomingRecord) {
        debug!("Update: {:?}", self.identity);

        self.state.temperature_c = record.temperature_c();
        self.temperature.set_characteristic(
            Characteristic::CurrentTemperature,
            self.state.temperature_c.into(),
        );

        self.state.humidity = record.humidity();
        self.humidity.set_characteristic(
            Characteristic::CurrentRelativeHumidity,
            self.state.humidity.into(),
        );

        if !self.identity.watches_battery() {
            return;
        }

        let status = if record.battery_ok() {
            BatteryStatus::Normal
        } else {
            BatteryStatus::Low
        };
        self.state.battery = Some(status);
        self.temperature
            .set_characteristic(Characteristic::StatusLowBattery, status.into());
        self.humidity
            .set_characteristic(Characteristic::StatusLowBattery, status.into());
    }
}

/// Serial numbers render unset fields as `null`, keeping them stable across
/// installations that configured the same sensor.
fn serial_number(identity: &DeviceIdentity) -> String {
    fn render(value: Option<i64>) -> String {
        value.map_or_else(|| "null".to_string(), |v| v.to_string())
    }
    format!(
        "rtl-temperature-{}-{}",
        render(identity.id()),
        render(identity.channel())
    )
}
