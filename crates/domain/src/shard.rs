//! Sharded entity naming.
//!
//! Every per-device, per-property series lives in its own storage kind named
//! `{kind}_{property}_{device}`. Spreading frequently written series across
//! kinds keeps writers for different devices off each other's partitions.

use crate::id::DeviceKey;

/// Storage kinds (collections) used by the platform.
pub mod kind {
    pub const DEVICE_DATA: &str = "DeviceData";
    pub const DEVICES: &str = "Devices";
    pub const USERS: &str = "Users";
    pub const USER_SESSION: &str = "UserSession";
    pub const HORTICULTURE_MEASUREMENTS: &str = "HorticultureMeasurements";
    pub const MQTT_SERVICE_CACHE: &str = "MqttServiceCache";
    pub const MQTT_SERVICE_TURDS: &str = "MqttServiceTurds";
    pub const IMAGES: &str = "Images";
    pub const DEVICE_PUBLIC_KEYS: &str = "DevicePublicKeys";
}

/// Property names of device series.
pub mod property {
    pub const CO2: &str = "air_carbon_dioxide_ppm";
    pub const RH: &str = "air_humidity_percent";
    pub const TEMP: &str = "air_temperature_celsius";
    pub const LED: &str = "light_spectrum_nm_percent";
    pub const LED_DISTANCE: &str = "light_illumination_distance_cm";
    pub const LED_INTENSITY: &str = "light_intensity_watts";
    pub const BOOT: &str = "boot";
    pub const STATUS: &str = "status";
    pub const WATER_EC: &str = "water_electrical_conductivity_ms_cm";
    pub const WATER_PH: &str = "water_potential_hydrogen";
    pub const WATER_TEMP: &str = "water_temperature_celcius";
    pub const RUNS: &str = "runs";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const SCHEDULE: &str = "schedule";

    /// Series summarised by the "latest properties" view, in display order.
    pub const USUAL: [&str; 11] = [
        BOOT,
        STATUS,
        CO2,
        RH,
        TEMP,
        LED,
        LED_DISTANCE,
        LED_INTENSITY,
        WATER_EC,
        WATER_PH,
        WATER_TEMP,
    ];
}

/// Name of the storage kind holding one device's series for one property.
#[must_use]
pub fn shard_name(kind: &str, property: &str, device: &DeviceKey) -> String {
    format!("{kind}_{property}_{device}")
}

/// [`shard_name`] specialised to the `DeviceData` kind.
#[must_use]
pub fn device_data_kind(property: &str, device: &DeviceKey) -> String {
    shard_name(kind::DEVICE_DATA, property, device)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DeviceKey {
        s.parse().unwrap()
    }

    #[test]
    fn should_join_kind_property_and_device_with_underscores() {
        assert_eq!(
            shard_name("DeviceData", "runs", &key("dev-1")),
            "DeviceData_runs_dev-1"
        );
    }

    #[test]
    fn should_produce_same_name_for_same_inputs() {
        let a = device_data_kind(property::CO2, &key("dev-1"));
        let b = device_data_kind(property::CO2, &key("dev-1"));
        assert_eq!(a, b);
    }

    #[test]
    fn should_not_collide_across_devices_or_properties() {
        let names = [
            device_data_kind(property::CO2, &key("dev-1")),
            device_data_kind(property::CO2, &key("dev-2")),
            device_data_kind(property::TEMP, &key("dev-1")),
            device_data_kind(property::RUNS, &key("dev-1")),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
