//! Shared shift fixture for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use field_dispatch::{Camera, DispatchCoordinator, FieldDispatchConfig, ShiftManifest, SimulatedCamera};

/// Two on-duty agents, one offline agent, and a mixed-risk portfolio around Makati
pub const SHIFT: &str = r#"
[[agents]]
id = "FA-101"
name = "Ramon Reyes"
status = "online"
location = { lat = 14.5547, lng = 121.0244, label = "Makati CBD" }

[[agents]]
id = "FA-102"
name = "Liza Santos"
status = "online"
location = { lat = 14.5764, lng = 121.0851, label = "Ortigas" }

[[agents]]
id = "FA-103"
name = "Jun Villanueva"
status = "offline"
location = { lat = 14.6507, lng = 121.0494, label = "Diliman" }

[[cases]]
id = "C-A"
name = "Aquino Motors"
address = "Paseo de Roxas, Makati"
riskTier = "High"
location = { lat = 14.5700, lng = 121.0400 }

[[cases]]
id = "C-B"
name = "Bautista Hardware"
address = "Ayala Ave, Makati"
riskTier = "High"
location = { lat = 14.5550, lng = 121.0250 }

[[cases]]
id = "C-CRIT"
name = "Castillo Holdings"
address = "Buendia Ave, Makati"
riskTier = "Critical"
location = { lat = 14.5600, lng = 121.0150 }

[[cases]]
id = "C-LOW"
name = "Lim Bakery"
address = "Kalayaan Ave, Makati"
riskTier = "Low"
location = { lat = 14.5650, lng = 121.0300 }
"#;

pub fn manifest() -> ShiftManifest {
    ShiftManifest::from_toml_str(SHIFT).expect("fixture manifest parses")
}

pub async fn coordinator_with(device: Arc<SimulatedCamera>) -> DispatchCoordinator {
    DispatchCoordinator::from_manifest(&FieldDispatchConfig::default(), &manifest(), Camera::new(device))
        .await
        .expect("fixture imports")
}

pub async fn coordinator() -> DispatchCoordinator {
    coordinator_with(Arc::new(SimulatedCamera::new())).await
}
