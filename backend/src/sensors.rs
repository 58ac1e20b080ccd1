use chrono::Utc;
use tokio::sync::RwLock;

use shared::{SensorSnapshot, SensorUpdate};

/// Latest readings pushed by the microcontroller. Only the default-moisture
/// path consumes this; the analysis core itself never persists readings.
pub struct SensorHub {
    state: RwLock<SensorSnapshot>,
}

impl SensorHub {
    pub fn new(default_soil_moisture: f32) -> Self {
        Self {
            state: RwLock::new(SensorSnapshot {
                temperature: 25.0,
                humidity: 60.0,
                soil_moisture: default_soil_moisture,
                timestamp: Utc::now(),
            }),
        }
    }

    pub async fn snapshot(&self) -> SensorSnapshot {
        self.state.read().await.clone()
    }

    pub async fn latest_moisture(&self) -> f32 {
        self.state.read().await.soil_moisture
    }

    pub async fn apply(&self, update: SensorUpdate) -> SensorSnapshot {
        let mut state = self.state.write().await;
        if let Some(temperature) = update.temperature {
            state.temperature = temperature;
        }
        if let Some(humidity) = update.humidity {
            state.humidity = humidity;
        }
        if let Some(soil_moisture) = update.soil_moisture {
            state.soil_moisture = soil_moisture;
        }
        state.timestamp = Utc::now();
        state.clone()
    }
}
