use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use shared::SprayStatus;

#[derive(Default)]
struct SprayState {
    is_spraying: bool,
    last_command: Option<String>,
    last_spray_time: Option<DateTime<Utc>>,
    last_duration: Option<u32>,
}

/// Actuation bookkeeping for the pump, written only by the manual command
/// path and read by the status endpoint. The decision pipeline itself stays
/// stateless; this exists so operators can see what the pump last did.
pub struct SprayController {
    state: RwLock<SprayState>,
}

impl SprayController {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SprayState::default()),
        }
    }

    pub async fn record_start(&self, duration: u32) {
        let mut state = self.state.write().await;
        state.is_spraying = true;
        state.last_command = Some("START".to_string());
        state.last_spray_time = Some(Utc::now());
        state.last_duration = Some(duration);
    }

    pub async fn record_stop(&self) {
        let mut state = self.state.write().await;
        state.is_spraying = false;
        state.last_command = Some("STOP".to_string());
    }

    pub async fn record_rejection(&self) {
        let mut state = self.state.write().await;
        state.last_command = Some("REJECTED".to_string());
    }

    pub async fn status(&self) -> SprayStatus {
        let state = self.state.read().await;
        SprayStatus {
            is_spraying: state.is_spraying,
            last_command: state.last_command.clone(),
            last_spray_time: state.last_spray_time,
            last_duration: state.last_duration,
        }
    }
}

impl Default for SprayController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_start_then_stop() {
        let controller = SprayController::new();
        controller.record_start(8).await;

        let status = controller.status().await;
        assert!(status.is_spraying);
        assert_eq!(status.last_command.as_deref(), Some("START"));
        assert_eq!(status.last_duration, Some(8));
        assert!(status.last_spray_time.is_some());

        controller.record_stop().await;
        let status = controller.status().await;
        assert!(!status.is_spraying);
        assert_eq!(status.last_command.as_deref(), Some("STOP"));
    }

    #[actix_web::test]
    async fn test_rejection_does_not_mark_spraying() {
        let controller = SprayController::new();
        controller.record_rejection().await;

        let status = controller.status().await;
        assert!(!status.is_spraying);
        assert_eq!(status.last_command.as_deref(), Some("REJECTED"));
    }
}
