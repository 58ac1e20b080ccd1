use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Discrete infection tier derived from the infection level percentage.
/// Ordering follows treatment intensity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Severe,
}

/// Actuation command accepted by the spray control endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SprayCommand {
    #[strum(serialize = "START")]
    Start,
    #[strum(serialize = "STOP")]
    Stop,
}

/// Flat analysis record returned by the analyze endpoint. Every field is
/// always populated on success; clients never have to handle absence.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub disease_detected: bool,
    pub disease_name: String,
    pub disease_description: String,
    pub infection_level: f32,
    pub severity: Severity,
    pub confidence: f32,
    pub pesticide: String,
    pub dosage: String,
    pub spray_recommended: bool,
    pub spray_duration: u32,
    pub soil_moisture: f32,
    pub moisture_safe: bool,
    pub model_fallback: bool,
    pub alert_message: Option<String>,
    pub reason: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct AnalyzeRequest {
    pub image_base64: String,
    pub soil_moisture: Option<f32>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SprayCommandRequest {
    pub command: String,
    pub duration: Option<u32>,
    pub soil_moisture: Option<f32>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SprayCommandResponse {
    pub success: bool,
    pub command: String,
    pub spray_allowed: bool,
    pub duration: Option<u32>,
    pub soil_moisture: f32,
    pub message: String,
}

/// Latest readings pushed by the microcontroller collaborator.
#[derive(Serialize, Deserialize, Clone)]
pub struct SensorSnapshot {
    pub temperature: f32,
    pub humidity: f32,
    pub soil_moisture: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct SensorUpdate {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub soil_moisture: Option<f32>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SprayStatus {
    pub is_spraying: bool,
    pub last_command: Option<String>,
    pub last_spray_time: Option<DateTime<Utc>>,
    pub last_duration: Option<u32>,
}
