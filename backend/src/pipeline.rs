use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use shared::{AnalysisReport, Severity};

use crate::agronomy::{self, disease, DiseaseProfile, SeverityScore};
use crate::config::SystemConfig;
use crate::spray::{self, MoistureBand, SprayDecision};
use crate::vision::{preprocess, EngineError, SegmentationEngine};

/// Sequences segmentation, severity scoring, and the spray policy, then
/// assembles the externally visible record. Stateless between requests;
/// everything it holds is read-only after construction.
pub struct AnalysisPipeline {
    engine: Arc<SegmentationEngine>,
    band: MoistureBand,
    timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(engine: Arc<SegmentationEngine>, cfg: &SystemConfig) -> Self {
        Self {
            engine,
            band: MoistureBand::from_config(&cfg.policy),
            timeout: Duration::from_millis(cfg.model.inference_timeout_ms),
        }
    }

    pub fn moisture_band(&self) -> &MoistureBand {
        &self.band
    }

    /// Run the full decision pipeline for one request. Decoding and model
    /// failures abort before severity/policy run; a success populates every
    /// response field.
    pub async fn analyze(
        &self,
        image_bytes: Vec<u8>,
        soil_moisture: f32,
    ) -> Result<AnalysisReport, EngineError> {
        let digest: [u8; 32] = Sha256::digest(&image_bytes).into();
        let image = preprocess::prepare(&image_bytes, self.engine.input_size())?;

        let engine = Arc::clone(&self.engine);
        let timeout_ms = self.timeout.as_millis() as u64;
        let handle = tokio::task::spawn_blocking(move || engine.segment(&image, digest));
        let segmentation = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(segmentation)) => segmentation,
            Ok(Err(_)) => return Err(EngineError::Aborted),
            Err(_) => return Err(EngineError::Timeout(timeout_ms)),
        };

        let score = agronomy::score(&segmentation.mask);
        let profile = if score.disease_detected {
            disease::lookup(disease::DEFAULT_DISEASE_KEY)
        } else {
            disease::healthy()
        };
        let decision = spray::decide(
            score.severity,
            score.infection_level,
            soil_moisture,
            &self.band,
            profile,
        );
        let alert_message = compose_alert(&score, profile, &decision);

        Ok(AnalysisReport {
            analysis_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            disease_detected: score.disease_detected,
            disease_name: profile.name.to_string(),
            disease_description: profile.description.to_string(),
            infection_level: score.infection_level,
            severity: score.severity,
            confidence: round2(segmentation.confidence),
            pesticide: decision.pesticide.clone(),
            dosage: decision.dosage.clone(),
            spray_recommended: decision.spray_recommended,
            spray_duration: decision.spray_duration,
            soil_moisture,
            moisture_safe: self.band.check(soil_moisture).is_ok(),
            model_fallback: segmentation.fallback,
            alert_message,
            reason: decision.reason,
        })
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// Human-readable notification mirroring the dashboard alert: a disease
/// block when something was found, with either the recommendation or the
/// moisture warning appended; the bare warning when the leaf is clean but
/// the soil is out of band.
fn compose_alert(
    score: &SeverityScore,
    profile: &DiseaseProfile,
    decision: &SprayDecision,
) -> Option<String> {
    if score.severity == Severity::None {
        return decision.alert_message.clone();
    }

    let mut alert = format!(
        "DISEASE ALERT: {} - infection level {}% ({}). Pesticide: {}, dosage: {}",
        profile.name, score.infection_level, score.severity, profile.pesticide, profile.dosage
    );
    match &decision.alert_message {
        Some(warning) => {
            alert.push_str(". WARNING: ");
            alert.push_str(warning);
        }
        None => {
            alert.push_str(&format!(
                ". Spraying recommended for {} seconds",
                decision.spray_duration
            ));
        }
    }
    Some(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    fn fallback_pipeline() -> AnalysisPipeline {
        let cfg = SystemConfig::default();
        let engine = Arc::new(SegmentationEngine::new(&cfg.model).unwrap());
        AnalysisPipeline::new(engine, &cfg)
    }

    fn leaf_png(shade: u8) -> Vec<u8> {
        let mut img = RgbImage::new(64, 64);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([shade, 180, 40]);
        }
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[actix_web::test]
    async fn test_analyze_populates_every_field() {
        let pipeline = fallback_pipeline();
        let report = pipeline.analyze(leaf_png(30), 55.0).await.unwrap();

        assert!(!report.disease_name.is_empty());
        assert!(!report.disease_description.is_empty());
        assert!(!report.pesticide.is_empty());
        assert!(!report.dosage.is_empty());
        assert!(!report.reason.is_empty());
        assert!((0.0..=100.0).contains(&report.infection_level));
        assert!((0.0..=100.0).contains(&report.confidence));
        assert_eq!(report.soil_moisture, 55.0);
        assert!(report.moisture_safe);
        assert!(report.model_fallback);
    }

    #[actix_web::test]
    async fn test_analyze_is_deterministic_for_identical_bytes() {
        let pipeline = fallback_pipeline();
        let bytes = leaf_png(77);
        let a = pipeline.analyze(bytes.clone(), 55.0).await.unwrap();
        let b = pipeline.analyze(bytes, 55.0).await.unwrap();

        assert_eq!(a.infection_level, b.infection_level);
        assert_eq!(a.severity, b.severity);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.spray_duration, b.spray_duration);
    }

    #[actix_web::test]
    async fn test_analyze_rejects_undecodable_bytes() {
        let pipeline = fallback_pipeline();
        let err = pipeline
            .analyze(b"not an image at all".to_vec(), 55.0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidImage(_)));
    }

    #[actix_web::test]
    async fn test_unsafe_moisture_forces_zero_duration() {
        let pipeline = fallback_pipeline();
        let report = pipeline.analyze(leaf_png(30), 30.0).await.unwrap();

        assert!(!report.spray_recommended);
        assert_eq!(report.spray_duration, 0);
        assert!(!report.moisture_safe);
        if report.disease_detected {
            assert!(report.alert_message.unwrap().contains("dry"));
        }
    }

    #[test]
    fn test_alert_mentions_recommendation_when_safe() {
        let score = SeverityScore {
            infection_level: 30.0,
            severity: Severity::Moderate,
            disease_detected: true,
        };
        let profile = disease::lookup(disease::DEFAULT_DISEASE_KEY);
        let decision = spray::decide(
            score.severity,
            score.infection_level,
            55.0,
            &MoistureBand::default(),
            profile,
        );
        let alert = compose_alert(&score, profile, &decision).unwrap();
        assert!(alert.contains("Wheat Brown Rust"));
        assert!(alert.contains("5 seconds"));
    }
}
