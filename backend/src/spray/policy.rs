use std::fmt;

use shared::Severity;

use crate::agronomy::DiseaseProfile;
use crate::config::PolicyConfig;

/// The soil-moisture range in which spraying is permitted, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoistureBand {
    pub min: f32,
    pub max: f32,
}

/// A reading outside the safe band. Not an error: a normal, reported
/// decision outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoistureViolation {
    TooDry { reading: f32, min: f32, max: f32 },
    TooWet { reading: f32, min: f32, max: f32 },
}

impl fmt::Display for MoistureViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoistureViolation::TooDry { reading, min, max } => write!(
                f,
                "soil too dry: reading {reading:.1}% outside safe range ({min:.0}-{max:.0}%)"
            ),
            MoistureViolation::TooWet { reading, min, max } => write!(
                f,
                "soil too wet: reading {reading:.1}% outside safe range ({min:.0}-{max:.0}%)"
            ),
        }
    }
}

impl MoistureBand {
    pub fn from_config(cfg: &PolicyConfig) -> Self {
        Self {
            min: cfg.moisture_min,
            max: cfg.moisture_max,
        }
    }

    /// The single safety gate. Every path that can actuate the pump (the
    /// scan-driven recommendation and the manual command) goes through this
    /// check; there is deliberately no second copy of the inequality.
    pub fn check(&self, reading: f32) -> Result<(), MoistureViolation> {
        if reading < self.min {
            Err(MoistureViolation::TooDry {
                reading,
                min: self.min,
                max: self.max,
            })
        } else if reading > self.max {
            Err(MoistureViolation::TooWet {
                reading,
                min: self.min,
                max: self.max,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for MoistureBand {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

/// Pump run time per infection tier, in seconds.
pub fn duration_for(severity: Severity) -> u32 {
    match severity {
        Severity::None => 0,
        Severity::Low => 3,
        Severity::Moderate => 5,
        Severity::High => 8,
        Severity::Severe => 10,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SprayDecision {
    pub spray_recommended: bool,
    pub spray_duration: u32,
    pub pesticide: String,
    pub dosage: String,
    pub alert_message: Option<String>,
    pub reason: String,
}

/// Map severity and live moisture to a bounded actuation decision. A pure
/// function of its inputs: identical calls yield identical decisions.
pub fn decide(
    severity: Severity,
    infection_level: f32,
    moisture: f32,
    band: &MoistureBand,
    profile: &DiseaseProfile,
) -> SprayDecision {
    if let Err(violation) = band.check(moisture) {
        // Unsafe moisture overrides the infection-driven schedule entirely.
        return SprayDecision {
            spray_recommended: false,
            spray_duration: 0,
            pesticide: profile.pesticide.to_string(),
            dosage: profile.dosage.to_string(),
            alert_message: Some(violation.to_string()),
            reason: format!("spraying withheld: {violation}"),
        };
    }

    if severity == Severity::None {
        return SprayDecision {
            spray_recommended: false,
            spray_duration: 0,
            pesticide: profile.pesticide.to_string(),
            dosage: profile.dosage.to_string(),
            alert_message: None,
            reason: "no infection detected, nothing to treat".to_string(),
        };
    }

    let duration = duration_for(severity);
    SprayDecision {
        spray_recommended: true,
        spray_duration: duration,
        pesticide: profile.pesticide.to_string(),
        dosage: profile.dosage.to_string(),
        alert_message: None,
        reason: format!(
            "infection level {infection_level}% ({severity}), spraying for {duration} seconds"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agronomy::{disease, DEFAULT_DISEASE_KEY};

    const ALL_SEVERITIES: [Severity; 5] = [
        Severity::None,
        Severity::Low,
        Severity::Moderate,
        Severity::High,
        Severity::Severe,
    ];

    fn profile() -> &'static DiseaseProfile {
        disease::lookup(DEFAULT_DISEASE_KEY)
    }

    #[test]
    fn test_duration_table() {
        assert_eq!(duration_for(Severity::None), 0);
        assert_eq!(duration_for(Severity::Low), 3);
        assert_eq!(duration_for(Severity::Moderate), 5);
        assert_eq!(duration_for(Severity::High), 8);
        assert_eq!(duration_for(Severity::Severe), 10);
    }

    #[test]
    fn test_band_bounds_inclusive() {
        let band = MoistureBand::default();
        assert!(band.check(40.0).is_ok());
        assert!(band.check(70.0).is_ok());
        assert!(matches!(
            band.check(39.9),
            Err(MoistureViolation::TooDry { .. })
        ));
        assert!(matches!(
            band.check(70.1),
            Err(MoistureViolation::TooWet { .. })
        ));
    }

    #[test]
    fn test_unsafe_moisture_blocks_every_severity() {
        let band = MoistureBand::default();
        for severity in ALL_SEVERITIES {
            for moisture in [0.0, 30.0, 39.9, 70.1, 85.0, 100.0] {
                let d = decide(severity, 80.0, moisture, &band, profile());
                assert!(!d.spray_recommended);
                assert_eq!(d.spray_duration, 0);
            }
        }
    }

    #[test]
    fn test_severe_infection_dry_soil_forces_zero() {
        let d = decide(Severity::Severe, 80.0, 30.0, &MoistureBand::default(), profile());
        assert!(!d.spray_recommended);
        assert_eq!(d.spray_duration, 0);
        let alert = d.alert_message.unwrap();
        assert!(alert.contains("dry"));
        assert!(alert.contains("30.0"));
    }

    #[test]
    fn test_moderate_infection_safe_moisture() {
        let d = decide(Severity::Moderate, 30.0, 55.0, &MoistureBand::default(), profile());
        assert!(d.spray_recommended);
        assert_eq!(d.spray_duration, 5);
        assert_eq!(d.pesticide, "Propiconazole 25% EC");
    }

    #[test]
    fn test_low_infection_at_wet_boundary() {
        let d = decide(Severity::Low, 10.0, 70.0, &MoistureBand::default(), profile());
        assert!(d.spray_recommended);
        assert_eq!(d.spray_duration, 3);
    }

    #[test]
    fn test_none_severity_never_recommended() {
        let d = decide(Severity::None, 0.0, 55.0, &MoistureBand::default(), disease::healthy());
        assert!(!d.spray_recommended);
        assert_eq!(d.spray_duration, 0);
        assert!(d.alert_message.is_none());
    }

    #[test]
    fn test_duration_implies_recommended() {
        let band = MoistureBand::default();
        for severity in ALL_SEVERITIES {
            for moisture in [20.0, 40.0, 55.0, 70.0, 90.0] {
                let d = decide(severity, 50.0, moisture, &band, profile());
                if d.spray_duration > 0 {
                    assert!(d.spray_recommended);
                }
            }
        }
    }

    #[test]
    fn test_decide_is_idempotent() {
        let band = MoistureBand::default();
        let a = decide(Severity::High, 60.0, 45.0, &band, profile());
        let b = decide(Severity::High, 60.0, 45.0, &band, profile());
        assert_eq!(a, b);
    }
}
