use shared::Severity;

use crate::vision::Mask;

/// Reduction of a segmentation mask to the numbers the spray policy needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityScore {
    /// Percentage of pixels classified diseased, rounded to one decimal.
    pub infection_level: f32,
    pub severity: Severity,
    /// True for any nonzero diseased pixel count, even one that rounds to
    /// an infection level of 0.0.
    pub disease_detected: bool,
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

pub fn infection_level(mask: &Mask) -> f32 {
    let total = mask.total_pixels();
    if total == 0 {
        return 0.0;
    }
    round1(100.0 * mask.diseased_pixels() as f32 / total as f32)
}

/// Tier mapping over half-open intervals, upper bound inclusive:
/// 0 -> None, (0,25] -> Low, (25,50] -> Moderate, (50,75] -> High,
/// (75,100] -> Severe.
pub fn classify(infection: f32) -> Severity {
    if infection <= 0.0 {
        Severity::None
    } else if infection <= 25.0 {
        Severity::Low
    } else if infection <= 50.0 {
        Severity::Moderate
    } else if infection <= 75.0 {
        Severity::High
    } else {
        Severity::Severe
    }
}

pub fn score(mask: &Mask) -> SeverityScore {
    let infection = infection_level(mask);
    SeverityScore {
        infection_level: infection,
        severity: classify(infection),
        disease_detected: mask.diseased_pixels() > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Mask with the first `diseased` of `total` pixels set to 1.0.
    fn mask_with(diseased: usize, total: usize) -> Mask {
        let mut grid = Array2::zeros((1, total));
        for i in 0..diseased {
            grid[[0, i]] = 1.0;
        }
        Mask::new(grid)
    }

    #[test]
    fn test_all_healthy_mask() {
        let s = score(&mask_with(0, 100));
        assert_eq!(s.infection_level, 0.0);
        assert_eq!(s.severity, Severity::None);
        assert!(!s.disease_detected);
    }

    #[test]
    fn test_thirty_percent_is_moderate() {
        let s = score(&mask_with(30, 100));
        assert_eq!(s.infection_level, 30.0);
        assert_eq!(s.severity, Severity::Moderate);
        assert!(s.disease_detected);
    }

    #[test]
    fn test_eighty_percent_is_severe() {
        let s = score(&mask_with(80, 100));
        assert_eq!(s.severity, Severity::Severe);
    }

    #[test]
    fn test_ten_percent_is_low() {
        let s = score(&mask_with(10, 100));
        assert_eq!(s.severity, Severity::Low);
    }

    #[test]
    fn test_upper_inclusive_boundaries() {
        assert_eq!(classify(0.0), Severity::None);
        assert_eq!(classify(0.1), Severity::Low);
        assert_eq!(classify(25.0), Severity::Low);
        assert_eq!(classify(25.1), Severity::Moderate);
        assert_eq!(classify(50.0), Severity::Moderate);
        assert_eq!(classify(50.1), Severity::High);
        assert_eq!(classify(75.0), Severity::High);
        assert_eq!(classify(75.1), Severity::Severe);
        assert_eq!(classify(100.0), Severity::Severe);
    }

    #[test]
    fn test_rounded_to_one_decimal() {
        // 1/3 of pixels -> 33.333...% -> 33.3
        let s = score(&mask_with(1, 3));
        assert_eq!(s.infection_level, 33.3);
    }

    #[test]
    fn test_single_pixel_detected_but_rounds_to_zero() {
        let s = score(&mask_with(1, 10_000));
        assert_eq!(s.infection_level, 0.0);
        assert_eq!(s.severity, Severity::None);
        assert!(s.disease_detected);
    }

    #[test]
    fn test_infection_monotonic_in_diseased_count() {
        let mut prev = -1.0;
        for diseased in 0..=50 {
            let level = infection_level(&mask_with(diseased, 50));
            assert!(level >= prev);
            prev = level;
        }
    }

    #[test]
    fn test_tier_order_preserving() {
        let mut prev = Severity::None;
        for step in 0..=1000 {
            let sev = classify(step as f32 / 10.0);
            assert!(sev >= prev);
            prev = sev;
        }
    }
}
