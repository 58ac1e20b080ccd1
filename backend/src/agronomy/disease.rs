/// Treatment reference for a recognized disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseaseProfile {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub pesticide: &'static str,
    pub dosage: &'static str,
}

/// Label every diseased result is keyed to until multi-class classification
/// lands. A fixed lookup independent of the mask, by design.
pub const DEFAULT_DISEASE_KEY: &str = "wheat_brown_rust";
pub const HEALTHY_KEY: &str = "healthy";

const PROFILES: &[DiseaseProfile] = &[
    DiseaseProfile {
        key: "wheat_brown_rust",
        name: "Wheat Brown Rust",
        description: "Fungal disease causing brown pustules on leaves",
        pesticide: "Propiconazole 25% EC",
        dosage: "1ml per liter of water",
    },
    DiseaseProfile {
        key: "tomato_early_blight",
        name: "Tomato Early Blight",
        description: "Alternaria solani causing concentric rings on leaves",
        pesticide: "Mancozeb 75% WP",
        dosage: "2g per liter of water",
    },
    DiseaseProfile {
        key: "rice_blast",
        name: "Rice Blast",
        description: "Pyricularia oryzae causing diamond-shaped lesions",
        pesticide: "Tricyclazole 75% WP",
        dosage: "1g per liter of water",
    },
    DiseaseProfile {
        key: "potato_late_blight",
        name: "Potato Late Blight",
        description: "Phytophthora infestans causing dark lesions",
        pesticide: "Metalaxyl 8% + Mancozeb 64% WP",
        dosage: "2.5g per liter of water",
    },
    DiseaseProfile {
        key: "healthy",
        name: "Healthy Plant",
        description: "No disease detected",
        pesticide: "None required",
        dosage: "N/A",
    },
];

/// Look up a profile by key, falling back to the healthy profile for
/// unknown labels.
pub fn lookup(key: &str) -> &'static DiseaseProfile {
    PROFILES
        .iter()
        .find(|p| p.key == key)
        .unwrap_or_else(|| healthy())
}

pub fn healthy() -> &'static DiseaseProfile {
    PROFILES
        .iter()
        .find(|p| p.key == HEALTHY_KEY)
        .expect("healthy profile is always present")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_resolves() {
        let p = lookup(DEFAULT_DISEASE_KEY);
        assert_eq!(p.name, "Wheat Brown Rust");
        assert_eq!(p.pesticide, "Propiconazole 25% EC");
    }

    #[test]
    fn test_unknown_key_falls_back_to_healthy() {
        let p = lookup("martian_mildew");
        assert_eq!(p.key, HEALTHY_KEY);
        assert_eq!(p.pesticide, "None required");
    }
}
