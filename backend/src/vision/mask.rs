use ndarray::Array2;

/// Probability a pixel must exceed to count as diseased.
pub const DISEASED_THRESHOLD: f32 = 0.5;

/// Pixel-aligned diseased/healthy classification grid. Values are the
/// model's per-pixel disease probabilities in [0,1]. Derived from exactly
/// one image and never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    probs: Array2<f32>,
}

impl Mask {
    pub fn new(probs: Array2<f32>) -> Self {
        Self { probs }
    }

    pub fn probs(&self) -> &Array2<f32> {
        &self.probs
    }

    pub fn total_pixels(&self) -> usize {
        self.probs.len()
    }

    pub fn diseased_pixels(&self) -> usize {
        self.probs.iter().filter(|&&p| p > DISEASED_THRESHOLD).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_pixel_counts() {
        let mut grid = Array2::zeros((4, 4));
        grid[[0, 0]] = 0.9;
        grid[[1, 2]] = 0.7;
        grid[[3, 3]] = 0.5; // exactly at threshold, not diseased
        let mask = Mask::new(grid);
        assert_eq!(mask.total_pixels(), 16);
        assert_eq!(mask.diseased_pixels(), 2);
    }
}
