/// Two-point blends used to synthesize a missing wavelength column.
pub struct BlendHelper;

impl BlendHelper {
    /// Row-wise arithmetic mean of two equally long traces.
    pub fn midpoint(lower: &[f64], upper: &[f64]) -> Vec<f64> {
        lower
            .iter()
            .zip(upper)
            .map(|(&a, &b)| (a + b) / 2.0)
            .collect()
    }

    /// Row-wise linear blend; `fraction` is 0 at `lower` and 1 at `upper`.
    pub fn linear(lower: &[f64], upper: &[f64], fraction: f64) -> Vec<f64> {
        lower
            .iter()
            .zip(upper)
            .map(|(&a, &b)| a + (b - a) * fraction)
            .collect()
    }
}
