use serde::Deserialize;
use std::f32::consts::PI;

/// Window applied to each block before the transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    Blackman,
    Hann,
    Rectangular,
}

impl WindowFunction {
    /// Coefficients for a window of `size` samples.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size < 2 {
            return vec![1.0; size];
        }
        let denom = (size - 1) as f32;
        (0..size)
            .map(|n| {
                let x = n as f32 / denom;
                match self {
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
                    }
                    WindowFunction::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
                    WindowFunction::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

impl std::str::FromStr for WindowFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blackman" => Ok(WindowFunction::Blackman),
            "hann" | "hanning" => Ok(WindowFunction::Hann),
            "rectangular" | "rect" | "none" => Ok(WindowFunction::Rectangular),
            other => Err(format!("unknown window function '{}'", other)),
        }
    }
}

/// Multiply both halves of a block by the window, in place.
pub fn apply_window(window: &[f32], re: &mut [f32], im: &mut [f32]) {
    for ((r, i), &w) in re.iter_mut().zip(im.iter_mut()).zip(window) {
        *r *= w;
        *i *= w;
    }
}
