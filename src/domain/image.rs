// ============================================================
// Layer 3 — Image Sample
// ============================================================
// One decoded image with its label. Pixels are stored in
// channel-major order (C, H, W) and scaled to [0, 1];
// normalisation happens later, when samples are batched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    pub pixels:   Vec<f32>,
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
    pub label:    usize,
}

impl ImageSample {
    pub fn new(pixels: Vec<f32>, dims: [usize; 3], label: usize) -> Self {
        let [channels, height, width] = dims;
        debug_assert_eq!(pixels.len(), channels * height * width);
        Self { pixels, channels, height, width, label }
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}
