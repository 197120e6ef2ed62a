//! Animated entity records mutated by the driver each frame

use crate::ease_in_out_cubic;

/// Upper bound for every opacity value; 0 is fully transparent.
pub const OPACITY_MAX: f64 = 255.0;

/// RGB triple carried by flow particles so the renderer can tint them.
pub type Rgb = (u8, u8, u8);

/// One token of the input prompt, stacked in the input column.
#[derive(Debug, Clone)]
pub struct InputToken {
    /// Token text as produced by the word-boundary split
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// Fade state in [0, 255]
    pub opacity: f64,
    /// Set once the token has been revealed
    pub activated: bool,
}

/// Embedding vector panel shown beside a revealed input token.
///
/// Created lazily the first time its token becomes visible; at most one
/// exists per token index.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// Index of the input token this embedding belongs to
    pub token_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
    /// Synthetic embedding values in [-0.8, 0.8], drawn as a bar chart
    pub values: Vec<f64>,
}

/// Feed-forward or normalization sub-element of a layer block.
#[derive(Debug, Clone, Default)]
pub struct LayerPart {
    pub activated: bool,
    pub opacity: f64,
}

/// One attention head, placed on an arc over its layer block.
#[derive(Debug, Clone)]
pub struct AttentionHead {
    /// Head index within its layer
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub opacity: f64,
    pub activated: bool,
}

/// One visible transformer layer block in the center column.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer index within the visible stack
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
    pub heads: Vec<AttentionHead>,
    pub ffn: LayerPart,
    pub normalization: LayerPart,
}

/// Directed attention edge between two input tokens.
///
/// Generated once at scene build; only `active` and `opacity` change
/// afterwards.
#[derive(Debug, Clone)]
pub struct AttentionPattern {
    pub layer_index: usize,
    pub head_index: usize,
    /// Source token index
    pub from_token: usize,
    /// Target token index
    pub to_token: usize,
    /// Attention weight in [0, 1]; scales line width and peak opacity
    pub strength: f64,
    pub opacity: f64,
    pub active: bool,
}

/// One line of the generated code, stacked in the output column.
#[derive(Debug, Clone)]
pub struct OutputToken {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub opacity: f64,
    /// Set once the line has fully faded in
    pub activated: bool,
    /// True while the line is being "typed" during the generation phase
    pub generating: bool,
}

/// One bar of the next-token probability chart under the output column.
#[derive(Debug, Clone)]
pub struct TokenProbabilityBar {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    /// Current bar height; the highlighted bar grows during projection
    pub height: f64,
    /// Height the bar was built with
    pub max_height: f64,
    pub opacity: f64,
    /// Exactly one bar is highlighted as the sampled next token
    pub highlighted: bool,
    /// Display label; empty for all but the highlighted bar
    pub text: String,
}

/// Transient dot travelling between two entities.
///
/// `x`/`y` hold the spawn point; the current position is derived from
/// `progress`, so a particle never drifts off its path.
#[derive(Debug, Clone)]
pub struct FlowParticle {
    pub x: f64,
    pub y: f64,
    pub target_x: f64,
    pub target_y: f64,
    /// Travel completion in [0, 1]; the particle is dropped at 1
    pub progress: f64,
    /// Progress gained per frame before the speed multiplier
    pub speed: f64,
    pub color: Rgb,
    pub size: f64,
}

impl FlowParticle {
    /// Current point along the eased path from spawn point to target.
    pub fn position(&self) -> (f64, f64) {
        let t = ease_in_out_cubic(self.progress);
        (
            self.x + (self.target_x - self.x) * t,
            self.y + (self.target_y - self.y) * t,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_position_at_endpoints() {
        let particle = FlowParticle {
            x: 100.0,
            y: 200.0,
            target_x: 300.0,
            target_y: 400.0,
            progress: 0.0,
            speed: 0.03,
            color: (255, 200, 100),
            size: 6.0,
        };
        assert_eq!(particle.position(), (100.0, 200.0));

        let done = FlowParticle {
            progress: 1.0,
            ..particle
        };
        let (x, y) = done.position();
        assert!((x - 300.0).abs() < 1e-9);
        assert!((y - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_particle_position_midpoint() {
        let particle = FlowParticle {
            x: 0.0,
            y: 0.0,
            target_x: 100.0,
            target_y: 0.0,
            progress: 0.5,
            speed: 0.02,
            color: (70, 130, 210),
            size: 5.0,
        };
        let (x, y) = particle.position();
        assert!((x - 50.0).abs() < 1e-9);
        assert_eq!(y, 0.0);
    }
}
