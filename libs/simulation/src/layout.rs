//! Canvas-relative geometry derived from the viewport size

/// Fallback canvas width when the host container reports no usable size
pub const DEFAULT_WIDTH: f64 = 800.0;
/// Fallback canvas height
pub const DEFAULT_HEIGHT: f64 = 600.0;

/// Vertical spacing between stacked input tokens
pub const INPUT_TOKEN_SPACING: f64 = 40.0;
/// Vertical spacing between stacked output code lines
pub const OUTPUT_TOKEN_SPACING: f64 = 25.0;
/// Layer block size
pub const LAYER_WIDTH: f64 = 150.0;
pub const LAYER_HEIGHT: f64 = 50.0;
/// Distance of attention heads from their layer anchor
pub const HEAD_ARC_RADIUS: f64 = 70.0;
/// Drawn radius of a single attention head
pub const HEAD_RADIUS: f64 = 15.0;
/// Embedding panel offset and size relative to its token
pub const EMBEDDING_OFFSET_X: f64 = 70.0;
pub const EMBEDDING_WIDTH: f64 = 40.0;
pub const EMBEDDING_HEIGHT: f64 = 5.0;
/// Probability bar chart geometry
pub const BAR_SPACING: f64 = 15.0;
pub const BAR_WIDTH: f64 = 10.0;

/// Named layout bands and columns for the current canvas size.
///
/// The canvas splits into five equal horizontal sections: input column at
/// section one, layer stack centered, output column at section five.
/// Vertically a header band tops a content band, with the probability
/// chart sitting on the footer line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    pub header_y: f64,
    pub content_y: f64,
    pub content_height: f64,
    pub footer_y: f64,
    pub section_width: f64,
    pub input_x: f64,
    pub layers_x: f64,
    pub output_x: f64,
}

impl Layout {
    /// Compute the layout for a canvas size, falling back to the default
    /// dimensions when the host reports nothing usable.
    pub fn compute(width: f64, height: f64) -> Self {
        let width = if width.is_finite() && width > 0.0 {
            width
        } else {
            DEFAULT_WIDTH
        };
        let height = if height.is_finite() && height > 0.0 {
            height
        } else {
            DEFAULT_HEIGHT
        };

        let section_width = width / 5.0;

        Self {
            width,
            height,
            header_y: height * 0.1,
            content_y: height * 0.2,
            content_height: height * 0.6,
            footer_y: height * 0.85,
            section_width,
            input_x: section_width,
            layers_x: width / 2.0,
            output_x: width - section_width,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::compute(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_bands() {
        let layout = Layout::compute(800.0, 600.0);
        assert!((layout.header_y - 60.0).abs() < 1e-9);
        assert!((layout.content_y - 120.0).abs() < 1e-9);
        assert!((layout.content_height - 360.0).abs() < 1e-9);
        assert!((layout.footer_y - 510.0).abs() < 1e-9);
    }

    #[test]
    fn test_layout_columns() {
        let layout = Layout::compute(1000.0, 500.0);
        assert!((layout.section_width - 200.0).abs() < 1e-9);
        assert!((layout.input_x - 200.0).abs() < 1e-9);
        assert!((layout.layers_x - 500.0).abs() < 1e-9);
        assert!((layout.output_x - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_layout_recompute_is_idempotent() {
        let first = Layout::compute(1280.0, 720.0);
        let second = Layout::compute(1280.0, 720.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_layout_falls_back_to_defaults() {
        let layout = Layout::compute(0.0, 600.0);
        assert_eq!(layout.width, DEFAULT_WIDTH);
        assert_eq!(layout.height, 600.0);

        let layout = Layout::compute(f64::NAN, -1.0);
        assert_eq!(layout.width, DEFAULT_WIDTH);
        assert_eq!(layout.height, DEFAULT_HEIGHT);

        let layout = Layout::compute(f64::INFINITY, f64::INFINITY);
        assert_eq!(layout.width, DEFAULT_WIDTH);
        assert_eq!(layout.height, DEFAULT_HEIGHT);
    }
}
