//! Scene construction: builds every entity collection from the fixed
//! prompt, the model config, and the current layout.

use rand::Rng;

use crate::config::ModelConfig;
use crate::entities::{
    AttentionHead, AttentionPattern, Embedding, FlowParticle, InputToken, Layer, LayerPart,
    OutputToken, TokenProbabilityBar,
};
use crate::layout::{
    Layout, BAR_SPACING, BAR_WIDTH, EMBEDDING_HEIGHT, EMBEDDING_OFFSET_X, EMBEDDING_WIDTH,
    HEAD_ARC_RADIUS, HEAD_RADIUS, INPUT_TOKEN_SPACING, LAYER_HEIGHT, LAYER_WIDTH,
    OUTPUT_TOKEN_SPACING,
};

/// The prompt fed into the depicted model
pub const INPUT_PROMPT: &str = "Create a p5js graphical animation";

/// The code the model "generates", one output token per line
pub const GENERATED_CODE: [&str; 11] = [
    "function setup() {",
    "  createCanvas(800, 600);",
    "  background(10);",
    "}",
    "",
    "function draw() {",
    "  background(10, 20);",
    "  // Draw animation elements",
    "  drawParticles();",
    "  updatePhysics();",
    "}",
];

/// Number of bars in the next-token probability chart
pub const PROBABILITY_BAR_COUNT: usize = 20;
/// Which bar is highlighted as the sampled token
pub const HIGHLIGHTED_BAR_INDEX: usize = 5;
/// Label shown over the highlighted bar
pub const SAMPLED_TOKEN_TEXT: &str = "function";
/// Synthetic values per embedding panel
pub const EMBEDDING_VALUE_COUNT: usize = 16;

/// Split text at word boundaries, keeping punctuation runs but dropping
/// whitespace-only segments.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut last_kind: Option<bool> = None;

    for c in text.chars() {
        let kind = c.is_alphanumeric() || c == '_';
        if last_kind.is_some() && last_kind != Some(kind) && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        current.push(c);
        last_kind = Some(kind);
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens.retain(|t| !t.trim().is_empty());
    tokens
}

/// The full mutable entity set owned by one simulation instance.
///
/// Built once at initialization; geometry is reassigned on resize, all
/// other state only changes through the per-frame driver.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub input_tokens: Vec<InputToken>,
    pub embeddings: Vec<Embedding>,
    pub layers: Vec<Layer>,
    pub attention_patterns: Vec<AttentionPattern>,
    pub output_tokens: Vec<OutputToken>,
    pub probability_bars: Vec<TokenProbabilityBar>,
    pub particles: Vec<FlowParticle>,
}

impl Scene {
    /// Build the initial entity set. Everything starts fully transparent
    /// and inactive; randomized fields (bar heights, attention strengths
    /// and targets) come from the injected `rng`.
    pub fn build<R: Rng>(config: &ModelConfig, layout: &Layout, rng: &mut R) -> Self {
        let mut scene = Scene::default();

        for text in tokenize(INPUT_PROMPT) {
            scene.input_tokens.push(InputToken {
                text,
                x: 0.0,
                y: 0.0,
                opacity: 0.0,
                activated: false,
            });
        }

        for i in 0..config.visible_layers() {
            let heads = (0..config.visible_heads())
                .map(|h| AttentionHead {
                    index: h,
                    x: 0.0,
                    y: 0.0,
                    radius: HEAD_RADIUS,
                    opacity: 0.0,
                    activated: false,
                })
                .collect();
            scene.layers.push(Layer {
                index: i,
                x: 0.0,
                y: 0.0,
                width: LAYER_WIDTH,
                height: LAYER_HEIGHT,
                opacity: 0.0,
                heads,
                ffn: LayerPart::default(),
                normalization: LayerPart::default(),
            });
        }

        for line in GENERATED_CODE {
            scene.output_tokens.push(OutputToken {
                text: line.to_string(),
                x: 0.0,
                y: 0.0,
                opacity: 0.0,
                activated: false,
                generating: false,
            });
        }

        for i in 0..PROBABILITY_BAR_COUNT {
            let height = rng.gen_range(10.0..90.0);
            let highlighted = i == HIGHLIGHTED_BAR_INDEX;
            scene.probability_bars.push(TokenProbabilityBar {
                x: 0.0,
                y: 0.0,
                width: BAR_WIDTH,
                height,
                max_height: height,
                opacity: 0.0,
                highlighted,
                text: if highlighted {
                    SAMPLED_TOKEN_TEXT.to_string()
                } else {
                    String::new()
                },
            });
        }

        scene.attention_patterns = build_attention_patterns(
            config.visible_layers(),
            config.visible_heads(),
            scene.input_tokens.len(),
            rng,
        );

        scene.assign_positions(layout);
        scene
    }

    /// Derive every entity's coordinates from the layout.
    ///
    /// Called at build time and again from the resize handler; it touches
    /// geometry only, so opacities, flags, bar heights and embedding
    /// values survive a resize. Idempotent for equal layouts.
    pub fn assign_positions(&mut self, layout: &Layout) {
        for (i, token) in self.input_tokens.iter_mut().enumerate() {
            token.x = layout.input_x;
            token.y = layout.content_y + INPUT_TOKEN_SPACING * i as f64;
        }

        for embedding in &mut self.embeddings {
            if let Some(token) = self.input_tokens.get(embedding.token_index) {
                embedding.x = token.x + EMBEDDING_OFFSET_X;
                embedding.y = token.y;
            }
        }

        let spacing = layout.content_height / (self.layers.len() as f64 + 1.0);
        for layer in &mut self.layers {
            layer.x = layout.layers_x;
            layer.y = layout.content_y + spacing * (layer.index as f64 + 1.0);
            let (lx, ly) = (layer.x, layer.y);
            let head_count = layer.heads.len() as f64;
            for head in &mut layer.heads {
                let angle = (head.index as f64 / head_count) * std::f64::consts::PI
                    - std::f64::consts::FRAC_PI_2;
                head.x = lx + angle.cos() * HEAD_ARC_RADIUS;
                head.y = ly + angle.sin() * HEAD_ARC_RADIUS / 2.0;
            }
        }

        for (i, token) in self.output_tokens.iter_mut().enumerate() {
            token.x = layout.output_x;
            token.y = layout.content_y + OUTPUT_TOKEN_SPACING * i as f64;
        }

        let chart_width = PROBABILITY_BAR_COUNT as f64 * BAR_SPACING;
        let start_x = layout.output_x - chart_width / 2.0;
        for (i, bar) in self.probability_bars.iter_mut().enumerate() {
            bar.x = start_x + i as f64 * BAR_SPACING;
            bar.y = layout.footer_y;
        }
    }

    /// Whether an embedding already exists for the given token index.
    pub fn has_embedding(&self, token_index: usize) -> bool {
        self.embeddings.iter().any(|e| e.token_index == token_index)
    }

    /// Create the embedding panel for a token that has become visible.
    pub fn create_embedding<R: Rng>(&mut self, token_index: usize, rng: &mut R) {
        let Some(token) = self.input_tokens.get(token_index) else {
            return;
        };
        self.embeddings.push(Embedding {
            token_index,
            x: token.x + EMBEDDING_OFFSET_X,
            y: token.y,
            width: EMBEDDING_WIDTH,
            height: EMBEDDING_HEIGHT,
            opacity: 0.0,
            values: (0..EMBEDDING_VALUE_COUNT)
                .map(|_| rng.gen_range(-0.8..0.8))
                .collect(),
        });
    }
}

/// Generate the attention edges for every layer and head.
///
/// The rule bucket depends on layer depth: the first layer attends
/// locally, the second alternates between key-position and windowed
/// heads, and deeper layers attend globally but sparsely.
fn build_attention_patterns<R: Rng>(
    visible_layers: usize,
    visible_heads: usize,
    token_count: usize,
    rng: &mut R,
) -> Vec<AttentionPattern> {
    let mut patterns = Vec::new();
    if token_count == 0 {
        return patterns;
    }

    for layer in 0..visible_layers {
        for head in 0..visible_heads {
            match layer {
                0 => {
                    // Local window: self plus immediate neighbors
                    for t in 0..token_count {
                        patterns.push(pattern(layer, head, t, t, rng.gen_range(0.7..1.0)));
                        if t > 0 {
                            patterns.push(pattern(layer, head, t, t - 1, rng.gen_range(0.4..0.7)));
                        }
                        if t + 1 < token_count {
                            patterns.push(pattern(layer, head, t, t + 1, rng.gen_range(0.4..0.7)));
                        }
                    }
                }
                1 => {
                    if head % 2 == 0 {
                        // Even heads pin every token to the key positions
                        for t in 0..token_count {
                            for key in [0, 2, 4] {
                                if key < token_count {
                                    patterns.push(pattern(
                                        layer,
                                        head,
                                        t,
                                        key,
                                        rng.gen_range(0.5..1.0),
                                    ));
                                }
                            }
                        }
                    } else {
                        // Odd heads cover a window of two positions each way
                        for t in 0..token_count {
                            for t2 in 0..token_count {
                                if t.abs_diff(t2) <= 2 {
                                    patterns.push(pattern(
                                        layer,
                                        head,
                                        t,
                                        t2,
                                        rng.gen_range(0.3..0.7),
                                    ));
                                }
                            }
                        }
                    }
                }
                _ => {
                    // Global sparse: self plus a few random targets,
                    // without replacement
                    for t in 0..token_count {
                        let want = rng.gen_range(2..5).min(token_count);
                        let mut targets = vec![t];
                        while targets.len() < want {
                            let candidate = rng.gen_range(0..token_count);
                            if !targets.contains(&candidate) {
                                targets.push(candidate);
                            }
                        }
                        for to in targets {
                            patterns.push(pattern(layer, head, t, to, rng.gen_range(0.3..1.0)));
                        }
                    }
                }
            }
        }
    }

    patterns
}

fn pattern(
    layer_index: usize,
    head_index: usize,
    from_token: usize,
    to_token: usize,
    strength: f64,
) -> AttentionPattern {
    AttentionPattern {
        layer_index,
        head_index,
        from_token,
        to_token,
        strength,
        opacity: 0.0,
        active: false,
    }
}
