//! Canvas drawing for the scene. Pure functions over simulation state; no
//! globals and no DOM lookups, so everything here is driven by the frame
//! loop in `viz`.

use std::f64::consts::TAU;

use simulation::entities::Rgb;
use simulation::scene::Scene;
use simulation::{Layout, ModelConfig};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

/// Canvas background, also applied to the element style before the first
/// frame paints.
pub(crate) const BACKGROUND_CSS: &str = "#151a25";

const BACKGROUND: Rgb = (21, 26, 37);
const PANEL: Rgb = (30, 40, 60);
const TEXT: Rgb = (220, 230, 240);
const DIM_TEXT: Rgb = (180, 190, 200);
const INPUT_TOKEN: Rgb = (70, 130, 210);
const POSITIONAL: Rgb = (180, 120, 220);
const EMBEDDING_BLOCK: Rgb = (60, 100, 180);
const EMBEDDING_POSITIVE: Rgb = (100, 200, 255);
const EMBEDDING_NEGATIVE: Rgb = (255, 100, 100);
const LAYER_BASE: Rgb = (40, 70, 120);
const LAYER_ACCENT: Rgb = (80, 140, 255);
const ATTENTION_HEAD: Rgb = (120, 180, 255);
const ATTENTION_LINE: Rgb = (160, 210, 255);
const FFN: Rgb = (255, 140, 80);
const NORMALIZATION: Rgb = (220, 220, 100);
const OUTPUT_TOKEN: Rgb = (70, 180, 120);
const OUTPUT_ACCENT: Rgb = (100, 255, 150);
const HIGHLIGHT: Rgb = (255, 200, 100);

/// Attention edges render at a fixed faint alpha; strength feeds line
/// width instead.
const ATTENTION_LINE_ALPHA: f64 = 30.0;

/// CSS color from an RGB triple and an alpha in the 0-255 opacity domain.
pub(crate) fn rgba(color: Rgb, alpha: f64) -> String {
    let a = (alpha / 255.0).clamp(0.0, 1.0);
    format!("rgba({}, {}, {}, {:.3})", color.0, color.1, color.2, a)
}

/// Draw one complete frame in back-to-front order. Flow particles paint
/// last so they pass over everything they travel across.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_scene(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    layout: &Layout,
    config: &ModelConfig,
    phase: usize,
    frame_count: u64,
    advanced: bool,
) -> Result<(), JsValue> {
    ctx.set_fill_style_str(&rgba(BACKGROUND, 255.0));
    ctx.fill_rect(0.0, 0.0, layout.width, layout.height);

    draw_input_tokens(ctx, scene, phase, frame_count, advanced);
    draw_embeddings(ctx, scene, config, advanced);
    draw_layers(ctx, scene, config, advanced);
    draw_attention_patterns(ctx, scene, phase)?;
    draw_output_tokens(ctx, scene, frame_count);
    draw_token_probabilities(ctx, scene, layout, config, phase, advanced);
    draw_phase_indicator(ctx, layout, phase);
    draw_particles(ctx, scene);

    Ok(())
}

fn draw_input_tokens(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    phase: usize,
    frame_count: u64,
    advanced: bool,
) {
    for (i, token) in scene.input_tokens.iter().enumerate() {
        if token.opacity <= 0.0 {
            continue;
        }

        ctx.set_fill_style_str(&rgba(INPUT_TOKEN, token.opacity * 0.8));
        ctx.fill_rect(token.x - 80.0, token.y - 15.0, 160.0, 30.0);

        ctx.set_fill_style_str(&rgba(TEXT, token.opacity));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_font("14px monospace");
        let _ = ctx.fill_text(&token.text, token.x, token.y);

        if advanced && token.opacity > 200.0 {
            ctx.set_fill_style_str(&rgba(DIM_TEXT, token.opacity * 0.7));
            ctx.set_text_baseline("bottom");
            ctx.set_font("10px monospace");
            let _ = ctx.fill_text(&format!("ID: {}", 10000 + i), token.x, token.y - 16.0);
        }

        // Revealed tokens blink a border on a 40-frame cycle
        if token.activated && frame_count % 40 < 20 {
            ctx.set_stroke_style_str(&rgba(INPUT_TOKEN, token.opacity * 0.7));
            ctx.set_line_width(2.0);
            ctx.stroke_rect(token.x - 80.0, token.y - 15.0, 160.0, 30.0);
        }

        // Positional-encoding stripe once tokenization has started
        if phase >= 1 && token.opacity > 200.0 {
            ctx.set_fill_style_str(&rgba(POSITIONAL, token.opacity * 0.7));
            ctx.fill_rect(token.x - 75.0, token.y + 16.0, 25.0, 4.0);

            if advanced {
                ctx.set_fill_style_str(&rgba(POSITIONAL, token.opacity * 0.9));
                ctx.set_text_align("left");
                ctx.set_text_baseline("top");
                ctx.set_font("9px monospace");
                let _ = ctx.fill_text("pos", token.x - 75.0, token.y + 22.0);
            }
        }
    }
}

fn draw_embeddings(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    config: &ModelConfig,
    advanced: bool,
) {
    for embedding in &scene.embeddings {
        if embedding.opacity <= 0.0 {
            continue;
        }

        ctx.set_fill_style_str(&rgba(EMBEDDING_BLOCK, embedding.opacity * 0.6));
        ctx.fill_rect(
            embedding.x - embedding.width / 2.0,
            embedding.y - embedding.height / 2.0,
            embedding.width,
            embedding.height * 6.0,
        );

        // Two columns of eight value bars, up from the panel midline
        for (i, &value) in embedding.values.iter().enumerate() {
            let bar_height = value.abs() * 12.0;
            let bar_x = embedding.x - 30.0 + (i / 8) as f64 * 30.0;
            let bar_y = embedding.y + (i % 8) as f64 * 10.0 - 30.0;
            let tint = if value > 0.0 {
                EMBEDDING_POSITIVE
            } else {
                EMBEDDING_NEGATIVE
            };
            ctx.set_fill_style_str(&rgba(tint, embedding.opacity));
            ctx.fill_rect(bar_x, bar_y, 20.0, bar_height);
        }

        ctx.set_fill_style_str(&rgba(TEXT, embedding.opacity));
        ctx.set_text_align("center");
        ctx.set_text_baseline("bottom");
        ctx.set_font("11px monospace");
        let _ = ctx.fill_text("Embedding", embedding.x, embedding.y - 35.0);

        if advanced {
            ctx.set_fill_style_str(&rgba(DIM_TEXT, embedding.opacity * 0.8));
            ctx.set_text_baseline("top");
            ctx.set_font("9px monospace");
            let _ = ctx.fill_text(
                &format!("d={}", config.hidden_dim),
                embedding.x,
                embedding.y + 35.0,
            );
        }
    }
}

fn draw_layers(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    config: &ModelConfig,
    advanced: bool,
) {
    for layer in &scene.layers {
        if layer.opacity <= 0.0 {
            continue;
        }

        let left = layer.x - layer.width / 2.0;
        let top = layer.y - layer.height / 2.0;

        ctx.set_fill_style_str(&rgba(LAYER_BASE, layer.opacity * 0.7));
        ctx.fill_rect(left, top, layer.width, layer.height);
        ctx.set_stroke_style_str(&rgba(LAYER_ACCENT, layer.opacity * 0.8));
        ctx.set_line_width(2.0);
        ctx.stroke_rect(left, top, layer.width, layer.height);

        ctx.set_fill_style_str(&rgba(TEXT, layer.opacity));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_font("14px monospace");
        let _ = ctx.fill_text(&format!("Layer {}", layer.index + 1), layer.x, layer.y);

        if advanced && layer.index == 0 {
            ctx.set_fill_style_str(&rgba(DIM_TEXT, layer.opacity * 0.8));
            ctx.set_text_align("left");
            ctx.set_text_baseline("top");
            ctx.set_font("10px monospace");
            let _ = ctx.fill_text(
                &format!("{} layers total", config.num_layers),
                left,
                top - 18.0,
            );
        }

        for head in &layer.heads {
            if head.opacity <= 0.0 {
                continue;
            }

            ctx.set_fill_style_str(&rgba(ATTENTION_HEAD, head.opacity * 0.7));
            ctx.begin_path();
            let _ = ctx.arc(head.x, head.y, head.radius, 0.0, TAU);
            ctx.fill();

            if head.activated {
                ctx.set_stroke_style_str(&rgba(ATTENTION_HEAD, head.opacity));
                ctx.set_line_width(2.0);
                ctx.begin_path();
                let _ = ctx.arc(head.x, head.y, head.radius, 0.0, TAU);
                ctx.stroke();
            }

            if advanced && head.opacity > 100.0 {
                ctx.set_fill_style_str(&rgba(TEXT, head.opacity * 0.9));
                ctx.set_text_align("center");
                ctx.set_text_baseline("middle");
                ctx.set_font("8px monospace");
                let _ = ctx.fill_text(&format!("H{}", head.index + 1), head.x, head.y);
            }
        }

        if layer.ffn.activated {
            let ffn_y = layer.y + layer.height / 2.0 + 30.0;

            ctx.set_fill_style_str(&rgba(FFN, layer.ffn.opacity * 0.7));
            ctx.fill_rect(layer.x - 40.0, ffn_y - 10.0, 80.0, 20.0);

            ctx.set_fill_style_str(&rgba(TEXT, layer.ffn.opacity));
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            ctx.set_font("10px monospace");
            let _ = ctx.fill_text("FFN", layer.x, ffn_y);

            if advanced {
                ctx.set_fill_style_str(&rgba(DIM_TEXT, layer.ffn.opacity * 0.8));
                ctx.set_text_align("left");
                ctx.set_text_baseline("bottom");
                ctx.set_font("8px monospace");
                let _ = ctx.fill_text(
                    &format!("dim: {}", config.ffn_dim),
                    layer.x - 35.0,
                    ffn_y - 12.0,
                );
            }
        }

        if layer.normalization.activated {
            let norm_y_above = layer.y - layer.height / 2.0 - 15.0;
            let norm_y_below = layer.y + layer.height / 2.0 + 15.0;

            ctx.set_fill_style_str(&rgba(NORMALIZATION, layer.normalization.opacity * 0.7));
            ctx.fill_rect(layer.x - 30.0, norm_y_above - 3.0, 60.0, 6.0);
            ctx.fill_rect(layer.x - 30.0, norm_y_below - 3.0, 60.0, 6.0);

            if advanced {
                ctx.set_fill_style_str(&rgba(DIM_TEXT, layer.normalization.opacity * 0.8));
                ctx.set_text_align("center");
                ctx.set_text_baseline("bottom");
                ctx.set_font("8px monospace");
                let _ = ctx.fill_text("LN", layer.x, norm_y_above - 5.0);
                let _ = ctx.fill_text("LN", layer.x, norm_y_below - 5.0);
            }
        }
    }
}

fn draw_attention_patterns(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    phase: usize,
) -> Result<(), JsValue> {
    if phase < 3 {
        return Ok(());
    }

    for pattern in &scene.attention_patterns {
        if !pattern.active || pattern.opacity < 10.0 {
            continue;
        }
        let (Some(from), Some(to)) = (
            scene.input_tokens.get(pattern.from_token),
            scene.input_tokens.get(pattern.to_token),
        ) else {
            continue;
        };
        if from.opacity <= 100.0 || to.opacity <= 100.0 {
            continue;
        }

        ctx.set_stroke_style_str(&rgba(ATTENTION_LINE, ATTENTION_LINE_ALPHA));
        ctx.set_line_width(1.0 + pattern.strength * 2.0);
        ctx.begin_path();
        ctx.move_to(from.x, from.y);
        ctx.line_to(to.x, to.y);
        ctx.stroke();

        // Strong edges get an arrowhead at 60% of the way along
        if pattern.strength > 0.7 {
            let tip_x = from.x + (to.x - from.x) * 0.6;
            let tip_y = from.y + (to.y - from.y) * 0.6;
            let angle = (to.y - from.y).atan2(to.x - from.x);

            ctx.save();
            ctx.translate(tip_x, tip_y)?;
            ctx.rotate(angle)?;
            ctx.set_fill_style_str(&rgba(ATTENTION_LINE, ATTENTION_LINE_ALPHA));
            ctx.begin_path();
            ctx.move_to(0.0, 0.0);
            ctx.line_to(-8.0, 4.0);
            ctx.line_to(-8.0, -4.0);
            ctx.close_path();
            ctx.fill();
            ctx.restore();
        }
    }

    Ok(())
}

fn draw_output_tokens(ctx: &CanvasRenderingContext2d, scene: &Scene, frame_count: u64) {
    for token in &scene.output_tokens {
        if token.opacity <= 0.0 {
            continue;
        }

        ctx.set_fill_style_str(&rgba(OUTPUT_TOKEN, token.opacity * 0.8));
        ctx.fill_rect(token.x - 100.0, token.y - 15.0, 200.0, 30.0);

        ctx.set_fill_style_str(&rgba(TEXT, token.opacity));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.set_font("14px monospace");
        let _ = ctx.fill_text(&token.text, token.x, token.y);

        // Typing cursor effect while the line is being generated
        if token.generating && frame_count % 40 < 20 {
            ctx.set_stroke_style_str(&rgba(OUTPUT_ACCENT, token.opacity * 0.9));
            ctx.set_line_width(3.0);
            ctx.stroke_rect(token.x - 100.0, token.y - 15.0, 200.0, 30.0);
        }
    }
}

fn draw_token_probabilities(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    layout: &Layout,
    config: &ModelConfig,
    phase: usize,
    advanced: bool,
) {
    if phase < 4 {
        return;
    }

    ctx.set_fill_style_str(&rgba(TEXT, 200.0));
    ctx.set_text_align("center");
    ctx.set_text_baseline("bottom");
    ctx.set_font("14px monospace");
    let _ = ctx.fill_text(
        "Token Probabilities",
        layout.output_x,
        layout.footer_y - 110.0,
    );

    if advanced {
        ctx.set_fill_style_str(&rgba(DIM_TEXT, 150.0));
        ctx.set_font("10px monospace");
        let _ = ctx.fill_text(
            &format!("Vocabulary size: {}", config.vocab_size),
            layout.output_x,
            layout.footer_y - 90.0,
        );
    }

    for bar in &scene.probability_bars {
        if bar.opacity <= 0.0 {
            continue;
        }

        let tint = if bar.highlighted { HIGHLIGHT } else { OUTPUT_TOKEN };
        ctx.set_fill_style_str(&rgba(tint, bar.opacity * 0.8));
        ctx.fill_rect(bar.x - bar.width / 2.0, bar.y - bar.height, bar.width, bar.height);

        if bar.highlighted {
            ctx.set_stroke_style_str(&rgba(HIGHLIGHT, bar.opacity));
            ctx.set_line_width(2.0);
            ctx.stroke_rect(bar.x - bar.width / 2.0, bar.y - bar.height, bar.width, bar.height);
        }

        if !bar.text.is_empty() && bar.opacity > 100.0 {
            ctx.set_fill_style_str(&rgba(TEXT, bar.opacity));
            ctx.set_text_align("center");
            ctx.set_text_baseline("bottom");
            ctx.set_font("12px monospace");
            let _ = ctx.fill_text(&bar.text, bar.x, bar.y - bar.height - 5.0);
        }
    }
}

fn draw_phase_indicator(ctx: &CanvasRenderingContext2d, layout: &Layout, phase: usize) {
    ctx.set_fill_style_str(&rgba(TEXT, 255.0));
    ctx.set_text_align("center");
    ctx.set_text_baseline("top");
    ctx.set_font("16px monospace");
    let _ = ctx.fill_text("LLM Architecture Visualization", layout.layers_x, 20.0);

    let bar_width = 300.0;
    let bar_height = 6.0;
    let bar_x = layout.layers_x - bar_width / 2.0;
    let bar_y = 50.0;

    ctx.set_fill_style_str(&rgba(PANEL, 150.0));
    ctx.fill_rect(bar_x, bar_y, bar_width, bar_height);

    ctx.set_fill_style_str(&rgba(LAYER_ACCENT, 200.0));
    ctx.fill_rect(bar_x, bar_y, phase as f64 / 6.0 * bar_width, bar_height);

    for i in 0..=6usize {
        let marker_x = bar_x + i as f64 / 6.0 * bar_width;
        let tint = if i <= phase { LAYER_ACCENT } else { DIM_TEXT };
        ctx.set_fill_style_str(&rgba(tint, 200.0));
        ctx.begin_path();
        let _ = ctx.arc(marker_x, bar_y + bar_height / 2.0, 4.0, 0.0, TAU);
        ctx.fill();
    }
}

fn draw_particles(ctx: &CanvasRenderingContext2d, scene: &Scene) {
    for particle in &scene.particles {
        let (x, y) = particle.position();
        ctx.set_fill_style_str(&rgba(particle.color, 200.0));
        ctx.begin_path();
        let _ = ctx.arc(x, y, particle.size / 2.0, 0.0, TAU);
        ctx.fill();
    }
}

/// Heat grid for the attention overlay: mean edge strength between every
/// token pair, aggregated over all layers and heads.
pub(crate) fn draw_attention_overlay(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    width: f64,
    height: f64,
) {
    ctx.set_fill_style_str(&rgba(BACKGROUND, 255.0));
    ctx.fill_rect(0.0, 0.0, width, height);

    let n = scene.input_tokens.len();
    if n == 0 {
        return;
    }

    let mut sums = vec![0.0f64; n * n];
    let mut counts = vec![0u32; n * n];
    for pattern in &scene.attention_patterns {
        if pattern.from_token < n && pattern.to_token < n {
            sums[pattern.from_token * n + pattern.to_token] += pattern.strength;
            counts[pattern.from_token * n + pattern.to_token] += 1;
        }
    }

    let margin = 10.0;
    let cell = ((width - 2.0 * margin) / n as f64).min((height - 2.0 * margin) / n as f64);
    for from in 0..n {
        for to in 0..n {
            let count = counts[from * n + to];
            let mean = if count > 0 {
                sums[from * n + to] / count as f64
            } else {
                0.0
            };
            ctx.set_fill_style_str(&rgba(ATTENTION_HEAD, mean * 255.0));
            ctx.fill_rect(
                margin + to as f64 * cell,
                margin + from as f64 * cell,
                cell - 1.0,
                cell - 1.0,
            );
        }
    }
}
