//! HTML panels around the canvas: phase info on the left, controls on the
//! right, plus the attention-map overlay and a one-line status readout.

use simulation::driver::phase_name;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, HtmlInputElement};

use crate::render;
use crate::viz;

const INFO_PANEL_ID: &str = "info-panel";
const PHASE_NAME_ID: &str = "phase-name";
const PHASE_DESCRIPTION_ID: &str = "phase-description";
const COMPONENT_INFO_ID: &str = "component-info";
const PLAY_BTN_ID: &str = "play-btn";
const PREV_BTN_ID: &str = "prev-btn";
const NEXT_BTN_ID: &str = "next-btn";
const SPEED_LABEL_ID: &str = "speed-label";
const ATTENTION_BTN_ID: &str = "attention-btn";
const ADVANCED_BTN_ID: &str = "advanced-btn";
const PHASE_BTN_PREFIX: &str = "phase-btn-";
const OVERLAY_ID: &str = "attention-overlay";
const OVERLAY_CANVAS_ID: &str = "attention-canvas";
const STATUS_LINE_ID: &str = "status-line";

const OVERLAY_CANVAS_WIDTH: u32 = 280;
const OVERLAY_CANVAS_HEIGHT: u32 = 170;

const BUTTON_STYLE: &str = "padding: 8px 12px; background: rgba(37, 99, 235, 0.2); \
    color: #dbeafe; border: 1px solid rgba(37, 99, 235, 0.5); border-radius: 4px; \
    font-size: 13px; font-family: monospace; cursor: pointer;";

const PHASE_BUTTON_STYLE: &str = "padding: 6px 4px; background: rgba(37, 99, 235, 0.2); \
    color: #dbeafe; border: 1px solid rgba(37, 99, 235, 0.3); border-radius: 4px; \
    font-size: 11px; font-family: monospace; cursor: pointer; flex: 1 1 45%;";

const PHASE_BUTTON_ACTIVE_STYLE: &str = "padding: 6px 4px; background: rgba(37, 99, 235, 0.4); \
    color: #ffffff; border: 1px solid rgba(37, 99, 235, 0.3); border-radius: 4px; \
    font-size: 11px; font-family: monospace; cursor: pointer; flex: 1 1 45%; \
    box-shadow: 0 0 8px rgba(80, 140, 255, 0.6);";

/// Labels for the phase jump buttons, one per phase.
pub(crate) const PHASE_BUTTON_LABELS: [&str; 7] = [
    "1. Init",
    "2. Tokens",
    "3. Layers",
    "4. Attention",
    "5. Output",
    "6. Projection",
    "7. Generation",
];

/// One explainer paragraph per phase, shown in the info panel.
pub(crate) const PHASE_DESCRIPTIONS: [&str; 7] = [
    "Setting up the model architecture with transformer layers, attention heads, \
     feed-forward networks, and normalization components. The diagram shows a simplified \
     version of the full architecture, which contains 24 transformer layers with 16 \
     attention heads each.",
    "Converting input text into tokens (atomic units of text) and creating embedding \
     vectors - high-dimensional numerical representations that capture semantic meaning. \
     Each token is transformed into a vector of size 4096, which allows the model to \
     understand and process language. Positional encodings are also added to give the \
     model awareness of token order.",
    "Processing tokens through multiple transformer layers, which are the core \
     computational blocks of LLMs. Each layer builds increasingly abstract and \
     context-aware representations of the input. The model shown has 24 layers, \
     progressively refining the understanding of the text context.",
    "Focusing on the attention mechanism, which allows the model to weigh the importance \
     of different tokens when processing each token. Multi-head attention allows the \
     model to attend to different patterns simultaneously, capturing various linguistic \
     and semantic relationships.",
    "Generating token probabilities for the next word, calculated based on the processed \
     information from transformer layers. The model computes probabilities across its \
     entire vocabulary (typically 50,000+ tokens) based on the context provided.",
    "Projecting and sampling from output probabilities to select the most appropriate \
     next token. This involves converting the final layer's hidden states back to \
     vocabulary space and selecting the most likely token (or sampling based on a \
     temperature parameter).",
    "Creating the complete response through an autoregressive process. Each generated \
     token becomes part of the context for producing the next token, in a recursive \
     process that continues until a stopping condition is met.",
];

/// Build every panel and wire its callbacks. Runs once at init, before the
/// animation loop starts.
pub(crate) fn create_panels(document: &Document) -> Result<(), JsValue> {
    create_info_panel(document)?;
    create_control_panel(document)?;
    create_attention_overlay(document)?;
    create_status_line(document)?;
    Ok(())
}

fn create_info_panel(document: &Document) -> Result<(), JsValue> {
    let panel: HtmlElement = document.create_element("div")?.dyn_into()?;
    panel.set_id(INFO_PANEL_ID);
    panel.set_attribute(
        "style",
        "position: absolute; top: 0; left: 0; width: 20%; height: 100%; \
         padding: 16px; box-sizing: border-box; overflow-y: auto; \
         background: rgba(21, 26, 37, 0.9); border-right: 1px solid rgba(60, 100, 170, 0.3); \
         font-family: monospace; font-size: 12px; line-height: 1.5; color: #dce6f0; z-index: 10;",
    )?;

    let name: HtmlElement = document.create_element("div")?.dyn_into()?;
    name.set_id(PHASE_NAME_ID);
    name.set_attribute(
        "style",
        "font-weight: bold; margin-bottom: 8px; color: #ffffff; font-size: 14px;",
    )?;
    panel.append_child(&name)?;

    let description: HtmlElement = document.create_element("div")?.dyn_into()?;
    description.set_id(PHASE_DESCRIPTION_ID);
    description.set_attribute("style", "margin-bottom: 16px; font-size: 11px; color: #d0d8e4;")?;
    panel.append_child(&description)?;

    let component_info: HtmlElement = document.create_element("div")?.dyn_into()?;
    component_info.set_id(COMPONENT_INFO_ID);
    panel.append_child(&component_info)?;

    document.body().ok_or("No body")?.append_child(&panel)?;
    Ok(())
}

fn create_control_panel(document: &Document) -> Result<(), JsValue> {
    let panel: HtmlElement = document.create_element("div")?.dyn_into()?;
    panel.set_id("control-panel");
    panel.set_attribute(
        "style",
        "position: absolute; top: 0; right: 0; width: 20%; height: 100%; \
         padding: 16px; box-sizing: border-box; overflow-y: auto; \
         display: flex; flex-direction: column; gap: 10px; \
         background: rgba(21, 26, 37, 0.9); border-left: 1px solid rgba(60, 100, 170, 0.3); \
         font-family: monospace; color: #dce6f0; z-index: 10;",
    )?;

    let heading: HtmlElement = document.create_element("h3")?.dyn_into()?;
    heading.set_inner_text("Controls");
    heading.set_attribute(
        "style",
        "margin: 0 0 4px 0; font-size: 14px; color: #dbeafe; font-family: monospace;",
    )?;
    panel.append_child(&heading)?;

    let playback_row = create_row(document)?;
    let play_btn = create_button(document, PLAY_BTN_ID, "⏸️ Pause")?;
    wire_click(&play_btn, || {
        if let Some(document) = current_document() {
            toggle_pause(&document);
        }
    });
    playback_row.append_child(&play_btn)?;

    let restart_btn = create_button(document, "restart-btn", "🔄 Restart")?;
    wire_click(&restart_btn, || {
        if let Some(document) = current_document() {
            jump_to_phase(&document, 0);
        }
    });
    playback_row.append_child(&restart_btn)?;
    panel.append_child(&playback_row)?;

    let step_row = create_row(document)?;
    let prev_btn = create_button(document, PREV_BTN_ID, "◀ Previous Phase")?;
    wire_click(&prev_btn, || {
        if let Some(document) = current_document() {
            step_phase(&document, -1);
        }
    });
    step_row.append_child(&prev_btn)?;

    let next_btn = create_button(document, NEXT_BTN_ID, "Next Phase ▶")?;
    wire_click(&next_btn, || {
        if let Some(document) = current_document() {
            step_phase(&document, 1);
        }
    });
    step_row.append_child(&next_btn)?;
    panel.append_child(&step_row)?;

    panel.append_child(&create_speed_control(document)?.into())?;

    let toggle_row = create_row(document)?;
    let attention_btn = create_button(document, ATTENTION_BTN_ID, "Show Attention Maps")?;
    wire_click(&attention_btn, || {
        if let Some(document) = current_document() {
            toggle_attention_maps(&document);
        }
    });
    toggle_row.append_child(&attention_btn)?;

    let advanced_btn = create_button(document, ADVANCED_BTN_ID, "Advanced Mode")?;
    wire_click(&advanced_btn, || {
        if let Some(document) = current_document() {
            toggle_advanced_mode(&document);
        }
    });
    toggle_row.append_child(&advanced_btn)?;
    panel.append_child(&toggle_row)?;

    panel.append_child(&create_phase_jump_grid(document)?.into())?;

    document.body().ok_or("No body")?.append_child(&panel)?;
    Ok(())
}

fn create_speed_control(document: &Document) -> Result<HtmlElement, JsValue> {
    let block: HtmlElement = document.create_element("div")?.dyn_into()?;
    block.set_attribute("style", "margin-top: 8px;")?;

    let label: HtmlElement = document.create_element("div")?.dyn_into()?;
    label.set_id(SPEED_LABEL_ID);
    label.set_inner_text(&fmt_speed_label(1.0));
    label.set_attribute("style", "font-size: 11px; color: #dbeafe; margin-bottom: 6px;")?;
    block.append_child(&label)?;

    let slider: HtmlInputElement = document.create_element("input")?.dyn_into()?;
    slider.set_type("range");
    slider.set_min("0.2");
    slider.set_max("2");
    slider.set_step("0.1");
    slider.set_value("1");
    slider.set_attribute("style", "width: 100%;")?;

    let slider_ref = slider.clone();
    let closure = Closure::wrap(Box::new(move || {
        if let Some(document) = current_document() {
            apply_speed(&document, &slider_ref.value());
        }
    }) as Box<dyn Fn()>);
    slider.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref())?;
    closure.forget();

    block.append_child(&slider)?;
    Ok(block)
}

fn create_phase_jump_grid(document: &Document) -> Result<HtmlElement, JsValue> {
    let block: HtmlElement = document.create_element("div")?.dyn_into()?;
    block.set_attribute(
        "style",
        "margin-top: 16px; padding-top: 12px; border-top: 1px solid rgba(100, 136, 255, 0.3);",
    )?;

    let caption: HtmlElement = document.create_element("div")?.dyn_into()?;
    caption.set_inner_text("Jump to Phase:");
    caption.set_attribute("style", "font-size: 11px; color: #dbeafe; margin-bottom: 8px;")?;
    block.append_child(&caption)?;

    let grid: HtmlElement = document.create_element("div")?.dyn_into()?;
    grid.set_attribute("style", "display: flex; flex-wrap: wrap; gap: 6px;")?;
    for (i, label) in PHASE_BUTTON_LABELS.iter().enumerate() {
        let btn = create_button(document, &format!("{}{}", PHASE_BTN_PREFIX, i), label)?;
        btn.set_attribute("style", PHASE_BUTTON_STYLE)?;
        let phase = i as i32;
        wire_click(&btn, move || {
            if let Some(document) = current_document() {
                jump_to_phase(&document, phase);
            }
        });
        grid.append_child(&btn)?;
    }
    block.append_child(&grid)?;
    Ok(block)
}

fn create_attention_overlay(document: &Document) -> Result<(), JsValue> {
    let overlay: HtmlElement = document.create_element("div")?.dyn_into()?;
    overlay.set_id(OVERLAY_ID);
    overlay.set_attribute(
        "style",
        "position: absolute; bottom: 20px; left: 21%; padding: 8px; display: none; \
         background: rgba(21, 26, 37, 0.9); border: 1px solid rgba(60, 100, 170, 0.3); \
         border-radius: 4px; z-index: 10;",
    )?;

    let title: HtmlElement = document.create_element("div")?.dyn_into()?;
    title.set_inner_text("Attention Patterns");
    title.set_attribute(
        "style",
        "text-align: center; font-family: monospace; font-size: 12px; \
         color: #a0c8ff; margin-bottom: 6px;",
    )?;
    overlay.append_child(&title)?;

    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_id(OVERLAY_CANVAS_ID);
    canvas.set_width(OVERLAY_CANVAS_WIDTH);
    canvas.set_height(OVERLAY_CANVAS_HEIGHT);
    overlay.append_child(&canvas)?;

    document.body().ok_or("No body")?.append_child(&overlay)?;
    Ok(())
}

fn create_status_line(document: &Document) -> Result<(), JsValue> {
    let line: HtmlElement = document.create_element("div")?.dyn_into()?;
    line.set_id(STATUS_LINE_ID);
    line.set_attribute(
        "style",
        "position: fixed; bottom: 8px; right: 21%; font-family: monospace; \
         font-size: 11px; color: #8ca0b4; z-index: 20;",
    )?;
    document.body().ok_or("No body")?.append_child(&line)?;
    Ok(())
}

fn create_row(document: &Document) -> Result<HtmlElement, JsValue> {
    let row: HtmlElement = document.create_element("div")?.dyn_into()?;
    row.set_attribute("style", "display: flex; gap: 8px;")?;
    Ok(row)
}

fn create_button(document: &Document, id: &str, label: &str) -> Result<HtmlElement, JsValue> {
    let btn: HtmlElement = document.create_element("button")?.dyn_into()?;
    btn.set_id(id);
    btn.set_inner_text(label);
    btn.set_attribute("style", BUTTON_STYLE)?;
    Ok(btn)
}

fn wire_click(btn: &HtmlElement, handler: impl Fn() + 'static) {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn Fn()>);
    btn.set_onclick(Some(closure.as_ref().unchecked_ref()));
    closure.forget();
}

fn current_document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

fn element(document: &Document, id: &str) -> Option<HtmlElement> {
    document
        .get_element_by_id(id)
        .and_then(|e| e.dyn_into::<HtmlElement>().ok())
}

fn toggle_pause(document: &Document) {
    if let Some(paused) = viz::with_state_mut(|state| {
        state.controls.paused = !state.controls.paused;
        state.controls.paused
    }) {
        if let Some(btn) = element(document, PLAY_BTN_ID) {
            btn.set_inner_text(if paused { "▶️ Play" } else { "⏸️ Pause" });
        }
    }
}

fn jump_to_phase(document: &Document, phase: i32) {
    viz::with_state_mut(|state| state.controls.phase = phase.clamp(0, 6));
    refresh_phase_panels(document, phase.clamp(0, 6) as usize);
}

fn step_phase(document: &Document, delta: i32) {
    if let Some(next) = viz::with_state_mut(|state| {
        state.controls.phase = (state.controls.phase + delta).clamp(0, 6);
        state.controls.phase
    }) {
        refresh_phase_panels(document, next as usize);
    }
}

fn apply_speed(document: &Document, raw: &str) {
    let Ok(speed) = raw.parse::<f64>() else {
        return;
    };
    viz::with_state_mut(|state| state.controls.speed = speed);
    if let Some(label) = element(document, SPEED_LABEL_ID) {
        label.set_inner_text(&fmt_speed_label(speed));
    }
}

fn toggle_attention_maps(document: &Document) {
    let Some(visible) = viz::with_state_mut(|state| {
        state.show_attention_maps = !state.show_attention_maps;
        state.show_attention_maps
    }) else {
        return;
    };

    set_toggle_active(document, ATTENTION_BTN_ID, visible);
    if let Some(overlay) = element(document, OVERLAY_ID) {
        let _ = overlay
            .style()
            .set_property("display", if visible { "block" } else { "none" });
    }
    if visible {
        draw_overlay_grid(document);
    }
}

fn toggle_advanced_mode(document: &Document) {
    if let Some(advanced) = viz::with_state_mut(|state| {
        state.advanced_mode = !state.advanced_mode;
        state.advanced_mode
    }) {
        set_toggle_active(document, ADVANCED_BTN_ID, advanced);
    }
}

fn set_toggle_active(document: &Document, id: &str, active: bool) {
    if let Some(btn) = element(document, id) {
        let style = btn.style();
        if active {
            let _ = style.set_property("background", "rgba(37, 99, 235, 0.4)");
            let _ = style.set_property("color", "#ffffff");
            let _ = style.set_property("box-shadow", "0 0 10px rgba(80, 120, 200, 0.6)");
        } else {
            let _ = style.set_property("background", "rgba(37, 99, 235, 0.2)");
            let _ = style.set_property("color", "#dbeafe");
            let _ = style.remove_property("box-shadow");
        }
    }
}

/// Edge strengths are fixed at scene build, so the overlay grid only needs
/// repainting when it becomes visible.
fn draw_overlay_grid(document: &Document) {
    let Some(canvas) = document
        .get_element_by_id(OVERLAY_CANVAS_ID)
        .and_then(|e| e.dyn_into::<HtmlCanvasElement>().ok())
    else {
        return;
    };
    let Ok(Some(obj)) = canvas.get_context("2d") else {
        return;
    };
    let Ok(ctx) = obj.dyn_into::<CanvasRenderingContext2d>() else {
        return;
    };
    viz::with_state(|state| {
        render::draw_attention_overlay(
            &ctx,
            &state.sim.scene,
            canvas.width() as f64,
            canvas.height() as f64,
        );
    });
}

/// Sync every phase-dependent panel element to `phase`.
pub(crate) fn refresh_phase_panels(document: &Document, phase: usize) {
    let phase = phase.min(6);

    if let Some(name) = element(document, PHASE_NAME_ID) {
        name.set_inner_text(&format!("Phase: {}", phase_name(phase)));
    }
    if let Some(description) = element(document, PHASE_DESCRIPTION_ID) {
        description.set_inner_text(PHASE_DESCRIPTIONS[phase]);
    }
    if let Some(info) = element(document, COMPONENT_INFO_ID) {
        info.set_inner_html(component_info_html(phase));
    }

    for i in 0..PHASE_BUTTON_LABELS.len() {
        if let Some(btn) = element(document, &format!("{}{}", PHASE_BTN_PREFIX, i)) {
            let style = if i == phase {
                PHASE_BUTTON_ACTIVE_STYLE
            } else {
                PHASE_BUTTON_STYLE
            };
            let _ = btn.set_attribute("style", style);
        }
    }

    set_enabled(document, PREV_BTN_ID, phase > 0);
    set_enabled(document, NEXT_BTN_ID, phase < 6);
}

fn set_enabled(document: &Document, id: &str, enabled: bool) {
    if let Some(btn) = element(document, id) {
        if enabled {
            let _ = btn.remove_attribute("disabled");
            let _ = btn.style().set_property("opacity", "1");
        } else {
            let _ = btn.set_attribute("disabled", "");
            let _ = btn.style().set_property("opacity", "0.5");
        }
    }
}

/// Update the status readout; called every frame.
pub(crate) fn refresh_status_line(document: &Document) {
    let Some(mut text) = viz::with_state(|state| {
        format_status(
            state.controls.clamped_phase(),
            state.sim.clock,
            state.controls.speed,
            state.controls.paused,
            state.sim.scene.particles.len(),
        )
    }) else {
        return;
    };
    if let Some(err) = viz::last_frame_error() {
        text.push_str(&format!(" | last error: {}", err));
    }
    if let Some(line) = element(document, STATUS_LINE_ID) {
        line.set_text_content(Some(&text));
    }
}

pub(crate) fn fmt_speed_label(speed: f64) -> String {
    format!("Animation Speed: {:.1}x", speed)
}

pub(crate) fn format_status(
    phase: usize,
    clock: f64,
    speed: f64,
    paused: bool,
    particles: usize,
) -> String {
    let run_state = if paused { "paused" } else { "running" };
    format!(
        "phase {}/6 | clock {:.2} | speed {:.1}x | {} particles | {}",
        phase, clock, speed, particles, run_state
    )
}

/// Extra context box under the phase description. Three variants: one for
/// initialization, one for embedding, one for every later phase.
pub(crate) fn component_info_html(phase: usize) -> &'static str {
    match phase {
        0 => concat!(
            "<div style=\"background: rgba(40, 50, 71, 0.44); \
             border-left: 2px solid rgba(80, 140, 240, 0.8); border-radius: 4px; \
             padding: 10px; margin-top: 10px; font-size: 11px;\">",
            "<div style=\"font-weight: bold; margin-bottom: 4px; color: #a0c8ff;\">\
             Transformer Architecture</div>",
            "<p style=\"margin: 4px 0;\">The visualization shows a simplified \
             transformer architecture. In reality, large language models can have \
             billions of parameters across dozens of layers.</p>",
            "</div>"
        ),
        1 => concat!(
            "<div style=\"background: rgba(40, 50, 71, 0.44); \
             border-left: 2px solid rgba(80, 140, 240, 0.8); border-radius: 4px; \
             padding: 10px; margin-top: 10px; font-size: 11px;\">",
            "<div style=\"font-weight: bold; margin-bottom: 4px; color: #a0c8ff;\">\
             Embeddings</div>",
            "<p style=\"margin: 4px 0;\">Token embeddings convert words into \
             high-dimensional vectors that capture semantic meaning. These vectors allow \
             the model to process language mathematically.</p>",
            "</div>"
        ),
        _ => concat!(
            "<div style=\"background: rgba(40, 50, 71, 0.44); \
             border-left: 2px solid rgba(80, 140, 240, 0.8); border-radius: 4px; \
             padding: 10px; margin-top: 10px; font-size: 11px;\">",
            "<div style=\"font-weight: bold; margin-bottom: 4px; color: #a0c8ff;\">\
             Key Components</div>",
            "<p style=\"margin: 4px 0;\"><span style=\"color: #a0c8ff;\">Attention \
             Heads:</span> Calculate relevance between tokens</p>",
            "<p style=\"margin: 4px 0;\"><span style=\"color: #a0c8ff;\">Feed-Forward \
             Networks:</span> Process token representations</p>",
            "<p style=\"margin: 4px 0;\"><span style=\"color: #a0c8ff;\">Layer \
             Normalization:</span> Stabilizes training</p>",
            "</div>"
        ),
    }
}
