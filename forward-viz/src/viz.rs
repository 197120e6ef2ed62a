//! Canvas bootstrap, shared state and the requestAnimationFrame loop.

use std::cell::RefCell;
use std::rc::Rc;

use rand::thread_rng;
use simulation::{Controls, Layout, ModelConfig, Scene, Simulation};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement};

use crate::panels;
use crate::render;

/// Id of the host element the canvas mounts into; falls back to `<body>`.
const CONTAINER_ID: &str = "viz-container";
const CANVAS_ID: &str = "forward-canvas";
const RESIZE_DEBOUNCE_MS: i32 = 150;

/// Everything the app mutates at runtime.
pub(crate) struct AppState {
    pub config: ModelConfig,
    pub layout: Layout,
    pub sim: Simulation,
    pub controls: Controls,
    pub show_attention_maps: bool,
    pub advanced_mode: bool,
}

impl AppState {
    fn new(width: f64, height: f64) -> Self {
        let config = ModelConfig::default();
        let layout = Layout::compute(width, height);
        let scene = Scene::build(&config, &layout, &mut thread_rng());
        Self {
            config,
            layout,
            sim: Simulation::new(scene),
            controls: Controls::default(),
            show_attention_maps: false,
            advanced_mode: false,
        }
    }
}

// Global state (needed for WASM callbacks)
thread_local! {
    static STATE: RefCell<Option<AppState>> = const { RefCell::new(None) };
    static CANVAS: RefCell<Option<HtmlCanvasElement>> = const { RefCell::new(None) };
    static CTX: RefCell<Option<CanvasRenderingContext2d>> = const { RefCell::new(None) };
    // Pending timeout id while a resize burst is being debounced
    static DEBOUNCE_HANDLE: RefCell<Option<i32>> = const { RefCell::new(None) };
    // Most recent frame error, surfaced in the status line
    static LAST_FRAME_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub fn init() -> Result<(), JsValue> {
    log("Initializing forward-pass visualization");

    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;

    let canvas = create_canvas(&document)?;
    let ctx = match get_context(&canvas) {
        Ok(ctx) => ctx,
        Err(e) => {
            // Without a 2d context there is nothing to animate; leave a
            // readable notice instead of failing the module load.
            log(&format!("2d context unavailable: {:?}", e));
            show_unavailable_notice(&document)?;
            return Ok(());
        }
    };

    let state = AppState::new(canvas.width() as f64, canvas.height() as f64);
    log(&format!(
        "Scene ready: {} input tokens, {} layers ({} in model), {} attention edges",
        state.sim.scene.input_tokens.len(),
        state.sim.scene.layers.len(),
        state.config.num_layers,
        state.sim.scene.attention_patterns.len()
    ));

    panels::create_panels(&document)?;
    panels::refresh_phase_panels(&document, state.controls.clamped_phase());

    CANVAS.with(|c| *c.borrow_mut() = Some(canvas));
    CTX.with(|c| *c.borrow_mut() = Some(ctx));
    STATE.with(|s| *s.borrow_mut() = Some(state));

    setup_resize_handler(&window)?;
    start_animation_loop()?;

    log("Animation loop running");
    Ok(())
}

/// Borrow the app state immutably; `None` before init completes.
pub(crate) fn with_state<T>(f: impl FnOnce(&AppState) -> T) -> Option<T> {
    STATE.with(|s| s.borrow().as_ref().map(f))
}

/// Borrow the app state mutably; `None` before init completes.
pub(crate) fn with_state_mut<T>(f: impl FnOnce(&mut AppState) -> T) -> Option<T> {
    STATE.with(|s| s.borrow_mut().as_mut().map(f))
}

/// Most recent frame error, if any frame has failed to draw.
pub(crate) fn last_frame_error() -> Option<String> {
    LAST_FRAME_ERROR.with(|e| e.borrow().clone())
}

fn create_canvas(document: &Document) -> Result<HtmlCanvasElement, JsValue> {
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_id(CANVAS_ID);

    let (width, height) = container_size(document);
    canvas.set_width(width as u32);
    canvas.set_height(height as u32);

    let style = canvas.style();
    style.set_property("display", "block")?;
    style.set_property("background-color", render::BACKGROUND_CSS)?;

    match container(document) {
        Some(host) => host.append_child(&canvas)?,
        None => document.body().ok_or("No body")?.append_child(&canvas)?,
    };

    Ok(canvas)
}

fn container(document: &Document) -> Option<HtmlElement> {
    document
        .get_element_by_id(CONTAINER_ID)
        .and_then(|e| e.dyn_into::<HtmlElement>().ok())
}

/// Canvas dimensions from the host element, with a sane floor when the
/// element is missing or collapsed.
fn container_size(document: &Document) -> (f64, f64) {
    let (width, height) = match container(document) {
        Some(host) => (host.offset_width(), host.offset_height()),
        None => (0, 0),
    };
    let width = if width > 0 {
        width as f64
    } else {
        simulation::layout::DEFAULT_WIDTH
    };
    let height = if height > 0 {
        height as f64
    } else {
        simulation::layout::DEFAULT_HEIGHT
    };
    (width, height)
}

fn get_context(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    let obj = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("No 2d context"))?;
    obj.dyn_into()
        .map_err(|e: js_sys::Object| JsValue::from(e))
}

fn show_unavailable_notice(document: &Document) -> Result<(), JsValue> {
    let notice: HtmlElement = document.create_element("div")?.dyn_into()?;
    notice.set_inner_text("Canvas 2d rendering is not available in this browser.");
    notice.set_attribute(
        "style",
        "padding: 24px; font-family: monospace; font-size: 14px; color: #dce6f0;",
    )?;
    match container(document) {
        Some(host) => host.append_child(&notice)?,
        None => document.body().ok_or("No body")?.append_child(&notice)?,
    };
    Ok(())
}

fn setup_resize_handler(window: &web_sys::Window) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move || {
        schedule_resize();
    }) as Box<dyn Fn()>);
    window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn cancel_pending_resize() {
    DEBOUNCE_HANDLE.with(|h| {
        if let Some(id) = h.borrow_mut().take() {
            if let Some(window) = web_sys::window() {
                window.clear_timeout_with_handle(id);
            }
        }
    });
}

/// Collapse a burst of resize events into one relayout.
fn schedule_resize() {
    cancel_pending_resize();

    let Some(window) = web_sys::window() else {
        return;
    };

    let closure = Closure::once(Box::new(move || {
        DEBOUNCE_HANDLE.with(|h| *h.borrow_mut() = None);
        apply_resize();
    }) as Box<dyn FnOnce()>);

    match window.set_timeout_with_callback_and_timeout_and_arguments_0(
        closure.as_ref().unchecked_ref(),
        RESIZE_DEBOUNCE_MS,
    ) {
        Ok(id) => DEBOUNCE_HANDLE.with(|h| *h.borrow_mut() = Some(id)),
        Err(e) => log(&format!("Failed to schedule resize: {:?}", e)),
    }
    closure.forget();
}

/// Re-measure the host, resize the canvas and move every entity to its
/// slot in the new layout. Animation state is left untouched.
fn apply_resize() {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let (width, height) = container_size(&document);

    CANVAS.with(|c| {
        if let Some(canvas) = c.borrow().as_ref() {
            canvas.set_width(width as u32);
            canvas.set_height(height as u32);
        }
    });

    with_state_mut(|state| {
        state.layout = Layout::compute(width, height);
        state.sim.scene.assign_positions(&state.layout);
    });

    log(&format!("Resized to {}x{}", width as u32, height as u32));
}

fn start_animation_loop() -> Result<(), JsValue> {
    let f = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
    let g = f.clone();

    *g.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if tick() {
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                let phase = with_state(|s| s.controls.clamped_phase()).unwrap_or(0);
                panels::refresh_phase_panels(&document, phase);
            }
        }
        render_frame();
        request_animation_frame(f.borrow().as_ref().unwrap());
    }) as Box<dyn FnMut()>));

    request_animation_frame(g.borrow().as_ref().unwrap());
    Ok(())
}

/// Advance the simulation one frame. Returns true when the phase changed,
/// either by auto-advance or because a panel callback moved it.
fn tick() -> bool {
    let advanced = with_state_mut(|state| {
        let controls = state.controls;
        match state.sim.tick(&controls, &mut thread_rng()) {
            Some(advance) => {
                state.controls.phase = advance.next_phase as i32;
                log(&format!(
                    "Phase advance: {} -> {}",
                    advance.current_phase, advance.next_phase
                ));
                true
            }
            None => false,
        }
    });
    advanced.unwrap_or(false)
}

/// Draw one frame. A failure here is logged and the loop keeps going, so a
/// single bad frame never kills the animation.
fn render_frame() {
    CTX.with(|ctx_cell| {
        STATE.with(|state_cell| {
            let ctx_ref = ctx_cell.borrow();
            let state_ref = state_cell.borrow();
            if let (Some(ctx), Some(state)) = (ctx_ref.as_ref(), state_ref.as_ref()) {
                if let Err(e) = render::render_scene(
                    ctx,
                    &state.sim.scene,
                    &state.layout,
                    &state.config,
                    state.controls.clamped_phase(),
                    state.sim.frame_count,
                    state.advanced_mode,
                ) {
                    log(&format!("Frame render error: {:?}", e));
                    LAST_FRAME_ERROR.with(|cell| *cell.borrow_mut() = Some(format!("{:?}", e)));
                }
            }
        });
    });
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        panels::refresh_status_line(&document);
    }
}

fn request_animation_frame(f: &Closure<dyn FnMut()>) {
    web_sys::window()
        .unwrap()
        .request_animation_frame(f.as_ref().unchecked_ref())
        .unwrap();
}

pub(crate) fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}
