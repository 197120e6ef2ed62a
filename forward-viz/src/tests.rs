//! Native tests for the DOM-free parts of the app crate. Everything that
//! touches web-sys is exercised in the browser instead.

use simulation::driver::phase_name;

use crate::panels::{
    component_info_html, fmt_speed_label, format_status, PHASE_BUTTON_LABELS, PHASE_DESCRIPTIONS,
};
use crate::render::rgba;

#[test]
fn test_rgba_full_opacity() {
    assert_eq!(rgba((70, 130, 210), 255.0), "rgba(70, 130, 210, 1.000)");
}

#[test]
fn test_rgba_zero_opacity() {
    assert_eq!(rgba((21, 26, 37), 0.0), "rgba(21, 26, 37, 0.000)");
}

#[test]
fn test_rgba_partial_opacity() {
    assert_eq!(rgba((160, 210, 255), 127.5), "rgba(160, 210, 255, 0.500)");
}

#[test]
fn test_rgba_clamps_out_of_range_alpha() {
    assert_eq!(rgba((255, 200, 100), 400.0), "rgba(255, 200, 100, 1.000)");
    assert_eq!(rgba((255, 200, 100), -40.0), "rgba(255, 200, 100, 0.000)");
}

#[test]
fn test_phase_descriptions_cover_all_phases() {
    assert_eq!(PHASE_DESCRIPTIONS.len(), 7);
    for description in PHASE_DESCRIPTIONS {
        assert!(!description.is_empty());
    }
    assert!(PHASE_DESCRIPTIONS[1].contains("tokens"));
    assert!(PHASE_DESCRIPTIONS[3].contains("attention mechanism"));
    assert!(PHASE_DESCRIPTIONS[6].contains("autoregressive"));
}

#[test]
fn test_phase_button_labels_are_numbered() {
    assert_eq!(PHASE_BUTTON_LABELS.len(), 7);
    for (i, label) in PHASE_BUTTON_LABELS.iter().enumerate() {
        assert!(label.starts_with(&format!("{}.", i + 1)));
        assert!(!phase_name(i).is_empty());
    }
}

#[test]
fn test_component_info_tracks_phase_bands() {
    assert!(component_info_html(0).contains("Transformer Architecture"));
    assert!(component_info_html(1).contains("Embeddings"));
    for phase in 2..=6 {
        assert_eq!(component_info_html(phase), component_info_html(2));
        assert!(component_info_html(phase).contains("Key Components"));
        assert!(component_info_html(phase).contains("Attention Heads"));
    }
}

#[test]
fn test_speed_label_format() {
    assert_eq!(fmt_speed_label(1.0), "Animation Speed: 1.0x");
    assert_eq!(fmt_speed_label(0.2), "Animation Speed: 0.2x");
    assert_eq!(fmt_speed_label(2.0), "Animation Speed: 2.0x");
}

#[test]
fn test_status_line_format() {
    let running = format_status(3, 0.416, 1.5, false, 12);
    assert_eq!(running, "phase 3/6 | clock 0.42 | speed 1.5x | 12 particles | running");

    let paused = format_status(6, 0.0, 0.2, true, 0);
    assert!(paused.ends_with("paused"));
    assert!(paused.starts_with("phase 6/6"));
}
