//! Simulation core for the LLM forward-pass animation.
//!
//! Tracks the animated entities (tokens, embeddings, layers, attention
//! patterns, probability bars, flow particles) and advances their visual
//! state one frame at a time. Pure Rust with no browser dependencies so
//! the phase logic is testable natively.

pub mod config;
pub mod driver;
pub mod entities;
pub mod layout;
pub mod scene;

pub use config::ModelConfig;
pub use driver::{Controls, PhaseAdvance, Simulation};
pub use layout::Layout;
pub use scene::Scene;

/// Exponential approach toward a target value.
///
/// This is the easing law behind every fade in the animation: it never
/// overshoots and closes a fixed fraction of the remaining gap per frame,
/// so it approaches the target asymptotically without reaching it exactly.
pub fn ease_toward(value: f64, target: f64, rate: f64) -> f64 {
    value + (target - value) * rate
}

/// Cubic in-out easing over `t` in [0, 1], used for flow-particle motion.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_toward_converges() {
        let mut value = 0.0;
        for _ in 0..200 {
            value = ease_toward(value, 255.0, 0.1);
        }
        // Asymptotic: close to the target but never exactly equal
        assert!(value < 255.0);
        assert!((255.0 - value).abs() < 0.001);
    }

    #[test]
    fn test_ease_toward_never_overshoots() {
        let mut value = 250.0;
        for _ in 0..100 {
            let next = ease_toward(value, 255.0, 0.1);
            assert!(next >= value);
            assert!(next <= 255.0);
            value = next;
        }
    }

    #[test]
    fn test_ease_toward_downward() {
        let mut value = 255.0;
        for _ in 0..100 {
            value = ease_toward(value, 0.0, 0.05);
        }
        assert!(value > 0.0);
        assert!(value < 2.0);
    }

    #[test]
    fn test_ease_in_out_cubic_endpoints() {
        assert!((ease_in_out_cubic(0.0) - 0.0).abs() < 1e-9);
        assert!((ease_in_out_cubic(1.0) - 1.0).abs() < 1e-9);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_ease_in_out_cubic_monotonic() {
        let mut prev = 0.0;
        for i in 1..=100 {
            let t = i as f64 / 100.0;
            let eased = ease_in_out_cubic(t);
            assert!(eased >= prev);
            assert!((0.0..=1.0).contains(&eased));
            prev = eased;
        }
    }

    #[test]
    fn test_ease_in_out_cubic_symmetry() {
        for i in 0..=50 {
            let t = i as f64 / 100.0;
            let a = ease_in_out_cubic(t);
            let b = ease_in_out_cubic(1.0 - t);
            assert!((a + b - 1.0).abs() < 1e-9);
        }
    }
}
