//! Per-frame phase driver: clock, easing rules, phase behaviors,
//! particle lifecycle, and the auto-advance signal.

use rand::Rng;

use crate::ease_toward;
use crate::entities::{FlowParticle, Rgb, OPACITY_MAX};
use crate::scene::Scene;

/// Simulated seconds per frame at the nominal 60 fps
pub const FRAME_DT: f64 = 0.016;
/// Phase-local clock threshold that triggers an advance request
pub const PHASE_DURATION: f64 = 1.0;
/// Number of phases in the forward pass
pub const PHASE_COUNT: usize = 7;
/// Allowed animation speed multiplier range
pub const MIN_SPEED: f64 = 0.2;
pub const MAX_SPEED: f64 = 2.0;

/// Opacity above which a token counts as visible: embeddings appear and
/// particles may depart from it
pub const REVEAL_THRESHOLD: f64 = 200.0;
/// Opacity above which a generating output line counts as fully typed
const GENERATED_THRESHOLD: f64 = 230.0;

/// Seconds between sequential input-token reveals in the tokenization
/// phase
const TOKEN_REVEAL_INTERVAL: f64 = 0.5;
/// Seconds between output lines in the generation phase
const GENERATION_INTERVAL: f64 = 1.0;

// Easing rates per entity category
const LAYER_FADE_RATE: f64 = 0.05;
const PATTERN_FADE_RATE: f64 = 0.05;
const TOKEN_FADE_RATE: f64 = 0.1;
const BAR_FADE_RATE: f64 = 0.1;

// Particle tints: token-to-layer flow reuses the input-token blue,
// projection sparks reuse the highlight amber
const FLOW_TINT: Rgb = (70, 130, 210);
const PROJECTION_TINT: Rgb = (255, 200, 100);

/// External inputs owned by the surrounding UI, read fresh every tick.
#[derive(Debug, Clone, Copy)]
pub struct Controls {
    /// Active phase; values outside 0..=6 are clamped
    pub phase: i32,
    pub paused: bool,
    /// Animation speed multiplier; non-finite values fall back to 1.0
    pub speed: f64,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            phase: 0,
            paused: false,
            speed: 1.0,
        }
    }
}

impl Controls {
    /// Phase clamped into the valid range
    pub fn clamped_phase(&self) -> usize {
        self.phase.clamp(0, PHASE_COUNT as i32 - 1) as usize
    }

    /// Speed multiplier with bad input replaced and the range enforced
    pub fn sanitized_speed(&self) -> f64 {
        if !self.speed.is_finite() {
            return 1.0;
        }
        self.speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

/// Request to move to the next phase, returned from a tick.
///
/// The driver never changes the phase itself; whoever owns the phase
/// state decides whether to apply this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseAdvance {
    pub current_phase: usize,
    pub next_phase: usize,
}

/// Display name of a phase, indexed 0..=6.
pub fn phase_name(phase: usize) -> &'static str {
    match phase {
        0 => "Initialization",
        1 => "Tokenization & Embedding",
        2 => "Processing Through Layers",
        3 => "Attention Mechanism",
        4 => "Output Probabilities",
        5 => "Token Projection",
        _ => "Text Generation",
    }
}

/// The simulation context: the scene plus every animation counter.
///
/// Mutated exclusively through [`Simulation::tick`]; the renderer only
/// ever reads it.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub scene: Scene,
    /// Phase-local clock in simulated seconds, reset on phase change and
    /// on auto-advance
    pub clock: f64,
    /// Frames elapsed while unpaused, drives spawn cadences and pulses
    pub frame_count: u64,
    /// Input tokens revealed so far by the tokenization phase
    pub revealed_tokens: usize,
    /// Output lines started so far by the generation phase
    pub generation_index: usize,
    last_phase: usize,
}

impl Simulation {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            clock: 0.0,
            frame_count: 0,
            revealed_tokens: 0,
            generation_index: 0,
            last_phase: 0,
        }
    }

    /// Advance the simulation by one frame.
    ///
    /// Order within a tick: clock, common visibility rules, advance
    /// check, phase-specific behavior, particle motion. Returns the
    /// advance request when the phase-local clock crosses its threshold.
    pub fn tick<R: Rng>(&mut self, controls: &Controls, rng: &mut R) -> Option<PhaseAdvance> {
        let phase = controls.clamped_phase();
        let speed = controls.sanitized_speed();

        self.observe_phase(phase);

        if !controls.paused {
            self.clock += FRAME_DT * speed;
            self.frame_count += 1;
        }

        self.apply_common_rules(phase, rng);

        let mut advance = None;
        if !controls.paused && phase < PHASE_COUNT - 1 && self.clock > PHASE_DURATION {
            self.clock = 0.0;
            advance = Some(PhaseAdvance {
                current_phase: phase,
                next_phase: phase + 1,
            });
        }

        if !controls.paused {
            self.apply_phase_rules(phase, speed, rng);
            self.update_particles(speed);
        }

        advance
    }

    /// Reset counters when the externally owned phase changes.
    fn observe_phase(&mut self, phase: usize) {
        if phase == self.last_phase {
            return;
        }
        self.clock = 0.0;
        if phase == 1 {
            self.revealed_tokens = 0;
        }
        if phase == 6 {
            self.generation_index = 0;
        }
        self.last_phase = phase;
    }

    /// Phase-independent fades. These run even while paused, so elements
    /// mid-fade settle instead of freezing half-lit.
    fn apply_common_rules<R: Rng>(&mut self, phase: usize, rng: &mut R) {
        for layer in &mut self.scene.layers {
            layer.opacity = ease_toward(layer.opacity, OPACITY_MAX, LAYER_FADE_RATE);
        }

        if phase >= 1 {
            for token in &mut self.scene.input_tokens {
                token.activated = true;
                token.opacity = ease_toward(token.opacity, OPACITY_MAX, TOKEN_FADE_RATE);
            }

            let pending: Vec<usize> = (0..self.scene.input_tokens.len())
                .filter(|&i| {
                    self.scene.input_tokens[i].opacity > REVEAL_THRESHOLD
                        && !self.scene.has_embedding(i)
                })
                .collect();
            for token_index in pending {
                self.scene.create_embedding(token_index, rng);
            }

            for embedding in &mut self.scene.embeddings {
                embedding.opacity = ease_toward(embedding.opacity, OPACITY_MAX, TOKEN_FADE_RATE);
            }
        }

        if phase >= 3 {
            for pattern in &mut self.scene.attention_patterns {
                pattern.active = true;
                pattern.opacity = ease_toward(
                    pattern.opacity,
                    OPACITY_MAX * pattern.strength,
                    PATTERN_FADE_RATE,
                );
            }
        }

        if phase >= 4 {
            for bar in &mut self.scene.probability_bars {
                bar.opacity = ease_toward(bar.opacity, OPACITY_MAX, BAR_FADE_RATE);
            }
        }
    }

    fn apply_phase_rules<R: Rng>(&mut self, phase: usize, speed: f64, rng: &mut R) {
        match phase {
            1 => self.reveal_next_token(),
            2 => {
                self.cascade_layers();
                if self.frame_count % spawn_interval(30.0, speed) == 0 {
                    self.spawn_flow_particle(rng);
                }
            }
            4 => {
                self.pulse_next_token_preview();
                let bar_visible = self
                    .scene
                    .probability_bars
                    .iter()
                    .find(|b| b.highlighted)
                    .is_some_and(|b| b.opacity > REVEAL_THRESHOLD);
                if bar_visible && self.frame_count % spawn_interval(40.0, speed) == 0 {
                    self.spawn_projection_particle();
                }
            }
            5 => {
                if let Some(bar) = self
                    .scene
                    .probability_bars
                    .iter_mut()
                    .find(|b| b.highlighted)
                {
                    bar.height = ease_toward(bar.height, bar.max_height * 1.5, BAR_FADE_RATE);
                }
                if self.clock > 0.5 && self.frame_count % 20 == 0 {
                    self.spawn_projection_particle();
                }
            }
            6 => self.generate_output_tokens(),
            // Phases 0 and 3 add nothing beyond the common rules
            _ => {}
        }
    }

    /// Sequential token reveal for the tokenization phase.
    fn reveal_next_token(&mut self) {
        if self.clock > self.revealed_tokens as f64 * TOKEN_REVEAL_INTERVAL
            && self.revealed_tokens < self.scene.input_tokens.len()
        {
            self.scene.input_tokens[self.revealed_tokens].activated = true;
            self.revealed_tokens += 1;
        }
    }

    /// Bottom-up activation sweep across the layer stack. Each layer's
    /// normalization, feed-forward and heads light up at staggered points
    /// of its local progress.
    fn cascade_layers(&mut self) {
        let cascade = self.clock * self.scene.layers.len() as f64 * 1.2;
        for layer in &mut self.scene.layers {
            let progress = cascade - layer.index as f64;
            if progress <= 0.0 {
                continue;
            }

            if progress > 0.5 {
                layer.normalization.opacity =
                    ((progress - 0.5) * 4.0 * OPACITY_MAX).min(OPACITY_MAX);
                layer.normalization.activated = true;
            }
            if progress > 0.75 {
                layer.ffn.opacity = ((progress - 0.75) * 4.0 * OPACITY_MAX).min(OPACITY_MAX);
                layer.ffn.activated = true;
            }

            for head in &mut layer.heads {
                let head_progress = progress - 0.1 - head.index as f64 * 0.05;
                if head_progress > 0.0 {
                    head.opacity = (head_progress * 6.0 * OPACITY_MAX).min(OPACITY_MAX);
                    head.activated = true;
                }
            }
        }
    }

    /// Sine pulse on the first output line while probabilities settle.
    fn pulse_next_token_preview(&mut self) {
        if let Some(first) = self.scene.output_tokens.first_mut() {
            first.opacity =
                (100.0 + (self.frame_count as f64 * 0.1).sin() * 50.0).min(OPACITY_MAX);
        }
    }

    /// Reveal output lines one by one; a revealed line types itself in
    /// and flips to activated once fully visible.
    fn generate_output_tokens(&mut self) {
        if self.clock > self.generation_index as f64 * GENERATION_INTERVAL
            && self.generation_index < self.scene.output_tokens.len()
        {
            let token = &mut self.scene.output_tokens[self.generation_index];
            token.generating = true;
            token.opacity = 100.0;
            self.generation_index += 1;
        }

        for token in &mut self.scene.output_tokens {
            if token.generating {
                token.opacity = ease_toward(token.opacity, OPACITY_MAX, TOKEN_FADE_RATE);
                if token.opacity > GENERATED_THRESHOLD {
                    token.activated = true;
                    token.generating = false;
                }
            }
        }
    }

    /// Spawn a particle from a random visible input token to a random
    /// layer block.
    fn spawn_flow_particle<R: Rng>(&mut self, rng: &mut R) {
        if self.scene.input_tokens.is_empty() || self.scene.layers.is_empty() {
            return;
        }
        let token = &self.scene.input_tokens[rng.gen_range(0..self.scene.input_tokens.len())];
        if token.opacity < REVEAL_THRESHOLD {
            return;
        }
        let layer = &self.scene.layers[rng.gen_range(0..self.scene.layers.len())];

        self.scene.particles.push(FlowParticle {
            x: token.x,
            y: token.y,
            target_x: layer.x,
            target_y: layer.y,
            progress: 0.0,
            speed: rng.gen_range(0.02..0.04),
            color: FLOW_TINT,
            size: 5.0,
        });
    }

    /// Spawn a particle from the highlighted probability bar's top toward
    /// the output line currently being generated.
    fn spawn_projection_particle(&mut self) {
        let Some(bar) = self.scene.probability_bars.iter().find(|b| b.highlighted) else {
            return;
        };
        if self.scene.output_tokens.is_empty() {
            return;
        }
        let target_index = self
            .generation_index
            .min(self.scene.output_tokens.len() - 1);
        let target = &self.scene.output_tokens[target_index];

        self.scene.particles.push(FlowParticle {
            x: bar.x,
            y: bar.y - bar.height,
            target_x: target.x,
            target_y: target.y,
            progress: 0.0,
            speed: 0.03,
            color: PROJECTION_TINT,
            size: 6.0,
        });
    }

    /// Advance particle travel and drop the ones that arrived.
    fn update_particles(&mut self, speed: f64) {
        for particle in &mut self.scene.particles {
            particle.progress += particle.speed * speed;
        }
        self.scene.particles.retain(|p| p.progress < 1.0);
    }
}

/// Frames between particle spawns at the given base cadence; faster
/// animation spawns more often.
fn spawn_interval(base_frames: f64, speed: f64) -> u64 {
    ((base_frames / speed).floor() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::layout::Layout;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_simulation(seed: u64) -> (Simulation, StdRng) {
        let config = ModelConfig::default();
        let layout = Layout::compute(800.0, 600.0);
        let mut rng = StdRng::seed_from_u64(seed);
        let scene = Scene::build(&config, &layout, &mut rng);
        (Simulation::new(scene), rng)
    }

    fn controls(phase: i32) -> Controls {
        Controls {
            phase,
            paused: false,
            speed: 1.0,
        }
    }

    #[test]
    fn test_clock_advances_with_speed() {
        let (mut sim, mut rng) = new_simulation(1);
        let fast = Controls {
            phase: 0,
            paused: false,
            speed: 2.0,
        };
        sim.tick(&fast, &mut rng);
        assert!((sim.clock - 0.032).abs() < 1e-9);
        assert_eq!(sim.frame_count, 1);
    }

    #[test]
    fn test_pause_freezes_clock_and_frames() {
        let (mut sim, mut rng) = new_simulation(2);
        let paused = Controls {
            phase: 2,
            paused: true,
            speed: 1.0,
        };
        for _ in 0..500 {
            let advance = sim.tick(&paused, &mut rng);
            assert!(advance.is_none());
        }
        assert_eq!(sim.clock, 0.0);
        assert_eq!(sim.frame_count, 0);
    }

    #[test]
    fn test_auto_advance_fires_once_and_resets_clock() {
        let (mut sim, mut rng) = new_simulation(3);
        let input = controls(2);

        let mut signals = Vec::new();
        for _ in 0..70 {
            if let Some(advance) = sim.tick(&input, &mut rng) {
                signals.push(advance);
                assert_eq!(sim.clock, 0.0);
            }
        }

        assert_eq!(signals.len(), 1);
        assert_eq!(
            signals[0],
            PhaseAdvance {
                current_phase: 2,
                next_phase: 3
            }
        );
    }

    #[test]
    fn test_no_advance_past_final_phase() {
        let (mut sim, mut rng) = new_simulation(4);
        let input = controls(6);
        for _ in 0..600 {
            assert!(sim.tick(&input, &mut rng).is_none());
        }
        // The clock keeps running in the last phase instead of resetting
        assert!(sim.clock > 9.0);
    }

    #[test]
    fn test_out_of_range_phase_is_clamped() {
        let (mut sim, mut rng) = new_simulation(5);
        // Far beyond the last phase behaves like the last phase
        let input = controls(99);
        for _ in 0..70 {
            assert!(sim.tick(&input, &mut rng).is_none());
        }

        let (mut sim, mut rng) = new_simulation(5);
        let input = controls(-3);
        let mut advanced = None;
        for _ in 0..70 {
            if let Some(a) = sim.tick(&input, &mut rng) {
                advanced = Some(a);
            }
        }
        assert_eq!(
            advanced,
            Some(PhaseAdvance {
                current_phase: 0,
                next_phase: 1
            })
        );
    }

    #[test]
    fn test_speed_sanitized() {
        let bad = Controls {
            phase: 0,
            paused: false,
            speed: f64::NAN,
        };
        assert_eq!(bad.sanitized_speed(), 1.0);

        let huge = Controls {
            phase: 0,
            paused: false,
            speed: 50.0,
        };
        assert_eq!(huge.sanitized_speed(), MAX_SPEED);

        let tiny = Controls {
            phase: 0,
            paused: false,
            speed: 0.01,
        };
        assert_eq!(tiny.sanitized_speed(), MIN_SPEED);
    }

    #[test]
    fn test_layers_fade_in_from_phase_zero() {
        let (mut sim, mut rng) = new_simulation(6);
        let input = controls(0);
        sim.tick(&input, &mut rng);
        let first = sim.scene.layers[0].opacity;
        assert!(first > 0.0);
        sim.tick(&input, &mut rng);
        assert!(sim.scene.layers[0].opacity > first);
        // Input tokens stay dark before the tokenization phase
        assert!(sim.scene.input_tokens.iter().all(|t| t.opacity == 0.0));
    }

    #[test]
    fn test_tokens_reveal_sequentially_in_phase_one() {
        let (mut sim, mut rng) = new_simulation(7);
        let input = controls(1);

        sim.tick(&input, &mut rng);
        assert_eq!(sim.revealed_tokens, 1);

        // Second token waits for the half-second gate
        for _ in 0..29 {
            sim.tick(&input, &mut rng);
        }
        assert_eq!(sim.revealed_tokens, 1);
        for _ in 0..5 {
            sim.tick(&input, &mut rng);
        }
        assert_eq!(sim.revealed_tokens, 2);
    }

    #[test]
    fn test_embeddings_appear_once_per_token() {
        let (mut sim, mut rng) = new_simulation(8);
        let input = controls(1);
        for _ in 0..300 {
            sim.tick(&input, &mut rng);
        }

        let token_count = sim.scene.input_tokens.len();
        assert_eq!(sim.scene.embeddings.len(), token_count);

        let mut indices: Vec<_> = sim.scene.embeddings.iter().map(|e| e.token_index).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), token_count);
    }

    #[test]
    fn test_embedding_waits_for_token_visibility() {
        let (mut sim, mut rng) = new_simulation(9);
        let input = controls(1);
        sim.tick(&input, &mut rng);
        // One tick of fading is nowhere near the reveal threshold
        assert!(sim.scene.embeddings.is_empty());
    }

    #[test]
    fn test_layer_cascade_orders_subelements() {
        let (mut sim, mut rng) = new_simulation(10);
        let input = controls(2);

        // First tick: local progress ~0.12, only the earliest head is on
        sim.tick(&input, &mut rng);
        let first = &sim.scene.layers[0];
        assert!(first.heads[0].activated);
        assert!(!first.normalization.activated);
        assert!(!first.ffn.activated);

        // Local progress ~0.69: normalization on, feed-forward not yet
        for _ in 0..5 {
            sim.tick(&input, &mut rng);
        }
        let first = &sim.scene.layers[0];
        assert!(first.normalization.activated);
        assert!(!first.ffn.activated);

        // Local progress ~0.81: feed-forward joins
        sim.tick(&input, &mut rng);
        let first = &sim.scene.layers[0];
        assert!(first.ffn.activated);

        // The last layer has not started yet
        let last = sim.scene.layers.last().unwrap();
        assert!(!last.normalization.activated);
        assert!(last.heads.iter().all(|h| !h.activated));
    }

    #[test]
    fn test_particle_lifecycle() {
        let (mut sim, mut rng) = new_simulation(11);
        sim.scene.particles.push(FlowParticle {
            x: 0.0,
            y: 0.0,
            target_x: 100.0,
            target_y: 100.0,
            progress: 0.0,
            speed: 0.25,
            color: (70, 130, 210),
            size: 5.0,
        });

        let input = controls(0);
        let mut seen_ticks = 0;
        while !sim.scene.particles.is_empty() {
            sim.tick(&input, &mut rng);
            for p in &sim.scene.particles {
                assert!(p.progress < 1.0);
            }
            seen_ticks += 1;
            assert!(seen_ticks <= 4, "particle outlived its travel time");
        }
        assert_eq!(seen_ticks, 4);
    }

    #[test]
    fn test_particles_frozen_while_paused() {
        let (mut sim, mut rng) = new_simulation(12);
        sim.scene.particles.push(FlowParticle {
            x: 0.0,
            y: 0.0,
            target_x: 100.0,
            target_y: 100.0,
            progress: 0.5,
            speed: 0.1,
            color: (70, 130, 210),
            size: 5.0,
        });
        let paused = Controls {
            phase: 2,
            paused: true,
            speed: 1.0,
        };
        for _ in 0..50 {
            sim.tick(&paused, &mut rng);
        }
        assert_eq!(sim.scene.particles.len(), 1);
        assert_eq!(sim.scene.particles[0].progress, 0.5);
    }

    #[test]
    fn test_pulse_keeps_preview_opacity_bounded() {
        let (mut sim, mut rng) = new_simulation(13);
        let input = controls(4);
        for _ in 0..200 {
            sim.tick(&input, &mut rng);
            let preview = sim.scene.output_tokens[0].opacity;
            assert!((0.0..=OPACITY_MAX).contains(&preview));
        }
    }

    #[test]
    fn test_projection_grows_highlighted_bar() {
        let (mut sim, mut rng) = new_simulation(14);
        let input = controls(5);
        let original = sim
            .scene
            .probability_bars
            .iter()
            .find(|b| b.highlighted)
            .unwrap()
            .max_height;
        for _ in 0..300 {
            sim.tick(&input, &mut rng);
        }
        let bar = sim
            .scene
            .probability_bars
            .iter()
            .find(|b| b.highlighted)
            .unwrap();
        assert!(bar.height > original);
        assert!(bar.height < original * 1.5 + 1e-6);
        assert_eq!(bar.max_height, original);
    }

    #[test]
    fn test_generation_starts_first_line_immediately() {
        let (mut sim, mut rng) = new_simulation(15);
        let input = controls(6);
        sim.tick(&input, &mut rng);
        assert_eq!(sim.generation_index, 1);
        assert!(sim.scene.output_tokens[0].generating);
        // Seeded at 100 and already easing toward full visibility
        assert!(sim.scene.output_tokens[0].opacity >= 100.0);
        assert!(sim.scene.output_tokens[0].opacity < 130.0);
        assert!(!sim.scene.output_tokens[1].generating);
    }

    #[test]
    fn test_generated_line_settles_activated() {
        let (mut sim, mut rng) = new_simulation(16);
        let input = controls(6);
        for _ in 0..60 {
            sim.tick(&input, &mut rng);
        }
        let first = &sim.scene.output_tokens[0];
        assert!(first.activated);
        assert!(!first.generating);
        assert!(first.opacity > GENERATED_THRESHOLD);
    }

    #[test]
    fn test_phase_change_resets_clock() {
        let (mut sim, mut rng) = new_simulation(17);
        for _ in 0..30 {
            sim.tick(&controls(0), &mut rng);
        }
        assert!(sim.clock > 0.4);
        sim.tick(&controls(3), &mut rng);
        // One fresh tick after the reset
        assert!((sim.clock - 0.016).abs() < 1e-9);
    }

    #[test]
    fn test_spawn_interval_scales_with_speed() {
        assert_eq!(spawn_interval(30.0, 1.0), 30);
        assert_eq!(spawn_interval(30.0, 2.0), 15);
        assert_eq!(spawn_interval(30.0, 0.2), 150);
        assert_eq!(spawn_interval(40.0, 1.0), 40);
        // Never zero, whatever the inputs
        assert_eq!(spawn_interval(0.5, 2.0), 1);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(phase_name(0), "Initialization");
        assert_eq!(phase_name(6), "Text Generation");
        assert_eq!(phase_name(3), "Attention Mechanism");
    }
}
