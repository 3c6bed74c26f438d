//! Fixed-timestep game loop.
//!
//! The host drives the loop by calling [`GameLoop::run_iteration`] once per
//! animation frame with a monotonic timestamp. Each iteration:
//!
//! 1. throttles to `max_fps` (too-early frames are skipped entirely),
//! 2. runs update steps in fixed `1000 / max_fps` sub-steps over the
//!    accumulated time, dropping the backlog after `max_update_steps`,
//! 3. runs draw steps once with the time elapsed since the last drawn frame.
//!
//! Steps receive an explicit context `C` instead of reaching for globals.
//!
//! ```ignore
//! let mut game_loop = GameLoop::new(LoopConfig::default());
//! game_loop.add_update_step(|game: &mut Game, step_ms| game.tick(step_ms));
//! game_loop.add_draw_step(|game: &mut Game, elapsed_ms| { game.draw(elapsed_ms); });
//! game_loop.start();
//! // per host frame
//! game_loop.run_iteration(&mut game, now_ms);
//! ```

use std::fmt;

use tracing::{debug, trace};

use crate::config::LoopConfig;

/// Step callback: context and a duration in milliseconds.
pub type StepFn<C> = Box<dyn FnMut(&mut C, f64)>;

/// What happened during one [`GameLoop::run_iteration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Loop paused; nothing ran.
    Paused,
    /// Frame arrived before the throttle interval elapsed.
    Throttled,
    /// Frame ran.
    Ran {
        update_steps: u32,
        /// Backlog exceeded the sub-step cap and was dropped.
        backlog_dropped: bool,
    },
}

pub struct GameLoop<C> {
    update_steps: Vec<StepFn<C>>,
    draw_steps: Vec<StepFn<C>>,
    config: LoopConfig,
    enabled: bool,
    /// `None` until the first frame after `start`.
    last_frame: Option<f64>,
    accumulated: f64,

    fps: f64,
    frames_this_second: u32,
    last_fps_update: f64,
}

impl<C> GameLoop<C> {
    pub fn new(config: LoopConfig) -> Self {
        Self {
            update_steps: Vec::new(),
            draw_steps: Vec::new(),
            config,
            enabled: false,
            last_frame: None,
            accumulated: 0.0,
            fps: config.max_fps,
            frames_this_second: 0,
            last_fps_update: 0.0,
        }
    }

    pub fn add_update_step(&mut self, step: impl FnMut(&mut C, f64) + 'static) {
        self.update_steps.push(Box::new(step));
    }

    pub fn add_draw_step(&mut self, step: impl FnMut(&mut C, f64) + 'static) {
        self.draw_steps.push(Box::new(step));
    }

    /// Enable the loop. The next iteration becomes the timing baseline.
    pub fn start(&mut self) {
        self.pause();
        self.enabled = true;
        self.last_frame = None;
        self.accumulated = 0.0;
        debug!(max_fps = self.config.max_fps, "game loop started");
    }

    pub fn pause(&mut self) {
        if self.enabled {
            debug!("game loop paused");
        }
        self.enabled = false;
    }

    pub fn is_running(&self) -> bool {
        self.enabled
    }

    /// Exponential estimate, refreshed once per second.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn run_iteration(&mut self, ctx: &mut C, timestamp_ms: f64) -> IterationOutcome {
        if !self.enabled {
            return IterationOutcome::Paused;
        }
        let step_ms = self.config.step_ms();

        let Some(last_frame) = self.last_frame else {
            self.last_frame = Some(timestamp_ms);
            self.last_fps_update = timestamp_ms;
            self.track_fps(timestamp_ms);
            self.draw(ctx, 0.0);
            return IterationOutcome::Ran {
                update_steps: 0,
                backlog_dropped: false,
            };
        };

        if timestamp_ms < last_frame + step_ms {
            return IterationOutcome::Throttled;
        }
        self.track_fps(timestamp_ms);

        let elapsed = timestamp_ms - last_frame;
        self.accumulated += elapsed;
        self.last_frame = Some(timestamp_ms);

        let mut update_steps = 0;
        let mut backlog_dropped = false;
        while self.accumulated >= step_ms {
            for step in &mut self.update_steps {
                step(ctx, step_ms);
            }
            self.accumulated -= step_ms;
            update_steps += 1;
            if update_steps >= self.config.max_update_steps {
                debug!(dropped_ms = self.accumulated, "update backlog dropped");
                self.accumulated = 0.0;
                backlog_dropped = true;
                break;
            }
        }

        self.draw(ctx, elapsed);
        trace!(update_steps, elapsed, "frame");
        IterationOutcome::Ran {
            update_steps,
            backlog_dropped,
        }
    }

    fn draw(&mut self, ctx: &mut C, elapsed: f64) {
        for step in &mut self.draw_steps {
            step(ctx, elapsed);
        }
    }

    fn track_fps(&mut self, timestamp_ms: f64) {
        if timestamp_ms > self.last_fps_update + 1000.0 {
            self.fps = 0.25 * f64::from(self.frames_this_second) + 0.75 * self.fps;
            self.last_fps_update = timestamp_ms;
            self.frames_this_second = 0;
        }
        self.frames_this_second += 1;
    }
}

impl<C> fmt::Debug for GameLoop<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameLoop")
            .field("enabled", &self.enabled)
            .field("config", &self.config)
            .field("fps", &self.fps)
            .field("update_steps", &self.update_steps.len())
            .field("draw_steps", &self.draw_steps.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counters {
        updates: Vec<f64>,
        draws: Vec<f64>,
    }

    fn counting_loop(max_fps: f64) -> GameLoop<Counters> {
        let mut game_loop = GameLoop::new(LoopConfig {
            max_fps,
            ..LoopConfig::default()
        });
        game_loop.add_update_step(|c: &mut Counters, step| c.updates.push(step));
        game_loop.add_draw_step(|c: &mut Counters, elapsed| c.draws.push(elapsed));
        game_loop
    }

    #[test]
    fn test_paused_runs_nothing() {
        let mut game_loop = counting_loop(10.0);
        let mut counters = Counters::default();
        assert_eq!(game_loop.run_iteration(&mut counters, 0.0), IterationOutcome::Paused);
        assert!(counters.draws.is_empty());
    }

    #[test]
    fn test_first_frame_is_baseline() {
        let mut game_loop = counting_loop(10.0);
        let mut counters = Counters::default();
        game_loop.start();
        game_loop.run_iteration(&mut counters, 5000.0);
        assert!(counters.updates.is_empty());
        assert_eq!(counters.draws, vec![0.0]);
    }

    #[test]
    fn test_fixed_sub_steps() {
        let mut game_loop = counting_loop(10.0);
        let mut counters = Counters::default();
        game_loop.start();
        game_loop.run_iteration(&mut counters, 0.0);

        // 250 ms at 100 ms per step: two steps, 50 ms carried over
        let outcome = game_loop.run_iteration(&mut counters, 250.0);
        assert_eq!(
            outcome,
            IterationOutcome::Ran {
                update_steps: 2,
                backlog_dropped: false
            }
        );
        assert_eq!(counters.updates, vec![100.0, 100.0]);
        assert_eq!(counters.draws, vec![0.0, 250.0]);

        game_loop.run_iteration(&mut counters, 400.0);
        assert_eq!(counters.updates.len(), 4);
    }

    #[test]
    fn test_throttle() {
        let mut game_loop = counting_loop(10.0);
        let mut counters = Counters::default();
        game_loop.start();
        game_loop.run_iteration(&mut counters, 0.0);
        assert_eq!(
            game_loop.run_iteration(&mut counters, 50.0),
            IterationOutcome::Throttled
        );
        assert_eq!(counters.draws.len(), 1);
    }

    #[test]
    fn test_backlog_dropped_after_cap() {
        let mut game_loop = counting_loop(1000.0);
        let mut counters = Counters::default();
        game_loop.start();
        game_loop.run_iteration(&mut counters, 0.0);

        let outcome = game_loop.run_iteration(&mut counters, 1000.0);
        assert_eq!(
            outcome,
            IterationOutcome::Ran {
                update_steps: 240,
                backlog_dropped: true
            }
        );
        // Dropped backlog does not carry into the next frame
        game_loop.run_iteration(&mut counters, 1001.0);
        assert_eq!(counters.updates.len(), 241);
    }

    #[test]
    fn test_fps_estimate() {
        let mut game_loop = counting_loop(10.0);
        let mut counters = Counters::default();
        game_loop.start();
        for i in 0..=11 {
            game_loop.run_iteration(&mut counters, f64::from(i) * 100.0);
        }
        // Frames 0..=1000 counted, blended into the initial estimate at 1100
        assert_eq!(game_loop.fps(), 0.25 * 11.0 + 0.75 * 10.0);
    }

    #[test]
    fn test_pause_and_restart() {
        let mut game_loop = counting_loop(10.0);
        let mut counters = Counters::default();
        game_loop.start();
        game_loop.run_iteration(&mut counters, 0.0);
        game_loop.pause();
        assert!(!game_loop.is_running());
        game_loop.start();
        game_loop.run_iteration(&mut counters, 10_000.0);
        assert!(counters.updates.is_empty());
    }
}
