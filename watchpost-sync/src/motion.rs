//! Motion source seam.
//!
//! The real sensor is outside this system's scope; the production stub is a
//! random boolean, matching the hardware-free deployment the agent ships with.

use std::collections::VecDeque;

/// A source of motion samples, polled once per recording cycle.
pub trait MotionSource {
    /// Whether motion was detected since the last sample.
    fn sample(&mut self) -> bool;
}

/// Random-boolean stand-in for the motion sensor.
#[derive(Debug, Default)]
pub struct RandomMotion;

impl MotionSource for RandomMotion {
    fn sample(&mut self) -> bool {
        rand::random::<bool>()
    }
}

/// Deterministic source for tests: yields the scripted samples in order and
/// `false` once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedMotion {
    script: VecDeque<bool>,
}

impl ScriptedMotion {
    pub fn new(samples: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: samples.into_iter().collect(),
        }
    }
}

impl MotionSource for ScriptedMotion {
    fn sample(&mut self) -> bool {
        self.script.pop_front().unwrap_or(false)
    }
}
