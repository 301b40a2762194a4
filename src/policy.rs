use crate::game::Dir;
use crate::sensor::{BODY_BLOCK, FOOD_BLOCK, HEADING_BLOCK, SensorVector, WALL_BLOCK};
use thiserror::Error;

/// Number of activations a policy must return, one per `Dir`.
pub const POLICY_OUTPUTS: usize = 4;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy expects {expected} inputs, got {got}")]
    InputShape { expected: usize, got: usize },
    #[error("policy failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("policy returned {got} outputs, expected 4")]
    OutputLength { got: usize },
    #[error("policy output {index} is not finite ({value})")]
    NonFinite { index: usize, value: f32 },
}

/// A decision maker mapping a sensor vector to one activation per heading.
///
/// Implementations must not depend on anything but their own state and the
/// input, so that an episode replays exactly for a given seed.
pub trait ControlPolicy {
    fn activate(&self, inputs: &SensorVector) -> Result<Vec<f32>, PolicyError>;
}

impl<P: ControlPolicy + ?Sized> ControlPolicy for &P {
    fn activate(&self, inputs: &SensorVector) -> Result<Vec<f32>, PolicyError> {
        (**self).activate(inputs)
    }
}

impl<P: ControlPolicy + ?Sized> ControlPolicy for Box<P> {
    fn activate(&self, inputs: &SensorVector) -> Result<Vec<f32>, PolicyError> {
        (**self).activate(inputs)
    }
}

/// Adapter turning a closure into a policy.
pub struct FnPolicy<F>(pub F);

impl<F> ControlPolicy for FnPolicy<F>
where
    F: Fn(&SensorVector) -> Result<Vec<f32>, PolicyError>,
{
    fn activate(&self, inputs: &SensorVector) -> Result<Vec<f32>, PolicyError> {
        (self.0)(inputs)
    }
}

/// Argmax over the outputs, first maximum wins.
pub fn select_direction(outputs: &[f32]) -> Result<Dir, SelectError> {
    if outputs.len() != POLICY_OUTPUTS {
        return Err(SelectError::OutputLength { got: outputs.len() });
    }
    let mut best = 0usize;
    for (i, &v) in outputs.iter().enumerate() {
        if !v.is_finite() {
            return Err(SelectError::NonFinite { index: i, value: v });
        }
        if v > outputs[best] {
            best = i;
        }
    }
    Ok(Dir::ALL[best])
}

/// Hand-written baseline: heads for food seen on a cardinal ray, avoids
/// cells that are blocked one step ahead and never asks to reverse.
#[derive(Clone, Copy, Debug)]
pub struct GreedyPolicy {
    unit: f32,
}

impl GreedyPolicy {
    pub fn new(width: u16, height: u16) -> Self {
        Self { unit: 1.0 / f32::from(width.max(height).max(1)) }
    }

    fn blocked(&self, inputs: &SensorVector, ray: usize) -> bool {
        let wall = inputs[WALL_BLOCK + ray];
        let body = inputs[BODY_BLOCK + ray];
        wall < self.unit * 0.5 || (body > 0.0 && body < self.unit * 1.5)
    }
}

impl ControlPolicy for GreedyPolicy {
    fn activate(&self, inputs: &SensorVector) -> Result<Vec<f32>, PolicyError> {
        // Compass index of each heading: N, E, S, W.
        const RAYS: [usize; POLICY_OUTPUTS] = [0, 2, 4, 6];
        let reverse = inputs[HEADING_BLOCK..HEADING_BLOCK + POLICY_OUTPUTS]
            .iter()
            .position(|&v| v > 0.5)
            .map(|heading| (heading + 2) % POLICY_OUTPUTS);
        let out = RAYS
            .iter()
            .enumerate()
            .map(|(i, &ray)| {
                if reverse == Some(i) {
                    return -2.0;
                }
                if self.blocked(inputs, ray) {
                    return -1.0;
                }
                let food = inputs[FOOD_BLOCK + ray];
                let room = inputs[WALL_BLOCK + ray];
                if food > 0.0 { 2.0 - food } else { room }
            })
            .collect();
        Ok(out)
    }
}
