//! Reference payload: bodies moving with constant velocity between diffs.

use crate::integrator::{EntityDiff, Integrator};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position and velocity of one body.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyState {
    pub x_pos: f32,
    pub y_pos: f32,
    pub x_vel: f32,
    pub y_vel: f32,
}

impl BodyState {
    pub fn moving(x_vel: f32, y_vel: f32) -> Self {
        Self {
            x_vel,
            y_vel,
            ..Default::default()
        }
    }

    pub fn at(x_pos: f32, y_pos: f32, x_vel: f32, y_vel: f32) -> Self {
        Self {
            x_pos,
            y_pos,
            x_vel,
            y_vel,
        }
    }
}

impl fmt::Debug for BodyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pos: [{}, {}]; vel: [{}, {}]",
            self.x_pos, self.y_pos, self.x_vel, self.y_vel
        )
    }
}

/// One body per participant, indexed by entity slot.
///
/// Missing trailing bodies read as at rest at the origin, so an empty world
/// is the neutral diff.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldState {
    pub bodies: Vec<BodyState>,
}

impl WorldState {
    pub fn new(bodies: Vec<BodyState>) -> Self {
        Self { bodies }
    }

    /// Body in `entity`'s slot; a missing slot reads as at rest.
    pub fn body(&self, entity: usize) -> BodyState {
        self.bodies.get(entity).copied().unwrap_or_default()
    }
}

impl EntityDiff for WorldState {
    /// Update events carry a velocity change.
    fn entity_diff(entity: usize, diff_x: f32, diff_y: f32) -> Self {
        let mut bodies = vec![BodyState::default(); entity + 1];
        bodies[entity] = BodyState::moving(diff_x, diff_y);
        Self { bodies }
    }
}

/// Integrates positions by velocity and adds diffs component-wise.
#[derive(Clone, Copy, Debug, Default)]
pub struct KinematicIntegrator;

impl KinematicIntegrator {
    fn integrate_body(body: &mut BodyState, diff: &BodyState, elapsed: f32) {
        body.x_pos += diff.x_pos + body.x_vel * elapsed;
        body.y_pos += diff.y_pos + body.y_vel * elapsed;
        body.x_vel += diff.x_vel;
        body.y_vel += diff.y_vel;
    }
}

impl Integrator<BodyState> for KinematicIntegrator {
    fn integrate(&self, state: &mut BodyState, diff: &BodyState, elapsed: f32) {
        Self::integrate_body(state, diff, elapsed);
    }
}

impl Integrator<WorldState> for KinematicIntegrator {
    fn integrate(&self, state: &mut WorldState, diff: &WorldState, elapsed: f32) {
        if state.bodies.len() < diff.bodies.len() {
            state.bodies.resize(diff.bodies.len(), BodyState::default());
        }

        let neutral = BodyState::default();
        for (i, body) in state.bodies.iter_mut().enumerate() {
            let diff = diff.bodies.get(i).unwrap_or(&neutral);
            Self::integrate_body(body, diff, elapsed);
        }
    }
}
