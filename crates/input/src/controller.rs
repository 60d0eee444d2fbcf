use std::collections::VecDeque;

use glam::{Mat4, Quat, Vec3};

use crate::command::CharacterCommand;

/// Where the frame loop is running. Only touch platforms have an on-screen
/// controller to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    Desktop,
    Touch,
}

/// What the frame loop reads from input each frame.
pub trait InputSource {
    /// Current rigid transform of the character.
    fn character_transform(&self) -> Mat4;

    fn platform(&self) -> Platform;

    /// Poll the secondary on-screen controller. Called once per frame, last.
    fn poll_controller(&mut self);
}

/// A character driven by [`CharacterCommand`]s.
///
/// On desktop, commands apply as they arrive. On touch, they queue until the
/// controller is polled.
#[derive(Debug, Clone)]
pub struct CharacterController {
    position: Vec3,
    yaw: f32,
    platform: Platform,
    pending: VecDeque<CharacterCommand>,
    polls: u64,
}

impl CharacterController {
    pub fn new(position: Vec3, platform: Platform) -> Self {
        Self {
            position,
            yaw: 0.0,
            platform,
            pending: VecDeque::new(),
            polls: 0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Commands waiting for the next poll.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of times the controller has been polled.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn send(&mut self, command: CharacterCommand) {
        match self.platform {
            Platform::Desktop => self.apply(command),
            Platform::Touch => self.pending.push_back(command),
        }
    }

    fn apply(&mut self, command: CharacterCommand) {
        match command {
            CharacterCommand::Move(local) => {
                if local.is_finite() {
                    self.position += self.rotation() * local;
                } else {
                    tracing::warn!(?local, "dropping non-finite move");
                }
            }
            CharacterCommand::Turn(radians) => {
                if radians.is_finite() {
                    self.yaw = (self.yaw + radians).rem_euclid(std::f32::consts::TAU);
                }
            }
            CharacterCommand::Teleport(target) => {
                if target.is_finite() {
                    tracing::debug!(?target, "character teleported");
                    self.position = target;
                }
            }
            CharacterCommand::Noop => {}
        }
    }
}

impl InputSource for CharacterController {
    fn character_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation(), self.position)
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn poll_controller(&mut self) {
        self.polls += 1;
        while let Some(command) = self.pending.pop_front() {
            self.apply(command);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn desktop_applies_immediately() {
        let mut c = CharacterController::new(Vec3::ZERO, Platform::Desktop);
        c.send(CharacterCommand::forward(3.0));
        assert!(close(c.position(), Vec3::new(0.0, 0.0, -3.0)));
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn touch_queues_until_polled() {
        let mut c = CharacterController::new(Vec3::ZERO, Platform::Touch);
        c.send(CharacterCommand::forward(1.0));
        c.send(CharacterCommand::Teleport(Vec3::new(5.0, 0.0, 5.0)));
        assert_eq!(c.position(), Vec3::ZERO);
        assert_eq!(c.pending(), 2);

        c.poll_controller();
        assert_eq!(c.position(), Vec3::new(5.0, 0.0, 5.0));
        assert_eq!(c.polls(), 1);
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn moves_follow_heading() {
        let mut c = CharacterController::new(Vec3::ZERO, Platform::Desktop);
        c.send(CharacterCommand::Turn(std::f32::consts::FRAC_PI_2));
        c.send(CharacterCommand::forward(2.0));
        // A quarter turn left faces -X.
        assert!(close(c.position(), Vec3::new(-2.0, 0.0, 0.0)));
    }

    #[test]
    fn transform_carries_position_and_heading() {
        let mut c = CharacterController::new(Vec3::new(1.0, 2.0, 3.0), Platform::Desktop);
        c.send(CharacterCommand::Turn(0.5));
        let m = c.character_transform();
        assert!(close(m.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0)));
        let forward = m.transform_vector3(Vec3::NEG_Z);
        assert!(close(forward, c.rotation() * Vec3::NEG_Z));
    }

    #[test]
    fn non_finite_commands_are_dropped() {
        let mut c = CharacterController::new(Vec3::ONE, Platform::Desktop);
        c.send(CharacterCommand::Move(Vec3::splat(f32::NAN)));
        c.send(CharacterCommand::Teleport(Vec3::splat(f32::INFINITY)));
        c.send(CharacterCommand::Turn(f32::NAN));
        assert_eq!(c.position(), Vec3::ONE);
        assert_eq!(c.yaw(), 0.0);
    }
}
