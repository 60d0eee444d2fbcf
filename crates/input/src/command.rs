use glam::Vec3;

/// A high-level character command that any input device can produce.
///
/// The frame loop consumes the resulting transform, never raw input events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacterCommand {
    /// Move by a delta in the character's local frame (-Z is forward).
    Move(Vec3),
    /// Turn about the vertical axis, in radians. Positive turns left.
    Turn(f32),
    /// Jump straight to a world position.
    Teleport(Vec3),
    /// Unbound input.
    Noop,
}

impl CharacterCommand {
    /// Forward walk of `distance` units.
    pub fn forward(distance: f32) -> Self {
        CharacterCommand::Move(Vec3::new(0.0, 0.0, -distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_moves_along_negative_z() {
        assert_eq!(
            CharacterCommand::forward(2.0),
            CharacterCommand::Move(Vec3::new(0.0, 0.0, -2.0))
        );
    }

    #[test]
    fn noop_is_distinct() {
        assert_ne!(CharacterCommand::Noop, CharacterCommand::Turn(0.0));
    }
}
