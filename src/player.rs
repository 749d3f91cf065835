use serde::Serialize;

use crate::round::ShelfItem;

/// Savings a fresh player starts with.
pub const STARTING_SAVINGS: i32 = 100;

// ============================================================================
// Player State
// ============================================================================

/// Session-wide player state. Lives from game start until an explicit reset;
/// mutated only through round outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub total_savings: i32,
    /// Every toy ever bought, in purchase order.
    pub trophies: Vec<ShelfItem>,
    pub rounds_played: u32,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            total_savings: STARTING_SAVINGS,
            trophies: Vec::new(),
            rounds_played: 0,
        }
    }

    /// Explicit player-initiated reset after a game over.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ToyDefinition;

    fn trophy(price: i32) -> ShelfItem {
        ShelfItem {
            id: "toy_1_0".to_string(),
            toy: ToyDefinition {
                id: "robot".to_string(),
                icon: "\u{1F916}".to_string(),
                name: "Robot".to_string(),
            },
            price,
        }
    }

    #[test]
    fn test_new_player_defaults() {
        let player = PlayerState::new();
        assert_eq!(player.total_savings, STARTING_SAVINGS);
        assert!(player.trophies.is_empty());
        assert_eq!(player.rounds_played, 0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut player = PlayerState::new();
        player.total_savings = 3;
        player.trophies.push(trophy(7));
        player.rounds_played = 12;

        player.reset();

        assert_eq!(player.total_savings, STARTING_SAVINGS);
        assert!(player.trophies.is_empty());
        assert_eq!(player.rounds_played, 0);
    }
}
