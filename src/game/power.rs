//! Power economy: shed load until the ship's power balance is non-negative

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::block::BlockType;
use super::ship::Ship;

/// Order in which block types are switched off. Generators are never shed.
pub const SHED_PRIORITY: [BlockType; 4] = [
    BlockType::Engine,
    BlockType::Shield,
    BlockType::Turret,
    BlockType::Plain,
];

impl Ship {
    /// Net power output of all active blocks
    pub fn power_level(&self) -> f32 {
        self.blocks().values().map(|b| b.power_output()).sum()
    }

    /// Deactivate blocks in priority order, randomly within a type, until power is non-negative
    pub fn control_power_level(&mut self, rng: &mut impl Rng) {
        let mut power = self.power_level();
        if power >= 0.0 {
            return;
        }

        for block_type in SHED_PRIORITY {
            let mut candidates: Vec<_> = self
                .cells_of(block_type)
                .iter()
                .copied()
                .filter(|cell| self.block(*cell).is_some_and(|b| b.active))
                .collect();
            candidates.shuffle(rng);

            for cell in candidates {
                self.apply_active(cell, false);
                power = self.power_level();
                debug!(team = self.team(), cell = %cell, power, "Block shed for power");
                if power >= 0.0 {
                    return;
                }
            }
        }
    }
}
