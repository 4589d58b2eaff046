//! Shield pooling: distribution, balancing, regeneration and freezing of shield hp

use super::block::{BlockMap, Cell};
use super::constants::{
    SHIELD_HP, SHIELD_MAX_INTENSITY, SHIELD_MAX_PRTC, SHIELD_MIN_INTENSITY, SHIELD_REGEN_RATE,
};

/// Shield bookkeeping for one protected block. The current value lives on the block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldLink {
    pub cell: Cell,
    pub max: f32,
    /// Shield hp held while the shield is deactivated
    pub frozen: f32,
}

/// Shield-specific block state
#[derive(Debug, Clone)]
pub struct ShieldState {
    pub intensity: u8,
    pub links: Vec<ShieldLink>,
}

impl Default for ShieldState {
    fn default() -> Self {
        Self {
            intensity: SHIELD_MIN_INTENSITY,
            links: Vec::new(),
        }
    }
}

impl ShieldState {
    /// Total shield hp this shield distributes at its current intensity
    pub fn capacity(&self) -> f32 {
        SHIELD_HP * self.intensity as f32
    }

    pub fn protects(&self, cell: Cell) -> bool {
        self.links.iter().any(|l| l.cell == cell)
    }

    /// Attach a block; returns false if full, duplicate, or already shielded elsewhere
    pub fn add_prtc_block(&mut self, shield_cell: Cell, target: Cell, blocks: &mut BlockMap) -> bool {
        if self.links.len() >= SHIELD_MAX_PRTC || target == shield_cell || self.protects(target) {
            return false;
        }
        let Some(block) = blocks.get_mut(&target) else {
            return false;
        };
        if block.shielded_by.is_some() {
            return false;
        }

        block.shielded_by = Some(shield_cell);
        self.links.push(ShieldLink {
            cell: target,
            max: 0.0,
            frozen: 0.0,
        });
        true
    }

    /// Even initial split of the full capacity
    pub fn setup(&mut self, blocks: &mut BlockMap) {
        if self.links.is_empty() {
            return;
        }
        let share = self.capacity() / self.links.len() as f32;
        for link in &mut self.links {
            link.max = share;
            link.frozen = share;
            if let Some(block) = blocks.get_mut(&link.cell) {
                block.shield_hp = share;
            }
        }
    }

    /// Re-split max shares and (current + bonus) evenly across protected blocks
    ///
    /// While the shield is inactive the frozen values are balanced instead.
    pub fn balance(&mut self, bonus: f32, active: bool, blocks: &mut BlockMap) {
        if self.links.is_empty() {
            return;
        }
        let count = self.links.len() as f32;
        let max_share = self.capacity() / count;

        let pooled: f32 = self
            .links
            .iter()
            .map(|link| {
                if active {
                    blocks.get(&link.cell).map_or(0.0, |b| b.shield_hp)
                } else {
                    link.frozen
                }
            })
            .sum();
        let share = (pooled + bonus).max(0.0) / count;

        for link in &mut self.links {
            link.max = max_share;
            if active {
                if let Some(block) = blocks.get_mut(&link.cell) {
                    block.shield_hp = share;
                }
            } else {
                link.frozen = share;
            }
        }
    }

    /// Change intensity at runtime. Returns false for out-of-range levels.
    pub fn set_intensity(&mut self, level: u8, active: bool, blocks: &mut BlockMap) -> bool {
        if !(SHIELD_MIN_INTENSITY..=SHIELD_MAX_INTENSITY).contains(&level) {
            return false;
        }
        self.intensity = level;
        self.balance(0.0, active, blocks);

        for link in &mut self.links {
            if active {
                if let Some(block) = blocks.get_mut(&link.cell) {
                    block.shield_hp = block.shield_hp.min(link.max);
                }
            } else {
                link.frozen = link.frozen.min(link.max);
            }
        }
        true
    }

    /// Per-tick regen, split between blocks still under their max
    pub fn update_state(&mut self, blocks: &mut BlockMap) {
        let under: Vec<ShieldLink> = self
            .links
            .iter()
            .copied()
            .filter(|link| blocks.get(&link.cell).is_some_and(|b| b.shield_hp < link.max))
            .collect();
        if under.is_empty() {
            return;
        }

        let share = SHIELD_REGEN_RATE / under.len() as f32;
        for link in under {
            if let Some(block) = blocks.get_mut(&link.cell) {
                block.shield_hp = (block.shield_hp + share).min(link.max);
            }
        }
    }

    /// Shield switched off: park current values and leave blocks unshielded
    pub fn freeze(&mut self, blocks: &mut BlockMap) {
        for link in &mut self.links {
            if let Some(block) = blocks.get_mut(&link.cell) {
                link.frozen = block.shield_hp;
                block.shield_hp = 0.0;
            }
        }
    }

    /// Shield switched back on: restore parked values
    pub fn thaw(&mut self, blocks: &mut BlockMap) {
        for link in &self.links {
            if let Some(block) = blocks.get_mut(&link.cell) {
                block.shield_hp = link.frozen;
            }
        }
    }

    /// A protected block was destroyed
    pub fn detach(&mut self, cell: Cell, active: bool, blocks: &mut BlockMap) {
        let before = self.links.len();
        self.links.retain(|link| link.cell != cell);
        if self.links.len() != before {
            self.balance(0.0, active, blocks);
        }
    }

    /// The shield block itself was destroyed: strip protection for good
    pub fn release(&mut self, blocks: &mut BlockMap) {
        for link in self.links.drain(..) {
            if let Some(block) = blocks.get_mut(&link.cell) {
                block.shield_hp = 0.0;
                block.shielded_by = None;
            }
        }
    }
}
