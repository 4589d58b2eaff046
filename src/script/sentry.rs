//! Built-in reference script: close in on the opponent, aim every turret at it, fire when lined up

use crate::game::block::BlockType;
use crate::util::geometry::shortest_arc_degrees;

use super::api::{BlockDetail, ShipControl};
use super::{ScriptError, ShipScript};

/// Degrees of aim error tolerated before firing
const AIM_TOLERANCE: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct SentryScript {
    /// Engines cut out once the opponent is this close, in pixels
    pub standoff: f32,
}

impl Default for SentryScript {
    fn default() -> Self {
        Self { standoff: 350.0 }
    }
}

impl ShipScript for SentryScript {
    fn main(&mut self, ctl: &mut ShipControl<'_>) -> Result<(), ScriptError> {
        let opponent = ctl.opponent_team();
        let (Some(target), Some(own)) = (ctl.position(opponent), ctl.position(ctl.own_team())) else {
            return Ok(());
        };

        for turret in ctl.own_blocks(BlockType::Turret) {
            let Some(info) = ctl.info(turret) else {
                continue;
            };
            let BlockDetail::Turret {
                orientation,
                rotating,
                fire_ready,
            } = info.detail
            else {
                continue;
            };
            let Some(aim) = ctl.aim_angle(turret, target) else {
                continue;
            };

            if shortest_arc_degrees(orientation, aim).abs() > AIM_TOLERANCE {
                if !rotating {
                    ctl.rotate_turret(turret, aim)?;
                }
            } else if fire_ready && info.active {
                ctl.fire(turret)?;
            }
        }

        let throttle = if own.distance(target) > self.standoff { 1.0 } else { 0.0 };
        for engine in ctl.own_blocks(BlockType::Engine) {
            let current = match ctl.info(engine).map(|i| i.detail) {
                Some(BlockDetail::Engine { activation }) => activation,
                _ => continue,
            };
            if current != throttle {
                ctl.set_engine_power(engine, throttle)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::BulletSystem;
    use crate::game::physics::Body;
    use crate::game::ship::tests::{grid, local_ship};
    use crate::game::ship::Ship;
    use crate::script::actions::ActionLog;
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sentry_turns_turret_then_fires() {
        // Opponent sits above the ship, so the sentry must rotate first
        let mut own = local_ship(&[&[2, 4]]);
        let opponent = Ship::from_grid(1, &grid(&[&[1]]), Body::new(IVec2::new(300, 100), 0.0), true)
            .unwrap();
        let mut bullets = BulletSystem::new();
        let mut actions = ActionLog::new();
        let mut sentry = SentryScript { standoff: 1000.0 };
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let mut fired = false;
        for tick in 0..120 {
            own.update(&mut rng);
            let mut ctl = ShipControl::new(&mut own, &opponent, &mut bullets, &mut actions, tick);
            sentry.main(&mut ctl).unwrap();
            if !bullets.bullets().is_empty() {
                fired = true;
                break;
            }
        }

        assert!(fired);
        let lines = actions.drain_lines();
        assert!(lines[0].starts_with("rotate (0, 1)"));
        assert!(lines.last().unwrap().starts_with("fire (0, 1)"));
    }
}
