//! Gameplay tuning constants

/// Ship board is a fixed GRID_SIZE x GRID_SIZE grid
pub const GRID_SIZE: usize = 6;
/// Side of one block cell in world pixels
pub const BLOCK_SIZE: i32 = 20;
/// Mass contributed by each live block
pub const MASS_PER_BLOCK: f32 = 4.0;
/// Hull hit points of a fresh block
pub const BLOCK_HP: i32 = 100;

// Power economy
pub const GENERATOR_POWER: f32 = 10.0;
pub const ENGINE_POWER: f32 = 6.0;
/// Consumption per intensity level
pub const SHIELD_POWER: f32 = 3.0;
pub const TURRET_POWER: f32 = 3.0;

// Physics
pub const MOTOR_FORCE: f32 = 24.0;
/// Circular acceleration per unit of engine force per cell of lateral offset
pub const ENGINE_TORQUE: f32 = 0.002;
pub const AIR_RESISTANCE: f32 = 0.98;
pub const MAX_CIRCULAR_SPEED: f32 = 0.06;
/// Ticks an auxiliary acceleration stays applied
pub const AUX_TIMER: u32 = 10;

// Shields
pub const SHIELD_HP: f32 = 40.0;
pub const SHIELD_REGEN_RATE: f32 = 0.5;
pub const SHIELD_MAX_PRTC: usize = 3;
pub const SHIELD_MIN_INTENSITY: u8 = 1;
pub const SHIELD_MAX_INTENSITY: u8 = 3;

// Turrets
pub const TURRET_FIRE_DELAY: u32 = 20;
/// Degrees per tick
pub const TURRET_ANGULAR_SPEED: f32 = 3.0;
/// Distance from the turret center to the muzzle
pub const TURRET_BARREL: f32 = 8.0;

// Bullets and effects
pub const BULLET_SPEED: f32 = 8.0;
pub const BULLET_DAMAGE: i32 = 20;
/// Side of the square bullet mask in pixels
pub const BULLET_SIZE: i32 = 3;
pub const EXPLOSION_LIFETIME: u32 = 15;
/// Ticks a bullet id stays in the recently-hit set
pub const RECENT_HIT_TICKS: u32 = 30;

// Ship-vs-ship collisions
pub const SPEED_HISTORY_LEN: usize = 5;
pub const COLLISION_COOLDOWN: u32 = 15;
pub const COLLISION_SPIN: f32 = 0.02;
/// Floor on the bounce speed so touching, stationary ships still separate
pub const MIN_BOUNCE_SPEED: f32 = 1.0;

// Arena
pub const ARENA_WIDTH: i32 = 1200;
pub const ARENA_HEIGHT: i32 = 800;

/// Ship board side in pixels
pub const fn ship_extent() -> i32 {
    GRID_SIZE as i32 * BLOCK_SIZE
}

/// Diagonal of the ship board, the widest a rotated ship can get
pub fn ship_diagonal() -> f32 {
    ship_extent() as f32 * std::f32::consts::SQRT_2
}
