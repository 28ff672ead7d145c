//! Input sources for the frame loop

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::game::movement::{MoveKeys, MovementInput};
use crate::game::weapon::WeaponKind;
use crate::game::FrameInput;

/// Something that produces one frame of player input
pub trait InputSource: Send {
    fn sample(&mut self, dt: f32) -> FrameInput;
}

/// Seeded bot that wanders, looks around and shoots in short phases
pub struct ScriptedInput {
    rng: ChaCha8Rng,
    held: FrameInput,
    /// Seconds left in the current phase
    phase_left: f32,
    weapon: WeaponKind,
}

impl ScriptedInput {
    pub fn new(seed: u64, weapon: WeaponKind) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            held: FrameInput::default(),
            phase_left: 0.0,
            weapon,
        }
    }

    fn next_phase(&mut self) {
        let rng = &mut self.rng;
        self.phase_left = rng.gen_range(0.5..2.0);
        self.held = FrameInput {
            movement: MovementInput {
                keys: MoveKeys {
                    forward: rng.gen_bool(0.5),
                    back: rng.gen_bool(0.1),
                    left: rng.gen_bool(0.25),
                    right: rng.gen_bool(0.25),
                    sprint: rng.gen_bool(0.3),
                },
                mouse_dx: rng.gen_range(-6.0..6.0),
                mouse_dy: rng.gen_range(-1.0..1.0),
                jump: false,
                crouch: rng.gen_bool(0.1),
            },
            fire: rng.gen_bool(0.5),
            switch_weapon: None,
        };
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self, dt: f32) -> FrameInput {
        self.phase_left -= dt;
        if self.phase_left <= 0.0 {
            self.next_phase();
        }

        let mut input = self.held;
        // Single-frame presses
        input.movement.jump = self.rng.gen_bool(0.01);
        if self.rng.gen_bool(0.002) {
            self.weapon = match self.weapon {
                WeaponKind::Rifle => WeaponKind::Smg,
                WeaponKind::Smg => WeaponKind::Rifle,
            };
            input.switch_weapon = Some(self.weapon);
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_inputs() {
        let mut a = ScriptedInput::new(7, WeaponKind::Rifle);
        let mut b = ScriptedInput::new(7, WeaponKind::Rifle);
        for _ in 0..600 {
            let (x, y) = (a.sample(1.0 / 60.0), b.sample(1.0 / 60.0));
            assert_eq!(x.fire, y.fire);
            assert_eq!(x.movement.keys, y.movement.keys);
            assert_eq!(x.movement.jump, y.movement.jump);
            assert_eq!(x.switch_weapon, y.switch_weapon);
        }
    }

    #[test]
    fn phases_hold_between_changes() {
        let mut input = ScriptedInput::new(3, WeaponKind::Rifle);
        let first = input.sample(0.01);
        let second = input.sample(0.01);
        // The shortest phase is half a second
        assert_eq!(first.movement.keys, second.movement.keys);
        assert_eq!(first.fire, second.fire);
    }
}
