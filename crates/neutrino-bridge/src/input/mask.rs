/// Keys the host can observe, by bit position in [`InputMask`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum KeyBit {
    W = 0,
    A = 1,
    S = 2,
    D = 3,
    Q = 4,
    E = 5,
    Space = 6,
}

impl KeyBit {
    pub const ALL: [KeyBit; 7] = [
        KeyBit::W,
        KeyBit::A,
        KeyBit::S,
        KeyBit::D,
        KeyBit::Q,
        KeyBit::E,
        KeyBit::Space,
    ];

    #[inline]
    const fn flag(self) -> u8 {
        1 << self as u8
    }
}

/// Held-key state collapsed to one byte, sampled once per frame.
///
/// Press/release events update it as they arrive; only the state at
/// sampling time reaches the host.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct InputMask(u8);

impl InputMask {
    pub const EMPTY: InputMask = InputMask(0);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn pressed(self, key: KeyBit) -> bool {
        self.0 & key.flag() != 0
    }

    pub fn set(&mut self, key: KeyBit, pressed: bool) {
        if pressed {
            self.0 |= key.flag();
        } else {
            self.0 &= !key.flag();
        }
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_follow_key_layout() {
        let mut mask = InputMask::EMPTY;
        mask.set(KeyBit::W, true);
        mask.set(KeyBit::D, true);
        mask.set(KeyBit::Space, true);
        assert_eq!(mask.bits(), 0b0100_1001);
        assert!(mask.pressed(KeyBit::D));
        assert!(!mask.pressed(KeyBit::A));
    }

    #[test]
    fn release_clears_only_that_bit() {
        let mut mask = InputMask::from_bits(0b0111_1111);
        mask.set(KeyBit::Q, false);
        assert_eq!(mask.bits(), 0b0110_1111);

        // Releasing twice is harmless.
        mask.set(KeyBit::Q, false);
        assert_eq!(mask.bits(), 0b0110_1111);
    }

    #[test]
    fn all_keys_have_distinct_bits() {
        let combined = KeyBit::ALL.iter().fold(0u8, |acc, k| acc | k.flag());
        assert_eq!(combined, 0b0111_1111);
    }
}
