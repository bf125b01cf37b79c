use serde::{Deserialize, Serialize};

/// The VM's single fixed-size value unit.
///
/// A slot is 4 bytes that are either a signed 32-bit integer or an IEEE-754
/// float. There is no runtime tag: the consuming instruction decides the
/// interpretation. `IADD` reads the same bits as an integer that `FADD`
/// would read as a float, and only the explicit `I2F`/`F2I` instructions
/// convert between the two.
#[derive(Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot(u32);

impl Slot {
    pub const ZERO: Slot = Slot(0);
    pub const ONE: Slot = Slot(1);

    pub fn from_i32(v: i32) -> Slot {
        Slot(v as u32)
    }

    pub fn from_f32(v: f32) -> Slot {
        Slot(v.to_bits())
    }

    pub fn from_bool(v: bool) -> Slot {
        if v { Slot::ONE } else { Slot::ZERO }
    }

    pub fn as_i32(self) -> i32 {
        self.0 as i32
    }

    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.0)
    }

    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; 4]) -> Slot {
        Slot(u32::from_le_bytes(bytes))
    }
}

impl std::fmt::Debug for Slot {
    /// Show the raw bits alongside both interpretations; when debugging a
    /// program it is rarely obvious which one the next instruction wants.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Slot(0x{:08x} i={} f={})",
            self.0,
            self.as_i32(),
            self.as_f32()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_round_trip() {
        assert_eq!(Slot::from_i32(0).as_i32(), 0);
        assert_eq!(Slot::from_i32(-1).as_i32(), -1);
        assert_eq!(Slot::from_i32(i32::MIN).as_i32(), i32::MIN);
        assert_eq!(Slot::from_i32(i32::MAX).as_i32(), i32::MAX);
    }

    #[test]
    fn test_float_round_trip() {
        assert_eq!(Slot::from_f32(1.5).as_f32(), 1.5);
        assert_eq!(Slot::from_f32(-0.0).as_f32().to_bits(), (-0.0f32).to_bits());
        assert!(Slot::from_f32(f32::NAN).as_f32().is_nan());
    }

    #[test]
    fn test_no_implicit_conversion() {
        // The float 1.0 is not the integer 1; reinterpretation is raw bits.
        assert_eq!(Slot::from_f32(1.0).as_i32(), 0x3f800000);
        assert_eq!(Slot::from_i32(1).as_f32().to_bits(), 1);
    }

    #[test]
    fn test_bool_and_bytes() {
        assert_eq!(Slot::from_bool(true), Slot::ONE);
        assert_eq!(Slot::from_bool(false), Slot::ZERO);
        let s = Slot::from_i32(0x0403_0201);
        assert_eq!(s.to_le_bytes(), [1, 2, 3, 4]);
        assert_eq!(Slot::from_le_bytes([1, 2, 3, 4]), s);
    }
}
