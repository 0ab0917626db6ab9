//! 7-segment display latches.
//!
//! Both displays go through 7447 BCD decoders. The edit display shows two
//! digits, one per nibble. The program display (a MAN6630) has a full digit,
//! a half digit that can only show "1", and a "+" sign; it is modeled as two
//! 7-segment digits with the "+" drawn as the middle segment.

/// Segment patterns (gfedcba) the 7447 produces for each input code. Codes
/// 10-15 yield the decoder's odd glyphs; 15 blanks the digit.
pub const PATTERNS_7447: [u8; 16] = [
    0x3f, 0x06, 0x5b, 0x4f, 0x66, 0x6d, 0x7c, 0x07, 0x7f, 0x67, 0x58, 0x4c, 0x62, 0x69, 0x78, 0x00,
];

/// Middle (g) segment, standing in for the MAN6630's "+" sign.
pub const SEGMENT_G: u8 = 0x40;

/// Edit display digits for a write to the edit latch.
pub fn edit_digits(data: u8) -> [u8; 2] {
    [
        PATTERNS_7447[(data & 0x0f) as usize],
        PATTERNS_7447[(data >> 4) as usize],
    ]
}

/// Program display digits for a write to the program latch.
///
/// D0-D3 drive the full digit, D4 lights the half-digit "1", D5 the "+".
pub fn program_digits(data: u8) -> [u8; 2] {
    let mut digit1 = PATTERNS_7447[15];
    if data & 0x10 != 0 {
        digit1 |= PATTERNS_7447[1];
    }
    if data & 0x20 != 0 {
        digit1 |= SEGMENT_G;
    }
    [PATTERNS_7447[(data & 0x0f) as usize], digit1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_digits() {
        assert_eq!(edit_digits(0x42), [0x5b, 0x66]);
        assert_eq!(edit_digits(0xff), [0x00, 0x00]);
    }

    #[test]
    fn test_program_digits() {
        assert_eq!(program_digits(0x07), [0x07, 0x00]);
        assert_eq!(program_digits(0x16), [0x7c, 0x06]);
        assert_eq!(program_digits(0x3f), [0x00, 0x46]);
        // D6 and D7 are not wired.
        assert_eq!(program_digits(0xc0), program_digits(0x00));
    }
}
