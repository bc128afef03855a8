//! RS1024: Reed-Solomon checksum for SLIP-39 mnemonics
//!
//! A Reed-Solomon code over GF(1024) that appends three 10-bit words to
//! the share data. It is guaranteed to detect any error affecting at most
//! 3 words and has a less than 1 in 10^9 chance of missing larger errors.
//!
//! The checksum is computed over a customization string followed by the
//! data words. Extendable backups use a different customization string
//! than classic ones, so the two families never validate against each
//! other.
//!
//! Reference: https://github.com/satoshilabs/slips/blob/master/slip-0039.md

/// Generator polynomial coefficients.
const GEN: [u32; 10] = [
    0xe0e040, 0x1c1c080, 0x3838100, 0x7070200, 0xe0e0009, 0x1c0c2412, 0x38086c24, 0x3090fc48,
    0x21b1f890, 0x3f3f120,
];

/// Checksum length in mnemonic words.
pub const CHECKSUM_WORDS: usize = 3;

fn customization(extendable: bool) -> &'static [u8] {
    if extendable {
        b"shamir_extendable"
    } else {
        b"shamir"
    }
}

/// Polynomial modular reduction over a sequence of 10-bit values.
fn polymod(values: impl Iterator<Item = u16>) -> u32 {
    let mut chk: u32 = 1;
    for v in values {
        let b = chk >> 20;
        chk = ((chk & 0xfffff) << 10) ^ u32::from(v);
        for (i, gen) in GEN.iter().enumerate() {
            if (b >> i) & 1 != 0 {
                chk ^= gen;
            }
        }
    }
    chk
}

/// Compute the 3-word checksum for `data` (the share words without the
/// checksum).
pub fn create_checksum(extendable: bool, data: &[u16]) -> [u16; CHECKSUM_WORDS] {
    let values = customization(extendable)
        .iter()
        .map(|&b| u16::from(b))
        .chain(data.iter().copied())
        .chain([0u16; CHECKSUM_WORDS]);
    let chk = polymod(values) ^ 1;
    [
        ((chk >> 20) & 0x3ff) as u16,
        ((chk >> 10) & 0x3ff) as u16,
        (chk & 0x3ff) as u16,
    ]
}

/// Verify the checksum of `data` (the share words including the trailing
/// 3-word checksum).
pub fn verify_checksum(extendable: bool, data: &[u16]) -> bool {
    let values = customization(extendable)
        .iter()
        .map(|&b| u16::from(b))
        .chain(data.iter().copied());
    polymod(values) == 1
}
