//! Sample codec
//!
//! Places one source sample into a 4-byte S32_LE target slot.
//!
//! **Placement:**
//! - S8, S16_LE, S32_LE: source bytes copied to the low-order end of the
//!   slot (target byte 0 onward)
//! - S24_LE: the 3 significant bytes go to target bytes 1..=3
//!
//! Bytes outside the copied range are left untouched. The repacker zeroes
//! the destination region before encoding into it.

use super::types::{SampleFormat, TARGET_SAMPLE_WIDTH};

/// Encode `sample` into `slot`
///
/// `sample` must hold at least `format.physical_width()` bytes (only the
/// significant bytes are read) and `slot` exactly [`TARGET_SAMPLE_WIDTH`].
pub fn encode_into(sample: &[u8], format: SampleFormat, slot: &mut [u8]) {
    debug_assert_eq!(slot.len(), TARGET_SAMPLE_WIDTH);

    match format {
        SampleFormat::S8 | SampleFormat::S16Le | SampleFormat::S32Le => {
            let width = format.significant_bytes();
            slot[..width].copy_from_slice(&sample[..width]);
        }
        SampleFormat::S24Le => {
            slot[1..4].copy_from_slice(&sample[..3]);
        }
    }
}

/// Encode a single sample into a zeroed slot
pub fn convert(sample: &[u8], format: SampleFormat) -> [u8; TARGET_SAMPLE_WIDTH] {
    let mut slot = [0u8; TARGET_SAMPLE_WIDTH];
    encode_into(sample, format, &mut slot);
    slot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s8_low_byte() {
        assert_eq!(convert(&[0x7F], SampleFormat::S8), [0x7F, 0, 0, 0]);
        assert_eq!(convert(&[0x80], SampleFormat::S8), [0x80, 0, 0, 0]);
    }

    #[test]
    fn test_s16_low_bytes() {
        assert_eq!(convert(&[0x34, 0x12], SampleFormat::S16Le), [0x34, 0x12, 0, 0]);
    }

    #[test]
    fn test_s24_shifted_up_one_byte() {
        // Container byte 3 is padding and must not leak into the slot
        assert_eq!(
            convert(&[0x56, 0x34, 0x12, 0xFF], SampleFormat::S24Le),
            [0x00, 0x56, 0x34, 0x12]
        );
    }

    #[test]
    fn test_s32_identity() {
        let sample = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(convert(&sample, SampleFormat::S32Le), sample);
    }

    #[test]
    fn test_encode_leaves_unused_bytes() {
        let mut slot = [0xAA; 4];
        encode_into(&[0x01], SampleFormat::S8, &mut slot);
        assert_eq!(slot, [0x01, 0xAA, 0xAA, 0xAA]);

        let mut slot = [0xAA; 4];
        encode_into(&[0x01, 0x02, 0x03, 0x00], SampleFormat::S24Le, &mut slot);
        assert_eq!(slot, [0xAA, 0x01, 0x02, 0x03]);
    }
}
