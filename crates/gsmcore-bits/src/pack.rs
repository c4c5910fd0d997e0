use crate::error::{bit_end, check_input, check_output, Result};
use crate::{PBit, UBit};

/// Bit ordering inside a packed byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BitOrder {
    /// First bit in `0x80` (GSM default).
    #[default]
    Msb,
    /// First bit in `0x01`.
    Lsb,
}

impl BitOrder {
    #[inline]
    fn mask(self, bit: usize) -> u8 {
        match self {
            BitOrder::Msb => 0x80 >> (bit & 7),
            BitOrder::Lsb => 0x01 << (bit & 7),
        }
    }
}

/// Number of bytes needed to hold `num_bits` packed bits.
#[inline]
pub const fn pbit_bytesize(num_bits: usize) -> usize {
    num_bits.div_ceil(8)
}

/// Pack `num_bits` unpacked bits MSB-first.
///
/// Unused low bits of the final byte are zeroed. Any non-zero input byte is
/// a `1`. Returns the number of packed bytes written.
pub fn ubit_to_pbit(out: &mut [PBit], input: &[UBit], num_bits: usize) -> Result<usize> {
    let bytes = pbit_bytesize(num_bits);
    check_input(input.len(), num_bits)?;
    check_output(out.len(), bytes)?;

    for (byte, chunk) in out[..bytes].iter_mut().zip(input[..num_bits].chunks(8)) {
        let mut acc = 0u8;
        for (i, bit) in chunk.iter().enumerate() {
            if *bit != 0 {
                acc |= 0x80 >> i;
            }
        }
        *byte = acc;
    }

    Ok(bytes)
}

/// Unpack `num_bits` MSB-first packed bits into one byte per bit.
///
/// Bits of the final packed byte beyond `num_bits` are ignored. Returns the
/// number of unpacked bits written.
pub fn pbit_to_ubit(out: &mut [UBit], input: &[PBit], num_bits: usize) -> Result<usize> {
    check_input(input.len(), pbit_bytesize(num_bits))?;
    check_output(out.len(), num_bits)?;

    for (i, bit) in out[..num_bits].iter_mut().enumerate() {
        *bit = (input[i >> 3] >> (7 - (i & 7))) & 1;
    }

    Ok(num_bits)
}

/// Splice unpacked bits into a packed buffer at arbitrary bit offsets.
///
/// Reads `num_bits` from `input[in_ofs..]` and writes them starting at bit
/// `out_ofs` of `out`. Only the addressed output bits change; neighbouring
/// bits of partially covered bytes keep their value, so `out` needs no
/// pre-zeroing.
///
/// Returns the number of output bytes touched (highest byte index written
/// plus one).
pub fn ubit_to_pbit_ext(
    out: &mut [PBit],
    out_ofs: usize,
    input: &[UBit],
    in_ofs: usize,
    num_bits: usize,
    order: BitOrder,
) -> Result<usize> {
    let in_end = bit_end(in_ofs, num_bits)?;
    let out_end = bit_end(out_ofs, num_bits)?;
    let touched = pbit_bytesize(out_end);
    check_input(input.len(), in_end)?;
    check_output(out.len(), touched)?;

    for (i, bit) in input[in_ofs..in_end].iter().enumerate() {
        let pos = out_ofs + i;
        let mask = order.mask(pos);
        if *bit != 0 {
            out[pos >> 3] |= mask;
        } else {
            out[pos >> 3] &= !mask;
        }
    }

    Ok(touched)
}

/// Extract packed bits at an arbitrary bit offset into unpacked form.
///
/// Reads `num_bits` starting at bit `in_ofs` of `input` and writes them to
/// `out[out_ofs..]`. Returns `out_ofs + num_bits`, the number of output
/// bytes touched.
pub fn pbit_to_ubit_ext(
    out: &mut [UBit],
    out_ofs: usize,
    input: &[PBit],
    in_ofs: usize,
    num_bits: usize,
    order: BitOrder,
) -> Result<usize> {
    let in_end = bit_end(in_ofs, num_bits)?;
    let out_end = bit_end(out_ofs, num_bits)?;
    check_input(input.len(), pbit_bytesize(in_end))?;
    check_output(out.len(), out_end)?;

    for (i, bit) in out[out_ofs..out_end].iter_mut().enumerate() {
        let pos = in_ofs + i;
        *bit = u8::from(input[pos >> 3] & order.mask(pos) != 0);
    }

    Ok(out_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitsError;

    fn random_bits(rng: &mut fastrand::Rng, n: usize) -> Vec<u8> {
        (0..n).map(|_| rng.u8(0..2)).collect()
    }

    #[test]
    fn bytesize_rounds_up() {
        assert_eq!(pbit_bytesize(0), 0);
        assert_eq!(pbit_bytesize(1), 1);
        assert_eq!(pbit_bytesize(8), 1);
        assert_eq!(pbit_bytesize(9), 2);
        assert_eq!(pbit_bytesize(184), 23);
    }

    #[test]
    fn pack_is_msb_first_with_zero_fill() {
        let bits = [1, 0, 1, 1, 0, 0, 0, 1, 1, 1];
        let mut out = [0xFFu8; 2];
        let n = ubit_to_pbit(&mut out, &bits, bits.len()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, [0xB1, 0xC0]);
    }

    #[test]
    fn pack_treats_nonzero_as_one() {
        let bits = [7, 0, 0, 0, 0, 0, 0, 0xFF];
        let mut out = [0u8; 1];
        ubit_to_pbit(&mut out, &bits, 8).unwrap();
        assert_eq!(out, [0x81]);
    }

    #[test]
    fn unpack_ignores_trailing_bits() {
        let packed = [0xA5, 0xFF];
        let mut out = [9u8; 12];
        let n = pbit_to_ubit(&mut out, &packed, 10).unwrap();
        assert_eq!(n, 10);
        assert_eq!(&out[..10], &[1, 0, 1, 0, 0, 1, 0, 1, 1, 1]);
        assert_eq!(&out[10..], &[9, 9]);
    }

    #[test]
    fn roundtrip_random_bits_all_lengths() {
        let mut rng = fastrand::Rng::with_seed(0x6573_6d63);
        for n in 0..=300 {
            let bits = random_bits(&mut rng, n);
            let mut packed = vec![0u8; pbit_bytesize(n)];
            let mut unpacked = vec![0u8; n];

            ubit_to_pbit(&mut packed, &bits, n).unwrap();
            pbit_to_ubit(&mut unpacked, &packed, n).unwrap();

            assert_eq!(unpacked, bits, "n = {n}");
        }
    }

    #[test]
    fn short_slices_are_errors() {
        let mut out = [0u8; 1];
        assert_eq!(
            ubit_to_pbit(&mut out, &[0u8; 16], 16),
            Err(BitsError::OutputTooShort {
                needed: 2,
                actual: 1
            })
        );
        assert_eq!(
            ubit_to_pbit(&mut out, &[0u8; 4], 8),
            Err(BitsError::InputTooShort {
                needed: 8,
                actual: 4
            })
        );

        let mut unpacked = [0u8; 4];
        assert!(matches!(
            pbit_to_ubit(&mut unpacked, &[0u8; 1], 8),
            Err(BitsError::OutputTooShort { .. })
        ));
        assert!(matches!(
            pbit_to_ubit(&mut [0u8; 16], &[0u8; 1], 9),
            Err(BitsError::InputTooShort { .. })
        ));
    }

    #[test]
    fn ext_offset_overflow_is_reported() {
        let err = ubit_to_pbit_ext(&mut [0u8; 1], usize::MAX, &[1], 0, 1, BitOrder::Msb)
            .unwrap_err();
        assert!(matches!(err, BitsError::OffsetOverflow { .. }));
    }

    #[test]
    fn ext_splice_preserves_neighbouring_bits() {
        let mut out = [0xFFu8, 0xFF];
        let n = ubit_to_pbit_ext(&mut out, 3, &[0, 0, 0, 0, 0, 0], 0, 6, BitOrder::Msb).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, [0b1110_0000, 0b0111_1111]);
    }

    #[test]
    fn ext_lsb_mode_places_first_bit_low() {
        let mut out = [0u8; 1];
        ubit_to_pbit_ext(&mut out, 0, &[1, 1, 0, 1], 0, 4, BitOrder::Lsb).unwrap();
        assert_eq!(out, [0b0000_1011]);

        let mut unpacked = [0u8; 4];
        pbit_to_ubit_ext(&mut unpacked, 0, &out, 0, 4, BitOrder::Lsb).unwrap();
        assert_eq!(unpacked, [1, 1, 0, 1]);
    }

    #[test]
    fn ext_returns_touched_extent() {
        let mut out = [0u8; 4];
        assert_eq!(
            ubit_to_pbit_ext(&mut out, 13, &[1; 4], 0, 4, BitOrder::Msb).unwrap(),
            3
        );
        assert_eq!(
            ubit_to_pbit_ext(&mut out, 9, &[1; 4], 0, 0, BitOrder::Msb).unwrap(),
            2
        );

        let mut unpacked = [0u8; 12];
        assert_eq!(
            pbit_to_ubit_ext(&mut unpacked, 5, &out, 13, 4, BitOrder::Msb).unwrap(),
            9
        );
        assert_eq!(&unpacked[5..9], &[1, 1, 1, 1]);
    }

    #[test]
    fn ext_roundtrip_random_offsets_both_orders() {
        let mut rng = fastrand::Rng::with_seed(0x0b17_5eed);
        for order in [BitOrder::Msb, BitOrder::Lsb] {
            for _ in 0..500 {
                let n = rng.usize(0..96);
                let in_ofs = rng.usize(0..17);
                let mid_ofs = rng.usize(0..23);
                let out_ofs = rng.usize(0..11);

                let source = random_bits(&mut rng, in_ofs + n);
                let mut packed: Vec<u8> = (0..pbit_bytesize(mid_ofs + n) + 2)
                    .map(|_| rng.u8(..))
                    .collect();
                let before = packed.clone();

                ubit_to_pbit_ext(&mut packed, mid_ofs, &source, in_ofs, n, order).unwrap();

                let mut back = vec![0u8; out_ofs + n];
                pbit_to_ubit_ext(&mut back, out_ofs, &packed, mid_ofs, n, order).unwrap();
                assert_eq!(&back[out_ofs..], &source[in_ofs..]);

                // bits outside the spliced window are untouched
                for pos in (0..packed.len() * 8).filter(|p| *p < mid_ofs || *p >= mid_ofs + n) {
                    let mask = order.mask(pos);
                    assert_eq!(packed[pos >> 3] & mask, before[pos >> 3] & mask);
                }
            }
        }
    }

    #[test]
    fn ext_msb_agrees_with_basic_form_at_zero_offset() {
        let mut rng = fastrand::Rng::with_seed(7);
        let bits = random_bits(&mut rng, 57);

        let mut basic = [0u8; 8];
        ubit_to_pbit(&mut basic, &bits, 57).unwrap();

        let mut ext = [0u8; 8];
        ubit_to_pbit_ext(&mut ext, 0, &bits, 0, 57, BitOrder::Msb).unwrap();

        assert_eq!(basic, ext);
    }
}
