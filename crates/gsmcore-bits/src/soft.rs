//! Hard decisions on soft bits and the ideal soft value for a hard bit.

use crate::error::{check_output, Result};
use crate::{SBit, UBit};

/// Soft value of a certain `0`.
pub const SBIT_ZERO: SBit = 127;

/// Soft value of a certain `1`.
pub const SBIT_ONE: SBit = -127;

/// Hard-decide every soft bit of `input` into `out`; negative means `1`.
///
/// Returns the number of bits written.
pub fn sbit_to_ubit(out: &mut [UBit], input: &[SBit]) -> Result<usize> {
    check_output(out.len(), input.len())?;
    for (dst, soft) in out.iter_mut().zip(input) {
        *dst = u8::from(*soft < 0);
    }
    Ok(input.len())
}

/// Map every unpacked bit of `input` to its ideal soft value.
pub fn ubit_to_sbit(out: &mut [SBit], input: &[UBit]) -> Result<usize> {
    check_output(out.len(), input.len())?;
    for (dst, bit) in out.iter_mut().zip(input) {
        *dst = if *bit != 0 { SBIT_ONE } else { SBIT_ZERO };
    }
    Ok(input.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitsError;

    #[test]
    fn hard_decision_on_sign() {
        let soft = [-127, -1, 0, 1, 127, -64];
        let mut hard = [0u8; 6];
        assert_eq!(sbit_to_ubit(&mut hard, &soft).unwrap(), 6);
        assert_eq!(hard, [1, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn ideal_soft_values_decide_back() {
        let bits = [0, 1, 1, 0, 1];
        let mut soft = [0i8; 5];
        ubit_to_sbit(&mut soft, &bits).unwrap();
        assert_eq!(soft, [127, -127, -127, 127, -127]);

        let mut hard = [0u8; 5];
        sbit_to_ubit(&mut hard, &soft).unwrap();
        assert_eq!(hard, bits);
    }

    #[test]
    fn short_output_is_rejected() {
        let err = sbit_to_ubit(&mut [0u8; 2], &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            BitsError::OutputTooShort {
                needed: 3,
                actual: 2
            }
        );
    }
}
