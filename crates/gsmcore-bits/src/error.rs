/// Errors reported by the bit conversion routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BitsError {
    /// The output slice cannot hold the converted bits.
    #[error("output too short ({actual} bytes, need {needed})")]
    OutputTooShort { needed: usize, actual: usize },

    /// The input slice does not contain the requested bits.
    #[error("input too short ({actual} bytes, need {needed})")]
    InputTooShort { needed: usize, actual: usize },

    /// A bit offset plus the bit count does not fit in `usize`.
    #[error("bit offset {offset} + {num_bits} bits overflows")]
    OffsetOverflow { offset: usize, num_bits: usize },
}

pub type Result<T> = std::result::Result<T, BitsError>;

pub(crate) fn check_input(actual: usize, needed: usize) -> Result<()> {
    if actual < needed {
        return Err(BitsError::InputTooShort { needed, actual });
    }
    Ok(())
}

pub(crate) fn check_output(actual: usize, needed: usize) -> Result<()> {
    if actual < needed {
        return Err(BitsError::OutputTooShort { needed, actual });
    }
    Ok(())
}

pub(crate) fn bit_end(offset: usize, num_bits: usize) -> Result<usize> {
    offset
        .checked_add(num_bits)
        .ok_or(BitsError::OffsetOverflow { offset, num_bits })
}
