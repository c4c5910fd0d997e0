use gsmcore_bits::{
    pbit_bytesize, pbit_to_ubit_ext, ubit_to_pbit_ext, BitOrder, BitsError, UBit,
};

use crate::cmd::{PackArgs, UnpackArgs};
use crate::exit::{bits_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{from_hex, print_bits, OutputFormat};

/// Upper bound on the packed output of one `pack` call.
const MAX_PACKED_BYTES: usize = 1 << 16;

pub fn pack(args: PackArgs, format: OutputFormat) -> CliResult<i32> {
    let ubits = parse_bit_string(&args.bits)?;
    let end = args
        .offset
        .checked_add(ubits.len())
        .ok_or(BitsError::OffsetOverflow {
            offset: args.offset,
            num_bits: ubits.len(),
        })
        .map_err(|err| bits_error("pack failed", err))?;
    let size = pbit_bytesize(end);
    if size > MAX_PACKED_BYTES {
        return Err(CliError::new(
            DATA_INVALID,
            format!("packed output of {size} bytes exceeds {MAX_PACKED_BYTES}"),
        ));
    }

    let mut packed = vec![0u8; size];
    ubit_to_pbit_ext(
        &mut packed,
        args.offset,
        &ubits,
        0,
        ubits.len(),
        bit_order(args.lsb),
    )
    .map_err(|err| bits_error("pack failed", err))?;

    print_bits(&render_bits(&ubits), &packed, format);
    Ok(SUCCESS)
}

pub fn unpack(args: UnpackArgs, format: OutputFormat) -> CliResult<i32> {
    let packed = from_hex(&args.hex)
        .ok_or_else(|| CliError::new(DATA_INVALID, format!("not valid hex: {}", args.hex)))?;
    let num_bits = match args.bits {
        Some(bits) => bits,
        None => (packed.len() * 8).saturating_sub(args.offset),
    };
    if num_bits > packed.len() * 8 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{num_bits} bits requested from {} bytes", packed.len()),
        ));
    }

    let mut ubits = vec![0; num_bits];
    pbit_to_ubit_ext(
        &mut ubits,
        0,
        &packed,
        args.offset,
        num_bits,
        bit_order(args.lsb),
    )
    .map_err(|err| bits_error("unpack failed", err))?;

    print_bits(&render_bits(&ubits), &packed, format);
    Ok(SUCCESS)
}

fn bit_order(lsb: bool) -> BitOrder {
    if lsb {
        BitOrder::Lsb
    } else {
        BitOrder::Msb
    }
}

fn parse_bit_string(input: &str) -> CliResult<Vec<UBit>> {
    input
        .chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            other => Err(CliError::new(
                DATA_INVALID,
                format!("invalid bit {other:?}; expected 0 or 1"),
            )),
        })
        .collect()
}

fn render_bits(ubits: &[UBit]) -> String {
    ubits
        .iter()
        .map(|bit| if *bit != 0 { '1' } else { '0' })
        .collect()
}
