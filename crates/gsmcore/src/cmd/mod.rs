use clap::{Args, Subcommand};
use std::path::PathBuf;

use gsmcore_tap::{DEFAULT_HOST, DEFAULT_QUEUE_LIMIT, GSMTAP_UDP_PORT};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bits;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encapsulate a payload in a GSMTAP header and send it.
    Send(SendArgs),
    /// Receive GSMTAP datagrams and print their headers.
    Listen(ListenArgs),
    /// Pack a string of 0/1 bits into bytes.
    Pack(PackArgs),
    /// Unpack hex bytes into a string of 0/1 bits.
    Unpack(UnpackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Pack(args) => bits::pack(args, format),
        Command::Unpack(args) => bits::unpack(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Destination host.
    #[arg(long, env = "GSMCORE_TAP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Destination UDP port.
    #[arg(long, env = "GSMCORE_TAP_PORT", default_value_t = GSMTAP_UDP_PORT)]
    pub port: u16,
    /// Absolute radio frequency channel number.
    #[arg(long, default_value_t = 0)]
    pub arfcn: u16,
    /// Timeslot (0-7).
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..8))]
    pub timeslot: u8,
    /// Sub-slot (sub-channel) within the timeslot.
    #[arg(long, default_value_t = 0)]
    pub sub_slot: u8,
    /// TDMA frame number of the first message.
    #[arg(long, default_value_t = 0)]
    pub frame_number: u32,
    /// Signal level in dBm.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub signal: i8,
    /// Signal-to-noise ratio in dB.
    #[arg(long, default_value_t = 0)]
    pub snr: u8,
    /// GSMTAP channel subtype (e.g. 1 for BCCH, 0x88 for SDCCH/8 SACCH).
    #[arg(long, value_parser = parse_byte, conflicts_with = "rsl_chan")]
    pub chan_type: Option<u8>,
    /// RSL channel number; sets channel subtype, timeslot and sub-slot.
    #[arg(long, value_parser = parse_byte)]
    pub rsl_chan: Option<u8>,
    /// RSL link identifier used with --rsl-chan (0x40 selects SACCH).
    #[arg(long, value_parser = parse_byte, default_value = "0")]
    pub link_id: u8,
    /// Payload as hex bytes.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    /// Number of messages; the frame number increments per message.
    #[arg(long, default_value_t = 1)]
    pub count: u32,
    /// Deliver through the bounded write queue driven by a reactor.
    #[arg(long)]
    pub queued: bool,
    /// Bound of the write queue with --queued.
    #[arg(long, default_value_t = DEFAULT_QUEUE_LIMIT)]
    pub queue_limit: usize,
    /// Bind a discard sink to a local destination.
    #[arg(long)]
    pub sink: bool,
    /// Maximum time to drain the queue with --queued (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,
    /// UDP port to bind.
    #[arg(long, env = "GSMCORE_TAP_PORT", default_value_t = GSMTAP_UDP_PORT)]
    pub port: u16,
    /// Exit after printing N datagrams.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up when nothing arrives for this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Bits to pack, as a string of 0 and 1 (`_` and spaces are ignored).
    pub bits: String,
    /// Bit offset in the output at which packing starts.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
    /// Least significant bit first within each byte.
    #[arg(long)]
    pub lsb: bool,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Packed bytes as hex.
    pub hex: String,
    /// Bit offset in the input at which unpacking starts.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
    /// Number of bits to unpack. Default: all remaining bits.
    #[arg(long)]
    pub bits: Option<usize>,
    /// Least significant bit first within each byte.
    #[arg(long)]
    pub lsb: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a byte given in decimal or with a `0x` prefix.
fn parse_byte(input: &str) -> Result<u8, String> {
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid byte value {input:?}: {err}"))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        std::time::Duration::from_millis(value)
    } else {
        std::time::Duration::from_secs(value)
    })
}
