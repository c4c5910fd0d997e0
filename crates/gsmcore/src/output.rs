use std::io::{IsTerminal, Write};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gsmcore_tap::{chantype, GsmtapHeader, TapStats};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct HeaderOutput<'a> {
    source: String,
    version: u8,
    arfcn: u16,
    timeslot: u8,
    sub_slot: u8,
    chan_type: u8,
    chan_name: &'a str,
    acch: bool,
    frame_number: u32,
    signal_dbm: i8,
    snr_db: u8,
    antenna: u8,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

/// Print one received GSMTAP datagram.
pub fn print_header(header: &GsmtapHeader, payload: &[u8], source: SocketAddr, format: OutputFormat) {
    let chan_name = chantype::chantype_name(header.sub_type);
    let acch = chantype::is_acch(header.sub_type);

    match format {
        OutputFormat::Json => {
            let out = HeaderOutput {
                source: source.to_string(),
                version: header.version,
                arfcn: header.arfcn,
                timeslot: header.timeslot,
                sub_slot: header.sub_slot,
                chan_type: header.sub_type,
                chan_name,
                acch,
                frame_number: header.frame_number,
                signal_dbm: header.signal_dbm,
                snr_db: header.snr_db,
                antenna: header.antenna_nr,
                payload_size: payload.len(),
                payload: to_hex(payload),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ARFCN", "TS", "SS", "CHANNEL", "FN", "SIGNAL", "SNR", "PAYLOAD"])
                .add_row(vec![
                    header.arfcn.to_string(),
                    header.timeslot.to_string(),
                    header.sub_slot.to_string(),
                    channel_label(chan_name, acch),
                    header.frame_number.to_string(),
                    format!("{} dBm", header.signal_dbm),
                    format!("{} dB", header.snr_db),
                    to_hex(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "arfcn={} ts={} ss={} chan={} fn={} signal={}dBm snr={}dB from={} payload={}",
                header.arfcn,
                header.timeslot,
                header.sub_slot,
                channel_label(chan_name, acch),
                header.frame_number,
                header.signal_dbm,
                header.snr_db,
                source,
                to_hex(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

/// Print the counters of a finished send.
pub fn print_stats(stats: &TapStats, format: OutputFormat) {
    let rows = [
        ("sent", stats.sent),
        ("queued", stats.queued),
        ("dropped_full", stats.dropped_full),
        ("short_writes", stats.short_writes),
        ("send_errors", stats.send_errors),
        ("sink_discarded", stats.sink_discarded),
        ("dropped_shutdown", stats.dropped_shutdown),
    ];

    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = rows
                .iter()
                .map(|(key, value)| (key.to_string(), serde_json::Value::from(*value)))
                .collect();
            println!("{}", serde_json::Value::Object(map));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (key, value) in rows {
                table.add_row(vec![key.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = rows
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            println!("{}", line.join(" "));
        }
        OutputFormat::Raw => {}
    }
}

/// Print the result of a bit conversion: `bits` as a `0`/`1` string and
/// its packed form as hex.
pub fn print_bits(bits: &str, packed: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "num_bits": bits.len(),
                "bits": bits,
                "hex": to_hex(packed),
            });
            println!("{out}");
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BITS", "HEX", "LENGTH"])
                .add_row(vec![bits.to_string(), to_hex(packed), bits.len().to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("bits={bits} hex={}", to_hex(packed)),
        OutputFormat::Raw => print_raw(packed),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a hex string; whitespace and an optional `0x` prefix are ignored.
pub fn from_hex(input: &str) -> Option<Vec<u8>> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

fn channel_label(name: &str, acch: bool) -> String {
    if acch {
        format!("{name}+ACCH")
    } else {
        name.to_string()
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_helpers() {
        assert_eq!(to_hex(&[0x00, 0x64, 0xe2]), "0064e2");
        assert_eq!(from_hex("0x01 03 01"), Some(vec![0x01, 0x03, 0x01]));
        assert_eq!(from_hex("abc"), None);
        assert_eq!(from_hex("zz"), None);
        assert_eq!(from_hex(""), Some(Vec::new()));
    }

    #[test]
    fn channel_labels() {
        assert_eq!(channel_label("SDCCH/8", true), "SDCCH/8+ACCH");
        assert_eq!(channel_label("BCCH", false), "BCCH");
    }
}
