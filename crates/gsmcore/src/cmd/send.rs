use std::fs;
use std::time::{Duration, Instant};

use gsmcore_tap::{
    chantype, make_msg, Delivery, GsmtapInst, RadioContext, TapConfig, TapError, TapStats, TapTokens,
};
use gsmcore_transport::{Reactor, TapSocket, Token};
use tracing::{debug, info};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{
    io_error, tap_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{from_hex, print_stats, OutputFormat};

const SOURCE: Token = Token(0);
const SINK: Token = Token(1);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    let ctx = radio_context(&args);
    let delivery = if args.queued {
        if args.queue_limit == 0 {
            return Err(CliError::new(USAGE, "--queue-limit must be greater than zero"));
        }
        Delivery::Queued {
            limit: args.queue_limit,
        }
    } else {
        Delivery::Direct
    };

    let config = TapConfig::default()
        .with_host(args.host.clone())
        .with_port(args.port)
        .with_delivery(delivery)
        .with_sink(args.sink);
    let mut tap = GsmtapInst::open(&config).map_err(|err| tap_error("open failed", err))?;

    let stats = if args.queued {
        let timeout = parse_duration(&args.timeout)?;
        send_queued(&mut tap, ctx, &payload, args.count, timeout)?
    } else {
        for i in 0..args.count {
            let ctx = RadioContext {
                frame_number: ctx.frame_number.wrapping_add(i),
                ..ctx
            };
            tap.send(&ctx, &payload)
                .map_err(|err| tap_error("send failed", err))?;
        }
        tap.close()
    };

    print_stats(&stats, format);
    Ok(SUCCESS)
}

fn send_queued(
    tap: &mut GsmtapInst<TapSocket>,
    ctx: RadioContext,
    payload: &[u8],
    count: u32,
    timeout: Duration,
) -> CliResult<TapStats> {
    let mut reactor = Reactor::new().map_err(|err| transport_error("reactor failed", err))?;
    tap.register(
        reactor.registry(),
        TapTokens {
            source: SOURCE,
            sink: SINK,
        },
    )
    .map_err(|err| tap_error("register failed", err))?;

    let deadline = Instant::now() + timeout;

    for i in 0..count {
        let ctx = RadioContext {
            frame_number: ctx.frame_number.wrapping_add(i),
            ..ctx
        };
        let mut msg = make_msg(&ctx, payload).map_err(|err| tap_error("encode failed", err))?;

        // Backpressure: drive the reactor until the queue has room again.
        loop {
            match tap.send_msg(msg) {
                Ok(()) => break,
                Err(TapError::QueueFull(full)) => {
                    msg = full.into_inner();
                    poll(&mut reactor, tap, deadline)?;
                }
                Err(err) => return Err(tap_error("send failed", err)),
            }
        }
    }

    while tap.queue_len() > 0 {
        poll(&mut reactor, tap, deadline)?;
    }

    info!(target: "gsmcore::tap", sent = tap.stats().sent, "queue drained");
    Ok(tap.stats())
}

fn poll(
    reactor: &mut Reactor,
    tap: &mut GsmtapInst<TapSocket>,
    deadline: Instant,
) -> CliResult<()> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(CliError::new(
            TIMEOUT,
            format!("timed out with {} messages queued", tap.queue_len()),
        ));
    }

    match reactor.poll_once(Some(remaining.min(POLL_INTERVAL)), tap) {
        Ok(_) => Ok(()),
        // A failed write has already been counted and the message dropped.
        Err(err @ (TapError::ShortWrite { .. } | TapError::SendFailed(_))) => {
            debug!(target: "gsmcore::tap", error = %err, "queued write failed");
            Ok(())
        }
        Err(err) => Err(tap_error("poll failed", err)),
    }
}

fn radio_context(args: &SendArgs) -> RadioContext {
    let mut ctx = RadioContext {
        arfcn: args.arfcn,
        timeslot: args.timeslot,
        sub_slot: args.sub_slot,
        chan_type: args.chan_type.unwrap_or(chantype::UNKNOWN),
        frame_number: args.frame_number,
        signal_dbm: args.signal,
        snr_db: args.snr,
    };

    if let Some(chan_nr) = args.rsl_chan {
        ctx.chan_type = chantype::from_chan_nr(chan_nr, args.link_id);
        ctx.timeslot = chantype::timeslot_from_chan_nr(chan_nr);
        ctx.sub_slot = chantype::sub_slot_from_chan_nr(chan_nr);
    }
    ctx
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return from_hex(hex)
            .ok_or_else(|| CliError::new(USAGE, format!("--hex is not valid hex: {hex}")));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: SendArgs,
    }

    fn parse(extra: &[&str]) -> SendArgs {
        let mut argv = vec!["send"];
        argv.extend_from_slice(extra);
        Wrapper::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn explicit_radio_context() {
        let args = parse(&[
            "--arfcn",
            "100",
            "--timeslot",
            "3",
            "--frame-number",
            "123456",
            "--signal",
            "-75",
            "--chan-type",
            "0x88",
        ]);
        let ctx = radio_context(&args);
        assert_eq!(ctx.arfcn, 100);
        assert_eq!(ctx.timeslot, 3);
        assert_eq!(ctx.frame_number, 123_456);
        assert_eq!(ctx.signal_dbm, -75);
        assert_eq!(ctx.chan_type, chantype::SDCCH8 | chantype::ACCH);
    }

    #[test]
    fn rsl_channel_number_sets_channel_fields() {
        // SDCCH/8 sub-channel 5 on timeslot 1, SACCH
        let args = parse(&["--rsl-chan", "0x69", "--link-id", "0x40", "--timeslot", "6"]);
        let ctx = radio_context(&args);
        assert_eq!(ctx.chan_type, chantype::SDCCH8 | chantype::ACCH);
        assert_eq!(ctx.timeslot, 1);
        assert_eq!(ctx.sub_slot, 5);
    }

    #[test]
    fn payload_from_hex() {
        let args = parse(&["--hex", "01 03 01"]);
        assert_eq!(resolve_payload(&args).unwrap(), vec![0x01, 0x03, 0x01]);

        let args = parse(&["--hex", "0g"]);
        assert_eq!(resolve_payload(&args).unwrap_err().code, USAGE);

        let args = parse(&[]);
        assert!(resolve_payload(&args).unwrap().is_empty());
    }

    #[test]
    fn timeslot_out_of_range_is_rejected() {
        assert!(Wrapper::try_parse_from(["send", "--timeslot", "8"]).is_err());
    }

    #[test]
    fn chan_type_conflicts_with_rsl_chan() {
        let err = Wrapper::try_parse_from(["send", "--chan-type", "1", "--rsl-chan", "0x80"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
