use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use gsmcore_tap::GsmtapHeader;
use tracing::{info, warn};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_header, OutputFormat};

const RECV_BUFFER_SIZE: usize = 65_535;
const WAKE_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let idle_timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let socket = UdpSocket::bind((args.bind.as_str(), args.port))
        .map_err(|err| io_error(&format!("bind {}:{} failed", args.bind, args.port), err))?;
    socket
        .set_read_timeout(Some(WAKE_INTERVAL))
        .map_err(|err| io_error("socket setup failed", err))?;
    let local = socket
        .local_addr()
        .map_err(|err| io_error("socket setup failed", err))?;
    info!(target: "gsmcore::tap", addr = %local, "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let mut printed = 0usize;
    let mut last_seen = Instant::now();

    while running.load(Ordering::SeqCst) {
        let (len, source) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                if let Some(timeout) = idle_timeout {
                    if last_seen.elapsed() >= timeout {
                        return Err(CliError::new(
                            TIMEOUT,
                            format!("no datagram received within {timeout:?}"),
                        ));
                    }
                }
                continue;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("receive failed", err)),
        };
        last_seen = Instant::now();

        let (header, payload) = match GsmtapHeader::decode(&buf[..len]) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(target: "gsmcore::tap", %source, len, error = %err, "ignoring datagram");
                continue;
            }
        };

        print_header(&header, payload, source, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
