use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("gsmcore {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("GSMCORE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "gsmtap: version {}, udp port {}, header {} bytes",
        gsmcore_tap::GSMTAP_VERSION,
        gsmcore_tap::GSMTAP_UDP_PORT,
        gsmcore_tap::HEADER_SIZE
    );

    Ok(SUCCESS)
}
