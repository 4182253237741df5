//! quizsync server binary.
//!
//! Runs the HTTP server hosting the synchronized quiz rooms over
//! WebSocket connections.

use clap::Parser;
use qzs_core::*;
use qzs_gameroom::ClockConfig;
use qzs_gameroom::RoundConfig;

/// Real-time coordination server for the synchronized multi-room quiz.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Listening address.
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND)]
    bind: String,
    /// Full round length in seconds.
    #[arg(long, default_value_t = CYCLE_SECS)]
    cycle: Secs,
    /// Lobby length in seconds.
    #[arg(long, default_value_t = LOBBY_SECS)]
    lobby: Secs,
    /// Most lobby seconds the coarse adjustment may drop per cycle.
    #[arg(long, default_value_t = MAX_SKIP_FWD)]
    max_skip: Secs,
    /// Aggressive tick calibration for hosts with heavy timer slop.
    #[arg(long)]
    large_skew: bool,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let cli = Cli::parse();
    qzs_core::log();
    qzs_core::trap();
    if cli.lobby >= cli.cycle {
        log::error!("lobby ({}s) must be shorter than the cycle ({}s)", cli.lobby, cli.cycle);
        std::process::exit(2);
    }
    qzs_server::run(qzs_server::Options {
        bind: cli.bind,
        round: RoundConfig {
            cycle: cli.cycle,
            lobby: cli.lobby,
            max_skip_fwd: cli.max_skip,
        },
        clock: ClockConfig {
            cycle: cli.cycle,
            large_skew: cli.large_skew,
            ..ClockConfig::default()
        },
    })
    .await
}
