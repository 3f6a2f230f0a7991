//! Run QVegas against a simulated bottleneck and print one line per round.
//!
//! Useful for eyeballing how the alpha / beta / gamma bounds shape the
//! window on different paths without a real network.

use std::time::Duration;

use clap::Parser;
use qvegas::config::ConfigArgs;
use qvegas::simulation::{BottleneckPath, PathCondition, RenoSocket, SimulatedFlow};
use qvegas::transport::{QVegasInfo, QVegasModule, QVegasTunables};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PathPreset {
    Datacenter,
    Continental,
    Intercontinental,
}

impl From<PathPreset> for PathCondition {
    fn from(preset: PathPreset) -> Self {
        match preset {
            PathPreset::Datacenter => PathCondition::DATACENTER,
            PathPreset::Continental => PathCondition::CONTINENTAL,
            PathPreset::Intercontinental => PathCondition::INTERCONTINENTAL,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "qvegas-sim")]
#[command(about = "Simulate a QVegas flow over a single bottleneck")]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,

    /// Round trips to simulate
    #[arg(long, default_value = "100")]
    rounds: usize,

    #[arg(long, value_enum, default_value = "continental")]
    path: PathPreset,

    /// Initial congestion window (packets)
    #[arg(long, default_value = "10")]
    initial_cwnd: u32,

    /// Upper bound on the window (packets)
    #[arg(long)]
    clamp: Option<u32>,

    /// Maximum extra delay per RTT sample, in microseconds
    #[arg(long, default_value = "0")]
    jitter_us: u64,

    #[arg(long, default_value = "0")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    #[cfg(feature = "trace")]
    qvegas::tracing::tracer::init_tracer(args.config.log_level)?;

    let config = args.config.build()?;
    let tunables = QVegasTunables::global();
    config.apply(&tunables);
    tracing::info!(params = ?config.qvegas, path = ?args.path, "Starting simulation");

    let module = QVegasModule::with_default_budget(tunables)?;
    let mut socket = RenoSocket::new(args.initial_cwnd);
    if let Some(clamp) = args.clamp {
        socket = socket.with_clamp(clamp);
    }
    let path = BottleneckPath::new(args.path.into())
        .with_jitter(Duration::from_micros(args.jitter_us), args.seed);
    tracing::info!(
        base_rtt_us = path.base_rtt_us(),
        bdp_packets = path.bdp_packets(),
        "Bottleneck path ready"
    );
    let mut flow = SimulatedFlow::new(module.connection(), socket, path);

    println!("round\tsent\tqueued\tdropped\tmin_rtt_us\tcwnd\tssthresh\tbase_rtt_us");
    for _ in 0..args.rounds {
        let report = flow.run_round();
        let info = QVegasInfo::from(flow.cc.state());
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            report.round,
            report.sent,
            report.queued,
            report.dropped,
            report.min_rtt_us,
            report.cwnd,
            report.ssthresh,
            info.base_rtt.map_or_else(|| "-".to_string(), |rtt| rtt.to_string()),
        );
    }

    Ok(())
}
