use std::ffi::CString;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use kms_planeblend::harness::Subtest;
use kms_planeblend::topology::Topology;
use kms_planeblend::Card;
use tracing_subscriber::EnvFilter;

/// Exercise per-plane alpha blending on a DRM device.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// DRM card device to open.
    #[arg(long, env = "KMS_PLANEBLEND_DEVICE", default_value = "/dev/dri/card0")]
    device: String,

    /// Run only the named subtest. May be repeated.
    #[arg(long = "run-subtest", value_name = "NAME")]
    run_subtest: Vec<String>,

    /// Print the available subtests and exit.
    #[arg(long)]
    list_subtests: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    if args.list_subtests {
        for t in Subtest::ALL {
            println!("{t}");
        }
        return Ok(());
    }

    let subtests = if args.run_subtest.is_empty() {
        Subtest::ALL.to_vec()
    } else {
        args.run_subtest
            .iter()
            .map(|name| Subtest::from_name(name).ok_or_else(|| anyhow!("unknown subtest {name:?}")))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    let path = CString::new(args.device.as_str()).context("device path contains a NUL byte")?;
    let mut card = Card::open(&path).map_err(|e| {
        let e: linux_io::result::Error = e.into();
        anyhow!(e.into_std_io_error()).context(format!("can't open {}", args.device))
    })?;
    card.become_master()
        .context("can't become DRM master; is another display server running?")?;
    let driver = card.driver_name().context("can't read driver name")?;
    let driver = String::from_utf8_lossy(&driver);
    tracing::info!(device = %args.device, %driver, "opened card");

    let topology = Topology::build(&card).context("can't discover device topology")?;

    let mut failed = None;
    for t in subtests {
        println!("Starting subtest: {t}");
        let mut out = String::new();
        let result = t.run(&topology, &mut out);
        print!("{out}");
        match result {
            Ok(()) => println!("Subtest {t}: SUCCESS"),
            Err(e) => {
                println!("Subtest {t}: FAIL");
                failed = Some((t, e));
                break;
            }
        }
    }

    let released = topology.release();
    if let Some((t, e)) = failed {
        return Err(anyhow::Error::new(e).context(format!("subtest {t} failed")));
    }
    released.context("can't release mode blobs")?;
    Ok(())
}
