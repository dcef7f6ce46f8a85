/// `haeck` -- Check the High Availability data in a support bundle
///
/// Run with --help for brief help.
///
/// The bundle directory is taken from --bundle, or from $SCA_BUNDLE, or is the current directory.
/// Problems reading the bundle are not fatal; they are reported as ERROR lines by `check` and as
/// log messages by the other commands, and the output is then empty.
mod check;
mod cluster;
mod format;
mod sbd;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use scautils::{read_check_config, Bundle, CheckConfig, StatusCollector};
use std::io::{self, Write};
use std::process;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print information about the program
    Version,

    /// Print information about the SBD devices
    Sbd(PrintCmdArgs),

    /// Print the cluster properties
    ClusterConfig(PrintCmdArgs),

    /// Check the HA data and print findings
    Check(CheckCmdArgs),
}

#[derive(Args, Debug)]
pub struct PrintCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    #[command(flatten)]
    print_args: PrintArgs,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct CheckCmdArgs {
    #[command(flatten)]
    source_args: SourceArgs,

    /// Smallest acceptable SBD msgwait timeout in seconds [default: from config file, or 300]
    #[arg(long)]
    msgwait_min: Option<i64>,

    #[command(flatten)]
    meta_args: MetaArgs,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Select the support bundle directory [default: $SCA_BUNDLE, or the current directory]
    #[arg(long, env = "SCA_BUNDLE")]
    bundle: Option<String>,

    /// File containing JSON data with check settings [default: none]
    #[arg(long)]
    config_file: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct PrintArgs {
    /// Select fields and format for the output, "help" for a list [default: all fields, fixed]
    #[arg(long)]
    fmt: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct MetaArgs {
    /// env_logger-style filter string (e.g. "debug"); overrides RUST_LOG
    #[arg(long)]
    log_filter: Option<String>,
}

const DEFAULT_LOG_FILTER: &str = "warn";

fn init_logging(cli_filter: Option<&str>) {
    let env = Env::default().default_filter_or(DEFAULT_LOG_FILTER);
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(filter) = cli_filter {
        builder.parse_filters(filter);
    }
    builder.format(|buf, record| {
        writeln!(buf, "[{:<5} {}] {}", record.level(), record.target(), record.args())
    });
    builder.init();
}

fn main() {
    match haeck() {
        Ok(()) => {}
        Err(msg) => {
            eprintln!("ERROR: {:#}", msg);
            process::exit(1);
        }
    }
}

fn haeck() -> Result<()> {
    let cli = Cli::parse();

    let (source_args, meta_args) = match cli.command {
        Commands::Version => {
            println!("haeck version({})", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Sbd(ref args) | Commands::ClusterConfig(ref args) => {
            (&args.source_args, &args.meta_args)
        }
        Commands::Check(ref args) => (&args.source_args, &args.meta_args),
    };

    init_logging(meta_args.log_filter.as_deref());

    let config = if let Some(ref filename) = source_args.config_file {
        read_check_config(filename)?
    } else {
        CheckConfig::default()
    };
    let bundle = Bundle::new(source_args.bundle.as_deref().unwrap_or("."));
    log::debug!("Reading {} in {}", config.ha_file, bundle.dir().display());

    let mut stdout = io::stdout();
    let mut status = StatusCollector::new();
    match cli.command {
        Commands::Sbd(ref args) => {
            if format::maybe_help(&mut stdout, &args.print_args.fmt, &sbd::fmt_help)? {
                return Ok(());
            }
            let records = haelib::read_sbd_info(&bundle, &config.ha_file, &mut status);
            report_errors(&status);
            sbd::print(&mut stdout, &args.print_args, &records)
        }
        Commands::ClusterConfig(ref args) => {
            if format::maybe_help(&mut stdout, &args.print_args.fmt, &cluster::fmt_help)? {
                return Ok(());
            }
            let cluster = haelib::read_cluster_config(&bundle, &config.ha_file, &mut status);
            report_errors(&status);
            cluster::print(&mut stdout, &args.print_args, cluster)
        }
        Commands::Check(ref args) => {
            let msgwait_min = args.msgwait_min.unwrap_or(config.msgwait_min);
            check::run_checks(&bundle, &config.ha_file, msgwait_min, &mut status);
            check::print(&mut stdout, &status)
        }
        Commands::Version => Ok(()),
    }
}

fn report_errors(status: &StatusCollector) {
    for (_, message) in status.messages() {
        log::error!("{message}");
    }
}
