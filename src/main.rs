//! tof-acceptance binary: runs the acceptance protocol against a camera.

use std::io::{self, Write};

use clap::{CommandFactory, Parser};
use log::{info, warn};
use tof_acceptance::settings::MIN_STREAM_SECONDS;
use tof_acceptance::{factory, Protocol, Settings, Stage, StagePlan};

/// Exit code for usage errors and the informational flags.
const USAGE_EXIT: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "tof-acceptance",
    about = "Hardware-in-the-loop acceptance protocol for ToF depth cameras",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Args {
    /// Print the version and exit
    #[arg(short = 'v')]
    version: bool,
    /// Print this help and exit
    #[arg(short = 'h')]
    help: bool,
    /// Streaming duration in seconds, raised to 10 when shorter
    #[arg(short = 'r', value_name = "SECONDS", allow_negative_numbers = true)]
    seconds: Option<i64>,
    /// Use case to run, e.g. `MODE_9_5FPS`
    #[arg(short = 'm', value_name = "MODE")]
    mode: Option<String>,
    /// Comma-separated stages to run, in order
    #[arg(long, value_delimiter = ',', value_name = "LIST")]
    stages: Option<Vec<Stage>>,
    /// Run every stage even after a failure
    #[arg(long)]
    keep_going: bool,
    /// Access code for the camera; empty for none
    #[arg(long, value_name = "CODE")]
    access_code: Option<String>,
}

impl Args {
    const fn uses_defaults(&self) -> bool {
        self.seconds.is_none()
            && self.mode.is_none()
            && self.stages.is_none()
            && !self.keep_going
            && self.access_code.is_none()
    }
}

/// Clamp the requested window, announcing adjustments.
fn stream_seconds(requested: i64, discard_after: u32) -> u32 {
    if requested < i64::from(MIN_STREAM_SECONDS) {
        warn!(
            "streaming duration {requested} s is too short, using {MIN_STREAM_SECONDS} s"
        );
        return MIN_STREAM_SECONDS;
    }
    let seconds = u32::try_from(requested).unwrap_or(u32::MAX);
    if seconds > discard_after {
        info!(
            "streaming for more than {discard_after} s, recording is discarded"
        );
    }
    seconds
}

fn settings_from(args: &Args) -> Settings {
    let mut settings = Settings::default().with_exit_on_error(!args.keep_going);
    if let Some(seconds) = args.seconds {
        let discard_after = settings.recording.discard_after_seconds;
        settings = settings.with_stream_seconds(stream_seconds(seconds, discard_after));
    }
    if let Some(mode) = &args.mode {
        settings = settings.with_use_case(mode.as_str());
    }
    if let Some(code) = &args.access_code {
        settings = settings.with_access_code(Some(code.clone()));
    }
    settings
}

fn run(args: &Args) -> io::Result<u8> {
    let mut stdout = io::stdout().lock();
    if args.version {
        writeln!(
            stdout,
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )?;
        return Ok(USAGE_EXIT);
    }
    if args.help {
        Args::command().write_help(&mut stdout)?;
        return Ok(USAGE_EXIT);
    }
    if args.uses_defaults() {
        info!("Using Default Settings.");
    }

    let settings = settings_from(args);
    let plan = args
        .stages
        .as_deref()
        .map_or_else(StagePlan::reference, StagePlan::from_stages);
    info!(
        "use case {}, streaming for {} s",
        settings.use_case, settings.stream_seconds
    );

    let camera = factory::create_camera(&settings);
    let mut protocol = Protocol::new(camera, settings);
    let report = protocol.run(&plan);

    for outcome in report.outcomes() {
        writeln!(stdout, "{outcome}")?;
    }
    Ok(report.exit_code())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let code = match Args::try_parse() {
        Ok(args) => run(&args).unwrap_or_else(|err| {
            eprintln!("Error: {err}");
            USAGE_EXIT
        }),
        Err(err) => {
            // Nothing more to report if stderr itself is gone.
            let _ = err.print();
            USAGE_EXIT
        }
    };
    std::process::exit(i32::from(code));
}
