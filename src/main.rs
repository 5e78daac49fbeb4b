use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use release_candidate::{
    release_version, structured_output, Clock, Config, ConfigError, FixedClock, OutputError,
    Settings, SystemClock, TemplateError, VersionIdentifier,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Template(#[from] TemplateError),

    #[error("{0}")]
    Output(#[from] OutputError),

    #[error("{0}")]
    UnparseableDate(#[from] chrono::ParseError),
}

/// Configuration sources. Flags take precedence over the configuration file, which takes
/// precedence over defaults.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// TOML file with any of `release_version_format`, `encoding`, `output_uri`, and
    /// `output_template`
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// How to turn the current version into the release version, e.g.
    /// "{{ api_version }}.{{ timestamp('yyyyMMdd') }}" [default: "{{ version }}"]
    #[arg(short = 'f', long, value_name = "TEMPLATE")]
    release_version_format: Option<String>,

    /// How to structure the output, e.g. "PROJECT_VERSION={{ version }}"
    /// [default: "{{ version }}"]
    #[arg(short = 't', long, value_name = "TEMPLATE")]
    output_template: Option<String>,

    /// Where to write output: "stdout" or a "file:" URI with an absolute path [default: stdout]
    #[arg(short, long, value_name = "URI")]
    output_uri: Option<String>,

    /// Output encoding: UTF-8, US-ASCII, or ISO-8859-1 [default: UTF-8]
    #[arg(short, long)]
    encoding: Option<String>,
}

impl ConfigArgs {
    fn to_settings(&self) -> Result<Settings, CliError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        // flags override whatever the file said
        let overrides = [
            (&mut config.release_version_format, &self.release_version_format),
            (&mut config.output_template, &self.output_template),
            (&mut config.output_uri, &self.output_uri),
            (&mut config.encoding, &self.encoding),
        ];
        for (field, flag) in overrides {
            if let Some(value) = flag {
                field.clone_from(value);
            }
        }

        tracing::debug!("Using configuration {:?}", config);
        Ok(config.validate()?)
    }
}

/// [CLOCK] Where `timestamp` tokens get the current time. Defaults to the local time.
#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
struct ClockArg {
    /// [CLOCK] Use the current UTC time. Exclusive with `--at`.
    #[arg(long)]
    utc: bool,

    /// [CLOCK] Use a fixed RFC 3339 time, e.g. `2015-08-01T00:00:00Z`, for reproducible output.
    /// Exclusive with `--utc`.
    #[arg(long, value_name = "DATETIME")]
    at: Option<String>,
}

impl ClockArg {
    /// Reads the time once, so that every template in one invocation sees the same instant.
    fn to_clock(&self) -> Result<FixedClock, CliError> {
        let now = if let Some(at) = &self.at {
            DateTime::parse_from_rfc3339(at)?
        } else if self.utc {
            Utc::now().fixed_offset()
        } else {
            SystemClock.now()
        };
        Ok(FixedClock::new(now))
    }
}

#[derive(Args, Debug)]
struct Invocation {
    /// The project's current version, e.g. `1.2.0-beta-SNAPSHOT`
    current: String,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    clock: ClockArg,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log more. Repeat for even more. `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Renders the output template for the current version.
    Version(Invocation),

    /// Derives the release version with the release version format, then renders the output
    /// template for it.
    ///
    /// With the version `1.2.0-beta-SNAPSHOT` and the format
    /// "{{ qualified_api_version }}-builton.{{ timestamp('yyyyMMdd') }}", the release version on
    /// 2015-08-01 is `1.2.0-beta-builton.20150801`.
    ReleaseVersion(Invocation),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let delivered = do_work(&cli.command).and_then(|(output, settings)| {
        settings.target.deliver(&output, settings.charset)?;
        Ok(())
    });

    if let Err(e) = delivered {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // logs go to stderr so they never mix with output written to stdout
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Renders the output for a command, returning it with the settings that say where it goes.
fn do_work(command: &Commands) -> Result<(String, Settings), CliError> {
    let (invocation, derive_release) = match command {
        Commands::Version(invocation) => (invocation, false),
        Commands::ReleaseVersion(invocation) => (invocation, true),
    };

    let settings = invocation.config.to_settings()?;
    let clock = invocation.clock.to_clock()?;

    let current = VersionIdentifier::parse(&invocation.current);
    tracing::debug!(
        "Parsed `{}` into release {:?}, qualifier {:?}, build metadata {:?}",
        current,
        current.numeric_release(),
        current.qualifier(),
        current.build_metadata()
    );

    let version = if derive_release {
        let release = release_version(&current, &settings.release_version_format, &clock)?;
        tracing::info!("Release version for {} is {}", current, release);
        release
    } else {
        current
    };

    let output = structured_output(&version, &settings.output_template, &clock)?;
    Ok((output, settings))
}
