#[macro_use]
extern crate log;

use env_logger::{Builder, Target};

mod cli;
use cli::Cli;

use gnss_smb::prelude::{run_stations, Error, Reporter, RunConfig};

fn run(cli: &Cli) -> Result<Vec<(String, Error)>, Error> {
    let cfg = RunConfig::from_file(cli.config_path()?)?;
    let range = cli.range()?;
    let stations = cli.stations()?;
    let reporter = Reporter::new(cli.output()?);

    let outcomes = run_stations(&cfg, &stations, range, &reporter);

    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(paths) => {
                for path in paths.iter() {
                    info!("{}: generated {}", outcome.station, path.display());
                }
            },
            Err(e) => failures.push((outcome.station, e)),
        }
    }
    Ok(failures)
}

pub fn main() {
    let mut builder = Builder::from_default_env();
    builder
        .target(Target::Stdout)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    let cli = Cli::new();

    match run(&cli) {
        Ok(failures) => {
            if let Some((_, first)) = failures.first() {
                for (station, e) in failures.iter() {
                    eprintln!("{}: {}", station, e);
                }
                std::process::exit(first.exit_code());
            }
        },
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        },
    }
}
