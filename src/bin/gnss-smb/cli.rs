// The Cli gathers the run definition: configuration, stations and period.
use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command};

use gnss_smb::prelude::{DateRange, Error};

pub struct Cli {
    matches: ArgMatches,
}

impl Cli {
    pub fn new() -> Self {
        let cmd = Command::new("gnss-smb")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Snow accumulation, SWE and density from GNSS reflectometry and refractometry")
            .arg_required_else_help(true)
            .color(ColorChoice::Always)
            .subcommand_required(true)
            .subcommand(
                Command::new("run")
                    .about("Process one or several stations over a period of time")
                    .arg(
                        Arg::new("config")
                            .short('c')
                            .long("config")
                            .action(ArgAction::Set)
                            .required(true)
                            .help("Stations configuration (JSON)"),
                    )
                    .arg(
                        Arg::new("station")
                            .short('s')
                            .long("station")
                            .action(ArgAction::Append)
                            .required(false)
                            .help("Station to process. Process all stations when omitted."),
                    )
                    .arg(
                        Arg::new("start")
                            .long("start")
                            .action(ArgAction::Set)
                            .required(true)
                            .help("First day (YYYY-MM-DD)"),
                    )
                    .arg(
                        Arg::new("end")
                            .long("end")
                            .action(ArgAction::Set)
                            .required(true)
                            .help("Last day, included (YYYY-MM-DD)"),
                    )
                    .arg(
                        Arg::new("output")
                            .short('o')
                            .long("output")
                            .action(ArgAction::Set)
                            .required(false)
                            .default_value("output")
                            .help("Output directory"),
                    ),
            );
        Self {
            matches: cmd.get_matches(),
        }
    }

    fn run(&self) -> Result<&ArgMatches, Error> {
        self.matches
            .subcommand_matches("run")
            .ok_or_else(|| Error::Config("unknown command".to_string()))
    }

    fn required(&self, key: &str) -> Result<&String, Error> {
        self.run()?
            .get_one::<String>(key)
            .ok_or_else(|| Error::Config(format!("--{} is required", key)))
    }

    pub fn config_path(&self) -> Result<&String, Error> {
        self.required("config")
    }

    pub fn output(&self) -> Result<&String, Error> {
        self.required("output")
    }

    pub fn stations(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .run()?
            .get_many::<String>("station")
            .map(|ids| ids.cloned().collect())
            .unwrap_or_default())
    }

    pub fn range(&self) -> Result<DateRange, Error> {
        DateRange::parse(self.required("start")?, self.required("end")?)
    }
}
