use std::fmt;

use clap::Args;
use log::LevelFilter;

#[derive(Args, Debug)]
pub struct VerbosityFlag {
    #[arg(
        short,
        long,
        global = true,
        default_value_t = false,
        help = "Set the verbosity to quiet"
    )]
    quiet: bool,

    #[arg(
        short,
        long,
        global = true,
        default_value_t = false,
        help = "Set the verbosity to verbose (default)"
    )]
    verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        default_value_t = false,
        help = "Set the verbosity to debug"
    )]
    debug: bool,

    #[arg(long, global = true, default_value_t = false, help = "Set the verbosity to trace")]
    trace: bool,
}

impl VerbosityFlag {
    /// Returns the log level filter corresponding to the given verbosity flags.
    pub fn log_level_filter(&self) -> LevelFilter {
        self.verbosity().log_level_filter()
    }

    /// Returns the verbosity level corresponding to the given verbosity flags,
    /// the quietest flag wins.
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.trace {
            Verbosity::Trace
        } else if self.debug {
            Verbosity::Debug
        } else {
            Verbosity::Verbose
        }
    }

    /// Initialises the global logger at the selected level. The `RUST_LOG`
    /// environment variable can still override it per module.
    pub fn init_logger(&self) {
        env_logger::Builder::new()
            .filter_level(self.log_level_filter())
            .parse_default_env()
            .init();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Verbose,
    Debug,
    Trace,
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verbosity::Quiet => write!(f, "quiet"),
            Verbosity::Verbose => write!(f, "verbose"),
            Verbosity::Debug => write!(f, "debug"),
            Verbosity::Trace => write!(f, "trace"),
        }
    }
}

impl Verbosity {
    /// Returns the log filter level corresponding to this verbosity.
    pub fn log_level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Off,
            Verbosity::Verbose => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
            Verbosity::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        verbosity: VerbosityFlag,
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::parse_from(["test"]);
        assert_eq!(cli.verbosity.verbosity(), Verbosity::Verbose);

        let cli = Cli::parse_from(["test", "--debug"]);
        assert_eq!(cli.verbosity.log_level_filter(), LevelFilter::Debug);

        let cli = Cli::parse_from(["test", "--quiet", "--trace"]);
        assert_eq!(cli.verbosity.verbosity(), Verbosity::Quiet);
    }
}
