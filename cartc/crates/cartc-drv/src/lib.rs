//! cartc-drv - Command-Line Driver
//!
//! Thin front end over the pipeline crates: parse a configuration file,
//! layer any extra override lines on top, and print the resulting variant
//! dictionaries.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as CliParser;
use tracing_subscriber::EnvFilter;

use cartc_gen::{Dicts, GenerateDicts};
use cartc_par::{Parser, ParserConfig};
use cartc_util::{DictValue, FlatDict};

/// Compile a Cartesian configuration into variant dictionaries.
#[derive(Debug, CliParser)]
#[command(
    name = "cartc",
    version,
    about = "Compile a Cartesian configuration into variant dictionaries",
    after_help = "Example:\n\n    cartc tests.cfg \"only my_set\" \"no qcow2\""
)]
pub struct Cli {
    /// Configuration file to compile.
    pub filename: PathBuf,

    /// Extra configuration lines applied after the file, in order.
    pub extra: Vec<String>,

    /// Include debug messages in console output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Show full dict names instead of short names.
    #[arg(short, long)]
    pub fullname: bool,

    /// Show dict contents.
    #[arg(short, long)]
    pub contents: bool,

    /// Output the dictionaries in a parseable list form.
    #[arg(short, long)]
    pub repr: bool,

    /// Use only the default variant of each axis that declares one.
    #[arg(short, long)]
    pub defaults: bool,

    /// Comma-separated axes to expand even when defaults are enabled.
    #[arg(short, long, value_name = "NAME,NAME,...")]
    pub expand: Option<String>,

    /// Don't drop variables with different suffixes and the same value.
    #[arg(short = 's', long = "skip-dups", action = clap::ArgAction::SetFalse)]
    pub skipdups: bool,
}

/// Runs the driver: parse, enumerate, print.
pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose);

    let expand_defaults = cli
        .expand
        .as_deref()
        .map(|e| e.split(',').map(|x| x.trim().to_owned()).collect())
        .unwrap_or_default();
    let config = ParserConfig {
        defaults: cli.defaults,
        expand_defaults,
        debug: cli.verbose,
    };

    let mut parser = Parser::from_file(&cli.filename, config)
        .with_context(|| format!("failed to parse {}", cli.filename.display()))?;
    for extra in &cli.extra {
        parser
            .parse_string(extra)
            .with_context(|| format!("failed to parse override {extra:?}"))?;
    }

    if cli.verbose {
        print!("{}", parser.node().dump(0, true));
    }

    let dicts = parser.get_dicts(cli.skipdups);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.repr {
        print_dicts_repr(&mut out, dicts)?;
    } else {
        print_dicts_default(&mut out, &cli, dicts)?;
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_dicts_default(out: &mut impl Write, cli: &Cli, dicts: Dicts) -> Result<()> {
    let key = if cli.fullname { "name" } else { "shortname" };
    for (count, dict) in dicts.enumerate() {
        let name = dict
            .get(key)
            .map(ToString::to_string)
            .unwrap_or_default();
        writeln!(out, "dict {:4}:  {}", count + 1, name)?;
        if cli.contents {
            let mut keys: Vec<&String> = dict.keys().collect();
            keys.sort();
            for key in keys {
                writeln!(out, "    {} = {}", key, dict[key])?;
            }
        }
    }
    Ok(())
}

fn print_dicts_repr(out: &mut impl Write, dicts: Dicts) -> Result<()> {
    writeln!(out, "[")?;
    for dict in dicts {
        writeln!(out, "{},", render_repr(&dict))?;
    }
    writeln!(out, "]")?;
    Ok(())
}

fn render_repr(dict: &FlatDict) -> String {
    let mut keys: Vec<&String> = dict.keys().collect();
    keys.sort();
    let entries: Vec<String> = keys
        .into_iter()
        .map(|key| match &dict[key] {
            DictValue::Str(s) => format!("'{key}': '{s}'"),
            other => format!("'{key}': {other}"),
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}
