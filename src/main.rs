use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};

use fcheck::comparator::Comparator;
use fcheck::count::count_entries;
use fcheck::exclude::read_exclusions;
use fcheck::generator::Generator;
use fcheck::printer::Printer;
use fcheck::{Config, Mode};

fn cli() -> ArgMatches {
    Command::new("fcheck")
        .about("A filesystem integrity monitor: snapshot a tree, then detect drift")
        .version("0.1.0")
        .arg(
            Arg::new("gendb")
                .long("gendb")
                .help("Generate a fresh record store from --path")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("show")
                .long("show")
                .help("Print every stored record under --path; overrides --gendb")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("path")
                .long("path")
                .help("Root of the walk, or query prefix for --show")
                .default_value("/"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .help("Base path for the record store")
                .default_value("fcheck.db"),
        )
        .arg(
            Arg::new("exclude_from")
                .long("exclude-from")
                .help("File of newline-separated excluded path prefixes")
                .default_value("excludes.txt"),
        )
        .arg(
            Arg::new("num")
                .long("num")
                .visible_alias("numcpu")
                .help("Worker count; invalid or zero falls back to the host CPU count")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every directory entry on descent")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("count")
                .about("Count filesystem entries under --path without touching any store")
                .arg(Arg::new("path").long("path").default_value("/")),
        )
        .get_matches()
}

fn main() -> ExitCode {
    let app = cli();

    let verbose = app.get_flag("verbose");
    init_logging(verbose);

    if let Some(("count", count_matches)) = app.subcommand() {
        let path = count_matches.get_one::<String>("path").unwrap();
        let n = count_entries(path);
        println!("Entries found {n}");
        return ExitCode::SUCCESS;
    }

    let config = Config::resolve(
        app.get_flag("gendb"),
        app.get_flag("show"),
        app.get_one::<String>("path").unwrap().clone(),
        PathBuf::from(app.get_one::<String>("db").unwrap()),
        PathBuf::from(app.get_one::<String>("exclude_from").unwrap()),
        app.get_one::<i64>("num").copied(),
        verbose,
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn run(config: &Config) -> fcheck::Result<()> {
    let excludes = read_exclusions(&config.exclude_from);

    match config.mode {
        Mode::Generate => {
            let mut generator = Generator::new(config.db.clone(), config.workers);
            generator.start()?;
            generator.start_walking(&config.path, &excludes, config.verbose)?;
            generator.stop()?;
            log::info!("generated {}", config.db.display());
        }
        Mode::Compare => {
            let mut comparator = Comparator::new(config.db.clone(), config.workers);
            comparator.start()?;
            comparator.start_walking(&config.path, &excludes, config.verbose)?;
            comparator.stop()?;
            print_report(comparator.report());
        }
        Mode::Show => {
            let mut printer = Printer::new(config.db.clone());
            printer.start()?;
            printer.start_walking(&config.path, &excludes)?;
            printer.stop()?;
        }
    }
    Ok(())
}

fn print_report(report: &fcheck::comparator::CompareReport) {
    println!("Changed files {}", report.changed_files.len());
    for p in &report.changed_files {
        println!("{p}");
    }
    println!("New files {}", report.new_files.len());
    for p in &report.new_files {
        println!("{p}");
    }
    println!("Deleted files {}", report.removed_files.len());
    for p in &report.removed_files {
        println!("{p}");
    }
}
