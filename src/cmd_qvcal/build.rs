use anyhow::Context;
use clap::*;
use qvcal::libs::base::read_training;
use qvcal::libs::config::{init_logging, CalibrationConfig, Verbosity};
use qvcal::libs::table::write_table;
use std::io::Write;
use tracing::info;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("build")
        .about("Build a quality value lookup table from labelled base calls")
        .after_help(
            r###"
Bins the training bases by per-parameter quantile thresholds, then repeatedly
emits the rectangular cut [0, index] with the highest quality value and removes
its bases, until no remaining cut holds enough incorrect calls.

Notes:
* Give 4 or 6 threshold counts, one per trace parameter
* Training data is read from stdin unless --infile is given; .gz is supported
* Lines starting with #, ; or /* are comments
* Deletion lines (sample_char '-') carry no parameters and are counted only
* Malformed lines are skipped with a warning
* Bases left over when the loop stops are reported as unaccounted

Examples:
1. Four parameters, 10 thresholds each:
   qvcal build 10 10 10 10 < train.txt > qv.tbl

2. Six parameters, no threshold compression, verbose:
   qvcal build -C -V 8 8 8 8 4 4 -i train.txt.gz -o qv.tbl

"###,
        )
        .arg(
            Arg::new("thresholds")
                .required(true)
                .num_args(1..)
                .index(1)
                .value_parser(value_parser!(usize))
                .help("Number of thresholds for each parameter"),
        )
        .arg(
            Arg::new("infile")
                .long("infile")
                .short('i')
                .num_args(1)
                .default_value("stdin")
                .help("Training data. [stdin] for standard input"),
        )
        .arg(
            Arg::new("room")
                .long("room")
                .short('b')
                .num_args(1)
                .default_value("100000")
                .value_parser(value_parser!(usize))
                .help("Initial capacity of the record buffer"),
        )
        .arg(
            Arg::new("compress")
                .long("compress")
                .short('c')
                .action(ArgAction::SetTrue)
                .overrides_with("no_compress")
                .help("Merge equal adjacent thresholds (default)"),
        )
        .arg(
            Arg::new("no_compress")
                .long("no-compress")
                .short('C')
                .action(ArgAction::SetTrue)
                .overrides_with("compress")
                .help("Keep equal adjacent thresholds"),
        )
        .arg(
            Arg::new("min_incorrect")
                .long("min-incorrect")
                .num_args(1)
                .default_value("3")
                .value_parser(value_parser!(u64))
                .help("Minimum incorrect calls in an emitted cut"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads for scoring cuts"),
        )
        .arg(
            Arg::new("quiet")
                .short('Q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .overrides_with("verbose")
                .help("Only report errors"),
        )
        .arg(
            Arg::new("verbose")
                .short('V')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .overrides_with("quiet")
                .help("Report every accepted cut"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let requested: Vec<usize> = args
        .get_many::<usize>("thresholds")
        .unwrap()
        .copied()
        .collect();
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();

    let verbosity = if args.get_flag("quiet") {
        Verbosity::Quiet
    } else if args.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    init_logging(verbosity);

    let mut config = CalibrationConfig::new(&requested);
    config.compress = !args.get_flag("no_compress");
    config.min_incorrect = *args.get_one::<u64>("min_incorrect").unwrap();
    config.parallel = *args.get_one::<usize>("parallel").unwrap();
    config.room = *args.get_one::<usize>("room").unwrap();
    config.verbosity = verbosity;
    config.validate()?;

    if config.parallel > 1 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build_global()?;
    }

    //----------------------------
    // Open files
    //----------------------------
    let mut writer = qvcal::libs::io::writer(outfile)
        .with_context(|| format!("could not create {}", outfile))?;
    let reader = qvcal::libs::io::reader(infile)
        .with_context(|| format!("could not open {}", infile))?;

    //----------------------------
    // Ops
    //----------------------------
    let (set, stats) = read_training(reader, config.parameter_count(), config.room)?;
    info!(
        "Read {} lines: {} bases ({} correct, {} incorrect), {} deletions, {} skipped",
        stats.lines,
        stats.bases,
        stats.matches,
        stats.mismatches(),
        stats.deletions,
        stats.skipped
    );

    let table = qvcal::libs::calibrate(&set, &config)?;

    //----------------------------
    // Output
    //----------------------------
    write_table(&mut writer, &table, Some(&stats))?;
    writer.flush()?;

    Ok(())
}
