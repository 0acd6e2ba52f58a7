use anyhow::Context;
use clap::*;
use qvcal::libs::base::read_training;
use qvcal::libs::config::{init_logging, Verbosity};
use qvcal::libs::threshold::collapse;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("stats")
        .about("Summarize a training file")
        .after_help(
            r###"
Reads training data with the same rules as `qvcal build` and reports line
counts and the range of every trace parameter.

Output is tab-separated: a block of counts, then one row per parameter with
min, max, mean and the number of distinct values.

Examples:
1. Four-parameter training data:
   qvcal stats train.txt

2. Six parameters from stdin:
   cat train.txt | qvcal stats -n 6

"###,
        )
        .arg(
            Arg::new("infile")
                .index(1)
                .default_value("stdin")
                .help("Training data. [stdin] for standard input"),
        )
        .arg(
            Arg::new("parameters")
                .long("parameters")
                .short('n')
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(usize))
                .help("Number of trace parameters per line"),
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
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();
    let parameter_count = *args.get_one::<usize>("parameters").unwrap();
    if parameter_count == 0 {
        anyhow::bail!("--parameters must be at least 1");
    }
    init_logging(Verbosity::Normal);

    let reader = qvcal::libs::io::reader(infile)
        .with_context(|| format!("could not open {}", infile))?;
    let (set, stats) = read_training(reader, parameter_count, 0)?;

    let mut writer = qvcal::libs::io::writer(outfile)
        .with_context(|| format!("could not create {}", outfile))?;

    writer.write_fmt(format_args!("lines\t{}\n", stats.lines))?;
    writer.write_fmt(format_args!("comments\t{}\n", stats.comments))?;
    writer.write_fmt(format_args!("bases\t{}\n", stats.bases))?;
    writer.write_fmt(format_args!("matches\t{}\n", stats.matches))?;
    writer.write_fmt(format_args!("mismatches\t{}\n", stats.mismatches()))?;
    writer.write_fmt(format_args!("deletions\t{}\n", stats.deletions))?;
    writer.write_fmt(format_args!("skipped\t{}\n", stats.skipped))?;

    writer.write_fmt(format_args!("parameter\tmin\tmax\tmean\tdistinct\n"))?;
    for d in 0..parameter_count {
        let mut values = set.column(d);
        if values.is_empty() {
            writer.write_fmt(format_args!("p{}\tNA\tNA\tNA\t0\n", d + 1))?;
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let (uniques, _) = collapse(&mut values);
        writer.write_fmt(format_args!(
            "p{}\t{:.4}\t{:.4}\t{:.4}\t{}\n",
            d + 1,
            uniques[0],
            uniques[uniques.len() - 1],
            mean,
            uniques.len()
        ))?;
    }
    writer.flush()?;

    Ok(())
}
