extern crate clap;
use clap::*;

mod cmd_qvcal;

fn main() -> anyhow::Result<()> {
    let app = Command::new("qvcal")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`qvcal` - Quality value lookup table calibration")
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_qvcal::build::make_subcommand())
        .subcommand(cmd_qvcal::stats::make_subcommand())
        .after_help(
            r###"Subcommands:

* build - Build a quality value lookup table from labelled base calls
* stats - Summarize a training file

Training lines:
    consensus_pos consensus_char is_match sample_pos sample_char p1 p2 p3 p4 [p5 p6]

"###,
        );

    match app.get_matches().subcommand() {
        Some(("build", sub_matches)) => cmd_qvcal::build::execute(sub_matches),
        Some(("stats", sub_matches)) => cmd_qvcal::stats::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
