use crate::libs::base::IngestStats;
use crate::libs::builder::{CalibrationTable, QvCount};
use itertools::Itertools;
use std::io::Write;

fn histogram_row(label: &str, count: &QvCount) -> String {
    format!(
        "# {}\t{}\t{}\t{}\t{}",
        label,
        count.entries,
        count.bases(),
        count.correct,
        count.incorrect
    )
}

/// Serialize a calibration table.
///
/// Layout:
/// * `#` header with requested and established threshold counts
/// * one line per threshold rank, one column per parameter; parameters with fewer
///   thresholds repeat their last one
/// * one line per entry: `quality_value index_1 .. index_N`, in emission order
/// * `#` histogram blocks
pub fn write_table<W: Write + ?Sized>(
    writer: &mut W,
    table: &CalibrationTable,
    stats: Option<&IngestStats>,
) -> std::io::Result<()> {
    let params = &table.parameters;

    writeln!(writer, "# Quality value lookup table")?;
    writeln!(writer, "# Parameters: {}", params.len())?;
    writeln!(writer, "# Training bases: {}", table.total_bases)?;
    if let Some(stats) = stats {
        writeln!(writer, "# Deletions: {}", stats.deletions)?;
        writeln!(writer, "# Skipped lines: {}", stats.skipped)?;
    }
    writeln!(
        writer,
        "# Thresholds requested:   {}",
        params.iter().map(|p| p.requested).join(" ")
    )?;
    writeln!(
        writer,
        "# Thresholds established: {}",
        params.iter().map(|p| p.threshold_count()).join(" ")
    )?;
    writeln!(
        writer,
        "# Distinct values:        {}",
        params.iter().map(|p| p.uniques.len()).join(" ")
    )?;

    writeln!(writer, "# Threshold values, one row per rank")?;
    let ranks = params.iter().map(|p| p.threshold_count()).max().unwrap_or(0);
    for rank in 0..ranks {
        let row = params
            .iter()
            .map(|p| p.thresholds[rank.min(p.threshold_count() - 1)])
            .join(" ");
        writeln!(writer, "{}", row)?;
    }

    writeln!(
        writer,
        "# Entries: quality_value index_1 .. index_{}",
        params.len()
    )?;
    for entry in &table.entries {
        writeln!(
            writer,
            "{} {}",
            entry.quality_value,
            entry.index.iter().join(" ")
        )?;
    }

    writeln!(writer, "# Bases by quality value")?;
    writeln!(writer, "# qv\tentries\tbases\tcorrect\tincorrect")?;
    for (qv, count) in &table.histograms.by_qv {
        writeln!(writer, "{}", histogram_row(&qv.to_string(), count))?;
    }

    writeln!(writer, "# Bases by quality value decade")?;
    writeln!(writer, "# range\tentries\tbases\tcorrect\tincorrect")?;
    for (decade, count) in &table.histograms.by_decade {
        let label = format!("{}-{}", decade * 10, decade * 10 + 9);
        writeln!(writer, "{}", histogram_row(&label, count))?;
    }

    writeln!(writer, "# Passes: {}", table.passes)?;
    writeln!(writer, "# Unaccounted bases: {}", table.unaccounted)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::builder::{Histograms, TableEntry};
    use crate::libs::threshold::Parameter;

    fn param(thresholds: Vec<f64>, requested: usize) -> Parameter {
        Parameter {
            uniques: thresholds.clone(),
            weights: vec![1; thresholds.len()],
            requested,
            thresholds,
            dimension: 1,
        }
    }

    #[test]
    fn test_write_table() {
        let entries = vec![
            TableEntry {
                quality_value: 23,
                index: vec![1, 0],
                correct: 995,
                incorrect: 5,
            },
            TableEntry {
                quality_value: 7,
                index: vec![2, 0],
                correct: 16,
                incorrect: 4,
            },
        ];
        let mut histograms = Histograms::default();
        entries.iter().for_each(|e| histograms.record(e));

        let table = CalibrationTable {
            parameters: vec![param(vec![0.5, 1.25, 3.0], 3), param(vec![2.0], 3)],
            entries,
            histograms,
            total_bases: 1030,
            unaccounted: 10,
            passes: 3,
        };
        let stats = IngestStats {
            deletions: 2,
            skipped: 1,
            ..Default::default()
        };

        let mut out = Vec::new();
        write_table(&mut out, &table, Some(&stats)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines.contains(&"# Thresholds requested:   3 3"));
        assert!(lines.contains(&"# Thresholds established: 3 1"));
        assert!(lines.contains(&"# Deletions: 2"));

        let data: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|l| !l.starts_with('#'))
            .collect();
        assert_eq!(data, vec!["0.5 2", "1.25 2", "3 2", "23 1 0", "7 2 0"]);

        assert!(lines.contains(&"# 23\t1\t1000\t995\t5"));
        assert!(lines.contains(&"# 0-9\t1\t20\t16\t4"));
        assert!(lines.contains(&"# 20-29\t1\t1000\t995\t5"));
        assert_eq!(lines.last(), Some(&"# Unaccounted bases: 10"));
    }
}
