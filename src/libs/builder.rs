use crate::libs::config::CalibrationConfig;
use crate::libs::cut::{Cut, CutEngine};
use crate::libs::error::Result;
use crate::libs::grid::BinGrid;
use crate::libs::threshold::Parameter;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Phred-scaled quality of a cut.
///
/// A cut without errors uses `1 / (total + 1)` as its error rate.
///
/// ```
/// use qvcal::libs::builder::quality_value;
/// assert_eq!(quality_value(297, 3), 20);
/// assert_eq!(quality_value(9, 0), 10);
/// assert_eq!(quality_value(0, 5), 0);
/// ```
pub fn quality_value(correct: u64, incorrect: u64) -> u32 {
    let total = correct + incorrect;
    let error_rate = if incorrect == 0 {
        1.0 / (total as f64 + 1.0)
    } else {
        incorrect as f64 / total as f64
    };
    let qv = (-10.0 * error_rate.log10()).round();
    if qv > 0.0 {
        qv as u32
    } else {
        0
    }
}

/// A scored cut, ranked by quality value, then total, then sum of indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Candidate {
    pub offset: usize,
    pub layer: usize,
    pub cut: Cut,
    pub quality_value: u32,
    pub sum_of_indices: usize,
}

impl Candidate {
    /// True if `self` should replace `best`. Full ties keep `best`.
    pub fn beats(&self, best: &Candidate, min_incorrect: u64) -> bool {
        if self.cut.incorrect < min_incorrect {
            return false;
        }
        let key = (self.quality_value, self.cut.total(), self.sum_of_indices);
        let best_key = (best.quality_value, best.cut.total(), best.sum_of_indices);
        key > best_key
    }
}

/// The best cut of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct HighestQvCut {
    pub index: Vec<usize>,
    pub correct: u64,
    pub incorrect: u64,
    pub total_base_call_count: u64,
    pub quality_value: u32,
    pub sum_of_indices: usize,
    /// Upper bound of the cut along each parameter
    pub thresholds: Vec<f64>,
}

/// One line of the output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub quality_value: u32,
    pub index: Vec<usize>,
    pub correct: u64,
    pub incorrect: u64,
}

impl TableEntry {
    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QvCount {
    pub entries: usize,
    pub correct: u64,
    pub incorrect: u64,
}

impl QvCount {
    pub fn bases(&self) -> u64 {
        self.correct + self.incorrect
    }
}

/// Base counts of the emitted entries, by quality value and by decade.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Histograms {
    pub by_qv: BTreeMap<u32, QvCount>,
    pub by_decade: BTreeMap<u32, QvCount>,
}

impl Histograms {
    pub fn record(&mut self, entry: &TableEntry) {
        for count in [
            self.by_qv.entry(entry.quality_value).or_default(),
            self.by_decade.entry(entry.quality_value / 10).or_default(),
        ] {
            count.entries += 1;
            count.correct += entry.correct;
            count.incorrect += entry.incorrect;
        }
    }
}

/// Everything the table writer needs.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    pub parameters: Vec<Parameter>,
    pub entries: Vec<TableEntry>,
    pub histograms: Histograms,
    pub total_bases: u64,
    /// Bases left when no remaining cut met the significance floor
    pub unaccounted: u64,
    pub passes: usize,
}

/// Greedy builder: each pass emits the best cut and consumes its bases.
pub struct TableBuilder<'a> {
    parameters: &'a [Parameter],
    min_incorrect: u64,
    parallel: bool,
}

impl<'a> TableBuilder<'a> {
    pub fn new(parameters: &'a [Parameter], config: &CalibrationConfig) -> Self {
        TableBuilder {
            parameters,
            min_incorrect: config.min_incorrect,
            parallel: config.parallel > 1,
        }
    }

    fn score(&self, engine: &CutEngine, layer: usize, offset: usize, cut: Cut) -> Candidate {
        Candidate {
            offset,
            layer,
            cut,
            quality_value: quality_value(cut.correct, cut.incorrect),
            sum_of_indices: engine.index_of(offset, layer).iter().sum(),
        }
    }

    /// Best candidate of the hyperslab just filled, earliest first on full ties.
    fn best_in_layer(&self, engine: &CutEngine, layer: usize) -> Candidate {
        let min_incorrect = self.min_incorrect;
        let pick = |best: Candidate, next: Candidate| {
            if next.beats(&best, min_incorrect) {
                next
            } else {
                best
            }
        };

        if self.parallel {
            engine
                .current()
                .par_iter()
                .enumerate()
                .map(|(offset, &cut)| self.score(engine, layer, offset, cut))
                .reduce(Candidate::default, pick)
        } else {
            engine
                .current()
                .iter()
                .enumerate()
                .map(|(offset, &cut)| self.score(engine, layer, offset, cut))
                .fold(Candidate::default(), pick)
        }
    }

    /// Sweep the whole grid once and return the best cut.
    pub fn pass(
        &self,
        engine: &mut CutEngine,
        grid: &mut BinGrid,
        consumed: Option<&[usize]>,
    ) -> HighestQvCut {
        let min_incorrect = self.min_incorrect;
        let mut best = Candidate::default();
        engine.sweep(grid, consumed, |layer, engine| {
            let candidate = self.best_in_layer(engine, layer);
            if candidate.beats(&best, min_incorrect) {
                best = candidate;
            }
        });

        let index = engine.index_of(best.offset, best.layer);
        let thresholds = index
            .iter()
            .zip(self.parameters)
            .map(|(&i, p)| p.thresholds[i])
            .collect();
        HighestQvCut {
            index,
            correct: best.cut.correct,
            incorrect: best.cut.incorrect,
            total_base_call_count: best.cut.total(),
            quality_value: best.quality_value,
            sum_of_indices: best.sum_of_indices,
            thresholds,
        }
    }

    /// Run passes until no cut meets the significance floor.
    pub fn build(&self, grid: &mut BinGrid) -> Result<CalibrationTable> {
        let mut engine = CutEngine::for_grid(grid)?;
        let total_bases = grid.total();
        let mut countdown = total_bases;
        let mut entries = Vec::new();
        let mut histograms = Histograms::default();
        let mut consumed: Option<Vec<usize>> = None;
        let mut passes = 0;

        loop {
            let best = self.pass(&mut engine, grid, consumed.as_deref());
            passes += 1;
            if best.total_base_call_count == 0 {
                break;
            }

            debug!(
                "Pass {}: qv {} at {:?} (<= {:?}), {} correct, {} incorrect",
                passes,
                best.quality_value,
                best.index,
                best.thresholds,
                best.correct,
                best.incorrect
            );

            let entry = TableEntry {
                quality_value: best.quality_value,
                index: best.index.clone(),
                correct: best.correct,
                incorrect: best.incorrect,
            };
            histograms.record(&entry);
            entries.push(entry);

            countdown -= best.total_base_call_count;
            consumed = Some(best.index);
        }

        // the final sweep zeroed the last accepted cut
        debug_assert_eq!(countdown, grid.total());
        if countdown != 0 {
            warn!(
                "{} of {} bases unaccounted: no remaining cut has {} or more incorrect calls",
                countdown, total_bases, self.min_incorrect
            );
        }

        Ok(CalibrationTable {
            parameters: self.parameters.to_vec(),
            entries,
            histograms,
            total_bases,
            unaccounted: countdown,
            passes,
        })
    }
}
