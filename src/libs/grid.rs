use crate::libs::base::TrainingSet;
use crate::libs::error::{try_alloc, CalibrationError, Result};
use crate::libs::threshold::Parameter;

/// Raw correct/incorrect counts of one grid cell.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bin {
    pub correct: u64,
    pub incorrect: u64,
}

impl Bin {
    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }
}

/// N-dimensional grid of bins, flattened with the first dimension varying fastest.
#[derive(Debug, Clone)]
pub struct BinGrid {
    shape: Vec<usize>,
    strides: Vec<usize>,
    bins: Vec<Bin>,
}

impl BinGrid {
    /// Allocate an empty grid; `shape[d]` is the number of bins along dimension `d`.
    pub fn new(shape: &[usize]) -> Result<Self> {
        let mut strides = Vec::with_capacity(shape.len());
        let mut cells: usize = 1;
        for &n in shape {
            strides.push(cells);
            cells = cells.checked_mul(n).ok_or(CalibrationError::GridOverflow)?;
        }

        Ok(BinGrid {
            shape: shape.to_vec(),
            strides,
            bins: try_alloc("bin grid", cells)?,
        })
    }

    /// Allocate the grid spanned by the established thresholds.
    pub fn from_parameters(parameters: &[Parameter]) -> Result<Self> {
        let shape: Vec<usize> = parameters.iter().map(|p| p.threshold_count()).collect();
        let grid = Self::new(&shape)?;
        debug_assert!(parameters
            .iter()
            .zip(&grid.strides)
            .all(|(p, &s)| p.dimension == s));
        Ok(grid)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn offset(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.strides)
            .map(|(&i, &s)| i * s)
            .sum()
    }

    /// Inverse of `offset`.
    pub fn index_of(&self, mut offset: usize) -> Vec<usize> {
        self.shape
            .iter()
            .map(|&n| {
                let i = offset % n;
                offset /= n;
                i
            })
            .collect()
    }

    pub fn bin(&self, offset: usize) -> Bin {
        self.bins[offset]
    }

    pub fn bin_mut(&mut self, offset: usize) -> &mut Bin {
        &mut self.bins[offset]
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn add(&mut self, offset: usize, is_match: bool) {
        let bin = &mut self.bins[offset];
        if is_match {
            bin.correct += 1;
        } else {
            bin.incorrect += 1;
        }
    }

    /// Total bases still held by the grid.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(Bin::total).sum()
    }

    /// Sum of all bins with coordinates `<= index` componentwise, by direct enumeration.
    pub fn prefix_sum(&self, index: &[usize]) -> Bin {
        let mut sum = Bin::default();
        for (offset, bin) in self.bins.iter().enumerate() {
            let inside = self
                .index_of(offset)
                .iter()
                .zip(index)
                .all(|(i, limit)| i <= limit);
            if inside {
                sum.correct += bin.correct;
                sum.incorrect += bin.incorrect;
            }
        }
        sum
    }
}

/// Flat bin offset of one parameter vector.
pub fn bin_offset(parameters: &[Parameter], values: &[f64]) -> Result<usize> {
    let mut offset = 0;
    for (d, (param, &value)) in parameters.iter().zip(values).enumerate() {
        let i = param
            .index_of(value)
            .ok_or_else(|| CalibrationError::ValueAboveThreshold {
                dimension: d,
                value,
                max: param.max_threshold().unwrap_or(f64::NAN),
            })?;
        offset += i * param.dimension;
    }
    Ok(offset)
}

/// Count every training base into its bin; returns the number of bases added.
pub fn populate(grid: &mut BinGrid, parameters: &[Parameter], set: &TrainingSet) -> Result<u64> {
    let mut count = 0;
    for (is_match, values) in set.iter() {
        let offset = bin_offset(parameters, values)?;
        grid.add(offset, is_match);
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::base::Base;
    use crate::libs::threshold::build_parameters;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_offsets() {
        let grid = BinGrid::new(&[2, 3, 4]).unwrap();
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.strides(), &[1, 2, 6]);
        assert_eq!(grid.offset(&[1, 2, 3]), 1 + 4 + 18);
        for offset in 0..grid.len() {
            assert_eq!(grid.offset(&grid.index_of(offset)), offset);
        }
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            BinGrid::new(&[usize::MAX, 2]),
            Err(CalibrationError::GridOverflow)
        ));
        assert!(matches!(
            BinGrid::new(&[1 << 20, 1 << 20, 1 << 20]),
            Err(CalibrationError::Allocation { .. })
        ));
    }

    #[test]
    fn test_populate_conservation() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut set = TrainingSet::new(4);
        for _ in 0..500 {
            let parameters = (0..4).map(|_| rng.gen_range(0.0..10.0)).collect();
            set.push(&Base {
                is_match: rng.gen_bool(0.8),
                parameters,
            });
        }
        let params = build_parameters(&set, &[3, 4, 5, 2], true).unwrap();
        let mut grid = BinGrid::from_parameters(&params).unwrap();
        assert_eq!(grid.shape(), &[3, 4, 5, 2]);

        let added = populate(&mut grid, &params, &set).unwrap();
        assert_eq!(added, 500);
        assert_eq!(grid.total(), 500);

        let matches = set.iter().filter(|(m, _)| *m).count() as u64;
        let correct: u64 = grid.bins().iter().map(|b| b.correct).sum();
        assert_eq!(correct, matches);
    }

    #[test]
    fn test_value_above_threshold() {
        let mut set = TrainingSet::new(4);
        set.push(&Base {
            is_match: true,
            parameters: vec![1.0, 1.0, 1.0, 1.0],
        });
        let params = build_parameters(&set, &[2, 2, 2, 2], true).unwrap();

        match bin_offset(&params, &[1.0, 1.0, 1.5, 1.0]) {
            Err(CalibrationError::ValueAboveThreshold { dimension, value, max }) => {
                assert_eq!(dimension, 2);
                assert_eq!(value, 1.5);
                assert_eq!(max, 1.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_prefix_sum() {
        let mut grid = BinGrid::new(&[2, 2]).unwrap();
        grid.add(0, true);
        grid.add(1, false);
        grid.add(2, true);
        grid.add(3, true);
        assert_eq!(grid.prefix_sum(&[0, 0]), Bin { correct: 1, incorrect: 0 });
        assert_eq!(grid.prefix_sum(&[1, 0]), Bin { correct: 1, incorrect: 1 });
        assert_eq!(grid.prefix_sum(&[0, 1]), Bin { correct: 2, incorrect: 0 });
        assert_eq!(grid.prefix_sum(&[1, 1]), Bin { correct: 3, incorrect: 1 });
    }
}
