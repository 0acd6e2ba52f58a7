//! Cumulative correct/incorrect counts over `[0, index]` hyper-rectangles.
//!
//! A summed-volume table generalises the 2-D summed-area table to N dimensions:
//!
//! ```text
//! cut(I) = bin(I) + sum over non-empty S of (-1)^(|S|+1) * cut(I - S)
//! ```
//!
//! where `S` ranges over subsets of the axes and `I - S` decrements every axis in `S`.
//! Only two hyperslabs of cuts are kept in memory, one for the current coordinate
//! along the last axis and one for the coordinate before it.

use crate::libs::error::{try_alloc, Result};
use crate::libs::grid::{Bin, BinGrid};

/// Cumulative counts of the hyper-rectangle from the origin to some index.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    pub correct: u64,
    pub incorrect: u64,
}

impl Cut {
    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }
}

impl From<Bin> for Cut {
    fn from(bin: Bin) -> Self {
        Cut {
            correct: bin.correct,
            incorrect: bin.incorrect,
        }
    }
}

/// One neighbour `I - S` of the recurrence.
#[derive(Debug, Clone, Copy)]
struct Corner {
    /// Bit `d` set when axis `d` is decremented
    mask: usize,
    /// Offset to subtract inside a hyperslab
    slab_delta: usize,
    /// Whether the last axis is decremented, i.e. the cut lives in the previous hyperslab
    previous: bool,
    sign: i64,
}

/// The two rolling hyperslabs.
#[derive(Debug, Clone)]
pub struct Hyperslabs {
    pub current: Vec<Cut>,
    pub previous: Vec<Cut>,
}

impl Hyperslabs {
    pub fn new(len: usize) -> Result<Self> {
        Ok(Hyperslabs {
            current: try_alloc("current hyperslab", len)?,
            previous: try_alloc("previous hyperslab", len)?,
        })
    }

    /// Make the current slab the previous one; the old previous slab is overwritten next.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Walks a `BinGrid` layer by layer along its last axis, producing cuts.
#[derive(Debug, Clone)]
pub struct CutEngine {
    shape: Vec<usize>,
    strides: Vec<usize>,
    corners: Vec<Corner>,
    slabs: Hyperslabs,
}

impl CutEngine {
    pub fn new(shape: &[usize], strides: &[usize]) -> Result<Self> {
        assert!(!shape.is_empty());
        assert_eq!(shape.len(), strides.len());
        let n = shape.len();
        let last = n - 1;

        // Inner strides of the grid equal the strides of a hyperslab
        let slab_len: usize = shape[..last].iter().product();

        let corners = (1usize..(1 << n))
            .map(|mask| {
                let slab_delta = (0..last)
                    .filter(|d| mask & (1 << d) != 0)
                    .map(|d| strides[d])
                    .sum();
                let sign = if mask.count_ones() % 2 == 1 { 1 } else { -1 };
                Corner {
                    mask,
                    slab_delta,
                    previous: mask & (1 << last) != 0,
                    sign,
                }
            })
            .collect();

        Ok(CutEngine {
            shape: shape.to_vec(),
            strides: strides.to_vec(),
            corners,
            slabs: Hyperslabs::new(slab_len)?,
        })
    }

    pub fn for_grid(grid: &BinGrid) -> Result<Self> {
        Self::new(grid.shape(), grid.strides())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn layers(&self) -> usize {
        self.shape[self.shape.len() - 1]
    }

    pub fn slab_len(&self) -> usize {
        self.slabs.len()
    }

    /// Cuts at the last filled layer.
    pub fn current(&self) -> &[Cut] {
        &self.slabs.current
    }

    /// Full index of position `offset` within the hyperslab of `layer`.
    pub fn index_of(&self, mut offset: usize, layer: usize) -> Vec<usize> {
        let last = self.shape.len() - 1;
        let mut index: Vec<usize> = self.shape[..last]
            .iter()
            .map(|&n| {
                let i = offset % n;
                offset /= n;
                i
            })
            .collect();
        index.push(layer);
        index
    }

    /// The cut of a neighbour, or `None` when the neighbour steps outside the grid.
    fn corner_cut(&self, corner: &Corner, offset: usize, zero_mask: usize) -> Option<Cut> {
        if corner.mask & zero_mask != 0 {
            return None;
        }
        let slab = if corner.previous {
            &self.slabs.previous
        } else {
            &self.slabs.current
        };
        Some(slab[offset - corner.slab_delta])
    }

    /// Fill the current hyperslab with the cuts of `layer`.
    ///
    /// Layers must be filled in increasing order, starting from 0. When `consumed` is
    /// given, every bin dominated by it is zeroed before its cut is computed.
    pub fn fill_layer(&mut self, grid: &mut BinGrid, layer: usize, consumed: Option<&[usize]>) {
        let n = self.shape.len();
        let last = n - 1;
        self.slabs.swap();

        let layer_start = layer * self.strides[last];
        let layer_consumed = consumed.map_or(false, |c| layer <= c[last]);
        let mut index = vec![0usize; last];

        for offset in 0..self.slabs.len() {
            let bin_offset = layer_start + offset;
            if layer_consumed {
                let dominated = consumed
                    .map_or(false, |c| index.iter().zip(c).all(|(i, limit)| i <= limit));
                if dominated {
                    *grid.bin_mut(bin_offset) = Bin::default();
                }
            }

            let mut zero_mask = 0usize;
            for (d, &i) in index.iter().enumerate() {
                if i == 0 {
                    zero_mask |= 1 << d;
                }
            }
            if layer == 0 {
                zero_mask |= 1 << last;
            }

            let bin = grid.bin(bin_offset);
            let mut correct = bin.correct as i64;
            let mut incorrect = bin.incorrect as i64;
            for corner in &self.corners {
                let cut = self
                    .corner_cut(corner, offset, zero_mask)
                    .unwrap_or_default();
                correct += corner.sign * cut.correct as i64;
                incorrect += corner.sign * cut.incorrect as i64;
            }
            debug_assert!(correct >= 0 && incorrect >= 0);

            self.slabs.current[offset] = Cut {
                correct: correct as u64,
                incorrect: incorrect as u64,
            };

            // odometer over the inner axes
            for (d, i) in index.iter_mut().enumerate() {
                *i += 1;
                if *i < self.shape[d] {
                    break;
                }
                *i = 0;
            }
        }
    }

    /// Sweep every layer, handing each completed hyperslab to `visit`.
    pub fn sweep<F>(&mut self, grid: &mut BinGrid, consumed: Option<&[usize]>, mut visit: F)
    where
        F: FnMut(usize, &CutEngine),
    {
        for layer in 0..self.layers() {
            self.fill_layer(grid, layer, consumed);
            visit(layer, self);
        }
    }
}
