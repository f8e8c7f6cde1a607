use std::fmt;

use log::trace;

/// A maximal run of consecutive rows that hold at least one sparse cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub ia: usize,
    pub ib: usize,
}

/// The set of (row, column) cells retained by posterior thresholding.
/// Built once per sequence by the Backward filter, then shared read-only by
/// every sparse DP pass. Rows store ascending explicit column lists in a
/// CSR layout; `segments` lists the row spans the sparse DP iterates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMask {
    m      : usize,
    l      : usize,
    kmem   : Vec<u32>,
    row_off: Vec<usize>,
    segs   : Vec<Segment>,
}

/// Incremental builder fed in Backward order: rows from L down to 1,
/// columns descending within a row. `finish` flips everything around.
#[derive(Debug)]
pub struct SparseMaskBuilder {
    m      : usize,
    l      : usize,
    kmem   : Vec<u32>,
    counts : Vec<usize>,
    cur_row: usize,
    last_k : u32,
}

impl SparseMaskBuilder {
    pub fn new(m: usize, l: usize) -> SparseMaskBuilder {
        SparseMaskBuilder {
            m,
            l,
            kmem: Vec::new(),
            counts: vec![0; l + 2],
            cur_row: l + 1,
            last_k: u32::MAX,
        }
    }

    /// Open row `i`. Rows must arrive strictly descending.
    pub fn start_row(&mut self, i: usize) {
        debug_assert!(i >= 1 && i < self.cur_row, "rows must arrive descending (got {i} after {})", self.cur_row);
        self.cur_row = i;
        self.last_k = u32::MAX;
    }

    /// Retain cell (current row, `k`). Columns must arrive strictly
    /// descending within the row.
    pub fn add(&mut self, k: usize) {
        let k = k as u32;
        debug_assert!(k >= 1 && k < self.last_k, "columns must arrive descending");
        self.last_k = k;
        self.kmem.push(k);
        self.counts[self.cur_row] += 1;
    }

    /// Seal the mask. The traversal wrote (rows desc, columns desc), so one
    /// global reversal yields the ascending CSR layout.
    pub fn finish(mut self) -> SparseMask {
        self.kmem.reverse();

        let mut row_off = vec![0_usize; self.l + 2];
        let mut off = 0;
        for i in 1..=self.l {
            row_off[i] = off;
            off += self.counts[i];
        }
        row_off[self.l + 1] = off;
        debug_assert_eq!(off, self.kmem.len());

        let mut segs = Vec::new();
        let mut open: Option<usize> = None;
        for i in 1..=self.l {
            match (self.counts[i] > 0, open) {
                (true, None) => open = Some(i),
                (false, Some(ia)) => {
                    segs.push(Segment { ia, ib: i - 1 });
                    open = None;
                }
                _ => (),
            }
        }
        if let Some(ia) = open {
            segs.push(Segment { ia, ib: self.l });
        }

        trace!("sparse mask sealed: {} cells over {} segments", self.kmem.len(), segs.len());
        SparseMask {
            m: self.m,
            l: self.l,
            kmem: self.kmem,
            row_off,
            segs,
        }
    }
}

impl SparseMask {
    /// The dense mask: every cell of every row. Test and oracle use.
    pub fn full(m: usize, l: usize) -> SparseMask {
        let mut b = SparseMaskBuilder::new(m, l);
        for i in (1..=l).rev() {
            b.start_row(i);
            for k in (1..=m).rev() {
                b.add(k);
            }
        }
        b.finish()
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn l(&self) -> usize {
        self.l
    }

    pub fn n_cells(&self) -> usize {
        self.kmem.len()
    }

    /// Ascending column list of row `i` (may be empty).
    #[inline]
    pub fn row(&self, i: usize) -> &[u32] {
        debug_assert!(i >= 1 && i <= self.l);
        &self.kmem[self.row_off[i]..self.row_off[i + 1]]
    }

    /// CSR offset of the first cell of row `i`; cell indices address the
    /// main planes of the sparse matrices.
    #[inline]
    pub fn row_offset(&self, i: usize) -> usize {
        self.row_off[i]
    }

    #[inline]
    pub fn contains(&self, i: usize, k: usize) -> bool {
        self.row(i).binary_search(&(k as u32)).is_ok()
    }

    /// Flat cell index of (i, k), if retained.
    #[inline]
    pub fn cell_index(&self, i: usize, k: usize) -> Option<usize> {
        self.row(i)
            .binary_search(&(k as u32))
            .ok()
            .map(|pos| self.row_off[i] + pos)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segs
    }

    /// Is every cell of `other` also retained here?
    pub fn is_superset_of(&self, other: &SparseMask) -> bool {
        (1..=other.l.min(self.l))
            .all(|i| other.row(i).iter().all(|&k| self.contains(i, k as usize)))
    }
}

impl fmt::Display for SparseMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sparse mask M={} L={}: {} cells", self.m, self.l, self.n_cells())?;
        for seg in &self.segs {
            writeln!(f, "  rows {}..={}", seg.ia, seg.ib)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(m: usize, l: usize) -> SparseMask {
        // Odd rows keep odd columns; even rows are empty.
        let mut b = SparseMaskBuilder::new(m, l);
        for i in (1..=l).rev().filter(|i| i % 2 == 1) {
            b.start_row(i);
            for k in (1..=m).rev().filter(|k| k % 2 == 1) {
                b.add(k);
            }
        }
        b.finish()
    }

    #[test]
    fn reversal_yields_ascending_rows() {
        let mask = checker(6, 5);
        assert_eq!(mask.row(1), &[1, 3, 5]);
        assert_eq!(mask.row(2), &[] as &[u32]);
        assert_eq!(mask.row(5), &[1, 3, 5]);
        assert_eq!(mask.n_cells(), 9);
    }

    #[test]
    fn segments_are_maximal_runs() {
        let mask = checker(4, 6);
        // Rows 1,3,5 hold cells; each is its own segment.
        let segs = mask.segments();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0], Segment { ia: 1, ib: 1 });
        assert_eq!(segs[2], Segment { ia: 5, ib: 5 });

        let full = SparseMask::full(4, 6);
        assert_eq!(full.segments(), &[Segment { ia: 1, ib: 6 }]);
        assert_eq!(full.n_cells(), 24);
    }

    #[test]
    fn contains_and_cell_index_agree() {
        let mask = checker(6, 5);
        assert!(mask.contains(3, 5));
        assert!(!mask.contains(3, 4));
        assert!(!mask.contains(2, 1));
        assert_eq!(mask.cell_index(1, 1), Some(0));
        assert_eq!(mask.cell_index(1, 3), Some(1));
        assert_eq!(mask.cell_index(3, 1), Some(3));
    }

    #[test]
    fn superset_relation() {
        let full = SparseMask::full(6, 5);
        let sparse = checker(6, 5);
        assert!(full.is_superset_of(&sparse));
        assert!(!sparse.is_superset_of(&full));
        assert!(sparse.is_superset_of(&sparse.clone()));
    }

    #[test]
    fn empty_mask_is_legal() {
        let b = SparseMaskBuilder::new(10, 8);
        let mask = b.finish();
        assert_eq!(mask.n_cells(), 0);
        assert!(mask.segments().is_empty());
        assert_eq!(mask.row(4), &[] as &[u32]);
    }
}
