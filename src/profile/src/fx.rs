use log::trace;

/// Reusable DP scratch for the vector filters. One instance per worker,
/// grown on demand (geometric, never shrunk), logically reset between
/// sequences.
///
/// Three views share the structure:
/// - byte: one striped row of MSV/SSV match cells;
/// - word: three striped rows (M, I, D) for the Viterbi filter;
/// - float: the full Forward matrix, (L+1) rows of three planes plus a
///   cumulative log-rescale per row, and two rolling Backward rows.
#[derive(Debug, Default)]
pub struct FilterMatrix {
    bytes    : Vec<u8>,
    words    : Vec<i16>,
    floats   : Vec<f32>,
    fwd_cum  : Vec<f32>,
    bck      : Vec<f32>,
    // current per-sequence geometry
    byte_len : usize,
    word_len : usize,
    float_len: usize,
    nrows    : usize,
}

/// Offsets of the M/I/D planes inside one striped float row.
pub const PLANE_M: usize = 0;
pub const PLANE_I: usize = 1;
pub const PLANE_D: usize = 2;
pub const N_PLANES: usize = 3;

fn grow<T: Clone + Default>(buf: &mut Vec<T>, needed: usize) {
    if buf.len() < needed {
        let target = needed.max(buf.len() + buf.len() / 2);
        trace!("filter matrix grows {} -> {target}", buf.len());
        buf.resize(target, T::default());
    }
}

impl FilterMatrix {
    pub fn new() -> FilterMatrix {
        FilterMatrix::default()
    }

    /// Size the views for one (M, L) problem. Grow-only; cheap when the
    /// capacity already suffices.
    ///
    /// # Arguments
    /// - `byte_len` : byte-stripe row length (Qb·W).
    /// - `word_len` : word-stripe row length (Qw·W/2).
    /// - `float_len`: float-stripe row length (Qf·W/4).
    /// - `l`        : target sequence length.
    pub fn resize(&mut self, byte_len: usize, word_len: usize, float_len: usize, l: usize) {
        self.resize_byte(byte_len);
        self.resize_word(word_len);
        self.resize_float(float_len, l);
    }

    pub fn resize_byte(&mut self, byte_len: usize) {
        grow(&mut self.bytes, byte_len);
        self.byte_len = byte_len;
    }

    pub fn resize_word(&mut self, word_len: usize) {
        grow(&mut self.words, N_PLANES * word_len);
        self.word_len = word_len;
    }

    pub fn resize_float(&mut self, float_len: usize, l: usize) {
        grow(&mut self.floats, (l + 1) * N_PLANES * float_len);
        grow(&mut self.fwd_cum, l + 1);
        grow(&mut self.bck, 2 * N_PLANES * float_len);
        self.float_len = float_len;
        self.nrows = l + 1;
    }

    /// Logical clear between sequences. Buffers stay allocated; the
    /// kernels re-initialize everything they read.
    pub fn reset(&mut self) {
        self.byte_len = 0;
        self.word_len = 0;
        self.float_len = 0;
        self.nrows = 0;
    }

    #[inline]
    pub fn byte_row(&mut self) -> &mut [u8] {
        assert!(self.byte_len > 0, "filter matrix not sized for byte DP");
        &mut self.bytes[..self.byte_len]
    }

    /// The three word rows (M, I, D).
    #[inline]
    pub fn word_rows(&mut self) -> (&mut [i16], &mut [i16], &mut [i16]) {
        assert!(self.word_len > 0, "filter matrix not sized for word DP");
        let (m, rest) = self.words[..N_PLANES * self.word_len].split_at_mut(self.word_len);
        let (i, d) = rest.split_at_mut(self.word_len);
        (m, i, d)
    }

    #[inline]
    fn float_row_len(&self) -> usize {
        N_PLANES * self.float_len
    }

    /// Forward row `i`, all three planes.
    #[inline]
    pub fn fwd_row(&self, i: usize) -> &[f32] {
        assert!(i < self.nrows, "row {i} outside the sized forward matrix");
        let rl = self.float_row_len();
        &self.floats[i * rl..(i + 1) * rl]
    }

    /// Rows `i−1` (read) and `i` (write) of the Forward matrix.
    #[inline]
    pub fn fwd_row_pair(&mut self, i: usize) -> (&[f32], &mut [f32]) {
        assert!(i >= 1 && i < self.nrows, "row {i} outside the sized forward matrix");
        let rl = self.float_row_len();
        let (lo, hi) = self.floats.split_at_mut(i * rl);
        (&lo[(i - 1) * rl..], &mut hi[..rl])
    }

    #[inline]
    pub fn fwd_row_mut(&mut self, i: usize) -> &mut [f32] {
        assert!(i < self.nrows);
        let rl = self.float_row_len();
        &mut self.floats[i * rl..(i + 1) * rl]
    }

    /// Cumulative ln of the rescalings applied up to and including row `i`.
    #[inline]
    pub fn fwd_cum(&self, i: usize) -> f32 {
        self.fwd_cum[i]
    }

    #[inline]
    pub fn set_fwd_cum(&mut self, i: usize, v: f32) {
        self.fwd_cum[i] = v;
    }

    /// The two rolling Backward rows; callers alternate them by parity.
    #[inline]
    pub fn bck_rows(&mut self) -> (&mut [f32], &mut [f32]) {
        assert!(self.float_len > 0, "filter matrix not sized for float DP");
        let rl = self.float_row_len();
        let (a, b) = self.bck[..2 * rl].split_at_mut(rl);
        (a, b)
    }

    /// Forward row `i` (read) together with both Backward rolling rows
    /// (write). Field-disjoint, so the borrows coexist.
    #[inline]
    pub fn bck_pair_with_fwd(&mut self, i: usize) -> (&[f32], &mut [f32], &mut [f32]) {
        assert!(i < self.nrows, "row {i} outside the sized forward matrix");
        let rl = N_PLANES * self.float_len;
        let fwd = &self.floats[i * rl..(i + 1) * rl];
        let (a, b) = self.bck[..2 * rl].split_at_mut(rl);
        (fwd, a, b)
    }

    /// Plane `p` of a float row slice.
    #[inline]
    pub fn plane(row: &[f32], p: usize, len: usize) -> &[f32] {
        &row[p * len..(p + 1) * len]
    }

    #[inline]
    pub fn plane_mut(row: &mut [f32], p: usize, len: usize) -> &mut [f32] {
        &mut row[p * len..(p + 1) * len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_only_and_geometric() {
        let mut fx = FilterMatrix::new();
        fx.resize(16, 24, 12, 10);
        let cap0 = fx.floats.len();
        fx.resize(16, 24, 12, 5); // smaller: no shrink
        assert_eq!(fx.floats.len(), cap0);
        fx.resize(16, 24, 12, 11); // tiny bump: geometric growth kicks in
        assert!(fx.floats.len() >= cap0 + cap0 / 2);
    }

    #[test]
    fn views_are_disjoint_and_sized() {
        let mut fx = FilterMatrix::new();
        fx.resize(8, 12, 6, 3);
        assert_eq!(fx.byte_row().len(), 8);
        let (m, i, d) = fx.word_rows();
        assert_eq!((m.len(), i.len(), d.len()), (12, 12, 12));
        m[0] = 1;
        i[0] = 2;
        d[0] = 3;
        let (m, i, d) = fx.word_rows();
        assert_eq!((m[0], i[0], d[0]), (1, 2, 3));
        let (prev, cur) = fx.fwd_row_pair(1);
        assert_eq!(prev.len(), cur.len());
    }

    #[test]
    #[should_panic(expected = "not sized")]
    fn unsized_use_fails_loud() {
        let mut fx = FilterMatrix::new();
        fx.reset();
        let _ = fx.byte_row();
    }
}
