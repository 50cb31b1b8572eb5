use crate::sparse::ScatteredVec;

/// Column-wise copy of the constraint matrix with a row-wise mirror.
///
/// Each row of the mirror is partitioned: entries for nonbasic columns come
/// first, entries for basic columns after `ar_nend`. Row-wise PRICE only
/// needs the nonbasic section, and a pivot just swaps the two variables
/// between sections.
#[derive(Clone, Debug, Default)]
pub struct Matrix {
    num_col: usize,
    num_row: usize,
    a_start: Vec<usize>,
    a_index: Vec<usize>,
    a_value: Vec<f64>,
    ar_start: Vec<usize>,
    ar_nend: Vec<usize>,
    ar_index: Vec<usize>,
    ar_value: Vec<f64>,
}

impl Matrix {
    pub fn new() -> Matrix {
        Matrix::default()
    }

    /// Rebuild both copies for a general basis.
    pub fn setup(
        &mut self,
        num_col: usize,
        num_row: usize,
        a_start: &[usize],
        a_index: &[usize],
        a_value: &[f64],
        nonbasic_flag: &[bool],
    ) {
        self.copy_col_wise(num_col, num_row, a_start, a_index, a_value);

        let num_nz = a_index.len();
        let mut nonbasic_count = vec![0usize; num_row];
        for col in 0..num_col {
            if nonbasic_flag[col] {
                for k in a_start[col]..a_start[col + 1] {
                    nonbasic_count[a_index[k]] += 1;
                }
            }
        }
        self.build_row_wise(num_nz, Some(&nonbasic_count));
        self.fill_row_wise(|col| nonbasic_flag[col]);
    }

    /// Fast path for the logical basis: every structural column is nonbasic,
    /// so each row is entirely nonbasic section.
    pub fn setup_logical_basis(
        &mut self,
        num_col: usize,
        num_row: usize,
        a_start: &[usize],
        a_index: &[usize],
        a_value: &[f64],
    ) {
        self.copy_col_wise(num_col, num_row, a_start, a_index, a_value);

        let num_nz = a_index.len();
        self.build_row_wise(num_nz, None);
        self.fill_row_wise(|_col| true);
    }

    fn copy_col_wise(
        &mut self,
        num_col: usize,
        num_row: usize,
        a_start: &[usize],
        a_index: &[usize],
        a_value: &[f64],
    ) {
        self.num_col = num_col;
        self.num_row = num_row;
        self.a_start = a_start.to_vec();
        self.a_index = a_index.to_vec();
        self.a_value = a_value.to_vec();
    }

    /// Lay out the row-wise arrays. With `nonbasic_count` each row's
    /// nonbasic section gets that many slots; without it (logical basis)
    /// every entry is nonbasic.
    fn build_row_wise(&mut self, num_nz: usize, nonbasic_count: Option<&[usize]>) {
        let mut count = vec![0usize; self.num_row];
        for &row in &self.a_index {
            count[row] += 1;
        }
        self.ar_start = Vec::with_capacity(self.num_row + 1);
        self.ar_start.push(0);
        for row in 0..self.num_row {
            self.ar_start.push(self.ar_start[row] + count[row]);
        }
        self.ar_nend = match nonbasic_count {
            Some(counts) => (0..self.num_row)
                .map(|row| self.ar_start[row] + counts[row])
                .collect(),
            None => self.ar_start[1..].to_vec(),
        };
        self.ar_index = vec![0; num_nz];
        self.ar_value = vec![0.0; num_nz];
    }

    fn fill_row_wise(&mut self, is_nonbasic: impl Fn(usize) -> bool) {
        let mut cursor_nonbasic: Vec<usize> = self.ar_start[..self.num_row].to_vec();
        let mut cursor_basic: Vec<usize> = self.ar_nend.clone();
        for col in 0..self.num_col {
            let nonbasic = is_nonbasic(col);
            for k in self.a_start[col]..self.a_start[col + 1] {
                let row = self.a_index[k];
                let put = if nonbasic {
                    let put = cursor_nonbasic[row];
                    cursor_nonbasic[row] += 1;
                    put
                } else {
                    let put = cursor_basic[row];
                    cursor_basic[row] += 1;
                    put
                };
                self.ar_index[put] = col;
                self.ar_value[put] = self.a_value[k];
            }
        }
    }

    /// Accumulate `alpha` times column `var` into `buffer`. A logical
    /// contributes a unit spike in its own row.
    pub fn collect_aj(&self, buffer: &mut ScatteredVec, var: usize, alpha: f64) {
        if var < self.num_col {
            for k in self.a_start[var]..self.a_start[var + 1] {
                buffer.add(self.a_index[k], alpha * self.a_value[k]);
            }
        } else {
            buffer.add(var - self.num_col, alpha);
        }
    }

    /// Column-wise PRICE: result[j] = Σ_i A_ij · pi_i over the structural
    /// columns.
    pub fn price_by_col(&self, result: &mut [f64], pi: &ScatteredVec) {
        for col in 0..self.num_col {
            let mut value = 0.0;
            for k in self.a_start[col]..self.a_start[col + 1] {
                value += self.a_value[k] * pi.values[self.a_index[k]];
            }
            result[col] = value;
        }
    }

    /// Re-partition the row-wise mirror after a basis swap: `column_in`
    /// enters the basis, `column_out` leaves it.
    pub fn update(&mut self, column_in: usize, column_out: usize) {
        if column_in < self.num_col {
            for k in self.a_start[column_in]..self.a_start[column_in + 1] {
                let row = self.a_index[k];
                let last = self.ar_nend[row] - 1;
                let at = self.find_in_section(row, self.ar_start[row], self.ar_nend[row], column_in);
                self.ar_index.swap(at, last);
                self.ar_value.swap(at, last);
                self.ar_nend[row] = last;
            }
        }
        if column_out < self.num_col {
            for k in self.a_start[column_out]..self.a_start[column_out + 1] {
                let row = self.a_index[k];
                let at =
                    self.find_in_section(row, self.ar_nend[row], self.ar_start[row + 1], column_out);
                let first = self.ar_nend[row];
                self.ar_index.swap(at, first);
                self.ar_value.swap(at, first);
                self.ar_nend[row] = first + 1;
            }
        }
    }

    fn find_in_section(&self, row: usize, from: usize, to: usize, col: usize) -> usize {
        for k in from..to {
            if self.ar_index[k] == col {
                return k;
            }
        }
        panic!("column {} missing from row {} section", col, row);
    }

    pub fn num_col(&self) -> usize {
        self.num_col
    }

    pub fn num_row(&self) -> usize {
        self.num_row
    }

    /// Column access for the factor: (row indices, values) of a basic
    /// variable's column. A logical has no stored column.
    pub fn col_storage(&self, col: usize) -> (&[usize], &[f64]) {
        let range = self.a_start[col]..self.a_start[col + 1];
        (&self.a_index[range.clone()], &self.a_value[range])
    }
}
