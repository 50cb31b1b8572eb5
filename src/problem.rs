use crate::consts::INF;
use crate::datatype::CsVec;
use crate::solver::Error;

/// Objective sense of the LP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjSense {
    Minimise,
    Maximise,
}

impl ObjSense {
    /// Sign applied to the costs when populating the working arrays.
    pub fn sign(&self) -> f64 {
        match self {
            ObjSense::Minimise => 1.0,
            ObjSense::Maximise => -1.0,
        }
    }
}

/// A linear program in column-major form:
/// min sense * cᵀx  subject to  row_lower ≤ Ax ≤ row_upper,
/// col_lower ≤ x ≤ col_upper, with A stored as CSC.
///
/// An infinite bound is the `INF` sentinel; such a bound is never rescaled.
#[derive(Clone, Debug, PartialEq)]
pub struct Lp {
    pub num_col: usize,
    pub num_row: usize,
    pub sense: ObjSense,
    pub offset: f64,
    pub model_name: String,
    pub col_cost: Vec<f64>,
    pub col_lower: Vec<f64>,
    pub col_upper: Vec<f64>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,
    pub a_start: Vec<usize>,
    pub a_index: Vec<usize>,
    pub a_value: Vec<f64>,
}

impl Lp {
    /// An LP with no columns, rows or nonzeros.
    pub fn empty(model_name: &str) -> Lp {
        Lp {
            num_col: 0,
            num_row: 0,
            sense: ObjSense::Minimise,
            offset: 0.0,
            model_name: model_name.to_string(),
            col_cost: vec![],
            col_lower: vec![],
            col_upper: vec![],
            row_lower: vec![],
            row_upper: vec![],
            a_start: vec![0],
            a_index: vec![],
            a_value: vec![],
        }
    }

    pub fn num_tot(&self) -> usize {
        self.num_col + self.num_row
    }

    pub fn num_nz(&self) -> usize {
        self.a_index.len()
    }

    /// Check the structural invariants of the column-major storage.
    pub fn validate(&self) -> Result<(), Error> {
        let fail = |what: String| Err(Error::StructuralInvariantViolation(what));
        if self.col_cost.len() != self.num_col
            || self.col_lower.len() != self.num_col
            || self.col_upper.len() != self.num_col
        {
            return fail(format!(
                "column vectors disagree with num_col = {}",
                self.num_col
            ));
        }
        if self.row_lower.len() != self.num_row || self.row_upper.len() != self.num_row {
            return fail(format!(
                "row vectors disagree with num_row = {}",
                self.num_row
            ));
        }
        if self.a_start.len() != self.num_col + 1 {
            return fail(format!(
                "a_start has {} entries for {} columns",
                self.a_start.len(),
                self.num_col
            ));
        }
        if self.a_start[0] != 0 {
            return fail("a_start does not begin at zero".to_string());
        }
        for col in 0..self.num_col {
            if self.a_start[col] > self.a_start[col + 1] {
                return fail(format!("a_start decreases at column {}", col));
            }
        }
        if self.a_start[self.num_col] != self.a_index.len()
            || self.a_index.len() != self.a_value.len()
        {
            return fail(format!(
                "a_start[{}] = {} but {} indices and {} values",
                self.num_col,
                self.a_start[self.num_col],
                self.a_index.len(),
                self.a_value.len()
            ));
        }
        if let Some(&bad) = self.a_index.iter().find(|&&row| row >= self.num_row) {
            return fail(format!("matrix row index {} out of range", bad));
        }
        Ok(())
    }
}

/// Relation of a constraint left-hand side to its right-hand side, as a
/// shorthand for range rows.
#[derive(Clone, Copy, Debug)]
pub enum ComparisonOp {
    Eq,
    Le,
    Ge,
}

impl ComparisonOp {
    fn to_row_bounds(self, rhs: f64) -> (f64, f64) {
        match self {
            ComparisonOp::Eq => (rhs, rhs),
            ComparisonOp::Le => (-INF, rhs),
            ComparisonOp::Ge => (rhs, INF),
        }
    }
}

/// A reference to a variable added to a [`Problem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(pub(crate) usize);

impl Variable {
    pub fn idx(&self) -> usize {
        self.0
    }
}

/// Incremental builder assembling an [`Lp`] row by row.
#[derive(Clone, Debug)]
pub struct Problem {
    sense: ObjSense,
    offset: f64,
    model_name: String,
    col_cost: Vec<f64>,
    col_lower: Vec<f64>,
    col_upper: Vec<f64>,
    constraints: Vec<(CsVec, f64, f64)>,
}

impl Problem {
    pub fn new(sense: ObjSense) -> Problem {
        Problem {
            sense,
            offset: 0.0,
            model_name: String::new(),
            col_cost: vec![],
            col_lower: vec![],
            col_upper: vec![],
            constraints: vec![],
        }
    }

    pub fn with_name(mut self, model_name: &str) -> Problem {
        self.model_name = model_name.to_string();
        self
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    /// Add a variable with the given objective coefficient and bounds. Use
    /// `-INF` / `INF` for absent bounds.
    pub fn add_var(&mut self, obj_coeff: f64, (lower, upper): (f64, f64)) -> Variable {
        let var = Variable(self.col_cost.len());
        self.col_cost.push(obj_coeff);
        self.col_lower.push(lower);
        self.col_upper.push(upper);
        var
    }

    /// Add a range constraint lower ≤ Σ coeff·var ≤ upper.
    pub fn add_range_constraint(
        &mut self,
        terms: impl IntoIterator<Item = (Variable, f64)>,
        lower: f64,
        upper: f64,
    ) {
        let mut indices = vec![];
        let mut values = vec![];
        for (var, coeff) in terms {
            indices.push(var.0);
            values.push(coeff);
        }
        self.constraints.push((
            CsVec::new(self.col_cost.len(), indices, values),
            lower,
            upper,
        ));
    }

    /// Add a single-sided or equality constraint.
    pub fn add_constraint(
        &mut self,
        terms: impl IntoIterator<Item = (Variable, f64)>,
        op: ComparisonOp,
        rhs: f64,
    ) {
        let (lower, upper) = op.to_row_bounds(rhs);
        self.add_range_constraint(terms, lower, upper);
    }

    /// Assemble the column-major LP.
    pub fn build(self) -> Lp {
        let num_col = self.col_cost.len();
        let num_row = self.constraints.len();

        let mut row_lower = Vec::with_capacity(num_row);
        let mut row_upper = Vec::with_capacity(num_row);
        let mut col_counts = vec![0usize; num_col];
        for (coeffs, lower, upper) in &self.constraints {
            row_lower.push(*lower);
            row_upper.push(*upper);
            for &col in coeffs.indices() {
                col_counts[col] += 1;
            }
        }

        let mut a_start = Vec::with_capacity(num_col + 1);
        a_start.push(0usize);
        for col in 0..num_col {
            a_start.push(a_start[col] + col_counts[col]);
        }
        let num_nz = a_start[num_col];
        let mut cursor = a_start[..num_col].to_vec();
        let mut a_index = vec![0usize; num_nz];
        let mut a_value = vec![0.0; num_nz];
        for (row, (coeffs, _, _)) in self.constraints.iter().enumerate() {
            for (col, &value) in coeffs.iter() {
                let put = cursor[col];
                cursor[col] += 1;
                a_index[put] = row;
                a_value[put] = value;
            }
        }

        Lp {
            num_col,
            num_row,
            sense: self.sense,
            offset: self.offset,
            model_name: self.model_name,
            col_cost: self.col_cost,
            col_lower: self.col_lower,
            col_upper: self.col_upper,
            row_lower,
            row_upper,
            a_start,
            a_index,
            a_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_assembles_column_major_storage() {
        let mut problem = Problem::new(ObjSense::Minimise).with_name("two_by_two");
        let x = problem.add_var(1.0, (0.0, 1.0));
        let y = problem.add_var(1.0, (0.0, 1.0));
        problem.add_constraint([(x, 1.0), (y, 1.0)], ComparisonOp::Ge, 1.0);
        problem.add_range_constraint([(x, 2.0)], 0.0, 4.0);

        let lp = problem.build();
        assert!(lp.validate().is_ok());
        assert_eq!(lp.num_col, 2);
        assert_eq!(lp.num_row, 2);
        assert_eq!(lp.a_start, vec![0, 2, 3]);
        assert_eq!(lp.a_index, vec![0, 1, 0]);
        assert_eq!(lp.a_value, vec![1.0, 2.0, 1.0]);
        assert_eq!(lp.row_lower, vec![1.0, 0.0]);
        assert_eq!(lp.row_upper, vec![INF, 4.0]);
    }

    #[test]
    fn validate_rejects_ragged_starts() {
        let mut lp = Lp::empty("bad");
        lp.num_col = 1;
        lp.col_cost = vec![1.0];
        lp.col_lower = vec![0.0];
        lp.col_upper = vec![1.0];
        lp.a_start = vec![0, 1];
        assert!(lp.validate().is_err());
    }
}
