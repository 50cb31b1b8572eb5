pub mod revised_dual_simplex;
