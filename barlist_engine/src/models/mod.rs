pub mod bar;
pub mod discrepancy;
pub mod verification;
