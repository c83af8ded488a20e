//! Bank statement reconciliation
//!
//! `import` turns raw CSV/XLSX files into normalized statement lines;
//! `matcher` scores those lines against existing vouchers and proposes
//! matches. Proposals are only ever confirmed or rejected by a human — the
//! matcher itself never commits a match.

pub mod import;
pub mod matcher;

pub use import::*;
pub use matcher::*;
