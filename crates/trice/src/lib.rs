//! trice - assign and reconcile trice IDs in C source trees
//!
//! The binary is a thin layer over [`trice_core`]: [`cli`] turns command-line
//! arguments into a [`trice_core::Config`], and [`output`] renders the run
//! summary.

pub mod cli;
pub mod output;
