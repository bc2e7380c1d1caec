//! Outer surfaces: CSV import/export used by the command line tool.

pub mod csv;
