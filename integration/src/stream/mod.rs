//! Stream combinators.

pub mod indexed;
