//! Domain layer - pure types and quota logic, no I/O.

pub mod foundation;
pub mod quota;
