pub mod decision;
pub mod signal;
pub mod tick;
