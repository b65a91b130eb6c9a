pub mod employee;
pub mod export;
pub mod stats;
