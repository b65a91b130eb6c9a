pub mod employee;
pub mod page;
pub mod user;
