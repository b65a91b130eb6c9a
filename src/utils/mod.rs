pub mod guard;
pub mod jwt;
pub mod media;
pub mod password;
pub mod validation;
