pub mod incident;
pub mod user;
