pub mod error;
pub mod principal_repo;
