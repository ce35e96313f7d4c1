pub mod codec;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod identity;
pub mod policy;
pub mod principal;
pub mod security;
pub mod token_service;

pub use factory::{build_security_policy, build_token_service};
pub use token_service::TokenService;
