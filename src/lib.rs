pub mod apis;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logger;
pub mod pricing;
pub mod rpc;
pub mod tokens;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;
