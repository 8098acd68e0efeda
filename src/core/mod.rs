pub mod archive;
pub mod aux_deploy;
pub mod dependency;
pub mod fetcher;
pub mod init_system;
pub mod installer;
pub mod port;
pub mod release;
pub mod service;

pub use crate::utils::error::Result;
