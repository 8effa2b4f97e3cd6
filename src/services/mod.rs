pub mod archive;
pub mod cache;
pub mod config;
pub mod fs_utils;
pub mod package;
pub mod pipeline;
pub mod reorganize;
pub mod resources;
pub mod scanner;
pub mod transform;
