pub mod config;
pub mod extensions;
pub mod plugins;
pub mod serve;
pub mod webui;
