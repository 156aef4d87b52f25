pub mod config;
pub mod create;
pub mod diff;
pub mod init;
pub mod push;
pub mod status;
pub mod token;
pub mod watch;
