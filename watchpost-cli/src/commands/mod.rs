pub mod init;
pub mod run;
pub mod status;
pub mod wipe;
