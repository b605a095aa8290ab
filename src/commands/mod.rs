pub mod init;
pub mod produce;
pub mod report;
pub mod run_batch;
pub mod schedule;
pub mod status;
