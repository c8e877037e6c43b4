pub mod backup_config;
pub mod compress;
pub mod dump;
pub mod file_ext;
pub mod finish;
pub mod orchestrator;
pub mod pipeline;
pub mod redacted;
pub mod result_error;
pub mod retention;
pub mod target;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;
