pub mod actor;
pub mod common;
pub mod sys;
