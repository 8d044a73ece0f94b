pub mod assignment;
pub mod subject;
pub mod submission;
