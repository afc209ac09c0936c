pub mod jobs;
pub mod pipeline;
pub mod speech;
pub mod storage;
