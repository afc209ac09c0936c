pub mod speech;
pub mod storage;
