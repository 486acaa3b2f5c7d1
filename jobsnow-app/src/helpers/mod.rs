pub mod password;
pub mod storage;
pub mod validation;

pub use storage::ClientStorage;
