pub mod crypto;
pub mod export;
pub mod health;
pub mod init;
pub mod session;
pub mod stats;
pub mod users;
