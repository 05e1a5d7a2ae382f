pub mod transfer;
pub mod user;

pub use transfer::TransferProgress;
pub use user::UserProfile;
