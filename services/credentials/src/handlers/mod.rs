pub mod credential;
pub mod redemption;
