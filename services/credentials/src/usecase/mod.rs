pub mod history;
pub mod issue;
pub mod redeem;
