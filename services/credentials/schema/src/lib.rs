//! sea-orm entities owned by the credential service.

pub mod credentials;
pub mod redemption_records;
