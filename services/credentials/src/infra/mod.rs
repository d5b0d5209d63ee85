pub mod clock;
pub mod db;
pub mod grpc;
pub mod mailer;
pub mod secret;
