//! Generated gRPC bindings for services the credential service talks to.

pub mod directory {
    tonic::include_proto!("directory");
}
