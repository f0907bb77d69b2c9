//! Wire contract of the `greeter.ToDoService` RPC service.
//!
//! # Overview
//! Shared by the server and the client crates: the protobuf messages and the
//! tonic service stubs generated from `proto/greeter.proto`, the proto3 JSON
//! mapping used by Connect, the method table, and the encoded descriptor set
//! served through gRPC reflection.
//!
//! # Design
//! - `build.rs` compiles `greeter.proto` with `tonic-prost-build`; the serde
//!   derives for the JSON mapping are attached there as attributes, so the
//!   `.proto` file is the only definition of every message.
//! - The package is `greeter` so existing Connect and gRPC clients generated
//!   from the same `.proto` keep working.

pub mod connect;
pub mod json;
pub mod timestamp;

/// Code generated from `proto/greeter.proto`.
pub mod greeter {
    tonic::include_proto!("greeter");
}

pub use greeter::{
    CreateRequest, CreateResponse, DeleteRequest, GetAllResponse, GetOneRequest, GetOneResponse,
    Status, ToDoDetails, ToDoItem, UpdateRequest, UpdateResponse, UpdateStatusRequest,
};
pub use json::JsonMessage;
pub use prost_types::Timestamp;
pub use tonic::Code;

pub const PACKAGE: &str = "greeter";
pub const SERVICE_NAME: &str = "greeter.ToDoService";

/// Encoded `FileDescriptorSet` of `greeter.proto` and the files it imports.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("greeter_descriptor");

/// The unary methods of `greeter.ToDoService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetAll,
    GetOne,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::GetAll,
        Method::GetOne,
        Method::Create,
        Method::Update,
        Method::UpdateStatus,
        Method::Delete,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::GetAll => "GetAll",
            Method::GetOne => "GetOne",
            Method::Create => "Create",
            Method::Update => "Update",
            Method::UpdateStatus => "UpdateStatus",
            Method::Delete => "Delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// HTTP path shared by every protocol: `/greeter.ToDoService/<Method>`.
    pub fn path(self) -> String {
        format!("/{SERVICE_NAME}/{}", self.name())
    }
}
