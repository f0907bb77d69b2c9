use prost::Message;

const PROTO_DIR: &str = "proto";
const PROTO_FILE: &str = "greeter.proto";

/// Messages that also carry the proto3 JSON mapping.
const JSON_MESSAGES: [&str; 11] = [
    "ToDoDetails",
    "ToDoItem",
    "GetAllResponse",
    "GetOneRequest",
    "GetOneResponse",
    "CreateRequest",
    "CreateResponse",
    "UpdateRequest",
    "UpdateResponse",
    "UpdateStatusRequest",
    "DeleteRequest",
];

const INT64_FIELDS: [&str; 5] = [
    "ToDoItem.id",
    "GetOneRequest.id",
    "UpdateRequest.id",
    "UpdateStatusRequest.id",
    "DeleteRequest.id",
];

const STATUS_FIELDS: [&str; 2] = ["ToDoDetails.status", "UpdateStatusRequest.status"];

const OPTIONAL_MESSAGE_FIELDS: [&str; 6] = [
    "ToDoItem.item",
    "GetOneResponse.item",
    "CreateRequest.item",
    "CreateResponse.item",
    "UpdateRequest.item",
    "UpdateResponse.item",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR")?);
    let descriptor_path = out_dir.join("greeter_descriptor.bin");

    // Parsed in-process by protox; tonic-prost-build reads the set back.
    let file_descriptors = protox::compile([PROTO_FILE], [PROTO_DIR])?;
    std::fs::write(&descriptor_path, file_descriptors.encode_to_vec())?;

    let mut builder = tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(&descriptor_path)
        .skip_protoc_run();

    for message in JSON_MESSAGES {
        builder = builder.message_attribute(
            format!(".greeter.{message}"),
            "#[derive(serde::Serialize, serde::Deserialize)]\n\
             #[serde(rename_all = \"camelCase\", default, deny_unknown_fields)]",
        );
    }
    for field in INT64_FIELDS {
        builder = builder.field_attribute(
            format!(".greeter.{field}"),
            "#[serde(with = \"crate::json::int64\")]",
        );
    }
    for field in STATUS_FIELDS {
        builder = builder.field_attribute(
            format!(".greeter.{field}"),
            "#[serde(with = \"crate::json::status\")]",
        );
    }
    for field in OPTIONAL_MESSAGE_FIELDS {
        builder = builder.field_attribute(
            format!(".greeter.{field}"),
            "#[serde(skip_serializing_if = \"Option::is_none\")]",
        );
    }
    builder = builder.field_attribute(
        ".greeter.ToDoItem.created_at",
        "#[serde(with = \"crate::json::timestamp\", alias = \"created_at\", \
         skip_serializing_if = \"Option::is_none\")]",
    );

    builder.compile_protos(&[format!("{PROTO_DIR}/{PROTO_FILE}")], &[PROTO_DIR.to_string()])?;

    println!("cargo:rerun-if-changed={PROTO_DIR}/{PROTO_FILE}");
    Ok(())
}
