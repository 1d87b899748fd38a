#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("wrong number of arguments to {function}()")]
    WrongArgumentCount { function: &'static str },
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },
    #[error("could not find message type {name}")]
    MessageTypeNotFound { name: String },
    #[error("could not find enum type {name}")]
    EnumTypeNotFound { name: String },
    #[error("Invalid field name {field} in message {message}")]
    InvalidFieldName { field: String, message: String },
    #[error("Path traverses non-message elements at field {field}")]
    NonMessageTraversal { field: String },
    #[error("Expected index into repeated field {field}")]
    ExpectedIndex { field: String },
    #[error("Invalid index into non-repeated field {field}")]
    UnexpectedIndex { field: String },
    #[error("Enum value not found in {enum_type}: {value}")]
    EnumValueNotFound { enum_type: String, value: String },
    #[error("failed to decode message {name}")]
    Decode {
        name: String,
        #[source]
        err: prost::DecodeError,
    },
    #[error("invalid file descriptor set")]
    Descriptor(#[from] prost_reflect::DescriptorError),
    #[error("SQLite {found} is too old: 3.13.0 or newer is required")]
    SqliteVersion { found: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TextFormat(#[from] prost_reflect::text_format::ParseError),
    #[error(transparent)]
    FromSql(#[from] rusqlite::types::FromSqlError),
}

// Scalar functions must fail through the SQL result channel, never
// across the host ABI.
impl From<Error> for rusqlite::Error {
    fn from(err: Error) -> Self {
        rusqlite::Error::UserFunctionError(Box::new(err))
    }
}

mod cache;
mod convert;
mod enums;
mod extract;
mod functions;
mod path;
pub mod registry;

#[cfg(test)]
pub(crate) mod testdata;

pub use convert::{of_json, of_text, to_json, to_text};
pub use enums::{enum_name_of_number, enum_number_of_name};
pub use extract::extract;
pub use functions::register;
pub use path::{parse_path, Step};
