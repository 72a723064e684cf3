// CV ingestion: pre-upload validation, format detection and text extraction.
// Nothing in here touches the network or the database.

pub mod extract;
pub mod format;
pub mod validator;
