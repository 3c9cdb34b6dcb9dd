//! CSV Export
//!
//! Back-office convenience export of user records. Fields are always
//! quoted; embedded double quotes are escaped by doubling.

use std::path::Path;
use thiserror::Error;

use crate::users::User;

/// Column order of the exported listing
pub const USER_CSV_HEADERS: [&str; 6] = [
    "username",
    "email",
    "role",
    "bio",
    "email_verified",
    "two_factor_enabled",
];

/// Errors that can occur while exporting
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export buffer error: {0}")]
    Buffer(String),
}

/// Render user records as a CSV document
pub fn users_to_csv(users: &[User]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(USER_CSV_HEADERS)?;

    for user in users {
        writer.write_record([
            user.username.as_str(),
            user.email.as_str(),
            user.role.map(|r| r.as_str()).unwrap_or(""),
            user.bio.as_deref().unwrap_or(""),
            if user.email_verified { "true" } else { "false" },
            if user.two_factor_enabled { "true" } else { "false" },
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

/// Write the user listing to a file
pub fn write_users_csv(path: &Path, users: &[User]) -> Result<(), ExportError> {
    let content = users_to_csv(users)?;
    std::fs::write(path, content)?;
    Ok(())
}
