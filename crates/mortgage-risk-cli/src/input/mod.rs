pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Request precedence: `--input` file, then piped stdin. `None` means the
/// caller should fall back to individual flags.
pub fn read_request<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Some(file::read_document(path)?)),
        None => stdin::read_stdin(),
    }
}
