use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Read a request document and deserialise it. `.yaml`/`.yml` files are
/// parsed as YAML, everything else as JSON.
pub fn read_document<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_document(&contents, DocumentFormat::from_path(&canonical))
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

fn parse_document<T: DeserializeOwned>(
    contents: &str,
    format: DocumentFormat,
) -> Result<T, Box<dyn std::error::Error>> {
    let value = match format {
        DocumentFormat::Json => serde_json::from_str(contents)?,
        DocumentFormat::Yaml => serde_yaml::from_str(contents)?,
    };
    Ok(value)
}

/// Resolve the path and check it names an existing file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
