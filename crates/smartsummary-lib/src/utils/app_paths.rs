// Application paths and error sanitization

use std::path::PathBuf;

/// Directory name under the platform data dir
pub const APP_IDENTIFIER: &str = "com.smartsummary.SmartSummary";

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf, String> {
    dirs::data_dir()
        .map(|p| p.join(APP_IDENTIFIER))
        .ok_or_else(|| "Could not determine application data directory".to_string())
}

/// Strip home directory paths from error messages shown to users
pub fn sanitize_error(error: &str) -> String {
    let home_dir = dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut sanitized = error.to_string();
    if !home_dir.is_empty() {
        sanitized = sanitized.replace(&home_dir, "~");
    }

    sanitized.replace("/Users/", "~/").replace("/home/", "~/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_error_hides_user_dirs() {
        let sanitized = sanitize_error("Failed to open /home/alice/data.db");
        assert!(!sanitized.contains("/home/"));
        assert!(sanitized.contains("data.db"));
    }

    #[test]
    fn test_app_data_dir_uses_identifier() {
        if let Ok(dir) = get_app_data_dir() {
            assert!(dir.ends_with(APP_IDENTIFIER));
        }
    }
}
