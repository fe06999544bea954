use std::path::Path;

pub const COOKIES_ENV: &str = "STEAM_COOKIES";
pub const COOKIES_FILE_ENV: &str = "STEAM_COOKIES_FILE";

/// Cookie header for profile requests.
///
/// The file named by `STEAM_COOKIES_FILE` wins when it exists and is not
/// blank; otherwise `STEAM_COOKIES` is used.
pub fn load_cookies() -> Option<String> {
    if let Ok(file) = std::env::var(COOKIES_FILE_ENV) {
        if !file.trim().is_empty() {
            if let Some(cookies) = read_cookie_file(Path::new(file.trim())) {
                return Some(cookies);
            }
        }
    }

    let from_env = std::env::var(COOKIES_ENV).ok()?;
    let from_env = from_env.trim();
    if from_env.is_empty() {
        tracing::debug!("no steam cookies configured");
        return None;
    }
    tracing::info!(var = COOKIES_ENV, "loaded steam cookies from environment");
    Some(from_env.to_string())
}

fn read_cookie_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            tracing::info!(path = %path.display(), "loaded steam cookies from file");
            Some(content.trim().to_string())
        }
        Ok(_) => {
            tracing::warn!(path = %path.display(), "cookie file is empty");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cookie file unreadable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        std::env::remove_var(COOKIES_ENV);
        std::env::remove_var(COOKIES_FILE_ENV);
    }

    #[test]
    #[serial]
    fn test_file_wins_over_env() {
        clear();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "sessionid=abc; steamLoginSecure=xyz\n").unwrap();
        std::env::set_var(COOKIES_FILE_ENV, &path);
        std::env::set_var(COOKIES_ENV, "sessionid=env");

        assert_eq!(
            load_cookies(),
            Some("sessionid=abc; steamLoginSecure=xyz".to_string())
        );
        clear();
    }

    #[test]
    #[serial]
    fn test_blank_or_missing_file_falls_back() {
        clear();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "   \n").unwrap();
        std::env::set_var(COOKIES_FILE_ENV, &path);
        std::env::set_var(COOKIES_ENV, " sessionid=env ");
        assert_eq!(load_cookies(), Some("sessionid=env".to_string()));

        std::env::set_var(COOKIES_FILE_ENV, dir.path().join("missing.txt"));
        assert_eq!(load_cookies(), Some("sessionid=env".to_string()));
        clear();
    }

    #[test]
    #[serial]
    fn test_nothing_configured() {
        clear();
        assert_eq!(load_cookies(), None);
        std::env::set_var(COOKIES_ENV, "");
        assert_eq!(load_cookies(), None);
        clear();
    }
}
