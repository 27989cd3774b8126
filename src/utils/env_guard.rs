use std::fs;
use std::io;
use std::path::Path;

/// Split one `.env` line into `(key, value)`. Comments, blank lines and lines without `=` yield
/// `None`; matching single or double quotes around the value are stripped.
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value_no_comment = value.split('#').next().unwrap_or("").trim();
    let parsed = if value_no_comment.len() >= 2
        && ((value_no_comment.starts_with('"') && value_no_comment.ends_with('"'))
            || (value_no_comment.starts_with('\'') && value_no_comment.ends_with('\'')))
    {
        &value_no_comment[1..value_no_comment.len() - 1]
    } else {
        value_no_comment
    };
    Some((key, parsed))
}

/// Load `path` into the process environment without overriding variables that are already set.
/// A missing file is not an error. Returns how many variables were applied.
pub fn load_dot_env(path: &Path) -> io::Result<usize> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let mut applied = 0usize;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
        applied += 1;
    }
    Ok(applied)
}

/// Startup hook for the binary: load `./.env` if present. Runs before logging is installed, so
/// failures go to stderr directly.
pub fn harden_env_setup() -> usize {
    match load_dot_env(Path::new(".env")) {
        Ok(applied) => applied,
        Err(err) => {
            eprintln!("[ENV] Failed to read .env: {}", err);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_line_strips_quotes_and_comments() {
        assert_eq!(
            parse_env_line("EXPLORER_LOAN_CAP=\"32\" # dense"),
            Some(("EXPLORER_LOAN_CAP", "32"))
        );
        assert_eq!(
            parse_env_line("export EXPLORER_CURVE_LAYOUT='price_impact'"),
            Some(("EXPLORER_CURVE_LAYOUT", "price_impact"))
        );
        assert_eq!(parse_env_line("  # comment"), None);
        assert_eq!(parse_env_line("NO_EQUALS_SIGN"), None);
        assert_eq!(parse_env_line("=orphan"), None);
    }

    #[test]
    fn test_load_dot_env_does_not_override_existing_values() {
        let dir = std::env::temp_dir().join(format!("regime-explorer-env-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("dir");
        let path = dir.join(".env");
        fs::write(
            &path,
            "REGIME_EXPLORER_ENV_TEST_NEW=fresh\nREGIME_EXPLORER_ENV_TEST_SET=from_file\n",
        )
        .expect("write");
        std::env::set_var("REGIME_EXPLORER_ENV_TEST_SET", "from_process");

        let applied = load_dot_env(&path).expect("load");
        assert_eq!(applied, 1);
        assert_eq!(
            std::env::var("REGIME_EXPLORER_ENV_TEST_NEW").as_deref(),
            Ok("fresh")
        );
        assert_eq!(
            std::env::var("REGIME_EXPLORER_ENV_TEST_SET").as_deref(),
            Ok("from_process")
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("regime-explorer-definitely-missing.env");
        assert_eq!(load_dot_env(&path).expect("missing is fine"), 0);
    }
}
