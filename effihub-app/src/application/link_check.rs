use effihub_errors::AppError;

const MAX_URL_LENGTH: usize = 2048;
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Validates links submitted with a new app (app link, logo URL) before they
/// are stored and rendered for other users.
pub struct LinkCheck;

impl LinkCheck {
    pub fn validate(field: &str, raw: &str) -> Result<String, AppError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(AppError::validation(field, "Link must not be empty"));
        }
        if raw.len() > MAX_URL_LENGTH {
            return Err(AppError::validation(field, "Link is too long"));
        }

        let parsed = url::Url::parse(raw)
            .map_err(|_| AppError::validation(field, "Link is not a valid URL"))?;

        let scheme = parsed.scheme().to_lowercase();
        if !ALLOWED_SCHEMES.contains(&scheme.as_str()) {
            return Err(AppError::validation(
                field,
                "Only http and https links are allowed",
            ));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::validation(field, "Link must have a host"))?;
        if host == "localhost" || host.starts_with("127.") || host.starts_with("192.168.") {
            return Err(AppError::validation(field, "Local links are not allowed"));
        }

        Ok(parsed.to_string())
    }
}
