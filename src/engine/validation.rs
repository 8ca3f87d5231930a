//! Connection form validation

use crate::engine::types::ConnectionConfig;

/// Lists every rule the config violates, in form order.
pub fn validate_connection(config: &ConnectionConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push("Host cannot be empty".to_string());
    }

    // u16 already caps the upper bound
    if config.port == 0 {
        errors.push("Port must be a number between 1 and 65535".to_string());
    }

    if config.user.trim().is_empty() {
        errors.push("Username cannot be empty".to_string());
    }

    if config.database.trim().is_empty() {
        errors.push("Database name cannot be empty".to_string());
    }

    if config.password.is_empty() {
        errors.push("Password cannot be empty".to_string());
    }

    errors
}

/// Trims the text fields and rejects configs that fail validation.
pub fn normalize_config(mut config: ConnectionConfig) -> Result<ConnectionConfig, String> {
    config.host = config.host.trim().to_string();
    config.user = config.user.trim().to_string();
    config.database = config.database.trim().to_string();
    config.connection_name = config
        .connection_name
        .take()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let errors = validate_connection(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::DbType;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            host: " db.internal ".to_string(),
            port: 5432,
            user: "app ".to_string(),
            password: "pw".to_string(),
            database: "orders".to_string(),
            db_type: DbType::Postgres,
            connection_name: Some("  ".to_string()),
        }
    }

    #[test]
    fn valid_config_is_trimmed() {
        let normalized = normalize_config(config()).expect("valid");
        assert_eq!(normalized.host, "db.internal");
        assert_eq!(normalized.user, "app");
        assert_eq!(normalized.connection_name, None);
    }

    #[test]
    fn reports_every_violation() {
        let mut bad = config();
        bad.host = "   ".to_string();
        bad.port = 0;
        bad.user = String::new();
        bad.database = String::new();
        bad.password = String::new();

        let errors = validate_connection(&bad);
        assert_eq!(
            errors,
            vec![
                "Host cannot be empty",
                "Port must be a number between 1 and 65535",
                "Username cannot be empty",
                "Database name cannot be empty",
                "Password cannot be empty",
            ]
        );

        let err = normalize_config(bad).expect_err("invalid");
        assert!(err.starts_with("Host cannot be empty; Port"));
    }
}
