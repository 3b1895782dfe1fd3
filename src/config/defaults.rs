use super::*;

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://vandebron.nl".to_string(),
            timeout_secs: 10,
            user_agent: format!("vandebron-green/{}", env!("APP_VERSION")),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 15 * 60,
            timezone: "Europe/Amsterdam".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            entry_file: "/data/vandebron_entry.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/vandebron.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            coordinator: CoordinatorConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
