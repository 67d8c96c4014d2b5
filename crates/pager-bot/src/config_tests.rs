#[cfg(test)]
mod tests {
    use crate::config::{Config, OperationalStatus, ReadEnv};
    use discord_pager::PaginatorConfig;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct InMemoryEnv(HashMap<&'static str, &'static str>);

    impl InMemoryEnv {
        fn new(pairs: &[(&'static str, &'static str)]) -> Self {
            Self(pairs.iter().cloned().collect())
        }
    }

    impl ReadEnv for InMemoryEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── from_file ─────────────────────────────────────────────────────────────

    #[test]
    fn test_from_file_minimal() {
        let toml = r#"
[discord]
bot_token = "BOT-TOKEN-123"
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.discord.bot_token, "BOT-TOKEN-123");
        assert_eq!(cfg.discord.prefixes, vec!["Tim.", "T.", "t.", "tim."]);
        assert_eq!(cfg.discord.status, OperationalStatus::Production);
        assert!(cfg.discord.error_webhook_url.is_none());
        assert_eq!(cfg.pagination.max_size, 1900);
        assert_eq!(cfg.pagination.max_pages, 10);
        assert_eq!(cfg.storage.error_cache_limit, Some(100));
        assert_eq!(cfg.storage.log_dir, "logs");
    }

    #[test]
    fn test_from_file_full() {
        let toml = r#"
[discord]
bot_token = "SECRET"
prefixes = ["!"]
status = "TESTING"
home_guild_id = 555
error_webhook_url = "https://discord.com/api/webhooks/1/abc"

[roles]
admin = [111, 222]
moderator = [333]
engineer = [444]

[pagination]
max_size = 1000
timeout_secs = 60
by_lines = false

[storage]
blacklist_path = "/var/lib/bot/blacklist.json"
error_cache_limit = 5
"#;
        let f = write_toml(toml);
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.discord.prefixes, vec!["!"]);
        assert_eq!(cfg.discord.status, OperationalStatus::Testing);
        assert_eq!(cfg.discord.home_guild_id, Some(555));
        assert_eq!(cfg.roles.admin, vec![111, 222]);
        assert_eq!(cfg.roles.moderator, vec![333]);
        assert_eq!(cfg.roles.engineer, vec![444]);
        assert_eq!(cfg.pagination.max_size, 1000);
        assert_eq!(cfg.pagination.timeout_secs, 60);
        assert!(!cfg.pagination.by_lines);
        assert_eq!(cfg.pagination.prefix, "```");
        assert_eq!(cfg.storage.blacklist_path, "/var/lib/bot/blacklist.json");
        assert_eq!(cfg.storage.error_cache_limit, Some(5));
    }

    #[test]
    fn test_example_config_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/pager-bot.toml");
        let cfg = Config::from_file(path).unwrap();
        assert_eq!(cfg.discord.status, OperationalStatus::Testing);
        assert_eq!(cfg.pagination, PaginatorConfig::default());
        assert_eq!(cfg.storage.error_cache_limit, Some(100));
    }

    #[test]
    fn test_from_file_missing_returns_error() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to read config file"));
    }

    #[test]
    fn test_from_file_invalid_toml_returns_error() {
        let f = write_toml("this is not valid toml !!!");
        let result = Config::from_file(f.path().to_str().unwrap());
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Failed to parse config file"));
    }

    #[test]
    fn test_from_file_unknown_status_returns_error() {
        let toml = r#"
[discord]
bot_token = "TOK"
status = "staging"
"#;
        let f = write_toml(toml);
        assert!(Config::from_file(f.path().to_str().unwrap()).is_err());
    }

    // ── from_env ──────────────────────────────────────────────────────────────

    #[test]
    fn test_from_env_missing_token_returns_error() {
        let env = InMemoryEnv::new(&[]);
        let result = Config::from_env_impl(&env);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_env_defaults() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok")]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.bot_token, "tok");
        assert_eq!(cfg.discord.prefixes.len(), 4);
        assert_eq!(cfg.discord.status, OperationalStatus::Production);
        assert!(cfg.discord.home_guild_id.is_none());
        assert!(cfg.roles.admin.is_empty());
        assert_eq!(cfg.storage.blacklist_path, "data/blacklist.json");
    }

    #[test]
    fn test_from_env_reads_everything() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "env-token-abc"),
            ("BOT_PREFIXES", "?, !"),
            ("BOT_STATUS", "testing"),
            ("HOME_GUILD_ID", "739205949134471238"),
            ("ERROR_WEBHOOK_URL", "https://example.invalid/hook"),
            ("ADMIN_ROLES", "1, 2"),
            ("MOD_ROLES", "3"),
            ("ENGINEER_ROLES", "4,bad,5"),
            ("PAGINATION_MAX_SIZE", "500"),
            ("PAGINATION_MAX_PAGES", "20"),
            ("PAGINATION_TIMEOUT_SECS", "30"),
            ("PAGINATION_BY_LINES", "off"),
            ("BLACKLIST_PATH", "/tmp/bl.json"),
            ("ERROR_CACHE_LIMIT", "none"),
            ("LOG_DIR", "/var/log/bot"),
        ]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.prefixes, vec!["?", "!"]);
        assert_eq!(cfg.discord.status, OperationalStatus::Testing);
        assert_eq!(cfg.discord.home_guild_id, Some(739205949134471238));
        assert_eq!(
            cfg.discord.error_webhook_url.as_deref(),
            Some("https://example.invalid/hook")
        );
        assert_eq!(cfg.roles.admin, vec![1, 2]);
        assert_eq!(cfg.roles.moderator, vec![3]);
        assert_eq!(cfg.roles.engineer, vec![4, 5]);
        assert_eq!(cfg.pagination.max_size, 500);
        assert_eq!(cfg.pagination.max_pages, 20);
        assert_eq!(cfg.pagination.timeout_secs, 30);
        assert!(!cfg.pagination.by_lines);
        assert_eq!(cfg.storage.blacklist_path, "/tmp/bl.json");
        assert_eq!(cfg.storage.error_cache_limit, None);
        assert_eq!(cfg.storage.log_dir, "/var/log/bot");
    }

    #[test]
    fn test_from_env_bad_number_returns_error() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("PAGINATION_MAX_SIZE", "huge"),
        ]);
        let msg = Config::from_env_impl(&env).unwrap_err().to_string();
        assert!(msg.contains("PAGINATION_MAX_SIZE"));
    }

    #[test]
    fn test_from_env_bad_bool_returns_error() {
        let env = InMemoryEnv::new(&[
            ("DISCORD_BOT_TOKEN", "tok"),
            ("PAGINATION_BY_LINES", "sometimes"),
        ]);
        assert!(Config::from_env_impl(&env).is_err());
    }

    #[test]
    fn test_from_env_bad_status_returns_error() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok"), ("BOT_STATUS", "staging")]);
        let msg = Config::from_env_impl(&env).unwrap_err().to_string();
        assert!(msg.contains("unknown status"));
    }

    #[test]
    fn test_from_env_empty_prefix_list_falls_back() {
        let env = InMemoryEnv::new(&[("DISCORD_BOT_TOKEN", "tok"), ("BOT_PREFIXES", " , ")]);
        let cfg = Config::from_env_impl(&env).unwrap();
        assert_eq!(cfg.discord.prefixes.len(), 4);
    }

    // ── OperationalStatus ────────────────────────────────────────────────────

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(
            "PRODUCTION".parse::<OperationalStatus>(),
            Ok(OperationalStatus::Production)
        );
        assert_eq!(
            "Testing".parse::<OperationalStatus>(),
            Ok(OperationalStatus::Testing)
        );
        assert!("prod".parse::<OperationalStatus>().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(OperationalStatus::Production.to_string(), "PRODUCTION");
        assert_eq!(OperationalStatus::Testing.to_string(), "TESTING");
    }
}
