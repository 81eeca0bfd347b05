use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "cirrostrats.toml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ALLOW_HTTP: bool = true;
pub const DEFAULT_TRACK_SEARCHES: bool = true;
pub const DEFAULT_LIVE_WEATHER: bool = true;
pub const DEFAULT_NAS_ENABLED: bool = true;
pub const DEFAULT_STORE_LIVE_WEATHER: bool = true;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_LOG_FILE: &str = "cirrostrats-tui.log";
pub const DEFAULT_THEME: &str = "default";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub timeout: Duration,
    pub insecure: bool,
    pub allow_http: bool,
    pub allow_insecure: bool,
    pub config_path: PathBuf,
    pub user_email: Option<String>,
    pub track_searches: bool,
    pub test_data: bool,
    pub live_weather: bool,
    pub nas_enabled: bool,
    pub store_live_weather: bool,
    pub legacy_weather_endpoint: bool,
    pub debounce: Duration,
    pub log_enabled: bool,
    pub log_level: String,
    pub log_file: String,
    pub theme: String,
}

impl Config {
    fn defaults(config_path: PathBuf) -> Self {
        Config {
            api_url: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            insecure: false,
            allow_http: DEFAULT_ALLOW_HTTP,
            allow_insecure: false,
            config_path,
            user_email: None,
            track_searches: DEFAULT_TRACK_SEARCHES,
            test_data: false,
            live_weather: DEFAULT_LIVE_WEATHER,
            nas_enabled: DEFAULT_NAS_ENABLED,
            store_live_weather: DEFAULT_STORE_LIVE_WEATHER,
            legacy_weather_endpoint: false,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            log_enabled: false,
            log_level: "info".to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    insecure: Option<bool>,
    allow_http: Option<bool>,
    allow_insecure: Option<bool>,
    user_email: Option<String>,
    track_searches: Option<bool>,
    test_data: Option<bool>,
    live_weather: Option<bool>,
    nas_enabled: Option<bool>,
    store_live_weather: Option<bool>,
    legacy_weather_endpoint: Option<bool>,
    debounce_ms: Option<u64>,
    log_enabled: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
    theme: Option<String>,
}

pub fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut explicit_config: Option<PathBuf> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--config needs a value"))?;
            explicit_config = Some(PathBuf::from(value));
        }
    }

    let env_config = env::var("CIRRO_CONFIG").ok().map(PathBuf::from);
    let config_path = explicit_config
        .clone()
        .or(env_config)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = Config::defaults(config_path.clone());

    if config_path.exists() {
        if let Some(file_config) = load_file_config(&config_path)? {
            apply_file_config(&mut config, file_config);
        }
    } else if explicit_config.is_some() {
        return Err(anyhow!("Config file not found: {}", config_path.display()));
    }

    apply_env(&mut config, |key| env::var(key).ok());
    apply_args(&mut config, &args)?;

    validate(&config)?;
    Ok(config)
}

fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(Some(cfg))
}

fn apply_file_config(target: &mut Config, file: FileConfig) {
    if let Some(api_url) = file.api_url {
        target.api_url = api_url;
    }
    if let Some(timeout) = file.timeout_secs {
        target.timeout = Duration::from_secs(timeout.max(1));
    }
    if let Some(insecure) = file.insecure {
        target.insecure = insecure;
    }
    if let Some(allow_http) = file.allow_http {
        target.allow_http = allow_http;
    }
    if let Some(allow_insecure) = file.allow_insecure {
        target.allow_insecure = allow_insecure;
    }
    if let Some(email) = file.user_email {
        target.user_email = non_empty(email);
    }
    if let Some(track) = file.track_searches {
        target.track_searches = track;
    }
    if let Some(test_data) = file.test_data {
        target.test_data = test_data;
    }
    if let Some(live) = file.live_weather {
        target.live_weather = live;
    }
    if let Some(nas) = file.nas_enabled {
        target.nas_enabled = nas;
    }
    if let Some(store) = file.store_live_weather {
        target.store_live_weather = store;
    }
    if let Some(legacy) = file.legacy_weather_endpoint {
        target.legacy_weather_endpoint = legacy;
    }
    if let Some(ms) = file.debounce_ms {
        target.debounce = Duration::from_millis(ms);
    }
    if let Some(log_enabled) = file.log_enabled {
        target.log_enabled = log_enabled;
    }
    if let Some(log_level) = file.log_level {
        target.log_level = log_level;
    }
    if let Some(log_file) = file.log_file {
        target.log_file = log_file;
    }
    if let Some(theme) = file.theme {
        target.theme = theme;
    }
}

fn apply_env(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    let flag = |key: &str| var(key).map(|value| truthy(&value));

    if let Some(url) = var("CIRRO_API_URL") {
        config.api_url = url;
    }
    if let Some(secs) = var("CIRRO_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
        config.timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(value) = flag("CIRRO_INSECURE") {
        config.insecure = value;
    }
    if let Some(value) = flag("CIRRO_ALLOW_HTTP") {
        config.allow_http = value;
    }
    if let Some(value) = flag("CIRRO_ALLOW_INSECURE") {
        config.allow_insecure = value;
    }
    if let Some(email) = var("CIRRO_USER_EMAIL") {
        config.user_email = non_empty(email);
    }
    if let Some(value) = flag("CIRRO_TRACK_SEARCHES") {
        config.track_searches = value;
    }
    if let Some(value) = flag("CIRRO_TEST_DATA") {
        config.test_data = value;
    }
    if let Some(value) = flag("CIRRO_LIVE_WEATHER") {
        config.live_weather = value;
    }
    if let Some(value) = flag("CIRRO_NAS") {
        config.nas_enabled = value;
    }
    if let Some(value) = flag("CIRRO_STORE_LIVE_WEATHER") {
        config.store_live_weather = value;
    }
    if let Some(value) = flag("CIRRO_LEGACY_WEATHER") {
        config.legacy_weather_endpoint = value;
    }
    if let Some(ms) = var("CIRRO_DEBOUNCE_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.debounce = Duration::from_millis(ms);
    }
    if let Some(value) = flag("CIRRO_LOG_ENABLED") {
        config.log_enabled = value;
    }
    if let Some(level) = var("CIRRO_LOG_LEVEL") {
        config.log_level = level;
    }
    if let Some(file) = var("CIRRO_LOG_FILE") {
        config.log_file = file;
    }
    if let Some(theme) = var("CIRRO_THEME") {
        config.theme = theme;
    }
}

fn apply_args(config: &mut Config, args: &[String]) -> Result<()> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                iter.next();
            }
            "--api-url" | "--url" => {
                config.api_url = iter
                    .next()
                    .ok_or_else(|| anyhow!("--api-url needs a value"))?
                    .to_string();
            }
            "--timeout" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--timeout needs a value"))?;
                let secs: u64 = value.parse()?;
                config.timeout = Duration::from_secs(secs.max(1));
            }
            "--insecure" => {
                config.insecure = true;
            }
            "--allow-http" => {
                config.allow_http = true;
            }
            "--allow-insecure" => {
                config.allow_insecure = true;
            }
            "--email" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--email needs a value"))?;
                config.user_email = non_empty(value.clone());
            }
            "--track" => {
                config.track_searches = true;
            }
            "--no-track" => {
                config.track_searches = false;
            }
            "--test-data" => {
                config.test_data = true;
            }
            "--no-live-weather" => {
                config.live_weather = false;
            }
            "--no-nas" => {
                config.nas_enabled = false;
            }
            "--no-store-live-weather" => {
                config.store_live_weather = false;
            }
            "--legacy-weather" => {
                config.legacy_weather_endpoint = true;
            }
            "--debounce-ms" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--debounce-ms needs a value"))?;
                config.debounce = Duration::from_millis(value.parse()?);
            }
            "--log" => {
                config.log_enabled = true;
            }
            "--no-log" => {
                config.log_enabled = false;
            }
            "--log-level" => {
                config.log_level = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-level needs a value"))?
                    .to_string();
            }
            "--log-file" => {
                config.log_file = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-file needs a value"))?
                    .to_string();
            }
            "--theme" => {
                config.theme = iter
                    .next()
                    .ok_or_else(|| anyhow!("--theme needs a value"))?
                    .to_string();
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}"));
            }
        }
    }
    Ok(())
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn print_help() {
    println!("cirrostrats-tui");
    println!("Usage: cirrostrats-tui [--api-url URL] [--timeout SECONDS] [--config PATH]");
    println!("       [--insecure] [--allow-http] [--allow-insecure]");
    println!("       [--email ADDRESS] [--track] [--no-track] [--test-data]");
    println!("       [--no-live-weather] [--no-nas] [--no-store-live-weather] [--legacy-weather]");
    println!("       [--debounce-ms MS] [--theme default|color|amber|mono]");
    println!("       [--log] [--no-log] [--log-level LEVEL] [--log-file PATH]");
    println!("Environment: CIRRO_API_URL sets the backend base URL");
    println!("Environment: CIRRO_CONFIG overrides config path");
    println!("Environment: CIRRO_INSECURE=1 enables invalid TLS certs");
    println!("Environment: CIRRO_ALLOW_HTTP=1 allows http:// URLs");
    println!("Environment: CIRRO_ALLOW_INSECURE=1 allows --insecure");
    println!("Environment: CIRRO_USER_EMAIL enables personalised suggestions");
    println!("Environment: CIRRO_TRACK_SEARCHES toggles search tracking");
    println!("Environment: CIRRO_TEST_DATA=1 serves built-in fixture data");
    println!("Environment: CIRRO_LIVE_WEATHER CIRRO_NAS CIRRO_STORE_LIVE_WEATHER toggle enrichment");
    println!("Environment: CIRRO_LEGACY_WEATHER uses the older cached weather endpoint");
    println!("Environment: CIRRO_DEBOUNCE_MS sets the suggestion delay");
    println!("Environment: CIRRO_LOG_ENABLED/LEVEL/FILE configure logging");
    println!("Keys: / search | up/down pick | enter submit | esc close | t theme | n nav | ? help | q quit");
}

fn validate(config: &Config) -> Result<()> {
    if config.api_url.trim().is_empty() && !config.test_data {
        return Err(anyhow!(
            "api_url is required (set it in the config file, CIRRO_API_URL or --api-url)"
        ));
    }
    validate_security(config)
}

fn validate_security(config: &Config) -> Result<()> {
    let url = config.api_url.trim();
    if url.to_ascii_lowercase().starts_with("http://") && !config.allow_http {
        return Err(anyhow!(
            "Refusing insecure http URL (set allow_http=true or CIRRO_ALLOW_HTTP=1 to override)"
        ));
    }
    if config.insecure && !config.allow_insecure {
        return Err(anyhow!(
            "Refusing --insecure without explicit allow_insecure=true or CIRRO_ALLOW_INSECURE=1"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        dir.push(format!("cirrostrats-config-test-{suffix}"));
        let _ = fs::create_dir_all(&dir);
        dir.push(name);
        dir
    }

    fn base_config() -> Config {
        let mut cfg = Config::defaults(PathBuf::from(DEFAULT_CONFIG_FILE));
        cfg.api_url = "http://localhost:8000".to_string();
        cfg
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_allows_http_url() {
        let cfg = base_config();
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn http_url_rejected_when_disabled() {
        let mut cfg = base_config();
        cfg.allow_http = false;
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("Refusing insecure http URL"));
    }

    #[test]
    fn insecure_needs_opt_in() {
        let mut cfg = base_config();
        cfg.insecure = true;
        assert!(validate(&cfg).is_err());
        cfg.allow_insecure = true;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn api_url_required_unless_test_data() {
        let mut cfg = Config::defaults(PathBuf::from(DEFAULT_CONFIG_FILE));
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("api_url is required"));
        cfg.test_data = true;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn load_file_config_parses_values() {
        let path = temp_file("config.toml");
        let content = r#"
api_url = "https://api.cirrostrats.us/api"
timeout_secs = 4
user_email = "pilot@example.com"
track_searches = false
test_data = true
nas_enabled = false
legacy_weather_endpoint = true
debounce_ms = 150
log_enabled = true
log_level = "debug"
theme = "amber"
"#;
        fs::write(&path, content).unwrap();
        let cfg = load_file_config(&path).unwrap().unwrap();
        assert_eq!(cfg.api_url.as_deref(), Some("https://api.cirrostrats.us/api"));
        assert_eq!(cfg.timeout_secs, Some(4));
        assert_eq!(cfg.user_email.as_deref(), Some("pilot@example.com"));
        assert_eq!(cfg.track_searches, Some(false));
        assert_eq!(cfg.test_data, Some(true));
        assert_eq!(cfg.nas_enabled, Some(false));
        assert_eq!(cfg.legacy_weather_endpoint, Some(true));
        assert_eq!(cfg.debounce_ms, Some(150));
        assert_eq!(cfg.log_enabled, Some(true));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.theme.as_deref(), Some("amber"));
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn load_file_config_reports_bad_toml() {
        let path = temp_file("broken.toml");
        fs::write(&path, "api_url = [").unwrap();
        let err = load_file_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn apply_file_config_overrides_and_clamps() {
        let mut cfg = base_config();
        let file = FileConfig {
            timeout_secs: Some(0),
            user_email: Some("   ".to_string()),
            store_live_weather: Some(false),
            live_weather: Some(false),
            log_file: Some("trace.log".to_string()),
            ..Default::default()
        };
        apply_file_config(&mut cfg, file);
        assert_eq!(cfg.timeout, Duration::from_secs(1));
        assert_eq!(cfg.user_email, None);
        assert!(!cfg.store_live_weather);
        assert!(!cfg.live_weather);
        assert_eq!(cfg.log_file, "trace.log");
        assert_eq!(cfg.debounce, Duration::from_millis(DEFAULT_DEBOUNCE_MS));
    }

    #[test]
    fn env_then_args_override() {
        let mut cfg = base_config();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CIRRO_API_URL", "https://env.example/api"),
            ("CIRRO_TRACK_SEARCHES", "off"),
            ("CIRRO_DEBOUNCE_MS", "500"),
            ("CIRRO_USER_EMAIL", "env@example.com"),
        ]);
        apply_env(&mut cfg, |key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.api_url, "https://env.example/api");
        assert!(!cfg.track_searches);
        assert_eq!(cfg.debounce, Duration::from_millis(500));

        apply_args(
            &mut cfg,
            &args(&["--config", "x.toml", "--api-url", "https://cli.example", "--track", "--no-nas"]),
        )
        .unwrap();
        assert_eq!(cfg.api_url, "https://cli.example");
        assert!(cfg.track_searches);
        assert!(!cfg.nas_enabled);
        assert_eq!(cfg.user_email.as_deref(), Some("env@example.com"));
    }

    #[test]
    fn unknown_or_incomplete_args_fail() {
        let mut cfg = base_config();
        assert!(apply_args(&mut cfg, &args(&["--bogus"])).is_err());
        assert!(apply_args(&mut cfg, &args(&["--debounce-ms"])).is_err());
        assert!(apply_args(&mut cfg, &args(&["--debounce-ms", "abc"])).is_err());
    }
}
