use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    pub domains: DomainConfig,
    pub allocation: AllocationConfig,
    pub cache: CacheConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Externally visible addresses of the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Base of every short URL (`{frontend_domain}/r/{id}`)
    pub frontend_domain: String,
    pub backend_domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub short_code_length: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the socket peer address only
    None,
    /// Trust `Forwarded` / `X-Forwarded-For`
    Standard,
    /// Trust `CF-Connecting-IP`
    Cloudflare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// MaxMind Country or City database used for scan geolocation
    pub geoip_db_path: Option<String>,
    pub trusted_proxy_mode: TrustedProxyMode,
    #[serde(default)]
    pub trusted_proxies: Vec<IpNet>,
    pub num_trusted_proxies: Option<usize>,
}

impl AllocationConfig {
    pub const MIN_LENGTH: usize = 6;
    pub const MAX_LENGTH: usize = 32;
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            short_code_length: 8,
            max_attempts: 8,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_secs: 300,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            geoip_db_path: None,
            trusted_proxy_mode: TrustedProxyMode::None,
            trusted_proxies: Vec::new(),
            num_trusted_proxies: None,
        }
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            frontend_domain: "http://localhost:3000".to_string(),
            backend_domain: "http://localhost:5000".to_string(),
        }
    }
}

impl DomainConfig {
    /// Externally addressable short URL for a link id
    pub fn short_url(&self, id: &str) -> String {
        format!("{}/r/{}", self.frontend_domain.trim_end_matches('/'), id)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend = match env_or("DATABASE_BACKEND", "sqlite").to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "memory" => DatabaseBackend::Memory,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres, memory"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = env_or("DATABASE_URL", "sqlite://./scanlink.db?mode=rwc");
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = env_or("API_HOST", "127.0.0.1");
        let api_port = env_or("API_PORT", "5000")
            .parse::<u16>()
            .context("API_PORT must be a valid port")?;

        let redirect_host = env_or("REDIRECT_HOST", "127.0.0.1");
        let redirect_port = env_or("REDIRECT_PORT", "3001")
            .parse::<u16>()
            .context("REDIRECT_PORT must be a valid port")?;

        let domain_defaults = DomainConfig::default();
        let frontend_domain = env_or("FRONTEND_DOMAIN", &domain_defaults.frontend_domain);
        let backend_domain = env_or("BACKEND_DOMAIN", &domain_defaults.backend_domain);

        let allocation_defaults = AllocationConfig::default();
        let short_code_length = std::env::var("SHORT_CODE_LENGTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(allocation_defaults.short_code_length)
            .clamp(AllocationConfig::MIN_LENGTH, AllocationConfig::MAX_LENGTH);
        let max_attempts = std::env::var("ALLOCATION_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(allocation_defaults.max_attempts);

        let cache_defaults = CacheConfig::default();
        let cache_max_entries = std::env::var("CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(cache_defaults.max_entries);
        let cache_ttl_secs = std::env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(cache_defaults.ttl_secs);

        let geoip_db_path = std::env::var("GEOIP_DB_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let trusted_proxy_mode = match env_or("TRUSTED_PROXY_MODE", "none").to_lowercase().as_str() {
            "none" => TrustedProxyMode::None,
            "standard" => TrustedProxyMode::Standard,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = match std::env::var("TRUSTED_PROXIES") {
            Ok(raw) => parse_cidr_list(&raw)?,
            Err(_) => Vec::new(),
        };

        let num_trusted_proxies = std::env::var("NUM_TRUSTED_PROXIES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok());

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            domains: DomainConfig {
                frontend_domain,
                backend_domain,
            },
            allocation: AllocationConfig {
                short_code_length,
                max_attempts,
            },
            cache: CacheConfig {
                max_entries: cache_max_entries,
                ttl_secs: cache_ttl_secs,
            },
            analytics: AnalyticsConfig {
                geoip_db_path,
                trusted_proxy_mode,
                trusted_proxies,
                num_trusted_proxies,
            },
        })
    }
}

/// Parse a comma separated list of CIDR ranges; bare addresses become host routes.
pub fn parse_cidr_list(raw: &str) -> anyhow::Result<Vec<IpNet>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpNet>()
                .or_else(|_| s.parse::<std::net::IpAddr>().map(IpNet::from))
                .with_context(|| format!("invalid entry '{s}' in TRUSTED_PROXIES"))
        })
        .collect()
}
