//! atrium-config - 配置加载库
//!
//! 加载顺序：`{dir}/default.toml` → `{dir}/{APP_ENV}.toml` → `APP_` 前缀环境变量，
//! 后者覆盖前者，嵌套字段用 `__` 分隔（如 `APP_RBAC__DENY_DELETE_MENU=true`）。

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    /// 访问令牌有效期（秒）
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
}

fn default_expires_in() -> u64 {
    7200
}

fn default_issuer() -> String {
    "atrium".to_string()
}

fn default_audience() -> String {
    "atrium-api".to_string()
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 是否输出 JSON 日志，未设置时生产环境默认开启
    pub json: Option<bool>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 缓存后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_memory_max_capacity")]
    pub memory_max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            memory_max_capacity: default_memory_max_capacity(),
        }
    }
}

fn default_memory_max_capacity() -> u64 {
    100_000
}

/// 超级管理员配置，不作为普通用户落库
#[derive(Debug, Clone, Deserialize)]
pub struct RootConfig {
    #[serde(default = "default_root_username")]
    pub username: String,
    pub password: Secret<String>,
    #[serde(default = "default_root_name")]
    pub name: String,
}

fn default_root_username() -> String {
    "admin".to_string()
}

fn default_root_name() -> String {
    "Admin".to_string()
}

/// RBAC 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RbacConfig {
    /// 禁止删除菜单
    #[serde(default)]
    pub deny_delete_menu: bool,
    /// 用户会话缓存有效期（小时）
    #[serde(default = "default_user_cache_exp_hours")]
    pub user_cache_exp_hours: u64,
    /// 启动时导入的菜单文件（JSON）
    pub menu_file: Option<String>,
    pub root: RootConfig,
}

fn default_user_cache_exp_hours() -> u64 {
    4
}

impl RbacConfig {
    pub fn user_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.user_cache_exp_hours * 3600)
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub rbac: RbacConfig,
}

fn default_name() -> String {
    "iam-rbac".to_string()
}

fn default_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_env());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("APP_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.env == "development"
    }

    /// 是否输出 JSON 日志
    pub fn json_logs(&self) -> bool {
        self.telemetry.json.unwrap_or_else(|| self.is_production())
    }
}
