use super::parsing::{
    env_flag, env_number, env_optional, env_or_default, parse_cors_origins, parse_environment,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, RedisSettings, RuntimeSettings,
    SecuritySettings, ServerHost, ServerPort, ServerSettings, SessionSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAM_HOST", "0.0.0.0");
        let port = env_or_default("EXAM_PORT", "8000");

        let environment =
            parse_environment(env_optional("EXAM_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config = env_flag("EXAM_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Exam Sessions API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = env_number("POSTGRES_PORT", 5432)?;
        let postgres_user = env_or_default("POSTGRES_USER", "exam");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "exam_portal");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = env_number("REDIS_PORT", 6379)?;
        let redis_db = env_number("REDIS_DB", 0)?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let test_cache_ttl_seconds = env_number("TEST_CACHE_TTL_SECONDS", 60)?;
        let question_cache_ttl_seconds = env_number("QUESTION_CACHE_TTL_SECONDS", 5 * 60 * 60)?;
        let sampling_timeout_seconds = env_number("SAMPLING_TIMEOUT_SECONDS", 10)?;
        let sampling_request_queue =
            env_or_default("SAMPLING_REQUEST_QUEUE", "question-bank:sampling:requests");

        let log_level = env_or_default("LOG_LEVEL", "info");
        let json = env_flag("LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Settings {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            session: SessionSettings {
                test_cache_ttl_seconds,
                question_cache_ttl_seconds,
                sampling_timeout_seconds,
                sampling_request_queue,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.sampling_request_queue.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "SAMPLING_REQUEST_QUEUE",
                value: String::from("<empty>"),
            });
        }

        if self.session.sampling_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SAMPLING_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.session.test_cache_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TEST_CACHE_TTL_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.session.question_cache_ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "QUESTION_CACHE_TTL_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::core::config::types::ConfigError;
    use crate::test_support;

    #[test]
    fn defaults_match_projection_lifetimes() {
        let _guard = test_support::env_lock();
        test_support::set_test_env();
        std::env::remove_var("TEST_CACHE_TTL_SECONDS");
        std::env::remove_var("QUESTION_CACHE_TTL_SECONDS");
        std::env::remove_var("SAMPLING_TIMEOUT_SECONDS");

        let settings = Settings::load().expect("settings");

        assert_eq!(settings.session().test_cache_ttl_seconds, 60);
        assert_eq!(settings.session().question_cache_ttl_seconds, 5 * 60 * 60);
        assert_eq!(settings.session().sampling_timeout_seconds, 10);
        assert_eq!(settings.api().api_v1_str, "/api/v1");
    }

    #[test]
    fn zero_sampling_timeout_is_rejected() {
        let _guard = test_support::env_lock();
        test_support::set_test_env();
        std::env::set_var("SAMPLING_TIMEOUT_SECONDS", "0");

        let result = Settings::load();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "SAMPLING_TIMEOUT_SECONDS", .. })
        ));
    }

    #[test]
    fn strict_mode_requires_database_password() {
        let _guard = test_support::env_lock();
        test_support::set_test_env();
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("POSTGRES_PASSWORD");
        std::env::set_var("EXAM_STRICT_CONFIG", "1");

        let result = Settings::load();
        std::env::set_var("EXAM_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"))));
    }
}
