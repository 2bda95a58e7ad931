use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("database_url", "postgresql://localhost/community_backend")?
            .set_default("bind_address", "0.0.0.0:8080")?
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_and_env_overrides() {
        std::env::remove_var("BIND_ADDRESS");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");

        std::env::set_var("BIND_ADDRESS", "127.0.0.1:9999");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.bind_address, "127.0.0.1:9999");
        std::env::remove_var("BIND_ADDRESS");
    }
}
