use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Instala el subscriber `fmt` con el filtro de `config.log_filter`.
/// Se puede llamar más de una vez; sólo la primera tiene efecto.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|e| {
        eprintln!("invalid log filter '{}': {}; using 'info'", config.log_filter, e);
        EnvFilter::new("info")
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        let cfg = Config {
            log_filter: "degreepath=debug".to_string(),
            ..Config::default()
        };
        init(&cfg);
        init(&cfg);
        tracing::debug!("still alive");
    }
}
