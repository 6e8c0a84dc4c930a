use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for ticketry
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/ticketry or fallback
    pub fn config_dir() -> PathBuf {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .unwrap_or_else(|| PathBuf::from(".config"))
            })
            .join("ticketry")
    }

    /// Get XDG_DATA_HOME/ticketry or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/share"))
                    .unwrap_or_else(|| PathBuf::from(".local/share"))
            })
            .join("ticketry")
    }

    /// Default configuration file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Default location of the SQL ticket database
    pub fn database_file() -> PathBuf {
        Self::data_dir().join("tickets.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_var<F: FnOnce()>(name: &str, value: &str, f: F) {
        let original = env::var(name).ok();
        env::set_var(name, value);
        f();
        match original {
            Some(value) => env::set_var(name, value),
            None => env::remove_var(name),
        }
    }

    #[test]
    #[serial]
    fn test_config_paths_follow_xdg_config_home() {
        with_var("XDG_CONFIG_HOME", "/tmp/config", || {
            assert_eq!(XdgPaths::config_dir(), PathBuf::from("/tmp/config/ticketry"));
            assert_eq!(
                XdgPaths::config_file(),
                PathBuf::from("/tmp/config/ticketry/config.json")
            );
        });
    }

    #[test]
    #[serial]
    fn test_database_file_follows_xdg_data_home() {
        with_var("XDG_DATA_HOME", "/tmp/data", || {
            assert_eq!(
                XdgPaths::database_file(),
                PathBuf::from("/tmp/data/ticketry/tickets.db")
            );
        });
    }
}
