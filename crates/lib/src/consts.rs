/// Application name, used for configuration directories.
pub const APP_NAME: &str = "lakesync";

/// File name of the configuration file inside the config directory.
pub const CONFIG_FILENAME: &str = "lakesync.toml";

/// Overrides the configuration file location.
pub const CONFIG_ENV: &str = "LAKESYNC_CONFIG";

/// Bearer token handed to the engine by the external credential provider.
pub const TOKEN_ENV: &str = "LAKESYNC_TOKEN";

/// Overrides `api.base_url` from the configuration file.
pub const API_URL_ENV: &str = "LAKESYNC_API_URL";
