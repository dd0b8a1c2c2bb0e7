//! Runtime options that are not part of the persisted config

/// Server runtime options, set from the command line
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,
    /// Override for the persisted port (tests bind port 0)
    pub port_override: Option<u16>,
    /// Wrap the router in the access-logging layer
    pub access_log: bool,
    /// Serve static assets from `webDir` under `webURL`
    pub serve_static: bool,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port_override: None,
            access_log: true,
            serve_static: true,
            max_body_size: 1024 * 1024 * 1024, // 1 GB
        }
    }
}

impl ServerOptions {
    /// Get the bind address for a configured port
    pub fn bind_addr(&self, port: u16) -> String {
        format!("{}:{}", self.host, self.port_override.unwrap_or(port))
    }
}
