pub const HOST: &str = "127.0.0.1";
pub const PORT: u16 = 5000;
/// Relative to the working directory.
pub const MODEL_PATH: &str = "model.onnx";

/// Process settings. Address, port and artifact path are fixed; only the
/// worker count follows the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: HOST.to_string(),
            port: PORT,
            workers: num_cpus::get(),
            model_path: MODEL_PATH.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
