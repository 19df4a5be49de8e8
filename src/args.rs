use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct Args {
    #[arg(long, env = "HTTP_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Connect to the chains in use as soon as the process starts.
    #[arg(long, env = "CONNECT_ON_STARTUP", default_value = "true")]
    pub connect_on_startup: bool,

    /// Expose chain-scoped debugging subscriptions in task listings.
    #[arg(long, env = "SHOW_DEBUGGING_SUBSCRIPTIONS", default_value = "false")]
    pub show_debugging_subscriptions: bool,

    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "")]
    allowed_origins_from_env: String,
}

impl Args {
    pub fn from_env() -> Self {
        Self::parse()
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins_from_env
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
