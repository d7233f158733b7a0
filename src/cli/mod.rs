use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- History Store Args ---
    /// History store type (redis, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "redis")]
    pub history_type: String,

    /// History store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis history keys. One sorted set per user lives under `{prefix}{user_id}`.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "history:")]
    pub history_redis_prefix: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (bedrock, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "bedrock")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API. Defaults to the regional Bedrock runtime endpoint.
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. Bedrock keys are sent as a bearer token; without one requests go out unsigned, so point --chat-base-url at a SigV4 signing proxy
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., anthropic.claude-3-sonnet-20240229-v1:0, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Region used to build the default Bedrock runtime endpoint.
    #[arg(long, env = "CHAT_REGION", default_value = "us-east-1")]
    pub chat_region: String,

    /// Upper bound in seconds for a single inference call. 0 disables the bound.
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS", default_value = "60")]
    pub inference_timeout_secs: u64,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8080")]
    pub server_addr: String,

    /// Optional API Key required for clients to call the HTTP API. If set, clients must send it as `x-api-key`.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Header carrying the verified caller identity, set by the token-verifying gateway in front of this service.
    #[arg(long, env = "IDENTITY_HEADER", default_value = "x-user-id")]
    pub identity_header: String,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
