pub mod cli;
pub mod conversation;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use cli::Args;
use conversation::ConversationService;
use history::initialize_history_store;
use llm::adapter::InferenceAdapter;
use llm::chat::new_client as new_chat_client;
use llm::{ LlmConfig, LlmType };
use log::info;
use server::api::AppState;
use server::Server;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Composes the adapter and store chosen by `args` into a service.
pub fn build_service(args: &Args) -> Result<ConversationService, Box<dyn Error + Send + Sync>> {
    let chat_config = LlmConfig {
        llm_type: args.chat_llm_type.parse::<LlmType>()?,
        base_url: args.chat_base_url.clone(),
        api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
        completion_model: args.chat_model.clone(),
        region: Some(args.chat_region.clone()),
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={}",
        chat_config.llm_type,
        chat_client.get_model(),
        chat_client.get_base_url()
    );

    let timeout = match args.inference_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let adapter = InferenceAdapter::new(chat_client, timeout);
    let store = initialize_history_store(args)?;

    Ok(ConversationService::new(adapter, store))
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Region: {}", args.chat_region);
    info!("Inference Timeout (s): {}", args.inference_timeout_secs);
    info!("History Store Type: {}", args.history_type);
    info!("History Store Host: {}", args.history_host);
    info!("Identity Header: {}", args.identity_header);
    info!("API Key Required: {}", args.server_api_key.is_some());
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let service = Arc::new(build_service(&args)?);
    let state = AppState::new(service, &args.identity_header, args.server_api_key.clone())?;
    let server = Server::new(args.server_addr.clone(), state, args);
    server.run().await?;

    Ok(())
}
