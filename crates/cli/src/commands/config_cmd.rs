//! `pokerag config`: Configuration management commands.

use pokerag_config::AppConfig;
use std::path::Path;

pub async fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    let config = match AppConfig::load_with(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed and validated");

    let mut warnings = Vec::new();
    if config.llm.provider == "openai" && !config.has_api_key() {
        warnings.push("No API key set for the openai provider");
    }
    if config.server.host == "0.0.0.0" {
        warnings.push("Gateway bound to 0.0.0.0, it will be reachable from other hosts");
    }
    if config.limits.max_conversation_tokens >= config.rag.max_prompt_tokens {
        warnings.push("limits.max_conversation_tokens leaves no prompt budget for retrieved context");
    }
    for w in &warnings {
        println!("   warning: {w}");
    }

    println!();
    println!("   Provider:     {} ({})", config.llm.provider, config.llm.base_url);
    println!("   Chat model:   {}", config.llm.chat_model);
    println!("   Embeddings:   {} (dim {})", config.llm.embedding_model, config.vector_store.dimension);
    println!("   Vector store: {} / {}", config.vector_store.backend, config.vector_store.collection);
    println!("   Budget:       {} tokens, top-{}", config.rag.max_prompt_tokens, config.rag.top_k);

    Ok(())
}

pub async fn show(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let mut shown = config.clone();
    // Never print secrets.
    if shown.llm.api_key.is_some() {
        shown.llm.api_key = Some("[REDACTED]".into());
    }
    if shown.vector_store.api_key.is_some() {
        shown.vector_store.api_key = Some("[REDACTED]".into());
    }
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
    Ok(())
}
