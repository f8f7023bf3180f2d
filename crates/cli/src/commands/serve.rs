//! `pokerag serve`: Start the HTTP API server.

use std::path::Path;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.server.port = port;
    }

    println!("PokeRAG Gateway");
    println!("   Listening:    {}:{}", config.server.host, config.server.port);
    println!("   LLM:          {} ({})", config.llm.provider, config.llm.chat_model);
    println!("   Vector store: {} ({})", config.vector_store.backend, config.vector_store.collection);

    pokerag_gateway::start(config).await?;

    Ok(())
}
