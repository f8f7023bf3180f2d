//! `pokerag check`: Diagnose configuration and collaborator health.

use pokerag_agent::Services;
use pokerag_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("PokeRAG Check");
    println!("=============\n");

    let mut issues = 0;

    let default_path = AppConfig::config_dir().join("config.toml");
    let path = config_path.unwrap_or(&default_path);
    if path.exists() {
        println!("  [ok]   Config file: {}", path.display());
    } else {
        println!("  [warn] No config file at {}, using defaults (run `pokerag onboard`)", path.display());
    }

    let config = match AppConfig::load_with(config_path) {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            return Err(e.into());
        }
    };

    if config.llm.provider == "openai" && !config.has_api_key() {
        println!("  [warn] llm.provider is openai but no API key is set (POKERAG_API_KEY / OPENAI_API_KEY)");
        issues += 1;
    }

    let services = Services::from_config(&config)?;
    println!(
        "  [ok]   Token estimator: {}",
        services.chat.estimator().strategy_name()
    );

    match services.provider.health_check().await {
        Ok(true) => println!("  [ok]   LLM provider reachable: {} at {}", config.llm.provider, config.llm.base_url),
        Ok(false) => {
            println!("  [fail] LLM provider answered with an error: {}", config.llm.base_url);
            issues += 1;
        }
        Err(e) => {
            println!("  [fail] LLM provider unreachable: {e}");
            issues += 1;
        }
    }

    match services.store.count().await {
        Ok(n) => println!(
            "  [ok]   Vector store: {} collection '{}' holds {n} chunks",
            config.vector_store.backend, config.vector_store.collection
        ),
        Err(e) => {
            println!("  [fail] Vector store: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
