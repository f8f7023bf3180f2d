//! `pokerag onboard`: Write a default config file.

use pokerag_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("PokeRAG First-Time Setup");
    println!("========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Start Ollama and Qdrant (or set vector_store.backend = \"memory\")");
    println!("   2. Run: pokerag check");
    println!("   3. Run: pokerag ingest ./data/pokemon.json");
    println!("   4. Run: pokerag ask\n");

    Ok(())
}
