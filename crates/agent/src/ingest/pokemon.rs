//! Pokemon reference records and their retrieval-friendly text rendering.
//!
//! The rendering uses `=== Section ===` headings so the chunker can split
//! on section boundaries, and ends with a few one-line "quick facts" that
//! match common question shapes ("what type is X", "what is X's best stat").

use pokerag_core::source::SourceDocument;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Source tag stored with every Pokemon chunk.
pub const POKEMON_SOURCE: &str = "pokemondb";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
    /// Derived from the six stats when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

impl BaseStats {
    /// Display name and value of the six stats, in canonical order.
    pub fn entries(&self) -> [(&'static str, u32); 6] {
        [
            ("HP", self.hp),
            ("Attack", self.attack),
            ("Defense", self.defense),
            ("Special Attack", self.sp_attack),
            ("Special Defense", self.sp_defense),
            ("Speed", self.speed),
        ]
    }

    pub fn total(&self) -> u32 {
        self.total
            .unwrap_or_else(|| self.entries().iter().map(|(_, v)| v).sum())
    }

    /// Highest stat; ties go to the earlier stat.
    pub fn highest(&self) -> Option<(&'static str, u32)> {
        self.entries()
            .into_iter()
            .filter(|(_, v)| *v > 0)
            .fold(None, |best, (name, value)| match best {
                Some((_, b)) if b >= value => best,
                _ => Some((name, value)),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub name: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub height: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<BaseStats>,
    #[serde(default)]
    pub weak_against: Vec<String>,
    #[serde(default)]
    pub strong_against: Vec<String>,
    #[serde(default)]
    pub evolutions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PokemonRecord {
    /// Multi-section plain-text report.
    pub fn render(&self) -> String {
        let mut out = String::new();

        // `write!` into a String cannot fail.
        let _ = write!(out, "Pokemon: {}", self.name);
        if !self.number.is_empty() {
            let _ = write!(out, " (#{})", self.number);
        }
        out.push_str("\n\n");

        out.push_str("=== Basic Information ===\n");
        if !self.types.is_empty() {
            let _ = writeln!(out, "Type: {}", self.types.join(", "));
        }
        for (label, value) in [
            ("Category", &self.category),
            ("Height", &self.height),
            ("Weight", &self.weight),
        ] {
            if !value.is_empty() {
                let _ = writeln!(out, "{label}: {value}");
            }
        }
        out.push('\n');

        if !self.description.is_empty() {
            let _ = write!(out, "=== Description ===\n{}\n\n", self.description);
        }

        if !self.abilities.is_empty() {
            let _ = write!(out, "=== Abilities ===\n{}\n\n", self.abilities.join(", "));
        }

        if let Some(stats) = &self.stats {
            out.push_str("=== Base Stats ===\n");
            for (label, value) in stats.entries() {
                let _ = writeln!(out, "{label}: {value}");
            }
            let _ = write!(out, "Total: {}\n\n", stats.total());
        }

        if !self.weak_against.is_empty() || !self.strong_against.is_empty() {
            out.push_str("=== Type Effectiveness ===\n");
            if !self.weak_against.is_empty() {
                let _ = writeln!(out, "Weak against: {}", self.weak_against.join(", "));
            }
            if !self.strong_against.is_empty() {
                let _ = writeln!(out, "Strong against: {}", self.strong_against.join(", "));
            }
            out.push('\n');
        }

        if !self.evolutions.is_empty() {
            let _ = write!(
                out,
                "=== Evolution Chain ===\nEvolves to/from: {}\n\n",
                self.evolutions.join(" → ")
            );
        }

        out.push_str("=== Quick Facts ===\n");
        if !self.types.is_empty() {
            let _ = writeln!(out, "- {} is a {} type Pokemon", self.name, self.types.join("/"));
        }
        if let Some((stat, value)) = self.stats.as_ref().and_then(BaseStats::highest) {
            let _ = writeln!(out, "- Highest stat: {stat} ({value})");
        }
        if let Some(ability) = self.abilities.first() {
            let _ = writeln!(out, "- Primary ability: {ability}");
        }

        out
    }

    /// Rendered text plus the metadata every chunk of it carries.
    pub fn to_document(&self) -> SourceDocument {
        let mut doc = SourceDocument::new(self.name.clone(), self.render())
            .with_metadata("source", POKEMON_SOURCE)
            .with_metadata("pokemon", self.name.clone())
            .with_metadata("number", self.number.clone())
            .with_metadata("types", self.types.join(","));
        if let Some(url) = &self.url {
            doc = doc.with_metadata("url", url.clone());
        }
        doc
    }
}
