//! Indicator categorization and catalog generation.
//!
//! ESIOS publishes thousands of indicators; the catalog groups them by
//! keyword-derived category and assigns a collection priority so operators
//! can pick the series worth tracking. Categorization is driven by an
//! explicit ordered rule list passed in by the caller; there is no global
//! category table.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::provider::esios::IndicatorInfo;

/// Errors raised while generating or writing a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Filesystem failure
    #[error("catalog io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure
    #[error("catalog serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One categorization rule: a category name and the keywords that imply it.
///
/// Rules are evaluated in list order; the first rule with a matching keyword
/// wins, so more specific categories go first.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// Category name
    pub category: &'static str,
    /// Lowercase keywords matched as substrings of the indicator text
    pub keywords: &'static [&'static str],
}

/// Catch-all category for indicators no rule matches.
pub const OTHER_CATEGORY: &str = "other";

/// The default rule set, covering the Spanish electricity system's
/// vocabulary (ESIOS indicator names mix Spanish and English).
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            category: "price",
            keywords: &[
                "precio", "price", "pvpc", "mercado", "market", "coste", "cost",
                "componente", "término", "tarifa", "peaje",
            ],
        },
        CategoryRule {
            category: "production",
            keywords: &[
                "generación", "generation", "producción", "production", "programada",
                "nuclear", "hidráulica", "eólica", "solar", "térmica", "carbón",
                "ciclo combinado", "renovable", "wind", "photovoltaic",
            ],
        },
        CategoryRule {
            category: "demand",
            keywords: &[
                "demanda", "demand", "consumo", "consumption", "prevista", "forecast",
                "programada", "scheduled", "real", "actual",
            ],
        },
        CategoryRule {
            category: "capacity",
            keywords: &[
                "potencia", "capacity", "instalada", "installed", "disponible",
                "available",
            ],
        },
        CategoryRule {
            category: "exchange",
            keywords: &[
                "intercambio", "exchange", "importación", "exportación", "import",
                "export", "saldo", "balance", "frontera", "francia", "portugal",
                "marruecos",
            ],
        },
        CategoryRule {
            category: "storage",
            keywords: &[
                "bombeo", "pumping", "almacenamiento", "storage", "reserva",
                "reserve", "batería", "battery",
            ],
        },
        CategoryRule {
            category: "emissions",
            keywords: &["emisiones", "emissions", "co2", "carbono", "carbon"],
        },
        CategoryRule {
            category: "renewable",
            keywords: &["renovable", "renewable", "limpia", "clean", "verde", "green"],
        },
    ]
}

/// Assign a category to `indicator` using the first matching rule.
pub fn categorize(indicator: &IndicatorInfo, rules: &[CategoryRule]) -> &'static str {
    let text = format!(
        "{} {} {}",
        indicator.name,
        indicator.description.as_deref().unwrap_or(""),
        indicator.short_name.as_deref().unwrap_or(""),
    )
    .to_lowercase();

    for rule in rules {
        if rule.keywords.iter().any(|keyword| text.contains(keyword)) {
            return rule.category;
        }
    }
    OTHER_CATEGORY
}

/// Collection priority, 1 (highest) to 5 (lowest).
pub fn assign_priority(indicator: &IndicatorInfo, category: &str) -> u8 {
    let text = format!(
        "{} {}",
        indicator.name,
        indicator.short_name.as_deref().unwrap_or(""),
    )
    .to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| text.contains(w));

    match category {
        "price" if mentions(&["pvpc", "mercado diario", "spot", "precio final"]) => 1,
        "demand" if mentions(&["demanda prevista", "demanda real", "demanda programada"]) => 1,
        "production" | "renewable"
            if mentions(&["solar", "eólica", "hidráulica", "nuclear"]) =>
        {
            2
        }
        "exchange" => 2,
        "capacity" | "storage" => 3,
        "emissions" => 4,
        _ => 5,
    }
}

/// One catalog entry: an indicator with its derived category and priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Indicator id
    pub id: i64,
    /// Indicator name
    pub name: String,
    /// Short name
    pub short_name: String,
    /// Description
    pub description: String,
    /// Derived category
    pub category: String,
    /// Derived priority, 1 (highest) to 5 (lowest)
    pub priority: u8,
}

/// Catalog header: when it was generated and how the entries break down.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogMetadata {
    /// Generation time
    pub generated_at: DateTime<Utc>,
    /// Total entries
    pub total_indicators: usize,
    /// Entry count per category, sorted by category name
    pub categories: std::collections::BTreeMap<String, usize>,
}

/// A generated indicator catalog.
#[derive(Debug, Serialize, Deserialize)]
pub struct Catalog {
    /// Header
    pub metadata: CatalogMetadata,
    /// Entries sorted by (priority, category, id)
    pub indicators: Vec<CatalogEntry>,
}

/// Categorize `indicators` and build a catalog sorted by
/// (priority, category, id).
pub fn build_catalog(indicators: &[IndicatorInfo], rules: &[CategoryRule]) -> Catalog {
    let mut entries: Vec<CatalogEntry> = indicators
        .iter()
        .map(|indicator| {
            let category = categorize(indicator, rules);
            CatalogEntry {
                id: indicator.id,
                name: indicator.name.clone(),
                short_name: indicator.short_name.clone().unwrap_or_default(),
                description: indicator.description.clone().unwrap_or_default(),
                category: category.to_string(),
                priority: assign_priority(indicator, category),
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut categories = std::collections::BTreeMap::new();
    for entry in &entries {
        *categories.entry(entry.category.clone()).or_insert(0) += 1;
    }

    Catalog {
        metadata: CatalogMetadata {
            generated_at: Utc::now(),
            total_indicators: entries.len(),
            categories,
        },
        indicators: entries,
    }
}

/// Write `catalog` as pretty-printed JSON to `path`.
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(catalog)?;
    fs::write(path, json)?;
    info!(
        path = %path.display(),
        indicators = catalog.metadata.total_indicators,
        "catalog written"
    );
    Ok(())
}
