use std::collections::HashSet;

use uuid::Uuid;

use crate::core::signals::{fuzzy_score, trigram_score};
use crate::core::similarity::text_similarity;
use crate::models::{Product, ProductAlias, SignalTuning};

/// Narrow the full catalog to a bounded working set before any expensive
/// scoring runs.
///
/// The pre-filter is the cheapest signal (trigram across name/SKU/
/// manufacturer) at `floor`; the relaxed variant used by the fallback tier
/// also admits candidates on the fuzzy score. Products holding a qualifying
/// alias match are always included even when their own fields are lexically
/// distant. Catalog order is preserved for deterministic downstream
/// tie-breaking.
pub fn retrieve<'a>(
    normalized_query: &str,
    products: &'a [Product],
    aliases: &[ProductAlias],
    tuning: &SignalTuning,
    floor: f64,
    relaxed: bool,
) -> Vec<&'a Product> {
    if normalized_query.is_empty() {
        return Vec::new();
    }

    let alias_hits = alias_qualified_products(normalized_query, aliases, tuning);

    products
        .iter()
        .filter(|product| {
            if alias_hits.contains(&product.id) {
                return true;
            }
            let trigram = trigram_score(normalized_query, product);
            if trigram >= floor {
                return true;
            }
            relaxed && fuzzy_score(normalized_query, product, tuning.fuzzy_distance_cutoff) >= floor
        })
        .collect()
}

fn alias_qualified_products(
    normalized_query: &str,
    aliases: &[ProductAlias],
    tuning: &SignalTuning,
) -> HashSet<Uuid> {
    aliases
        .iter()
        .filter(|alias| {
            text_similarity(
                normalized_query,
                &alias.normalized_alias,
                tuning.fuzzy_distance_cutoff,
            ) >= tuning.alias_name_floor
        })
        .map(|alias| alias.product_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::normalize;
    use chrono::Utc;

    fn create_product(name: &str, sku: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            tenant_id: "acme".to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            manufacturer: None,
            category: None,
            embedding: None,
        }
    }

    fn create_alias(product_id: Uuid, text: &str) -> ProductAlias {
        ProductAlias {
            id: Uuid::new_v4(),
            tenant_id: "acme".to_string(),
            product_id,
            alias_text: text.to_string(),
            normalized_alias: normalize(text),
            confidence: 0.9,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_retrieve_filters_unrelated_products() {
        let products = vec![
            create_product("Hex Head Cap Screw", "HH-100"),
            create_product("Safety Goggles", "SG-44"),
        ];
        let tuning = SignalTuning::default();

        let working = retrieve(
            "hex head cap screw",
            &products,
            &[],
            &tuning,
            tuning.retrieval_floor,
            false,
        );

        assert_eq!(working.len(), 1);
        assert_eq!(working[0].sku, "HH-100");
    }

    #[test]
    fn test_alias_hit_included_despite_low_name_similarity() {
        let products = vec![
            create_product("Part 77-A", "P77A"),
            create_product("Hex Bolt", "HB-1"),
        ];
        // Competitor name bears no resemblance to the catalog name
        let aliases = vec![create_alias(products[0].id, "acme widget fastener")];
        let tuning = SignalTuning::default();

        let working = retrieve(
            "acme widget fastener",
            &products,
            &aliases,
            &tuning,
            tuning.retrieval_floor,
            false,
        );

        assert!(working.iter().any(|p| p.sku == "P77A"));
    }

    #[test]
    fn test_relaxed_retrieval_admits_fuzzy_only_hits() {
        let products = vec![create_product("Washer", "W-9")];
        let tuning = SignalTuning::default();

        // "washr" misses strict trigram floors but is one edit away
        let strict = retrieve("washr", &products, &[], &tuning, 0.5, false);
        let relaxed = retrieve("washr", &products, &[], &tuning, 0.5, true);

        assert!(strict.is_empty());
        assert_eq!(relaxed.len(), 1);
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let products = vec![create_product("Hex Bolt", "HB-1")];
        let tuning = SignalTuning::default();
        assert!(retrieve("", &products, &[], &tuning, 0.1, true).is_empty());
    }

    #[test]
    fn test_catalog_order_preserved() {
        let products = vec![
            create_product("Hex Bolt A", "A-1"),
            create_product("Hex Bolt B", "B-1"),
            create_product("Hex Bolt C", "C-1"),
        ];
        let tuning = SignalTuning::default();

        let working = retrieve("hex bolt", &products, &[], &tuning, 0.1, false);
        let skus: Vec<&str> = working.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["A-1", "B-1", "C-1"]);
    }
}
