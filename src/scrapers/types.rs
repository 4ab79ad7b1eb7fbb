use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://inmuebles.mercadolibre.com.ar";

/// Search space for a crawl: every kind is combined with every zone and term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Site root, without trailing slash
    pub base_url: String,
    /// Neighborhoods, as they appear in the site's URL paths
    pub zones: Vec<String>,
    /// Property categories (casas, ph, departamentos)
    pub kinds: Vec<String>,
    /// Free-text search terms
    pub terms: Vec<String>,
}

impl SearchConfig {
    /// Every (kind, zone, term) triple, kind outermost and term innermost
    pub fn combinations(&self) -> Vec<(&str, &str, &str)> {
        let mut triples = Vec::with_capacity(self.kinds.len() * self.zones.len() * self.terms.len());
        for kind in &self.kinds {
            for zone in &self.zones {
                for term in &self.terms {
                    triples.push((kind.as_str(), zone.as_str(), term.as_str()));
                }
            }
        }
        triples
    }

    /// Search results URL for one combination and price range
    pub fn query_url(&self, kind: &str, zone: &str, term: &str, min_price: i64, max_price: i64) -> String {
        format!(
            "{}/{}/alquiler/capital-federal/{}/{}_PriceRange_{}-{}_NoIndex_True",
            self.base_url.trim_end_matches('/'),
            kind,
            zone,
            term,
            min_price,
            max_price
        )
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            zones: [
                "belgrano-r",
                "chacarita",
                "coghlan",
                "colegiales",
                "nunez",
                "palermo",
                "palermo-chico",
                "palermo-hollywood",
                "palermo-soho",
                "paternal",
                "saavedra",
                "villa-crespo",
                "villa-ortuzar",
                "villa-urquiza",
            ]
            .iter()
            .map(|z| z.to_string())
            .collect(),
            kinds: vec!["casas".to_string(), "ph".to_string()],
            terms: vec!["parrilla".to_string()],
        }
    }
}
