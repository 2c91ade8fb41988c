//! Product catalog: resolves a product name or a direct URL to a product page URL

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Product '{0}' not found in catalog")]
    NotFound(String),

    #[error("Either product_name or item_url must be provided")]
    Missing,

    #[error("Invalid product URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

const BUILTIN_PRODUCTS: &[(&str, &str)] = &[
    ("almond croissant", "https://www.zepto.com/pn/almond-croissant/pvid/c8a1a8c8-fc8b-4ca9-8e57-4305fa9e0b79"),
    ("black forest shake", "https://www.zepto.com/pn/black-forest-shake/pvid/1d5a86f0-2565-432a-98c8-2dbad94cb470"),
    ("hazelnut latte", "https://www.zepto.com/pn/hazelnut-latte/pvid/89ca18fd-2178-4ef6-a3e5-b9545447f181"),
    ("mac and cheese", "https://www.zepto.com/pn/mac-and-cheese/pvid/b1cdf31f-4f53-45e9-bc73-360bc8d4707c"),
    ("strawberry lemonade", "https://www.zepto.com/pn/strawberry-lemonade/pvid/0adbb1a8-79df-4c2b-af11-6442999138f2"),
    ("angoori gulab jamun", "https://www.zepto.com/pn/angoori-gulab-jamun/pvid/3402b965-23f9-4070-b8c4-7ceae35bc82b"),
    ("desi ghee aloo paratha with dahi", "https://www.zepto.com/pn/desi-ghee-aloo-paratha-with-dahi/pvid/f58ccd8c-e532-4e4e-b261-79b6290017e5"),
    ("veg puff", "https://www.zepto.com/pn/veg-puff/pvid/362ac747-d438-4b80-916e-e074651e53bf"),
    ("adrak chai", "https://www.zepto.com/pn/adrak-chai/pvid/959a5253-e580-4f44-8236-07ac7ba96bbf"),
    ("iced americano", "https://www.zepto.com/pn/iced-americano/pvid/1f0d5ca8-8cb2-4499-b326-27654a68b6c7"),
    ("spanish coffee", "https://www.zepto.com/pn/spanish-coffee/pvid/2c41692c-dd57-44d3-bfb7-ef61a12eb257"),
    ("poha", "https://www.zepto.com/pn/poha/pvid/4426f6a8-ad91-4f21-a52a-823c8e659835"),
    ("bun maska", "https://www.zepto.com/pn/bun-maska/pvid/606354e0-f4be-477e-a18e-6b54c474f51d"),
    ("chicken puff", "https://www.zepto.com/pn/chicken-puff/pvid/de23bbb3-a07f-46f1-91a2-a8171b514a33"),
    ("cheese maggi", "https://www.zepto.com/pn/cheese-maggi/pvid/b6a09671-d52a-440e-a4ac-7c9dda740a34"),
    ("plain maggi", "https://www.zepto.com/pn/plain-maggi/pvid/ab252815-7562-465a-8abf-04ecc585c752"),
    ("masala peanuts", "https://www.zepto.com/pn/masala-peanuts/pvid/36a9acbc-6e07-4261-9e74-d3770a1508cd"),
    ("tiramisu", "https://www.zepto.com/pn/tiramisu/pvid/2d01c0d0-125f-42e3-980c-679859fc7d0d"),
    ("chicken classic burger", "https://www.zepto.com/pn/chicken-classic-burger/pvid/f41c7bce-33c4-4cfa-9647-5f38c634ee57"),
    ("vietnamese cold coffee", "https://www.zepto.com/pn/vietnamese-cold-coffee/pvid/6a09750b-2bb7-4d1b-90f9-cd2a66269bfd"),
    ("butter croissant", "https://www.zepto.com/pn/butter-croissant/pvid/37732d9c-b578-461e-9bd2-54bdd92b74d9"),
    ("garlic bread with cheese dip", "https://www.zepto.com/pn/garlic-bread-with-cheese-dip/pvid/5b265566-61a3-4660-9e76-5e40643fe81f"),
    ("cappuccino", "https://www.zepto.com/pn/cappuccino/pvid/27fbad73-4154-406c-a864-80127d4f8642"),
    ("latte", "https://www.zepto.com/pn/latte/pvid/88f6afb3-d80e-4e91-ba6f-e38c8a024713"),
    ("hot chocolate", "https://www.zepto.com/pn/hot-chocolate/pvid/a00691fc-b863-43fd-96be-f1ea08ab194e"),
    ("masala chai", "https://www.zepto.com/pn/masala-chai/pvid/7132f0c7-a233-4881-b310-ece3bb35ab9c"),
    ("classic cold coffee", "https://www.zepto.com/pn/classic-cold-coffee/pvid/6ebe42de-266c-4639-ae7b-b8517ccd52b3"),
    ("choco lava cake", "https://www.zepto.com/pn/choco-lava-cake/pvid/edf76459-7bbf-4ee6-9af4-507c7234368e"),
    ("samosa 2 pieces", "https://www.zepto.com/pn/samosa-2-pieces/pvid/5d385a24-313a-43f8-90f0-dd20eede55a0"),
    ("idli sambar dip", "https://www.zepto.com/pn/idli-sambar-dip/pvid/aa9a9c36-d6a1-42a5-8135-17d56ab8c7a5"),
    ("medu vada sambar dip", "https://www.zepto.com/pn/medu-vada-sambar-dip/pvid/32f6f992-141d-449b-bcc0-4e0366e838da"),
    ("chole kulche", "https://www.zepto.com/pn/chole-kulche/pvid/56a84353-e390-420b-a34b-c0d12c7aea5c"),
    ("dal makhani rice", "https://www.zepto.com/pn/dal-makhani-rice/pvid/0e8c050f-7b7f-4308-92a5-5366f08fcfff"),
    ("paneer makhani rice", "https://www.zepto.com/pn/paneer-makhani-rice/pvid/2019670e-219c-453a-88f8-35a7e7a90134"),
    ("butter chicken rice", "https://www.zepto.com/pn/butter-chicken-rice/pvid/dbc1404e-c8c4-4198-9c49-513bdf5b7bd6"),
    ("rajma masala rice", "https://www.zepto.com/pn/rajma-masala-rice/pvid/08abb94e-438d-4d42-b914-2130c3a9fcd8"),
    ("chole rice", "https://www.zepto.com/pn/chole-rice/pvid/ea55f3d8-ae96-4b08-86e9-fa508805e637"),
];

/// Named products in insertion order. Names are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<(String, String)>,
}

impl Catalog {
    pub fn new<N, U>(entries: impl IntoIterator<Item = (N, U)>) -> Self
    where
        N: AsRef<str>,
        U: Into<String>,
    {
        let mut catalog = Self::default();
        for (name, url) in entries {
            let key = normalize(name.as_ref());
            if key.is_empty() {
                continue;
            }
            let url = url.into();
            match catalog.entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = url,
                None => catalog.entries.push((key, url)),
            }
        }
        catalog
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_PRODUCTS.iter().copied())
    }

    pub fn list(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A supplied URL wins; otherwise the name is matched exactly, then by substring in
    /// either direction.
    pub fn resolve(&self, name: Option<&str>, url: Option<&str>) -> Result<String, CatalogError> {
        if let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) {
            return validate_url(url);
        }
        let Some(name) = name.filter(|name| !name.trim().is_empty()) else {
            return Err(CatalogError::Missing);
        };

        let key = normalize(name);
        if let Some((_, url)) = self.entries.iter().find(|(entry, _)| *entry == key) {
            return Ok(url.clone());
        }
        self.entries
            .iter()
            .find(|(entry, _)| entry.contains(&key) || key.contains(entry.as_str()))
            .map(|(_, url)| url.clone())
            .ok_or_else(|| CatalogError::NotFound(name.trim().to_string()))
    }

    /// Resolve `name-or-url`, treating anything that parses as an http(s) URL as a URL.
    pub fn resolve_any(&self, name_or_url: &str) -> Result<String, CatalogError> {
        let trimmed = name_or_url.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            self.resolve(None, Some(trimmed))
        } else {
            self.resolve(Some(trimmed), None)
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn validate_url(raw: &str) -> Result<String, CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    Ok(raw.to_string())
}
