use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page", deserialize_with = "page_number")]
    pub page: u64,
    #[serde(default = "default_page_size", deserialize_with = "page_size")]
    pub page_size: u64,
}

/// Query values arrive as text; anything that is not a non-negative
/// integer falls back to the default, as a paginator does.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(u64),
    Text(String),
    Other(IgnoredAny),
}

impl LooseNumber {
    fn or(self, default: u64) -> u64 {
        match self {
            LooseNumber::Number(number) => number,
            LooseNumber::Text(text) => text.trim().parse().unwrap_or(default),
            LooseNumber::Other(_) => default,
        }
    }
}

fn page_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(LooseNumber::deserialize(deserializer)?.or(default_page()))
}

fn page_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(LooseNumber::deserialize(deserializer)?.or(default_page_size()))
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// Resolves the request against `total` rows the way a paginator does:
    /// the size is clamped to 1..=100, page 0 becomes 1 and pages past the
    /// end become the last page.
    pub fn resolve(self, total: u64) -> ResolvedPage {
        let page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        let num_pages = total.div_ceil(page_size).max(1);
        let page = self.page.clamp(1, num_pages);
        ResolvedPage {
            page,
            page_size,
            num_pages,
            offset: (page - 1) * page_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPage {
    pub page: u64,
    pub page_size: u64,
    pub num_pages: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub num_pages: u64,
}
