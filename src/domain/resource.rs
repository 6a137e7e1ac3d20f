//! Origin resources and the freshness class each one is cached under.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::detail::Mutability;

/// Freshness classes; durations come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    /// Categories and countries.
    Taxonomy,
    /// Recently-updated feed and most paginated listings.
    Listing,
    /// Series listings, refreshed more often.
    SeriesListing,
    Search,
    Suggestion,
    DiscoveryPage,
    Watermark,
    RecentList,
    Detail(Mutability),
}

/// Listing types served under `/v1/api/danh-sach/{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingType {
    Series,
    SingleFeature,
    Animation,
    TvShows,
    Dubbed,
    VoiceOver,
    Subtitled,
}

impl ListingType {
    pub const fn as_slug(self) -> &'static str {
        match self {
            Self::Series => "phim-bo",
            Self::SingleFeature => "phim-le",
            Self::Animation => "hoat-hinh",
            Self::TvShows => "tv-shows",
            Self::Dubbed => "phim-long-tieng",
            Self::VoiceOver => "phim-thuyet-minh",
            Self::Subtitled => "phim-vietsub",
        }
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "phim-bo" => Ok(Self::Series),
            "phim-le" => Ok(Self::SingleFeature),
            "hoat-hinh" => Ok(Self::Animation),
            "tv-shows" => Ok(Self::TvShows),
            "phim-long-tieng" => Ok(Self::Dubbed),
            "phim-thuyet-minh" => Ok(Self::VoiceOver),
            "phim-vietsub" => Ok(Self::Subtitled),
            other => Err(format!("unknown listing type '{other}'")),
        }
    }
}

/// Every listing-shaped resource the origin exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Categories,
    Countries,
    RecentlyUpdated,
    ByType(ListingType),
    ByCategory(String),
    ByCountry(String),
    Search,
}

impl ResourceKind {
    /// Path relative to the origin base URL.
    pub fn path(&self) -> String {
        match self {
            Self::Categories => "/the-loai".to_string(),
            Self::Countries => "/quoc-gia".to_string(),
            Self::RecentlyUpdated => "/danh-sach/phim-moi-cap-nhat".to_string(),
            Self::ByType(kind) => format!("/v1/api/danh-sach/{}", kind.as_slug()),
            Self::ByCategory(slug) => format!("/v1/api/the-loai/{slug}"),
            Self::ByCountry(slug) => format!("/v1/api/quoc-gia/{slug}"),
            Self::Search => "/v1/api/tim-kiem".to_string(),
        }
    }

    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Self::Categories | Self::Countries => TtlClass::Taxonomy,
            Self::ByType(ListingType::Series) => TtlClass::SeriesListing,
            Self::RecentlyUpdated | Self::ByType(_) | Self::ByCategory(_) | Self::ByCountry(_) => {
                TtlClass::Listing
            }
            Self::Search => TtlClass::Search,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

/// Query parameters for one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub keyword: Option<String>,
}

impl ListQuery {
    pub const fn page(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            keyword: None,
        }
    }

    pub fn search(keyword: impl Into<String>, page: u32, limit: u32) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::page(page, limit)
        }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    /// Current page, 1 when unspecified.
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Parameters in a stable order.
    pub fn params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        if let Some(keyword) = &self.keyword {
            params.insert("keyword", keyword.clone());
        }
        if let Some(limit) = self.limit {
            params.insert("limit", limit.to_string());
        }
        if let Some(page) = self.page {
            params.insert("page", page.to_string());
        }
        params
    }

    /// `k=v&k=v` in key order; empty when there are no parameters.
    pub fn cache_fragment(&self) -> String {
        self.params()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}
