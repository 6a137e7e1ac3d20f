//! Domain module - catalog entities and pure rules
//!
//! Nothing in here performs I/O. Entities decode the origin's loosely typed
//! payloads, the completeness predicate guards what may be cached, and the
//! key layout names where everything lives.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod cache_keys;
pub mod catalog;
pub mod detail;
pub mod identifiers;
pub mod lenient;
pub mod pagination;
pub mod resource;
pub mod stream;

pub use catalog::{CatalogEntry, ListPage, RawListing, TaxonomyRef};
pub use detail::{DetailRecord, Episode, EpisodeServer, MovieDetail, Mutability, ValidationError};
pub use identifiers::{CatalogId, IdentifierError, validate_slug};
pub use pagination::{PageCount, PaginationCalculator};
pub use resource::{ListQuery, ListingType, ResourceKind, TtlClass};
pub use stream::{StreamId, StreamIdError, StreamLink, StreamRecord, derive_streams, locate_stream};
