//! Pagination domain logic.
//!
//! Responsibility:
//! - decide whether a listing page already knows its total page count
//! - infer the total from a one-page lookahead when the origin omits it

/// What is known about the total page count after fetching one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCount {
    /// The origin reported a positive total.
    Reported(u32),
    /// Derived without further requests.
    Known(u32),
    /// A full page with no total; the next page must be probed.
    NeedsProbe { next_page: u32 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationCalculator;

impl PaginationCalculator {
    /// Classify a fetched page.
    ///
    /// Without a reported total:
    /// - a full page (item count equals the requested limit) needs a probe
    /// - a partial, non-empty page is the last one
    /// - an empty page yields zero
    /// - an unpaginated resource (no limit) has one page when non-empty
    pub fn assess(
        reported: Option<u32>,
        page: u32,
        limit: Option<u32>,
        item_count: usize,
    ) -> PageCount {
        if let Some(total) = reported.filter(|total| *total > 0) {
            return PageCount::Reported(total);
        }
        if item_count == 0 {
            return PageCount::Known(0);
        }
        match limit {
            Some(limit) if limit > 0 && item_count >= limit as usize => PageCount::NeedsProbe {
                next_page: page.saturating_add(1),
            },
            Some(_) => PageCount::Known(page),
            None => PageCount::Known(1),
        }
    }

    /// Total after probing `page + 1`: one past the probe if it had items,
    /// otherwise the probe index itself.
    pub const fn total_after_probe(page: u32, probe_item_count: usize) -> u32 {
        let next_page = page.saturating_add(1);
        if probe_item_count > 0 {
            next_page.saturating_add(1)
        } else {
            next_page
        }
    }
}
