//! Page-numbered pagination for post listings.
//!
//! Listings are split into fixed-size pages addressed by a 1-indexed `page`
//! query parameter. The literal `last` selects the final page. Anything that
//! is not a positive integer, or points past the final page, is rejected so
//! the HTTP layer can answer with a 404.

use thiserror::Error;

/// Number of posts rendered per listing page.
pub const POSTS_PER_PAGE: u64 = 10;

const LAST_PAGE_KEYWORD: &str = "last";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page `{0}` is not a valid page number")]
    InvalidPage(String),
    #[error("page {requested} is out of range (last page is {last})")]
    PageOutOfRange { requested: u64, last: u64 },
}

/// Page requested by the client before the total count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    Number(u64),
    Last,
}

impl PageSelector {
    /// Interpret the raw `page` query value. Absent or empty means page 1.
    pub fn parse(raw: Option<&str>) -> Result<Self, PaginationError> {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(Self::Number(1));
        };

        if raw == LAST_PAGE_KEYWORD {
            return Ok(Self::Last);
        }

        match raw.parse::<u64>() {
            Ok(number) if number >= 1 => Ok(Self::Number(number)),
            _ => Err(PaginationError::InvalidPage(raw.to_string())),
        }
    }
}

impl Default for PageSelector {
    fn default() -> Self {
        Self::Number(1)
    }
}

/// Concrete window into a listing, handed to repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }
}

/// Resolves page selectors against a known total.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: u64) -> Self {
        Self {
            total,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty listing still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    pub fn resolve(&self, selector: PageSelector) -> Result<PageRequest, PaginationError> {
        let last = self.num_pages();
        let number = match selector {
            PageSelector::Last => last,
            PageSelector::Number(number) if number <= last => number,
            PageSelector::Number(requested) => {
                return Err(PaginationError::PageOutOfRange { requested, last });
            }
        };

        Ok(PageRequest {
            number,
            per_page: self.per_page,
        })
    }
}

/// One page of a listing together with its navigation facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub per_page: u64,
    pub total_count: u64,
    pub num_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        let num_pages = Paginator::new(total_count, request.per_page).num_pages();
        Self {
            items,
            number: request.number,
            per_page: request.per_page,
            total_count,
            num_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_count: self.total_count,
            num_pages: self.num_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_blank_select_first_page() {
        assert_eq!(PageSelector::parse(None), Ok(PageSelector::Number(1)));
        assert_eq!(PageSelector::parse(Some("")), Ok(PageSelector::Number(1)));
    }

    #[test]
    fn parses_numbers_and_last() {
        assert_eq!(PageSelector::parse(Some("3")), Ok(PageSelector::Number(3)));
        assert_eq!(PageSelector::parse(Some("last")), Ok(PageSelector::Last));
    }

    #[test]
    fn rejects_non_positive_and_garbage() {
        for raw in ["0", "-1", "abc", "1.5", "LAST"] {
            assert!(
                matches!(
                    PageSelector::parse(Some(raw)),
                    Err(PaginationError::InvalidPage(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn empty_listing_has_one_page() {
        let paginator = Paginator::new(0, POSTS_PER_PAGE);
        assert_eq!(paginator.num_pages(), 1);
        let request = paginator.resolve(PageSelector::Number(1)).unwrap();
        assert_eq!(request.offset(), 0);
        assert!(paginator.resolve(PageSelector::Number(2)).is_err());
    }

    #[test]
    fn thirteen_posts_make_two_pages() {
        let paginator = Paginator::new(13, POSTS_PER_PAGE);
        assert_eq!(paginator.num_pages(), 2);

        let last = paginator.resolve(PageSelector::Last).unwrap();
        assert_eq!(last.number, 2);
        assert_eq!(last.offset(), 10);

        assert_eq!(
            paginator.resolve(PageSelector::Number(3)),
            Err(PaginationError::PageOutOfRange {
                requested: 3,
                last: 2
            })
        );
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        assert_eq!(Paginator::new(20, POSTS_PER_PAGE).num_pages(), 2);
        assert_eq!(Paginator::new(21, POSTS_PER_PAGE).num_pages(), 3);
    }

    #[test]
    fn page_navigation_flags() {
        let request = PageRequest {
            number: 2,
            per_page: 10,
        };
        let page = Page::new(vec![1, 2, 3], request, 23);
        assert_eq!(page.num_pages, 3);
        assert!(page.has_previous());
        assert!(page.has_next());
        assert_eq!(page.previous_number(), Some(1));
        assert_eq!(page.next_number(), Some(3));

        let mapped = page.map(|value| value * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
    }
}
