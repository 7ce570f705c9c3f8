use fusion_catalog::{CatalogStore, GameRecord, RecordFilter};
use fusion_protocol::{GameFilters, StatusFilter};
use serde::Serialize;

/// What a filter change requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEffect {
    /// Nothing changed.
    Unchanged,
    /// Re-derive from the local catalog; no backend call.
    Local,
    /// The result set's identity changed; fetch a new snapshot.
    Refetch,
}

/// The library grid as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryView {
    pub games: Vec<GameRecord>,
    pub total: usize,
    pub installed: usize,
    pub not_installed: usize,
}

/// Current filter state of a library view.
///
/// Status filtering happens locally against the catalog; the free-text
/// query is delegated to the backend and therefore changes which games are
/// resident.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterView {
    filters: GameFilters,
    include_hidden: bool,
}

impl FilterView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.filters.status = Some(status);
        self
    }

    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn filters(&self) -> &GameFilters {
        &self.filters
    }

    pub fn status(&self) -> StatusFilter {
        self.filters.status()
    }

    pub fn query(&self) -> Option<&str> {
        self.filters.normalized_query()
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Filters to send with `fetch_games`: the query only, since status is
    /// applied locally.
    pub fn fetch_filters(&self) -> GameFilters {
        GameFilters {
            query: self.query().map(str::to_owned),
            status: None,
        }
    }

    pub fn set_status(&mut self, status: StatusFilter) -> FilterEffect {
        self.filters.status = Some(status);
        FilterEffect::Local
    }

    /// Updates the search text. Whitespace-only edits do not refetch.
    pub fn set_query(&mut self, query: impl Into<String>) -> FilterEffect {
        let query = query.into();
        let before = self.query().map(str::to_owned);
        self.filters.query = Some(query);
        if self.query() == before.as_deref() {
            FilterEffect::Unchanged
        } else {
            FilterEffect::Refetch
        }
    }

    pub fn set_include_hidden(&mut self, include_hidden: bool) -> FilterEffect {
        if self.include_hidden == include_hidden {
            return FilterEffect::Unchanged;
        }
        self.include_hidden = include_hidden;
        FilterEffect::Local
    }

    /// Builds the ordered, filtered grid from the catalog's resident scope.
    pub fn derive(&self, store: &CatalogStore) -> LibraryView {
        let result = store.query(&RecordFilter {
            status: self.status(),
            include_hidden: self.include_hidden,
        });
        LibraryView {
            games: result.records,
            total: result.total,
            installed: result.installed,
            not_installed: result.total - result.installed,
        }
    }
}
