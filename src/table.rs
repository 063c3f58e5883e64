use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::domain::{ALL, ViewError};
use crate::schema::{Record, Schema};

/// Snapshot of one page of a table, recomputed by [`TabularViewController::view`].
#[derive(Debug, Clone, PartialEq)]
pub struct View<'a, R> {
    pub rows: Vec<&'a R>,
    pub page: usize,
    pub page_count: usize,
    pub total_matching: usize,
}

/// Holds the query state (search, filters, sort, page) of a table over a
/// caller owned record collection and derives the visible page from it.
pub struct TabularViewController<R> {
    records: Arc<[R]>,
    schema: Arc<Schema<R>>,
    search_text: String,
    filters: Vec<Option<usize>>, // Selected value index per declared filter, None is "All"
    sort: usize,
    page: usize,
    page_size: usize,
}

impl<R: Record + Sync> TabularViewController<R> {
    pub fn new(
        records: Arc<[R]>,
        schema: Arc<Schema<R>>,
        page_size: usize,
    ) -> Result<Self, ViewError> {
        if page_size == 0 {
            return Err(ViewError::InvalidPageSize);
        }
        let filters = vec![None; schema.filters().len()];
        let sort = schema.default_sort();
        Ok(Self {
            records,
            schema,
            search_text: String::new(),
            filters,
            sort,
            page: 1,
            page_size,
        })
    }

    pub fn set_search_text(&mut self, text: &str) {
        trace!("Search text: \"{text}\"");
        self.search_text = text.to_string();
        self.page = 1;
    }

    pub fn set_filter(&mut self, field: &str, value: &str) -> Result<(), ViewError> {
        let fidx = self.schema.filter_index(field)?;
        let selection = if value == ALL {
            None
        } else {
            let vidx = self.schema.filters()[fidx]
                .values
                .iter()
                .position(|v| *v == value)
                .ok_or_else(|| ViewError::InvalidFilterValue {
                    field: field.to_string(),
                    value: value.to_string(),
                })?;
            Some(vidx)
        };
        trace!("Filter {field} = {value}");
        self.filters[fidx] = selection;
        self.page = 1;
        Ok(())
    }

    /// Steps a filter through All -> first value -> ... -> last value -> All.
    pub fn cycle_filter(&mut self, field: &str) -> Result<&'static str, ViewError> {
        let fidx = self.schema.filter_index(field)?;
        let nvalues = self.schema.filters()[fidx].values.len();
        self.filters[fidx] = match self.filters[fidx] {
            None => Some(0),
            Some(v) if v + 1 < nvalues => Some(v + 1),
            Some(_) => None,
        };
        self.page = 1;
        Ok(self.filter_value(fidx))
    }

    pub fn clear_filters(&mut self) {
        self.filters.iter_mut().for_each(|f| *f = None);
        self.page = 1;
    }

    /// Changing the sort order keeps the current page.
    pub fn set_sort(&mut self, key: &str) -> Result<(), ViewError> {
        self.sort = self.schema.sort_index(key)?;
        trace!("Sort by {key}");
        Ok(())
    }

    pub fn cycle_sort(&mut self) -> &'static str {
        self.sort = (self.sort + 1) % self.schema.sorts().len();
        self.sort_key()
    }

    pub fn go_to_page(&mut self, page: usize) {
        let page_count = self.page_count(self.matching().len());
        self.page = page.clamp(1, page_count);
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.page.saturating_sub(1));
    }

    pub fn last_page(&mut self) {
        self.go_to_page(usize::MAX);
    }

    pub fn view(&self) -> View<'_, R> {
        let mut matching = self.matching();
        let compare = self.schema.sorts()[self.sort].compare;
        let records: &[R] = &self.records;
        // Stable, ties keep collection order
        matching.par_sort_by(|&a, &b| compare(&records[a], &records[b]));

        let total_matching = matching.len();
        let page_count = self.page_count(total_matching);
        let page = self.page.clamp(1, page_count);

        let rbegin = std::cmp::min((page - 1) * self.page_size, total_matching);
        let rend = std::cmp::min(rbegin + self.page_size, total_matching);
        let rows = matching[rbegin..rend]
            .iter()
            .map(|&idx| &self.records[idx])
            .collect();

        debug!(
            "View: page {page}/{page_count}, {total_matching} of {} records match",
            self.records.len()
        );
        View {
            rows,
            page,
            page_count,
            total_matching,
        }
    }

    pub fn find(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn schema(&self) -> &Schema<R> {
        &self.schema
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn sort_key(&self) -> &'static str {
        self.schema.sorts()[self.sort].key
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current selection of every declared filter, "All" when unrestricted.
    pub fn filter_selections(&self) -> Vec<(&'static str, &'static str)> {
        self.schema
            .filters()
            .iter()
            .enumerate()
            .map(|(fidx, f)| (f.name, self.filter_value(fidx)))
            .collect()
    }

    fn filter_value(&self, fidx: usize) -> &'static str {
        match self.filters[fidx] {
            Some(v) => self.schema.filters()[fidx].values[v],
            None => ALL,
        }
    }

    fn page_count(&self, total: usize) -> usize {
        std::cmp::max(1, total.div_ceil(self.page_size))
    }

    // Indices of records passing every active filter and the search text, in collection order.
    fn matching(&self) -> Vec<usize> {
        let term = self.search_text.trim().to_lowercase();
        let schema: &Schema<R> = &self.schema;
        let active: Vec<_> = self
            .filters
            .iter()
            .enumerate()
            .filter_map(|(fidx, sel)| {
                sel.map(|v| (schema.filters()[fidx].field, schema.filters()[fidx].values[v]))
            })
            .collect();

        self.records
            .par_iter()
            .enumerate()
            .filter(|&(_, r)| active.iter().all(|&(field, value)| field(r) == value))
            .filter(|&(_, r)| {
                term.is_empty() || schema.display(r).to_lowercase().contains(&term)
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}
