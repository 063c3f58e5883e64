use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::{ALL, ViewError};

/// Reads a string value out of a record, either a stored field or a derived one.
pub type FieldFn<R> = fn(&R) -> &str;
pub type CompareFn<R> = fn(&R, &R) -> Ordering;

/// A row that can be shown in a table.
pub trait Record {
    fn id(&self) -> &str;

    /// Column headers, in display order.
    fn columns() -> &'static [&'static str];

    /// Cell values matching [`Record::columns`].
    fn cells(&self) -> Vec<String>;

    /// Label/value pairs for the details drawer.
    fn details(&self) -> Vec<(&'static str, String)> {
        Self::columns().iter().copied().zip(self.cells()).collect()
    }
}

pub struct FilterSpec<R> {
    pub name: &'static str,
    pub values: Vec<&'static str>,
    pub field: FieldFn<R>,
}

pub struct SortSpec<R> {
    pub key: &'static str,
    pub compare: CompareFn<R>,
}

/// Declared shape of a table: what can be searched, filtered and sorted.
pub struct Schema<R> {
    display: FieldFn<R>,
    filters: Vec<FilterSpec<R>>,
    sorts: Vec<SortSpec<R>>,
    default_sort: usize,
}

impl<R> Schema<R> {
    pub fn builder(display: FieldFn<R>) -> SchemaBuilder<R> {
        SchemaBuilder {
            display,
            filters: Vec::new(),
            sorts: Vec::new(),
            default_sort: None,
        }
    }

    /// Search text of `record`, borrowed from the record rather than the schema.
    pub fn display<'r>(&self, record: &'r R) -> &'r str {
        (self.display)(record)
    }

    pub fn filters(&self) -> &[FilterSpec<R>] {
        &self.filters
    }

    pub fn sorts(&self) -> &[SortSpec<R>] {
        &self.sorts
    }

    pub fn default_sort(&self) -> usize {
        self.default_sort
    }

    pub fn filter_index(&self, name: &str) -> Result<usize, ViewError> {
        self.filters
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| ViewError::InvalidField(name.to_string()))
    }

    pub fn sort_index(&self, key: &str) -> Result<usize, ViewError> {
        self.sorts
            .iter()
            .position(|s| s.key == key)
            .ok_or_else(|| ViewError::InvalidSortKey(key.to_string()))
    }
}

pub struct SchemaBuilder<R> {
    display: FieldFn<R>,
    filters: Vec<FilterSpec<R>>,
    sorts: Vec<SortSpec<R>>,
    default_sort: Option<&'static str>,
}

impl<R> SchemaBuilder<R> {
    pub fn filter(
        mut self,
        name: &'static str,
        values: &[&'static str],
        field: FieldFn<R>,
    ) -> Self {
        self.filters.push(FilterSpec {
            name,
            values: values.to_vec(),
            field,
        });
        self
    }

    pub fn sort(mut self, key: &'static str, compare: CompareFn<R>) -> Self {
        self.sorts.push(SortSpec { key, compare });
        self
    }

    /// Sort key used when a view is created. Defaults to the first declared key.
    pub fn default_sort(mut self, key: &'static str) -> Self {
        self.default_sort = Some(key);
        self
    }

    pub fn build(self) -> Result<Schema<R>, ViewError> {
        if self.sorts.is_empty() {
            return Err(ViewError::InvalidSchema("no sort keys declared".into()));
        }

        let mut seen = HashSet::new();
        for f in self.filters.iter() {
            if !seen.insert(f.name) {
                return Err(ViewError::InvalidSchema(format!(
                    "filter \"{}\" declared twice",
                    f.name
                )));
            }
            if f.values.is_empty() {
                return Err(ViewError::InvalidSchema(format!(
                    "filter \"{}\" has no values",
                    f.name
                )));
            }
            if f.values.contains(&ALL) {
                return Err(ViewError::InvalidSchema(format!(
                    "filter \"{}\" uses the reserved value \"{ALL}\"",
                    f.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for s in self.sorts.iter() {
            if !seen.insert(s.key) {
                return Err(ViewError::InvalidSchema(format!(
                    "sort key \"{}\" declared twice",
                    s.key
                )));
            }
        }

        let default_sort = match self.default_sort {
            Some(key) => self
                .sorts
                .iter()
                .position(|s| s.key == key)
                .ok_or_else(|| ViewError::InvalidSortKey(key.to_string()))?,
            None => 0,
        };

        Ok(Schema {
            display: self.display,
            filters: self.filters,
            sorts: self.sorts,
            default_sort,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        name: String,
        color: String,
    }

    fn name(i: &Item) -> &str {
        &i.name
    }

    fn color(i: &Item) -> &str {
        &i.color
    }

    fn by_name(a: &Item, b: &Item) -> Ordering {
        a.name.cmp(&b.name)
    }

    #[test]
    fn builds_with_first_sort_as_default() {
        let schema = Schema::builder(name)
            .filter("color", &["red", "blue"], color)
            .sort("NameAZ", by_name)
            .build()
            .unwrap();
        assert_eq!(schema.default_sort(), 0);
        assert_eq!(schema.filter_index("color"), Ok(0));
        assert_eq!(
            schema.filter_index("size"),
            Err(ViewError::InvalidField("size".into()))
        );

        let item = Item {
            name: "Ada".into(),
            color: "red".into(),
        };
        assert_eq!(schema.display(&item), "Ada");
    }

    #[test]
    fn display_text_outlives_schema() {
        let item = Item {
            name: "Grace".into(),
            color: "blue".into(),
        };
        let shown = {
            let schema = Schema::builder(name).sort("NameAZ", by_name).build().unwrap();
            schema.display(&item)
        };
        assert_eq!(shown, "Grace");
    }

    #[test]
    fn rejects_missing_sorts() {
        let res = Schema::<Item>::builder(name).build();
        assert!(matches!(res, Err(ViewError::InvalidSchema(_))));
    }

    #[test]
    fn rejects_unknown_default_sort() {
        let res = Schema::builder(name)
            .sort("NameAZ", by_name)
            .default_sort("Newest")
            .build();
        assert!(matches!(res, Err(ViewError::InvalidSortKey(k)) if k == "Newest"));
    }

    #[test]
    fn rejects_bad_filter_declarations() {
        let dup = Schema::builder(name)
            .filter("color", &["red"], color)
            .filter("color", &["blue"], color)
            .sort("NameAZ", by_name)
            .build();
        assert!(matches!(dup, Err(ViewError::InvalidSchema(_))));

        let empty = Schema::builder(name)
            .filter("color", &[], color)
            .sort("NameAZ", by_name)
            .build();
        assert!(matches!(empty, Err(ViewError::InvalidSchema(_))));

        let reserved = Schema::builder(name)
            .filter("color", &["red", ALL], color)
            .sort("NameAZ", by_name)
            .build();
        assert!(matches!(reserved, Err(ViewError::InvalidSchema(_))));
    }

    #[test]
    fn rejects_duplicate_sort_keys() {
        let res = Schema::builder(name)
            .sort("NameAZ", by_name)
            .sort("NameAZ", by_name)
            .build();
        assert!(matches!(res, Err(ViewError::InvalidSchema(_))));
    }
}
