//! Sortable list support for tabular views.
//!
//! A [`SortSpec`] names the sortable columns of one list. Resolving it against the
//! request's `sort` and `dir` parameters yields the ordering to apply plus one toggle
//! link per column. Unknown `sort` keys fall back to the default column; they never error.

use sea_orm::Order;
use serde::Serialize;

/// Ordering direction of a list column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    /// Reads a `dir` parameter; anything other than `asc`/`desc` means `default`.
    #[must_use]
    pub fn parse_or(value: Option<&str>, default: Self) -> Self {
        match value.map(str::trim) {
            Some("asc") => Self::Asc,
            Some("desc") => Self::Desc,
            _ => default,
        }
    }

    /// The other direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Query parameter spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// `SeaORM` ordering.
    #[must_use]
    pub const fn order(self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }
}

/// One sortable column: its query key, what it sorts by, and the direction a
/// fresh click on it uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortColumn<F> {
    /// Value of the `sort` parameter
    pub key: &'static str,
    /// Field the list is ordered by
    pub field: F,
    /// Direction of the toggle link while another column is active
    pub default_direction: SortDirection,
}

/// The sortable columns of one list and its default ordering.
#[derive(Clone, Copy, Debug)]
pub struct SortSpec<F: 'static> {
    /// Allowed columns, in display order
    pub columns: &'static [SortColumn<F>],
    /// Column used when `sort` is absent or unknown
    pub default_column: SortColumn<F>,
    /// Direction used when `dir` is absent or unknown
    pub default_direction: SortDirection,
}

/// A column header link that re-sorts the list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortLink {
    /// Column key
    pub key: &'static str,
    /// Direction the link asks for
    pub direction: SortDirection,
    /// Query string, e.g. `?sort=date&dir=desc`
    pub href: String,
}

/// Ordering resolved for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortState<F> {
    /// Active column key
    pub sort: &'static str,
    /// Field to order by
    #[serde(skip)]
    pub field: F,
    /// Active direction
    pub direction: SortDirection,
    /// One toggle link per column
    pub links: Vec<SortLink>,
}

impl<F: Copy> SortSpec<F> {
    /// Resolves the request parameters against this spec.
    #[must_use]
    pub fn resolve(&self, sort: Option<&str>, dir: Option<&str>) -> SortState<F> {
        let active = sort
            .map(str::trim)
            .and_then(|key| self.columns.iter().find(|column| column.key == key))
            .copied()
            .unwrap_or(self.default_column);
        let direction = SortDirection::parse_or(dir, self.default_direction);

        let links = self
            .columns
            .iter()
            .map(|column| {
                let link_direction = if column.key == active.key {
                    direction.reversed()
                } else {
                    column.default_direction
                };
                SortLink {
                    key: column.key,
                    direction: link_direction,
                    href: format!("?sort={}&dir={}", column.key, link_direction.as_str()),
                }
            })
            .collect();

        SortState {
            sort: active.key,
            field: active.field,
            direction,
            links,
        }
    }
}

impl<F> SortState<F> {
    /// Link for the column with `key`, if it is sortable.
    #[must_use]
    pub fn link(&self, key: &str) -> Option<&SortLink> {
        self.links.iter().find(|link| link.key == key)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Field {
        Date,
        Name,
        Count,
    }

    const DATE: SortColumn<Field> = SortColumn {
        key: "date",
        field: Field::Date,
        default_direction: SortDirection::Asc,
    };

    const SPEC: SortSpec<Field> = SortSpec {
        columns: &[
            DATE,
            SortColumn {
                key: "name",
                field: Field::Name,
                default_direction: SortDirection::Asc,
            },
            SortColumn {
                key: "count",
                field: Field::Count,
                default_direction: SortDirection::Desc,
            },
        ],
        default_column: DATE,
        default_direction: SortDirection::Desc,
    };

    #[test]
    fn test_defaults_when_nothing_requested() {
        let state = SPEC.resolve(None, None);
        assert_eq!(state.sort, "date");
        assert_eq!(state.field, Field::Date);
        assert_eq!(state.direction, SortDirection::Desc);
        assert_eq!(state.link("date").unwrap().href, "?sort=date&dir=asc");
        assert_eq!(state.link("name").unwrap().href, "?sort=name&dir=asc");
        assert_eq!(state.link("count").unwrap().href, "?sort=count&dir=desc");
    }

    #[test]
    fn test_active_column_link_toggles() {
        let state = SPEC.resolve(Some("date"), Some("asc"));
        let next = state.link("date").unwrap();
        assert_eq!(next.direction, SortDirection::Desc);

        let state = SPEC.resolve(Some(next.key), Some(next.direction.as_str()));
        assert_eq!(state.direction, SortDirection::Desc);
        assert_eq!(state.link("date").unwrap().direction, SortDirection::Asc);
    }

    #[test]
    fn test_unknown_sort_falls_back_to_default_column() {
        let state = SPEC.resolve(Some("bogus"), Some("asc"));
        assert_eq!(state.sort, "date");
        assert_eq!(state.field, Field::Date);
        assert_eq!(state.direction, SortDirection::Asc);
        assert!(state.link("bogus").is_none());
    }

    #[test]
    fn test_unknown_direction_uses_default() {
        let state = SPEC.resolve(Some("name"), Some("sideways"));
        assert_eq!(state.field, Field::Name);
        assert_eq!(state.direction, SortDirection::Desc);
        assert_eq!(state.link("name").unwrap().direction, SortDirection::Asc);
    }

    #[test]
    fn test_serializes_without_field() {
        let json = serde_json::to_value(SPEC.resolve(Some("count"), Some("asc"))).unwrap();
        assert_eq!(json["sort"], "count");
        assert_eq!(json["direction"], "asc");
        assert_eq!(json["links"][2]["href"], "?sort=count&dir=desc");
        assert!(json.get("field").is_none());
    }
}
