//! Sorting and pagination for list operations.
//!
//! Sort strings use the protocol format `field:order,field:order`
//! (e.g. `createdAt:desc,name:asc`). Rules apply left to right; the record id
//! ascending is always appended as the final tie-break so every ordering is
//! total. Pagination is offset based with 1-indexed pages.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ChamberlainError, ChamberlainResult};
use crate::model::{Config, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn apply(&self, o: Ordering) -> Ordering {
        match self {
            Self::Asc => o,
            Self::Desc => o.reverse(),
        }
    }
}

/// A field that records of one entity type can be ordered by.
pub trait SortField: Copy + Eq + Sized {
    type Item;

    fn parse(name: &str) -> Option<Self>;
    fn name(&self) -> &'static str;
    fn compare(&self, a: &Self::Item, b: &Self::Item) -> Ordering;
    /// The unique field used as the final tie-break.
    fn identity() -> Self;
    /// Ordering used when the caller gives none.
    fn default_rules() -> Vec<SortRule<Self>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortRule<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F: SortField> SortRule<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }
}

/// Renders in the protocol form, `field:order`.
impl<F: SortField> fmt::Display for SortRule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field.name(), self.order.as_str())
    }
}

/// Join rules back into a sort string; the inverse of [`parse_sort`].
pub fn format_sort<F: SortField>(rules: &[SortRule<F>]) -> String {
    rules
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse `field:order,...`. A missing order means ascending; empty input
/// yields the field type's default rules.
pub fn parse_sort<F: SortField>(s: &str) -> ChamberlainResult<Vec<SortRule<F>>> {
    if s.trim().is_empty() {
        return Ok(F::default_rules());
    }
    s.split(',')
        .map(|part| {
            let part = part.trim();
            let (name, order) = match part.split_once(':') {
                Some((n, o)) => (n.trim(), o.trim()),
                None => (part, "asc"),
            };
            let field = F::parse(name).ok_or_else(|| {
                ChamberlainError::invalid_argument(format!("unknown sort field: {name}"))
            })?;
            let order = match order.to_ascii_lowercase().as_str() {
                "asc" => SortOrder::Asc,
                "desc" => SortOrder::Desc,
                other => {
                    return Err(ChamberlainError::invalid_argument(format!(
                        "unknown sort order {other:?} for {name}"
                    )))
                }
            };
            Ok(SortRule { field, order })
        })
        .collect()
}

/// Sort `items` by `rules`, then by identity ascending.
pub fn apply_sort<F: SortField>(items: &mut [F::Item], rules: &[SortRule<F>]) {
    let tie = SortRule::asc(F::identity());
    items.sort_by(|a, b| {
        rules
            .iter()
            .chain(std::iter::once(&tie))
            .map(|r| r.order.apply(r.field.compare(a, b)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneSortField {
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl SortField for SceneSortField {
    type Item = Scene;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    fn compare(&self, a: &Scene, b: &Scene) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }

    fn identity() -> Self {
        Self::Id
    }

    fn default_rules() -> Vec<SortRule<Self>> {
        vec![SortRule::desc(Self::UpdatedAt)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSortField {
    Id,
    SceneId,
    SchemeVersion,
    CreatedAt,
    UpdatedAt,
}

impl SortField for ConfigSortField {
    type Item = Config;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "sceneId" => Some(Self::SceneId),
            "schemeVersion" => Some(Self::SchemeVersion),
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::SceneId => "sceneId",
            Self::SchemeVersion => "schemeVersion",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    fn compare(&self, a: &Config, b: &Config) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::SceneId => a.scene_id.cmp(&b.scene_id),
            Self::SchemeVersion => a.scheme_version.cmp(&b.scheme_version),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }

    fn identity() -> Self {
        Self::Id
    }

    fn default_rules() -> Vec<SortRule<Self>> {
        vec![SortRule::desc(Self::UpdatedAt)]
    }
}

/// A validated page request (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> ChamberlainResult<Self> {
        if page == 0 {
            return Err(ChamberlainError::invalid_argument("page starts at 1"));
        }
        if page_size == 0 {
            return Err(ChamberlainError::invalid_argument(
                "pageSize must be greater than zero",
            ));
        }
        Ok(Self { page, page_size })
    }

    /// Offset of the first record on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub list: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Slice `items[(page-1)*size .. page*size]`; pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, req: PageRequest) -> PageResult<T> {
    let total = items.len();
    let list = items
        .into_iter()
        .skip(req.offset())
        .take(req.page_size)
        .collect();
    PageResult {
        list,
        total,
        page: req.page,
        page_size: req.page_size,
    }
}
