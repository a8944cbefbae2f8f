//! List options, typed filters and paginated results
//!
//! Filtering and sorting always run over the full matching set; the page is
//! cut last.

use crate::models::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Page size when none is given
pub const DEFAULT_LIMIT: usize = 50;
/// Hard cap on page size
pub const MAX_LIMIT: usize = 100;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

// ============================================================================
// Sorting
// ============================================================================

/// Field to sort a listing by; each entity maps it to its closest field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    /// Name, title or commit message
    Name,
    Priority,
    Number,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Comparable projection of one sort field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Time(DateTime<Utc>),
    Text(String),
    Number(u64),
}

/// An entity that can be listed with [`ListOptions`]
pub trait Sortable {
    fn entity_id(&self) -> &str;

    /// Sort used when no key (or an unsupported key) is requested
    fn default_sort_key() -> SortKey;

    /// `None` when the key does not apply to this entity
    fn sort_value(&self, key: SortKey) -> Option<SortValue>;
}

/// Predicate over one entity type
pub trait Filter<T> {
    fn matches(&self, item: &T) -> bool;
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// Options & results
// ============================================================================

/// Pagination, sort and filter parameters of a list call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "F: Deserialize<'de> + Default"))]
pub struct ListOptions<F> {
    /// Max items to return (default: 50, capped at 100)
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Items to skip (default: 0)
    pub offset: usize,
    pub sort_by: Option<SortKey>,
    pub sort_order: SortOrder,
    pub filters: F,
}

impl<F: Default> Default for ListOptions<F> {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort_by: None,
            sort_order: SortOrder::default(),
            filters: F::default(),
        }
    }
}

impl<F> ListOptions<F> {
    /// Requested limit, capped at [`MAX_LIMIT`]
    pub fn validated_limit(&self) -> usize {
        self.limit.min(MAX_LIMIT)
    }
}

impl<F: Default> ListOptions<F> {
    pub fn with_filters(filters: F) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            ..Default::default()
        }
    }
}

/// Position of a page inside the full matching set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Total count of items matching the filter
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of a filtered, sorted listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: usize, limit: usize, offset: usize) -> Self {
        Self {
            data,
            pagination: Pagination {
                total,
                limit,
                offset,
                has_next: offset.saturating_add(limit) < total,
                has_prev: offset > 0,
            },
        }
    }
}

/// Sort in place by the requested key, falling back to the entity default.
/// Ties are broken by ascending id.
pub fn sort_items<T: Sortable>(items: &mut [T], sort_by: Option<SortKey>, order: SortOrder) {
    let key = match (sort_by, items.first()) {
        (Some(key), Some(first)) if first.sort_value(key).is_some() => key,
        _ => T::default_sort_key(),
    };
    items.sort_by(|a, b| {
        let primary = a.sort_value(key).cmp(&b.sort_value(key));
        let primary = match order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        match primary {
            Ordering::Equal => a.entity_id().cmp(b.entity_id()),
            other => other,
        }
    });
}

/// Filter, sort, then cut one page
pub fn query<'a, T, F, I>(items: I, options: &ListOptions<F>) -> Page<T>
where
    T: Sortable + Clone + 'a,
    F: Filter<T>,
    I: IntoIterator<Item = &'a T>,
{
    let mut matching: Vec<T> = items
        .into_iter()
        .filter(|item| options.filters.matches(item))
        .cloned()
        .collect();
    sort_items(&mut matching, options.sort_by, options.sort_order);

    let total = matching.len();
    let limit = options.validated_limit();
    let data = matching
        .into_iter()
        .skip(options.offset)
        .take(limit)
        .collect();
    Page::new(data, total, limit, options.offset)
}

// ============================================================================
// Per-entity filters
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectFilter {
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
    pub owner: Option<String>,
    pub is_private: Option<bool>,
}

impl Filter<Project> for ProjectFilter {
    fn matches(&self, p: &Project) -> bool {
        if let Some(q) = self.search.as_deref().filter(|q| !q.trim().is_empty()) {
            if !contains_ci(&p.name, q) && !contains_ci(&p.description, q) {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if &p.owner != owner {
                return false;
            }
        }
        if let Some(private) = self.is_private {
            if p.is_private != private {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitFilter {
    /// Exact branch name the commit was recorded on
    pub branch: Option<String>,
    /// Case-insensitive substring of author name or email
    pub author: Option<String>,
}

impl Filter<Commit> for CommitFilter {
    fn matches(&self, c: &Commit) -> bool {
        if let Some(branch) = &self.branch {
            if &c.branch_name != branch {
                return false;
            }
        }
        if let Some(q) = self.author.as_deref() {
            if !contains_ci(&c.author.name, q) && !contains_ci(&c.author.email, q) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub priority: Option<TaskPriority>,
}

impl Filter<Task> for TaskFilter {
    fn matches(&self, t: &Task) -> bool {
        self.status.is_none_or(|s| t.status == s)
            && self
                .assignee
                .as_ref()
                .is_none_or(|a| t.assignee.as_ref() == Some(a))
            && self.priority.is_none_or(|p| t.priority == p)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub assignee: Option<String>,
    pub priority: Option<IssuePriority>,
}

impl Filter<Issue> for IssueFilter {
    fn matches(&self, i: &Issue) -> bool {
        self.status.is_none_or(|s| i.status == s)
            && self
                .assignee
                .as_ref()
                .is_none_or(|a| i.assignee.as_ref() == Some(a))
            && self.priority.is_none_or(|p| i.priority == p)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PullRequestFilter {
    pub status: Option<PullRequestStatus>,
    pub author: Option<String>,
}

impl Filter<PullRequest> for PullRequestFilter {
    fn matches(&self, pr: &PullRequest) -> bool {
        self.status.is_none_or(|s| pr.status == s)
            && self.author.as_ref().is_none_or(|a| &pr.author == a)
    }
}

// ============================================================================
// Sortable impls
// ============================================================================

impl Sortable for Project {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn default_sort_key() -> SortKey {
        SortKey::UpdatedAt
    }

    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::CreatedAt => Some(SortValue::Time(self.created_at)),
            SortKey::UpdatedAt => Some(SortValue::Time(self.updated_at)),
            SortKey::Name => Some(SortValue::Text(self.name.to_lowercase())),
            SortKey::Priority | SortKey::Number => None,
        }
    }
}

impl Sortable for Commit {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn default_sort_key() -> SortKey {
        SortKey::UpdatedAt
    }

    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::CreatedAt | SortKey::UpdatedAt => Some(SortValue::Time(self.timestamp)),
            SortKey::Name => Some(SortValue::Text(self.message.to_lowercase())),
            SortKey::Priority | SortKey::Number => None,
        }
    }
}

impl Sortable for Task {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn default_sort_key() -> SortKey {
        SortKey::UpdatedAt
    }

    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::CreatedAt => Some(SortValue::Time(self.created_at)),
            SortKey::UpdatedAt => Some(SortValue::Time(self.updated_at)),
            SortKey::Name => Some(SortValue::Text(self.title.to_lowercase())),
            SortKey::Priority => Some(SortValue::Number(self.priority as u64)),
            SortKey::Number => None,
        }
    }
}

impl Sortable for Issue {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn default_sort_key() -> SortKey {
        SortKey::UpdatedAt
    }

    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::CreatedAt => Some(SortValue::Time(self.created_at)),
            SortKey::UpdatedAt => Some(SortValue::Time(self.updated_at)),
            SortKey::Name => Some(SortValue::Text(self.title.to_lowercase())),
            SortKey::Priority => Some(SortValue::Number(self.priority as u64)),
            SortKey::Number => Some(SortValue::Number(self.number)),
        }
    }
}

impl Sortable for PullRequest {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn default_sort_key() -> SortKey {
        SortKey::UpdatedAt
    }

    fn sort_value(&self, key: SortKey) -> Option<SortValue> {
        match key {
            SortKey::CreatedAt => Some(SortValue::Time(self.created_at)),
            SortKey::UpdatedAt => Some(SortValue::Time(self.updated_at)),
            SortKey::Name => Some(SortValue::Text(self.title.to_lowercase())),
            SortKey::Number => Some(SortValue::Number(self.number)),
            SortKey::Priority => None,
        }
    }
}
