use chrono::NaiveDateTime;
use tracing::{
  trace,
  warn
};

use crate::datetime::parse_query_date;
use crate::model::Status;
use crate::range::DateRange;
use crate::timeline::{
  ItemKind,
  TimelineItem
};

/// Timeline query parameters exactly as
/// a caller received them: plain,
/// unvalidated strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineQuery {
  /// Comma-separated status names.
  pub status:     Option<String>,
  /// `project` or `goal`.
  pub kind:       Option<String>,
  pub project_id: Option<String>,
  pub start_date: Option<String>,
  pub end_date:   Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pred {
  Kind(ItemKind),
  StatusIn(Vec<Status>),
  /// A project's own bar plus its goals.
  Project(u64),
  /// Open-ended items always pass.
  EndsAfter(NaiveDateTime),
  /// Items without a start always pass.
  StartsBefore(NaiveDateTime),
  /// Stands in for a value no item can
  /// carry, such as an unknown type.
  Never
}

/// Conjunction of predicates; an empty
/// filter passes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
  preds: Vec<Pred>
}

impl ItemFilter {
  /// Builds a filter from raw query
  /// strings. An unknown type or status
  /// matches nothing. A project id or
  /// date that cannot be decoded is
  /// dropped with a warning.
  #[tracing::instrument(skip(
    query, now
  ))]
  pub fn from_query(
    query: &TimelineQuery,
    now: NaiveDateTime
  ) -> Self {
    let mut filter = Self::default();

    if let Some(raw) =
      non_blank(query.kind.as_deref())
    {
      match raw.parse::<ItemKind>() {
        | Ok(kind) => {
          filter = filter.kind(kind);
        }
        | Err(err) => {
          warn!(value = raw, error = %err, "unknown type; nothing matches");
          filter = filter.never();
        }
      }
    }

    if let Some(raw) =
      non_blank(query.status.as_deref())
    {
      let statuses: Vec<Status> = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
          token
            .parse::<Status>()
            .map_err(|err| {
              warn!(value = token, error = %err, "unknown status; no item carries it");
            })
            .ok()
        })
        .collect();
      filter = filter.statuses(statuses);
    }

    if let Some(raw) = non_blank(
      query.project_id.as_deref()
    ) {
      match raw.parse::<u64>() {
        | Ok(id) => {
          filter = filter.project(id);
        }
        | Err(err) => {
          warn!(value = raw, error = %err, "ignoring project_id filter");
        }
      }
    }

    if let Some(raw) = non_blank(
      query.start_date.as_deref()
    ) {
      match parse_query_date(raw, now) {
        | Some(bound) => {
          filter = filter.ends_after(bound);
        }
        | None => {
          warn!(
            value = raw,
            "unparseable start_date; \
             ignoring"
          );
        }
      }
    }

    if let Some(raw) =
      non_blank(query.end_date.as_deref())
    {
      match parse_query_date(raw, now) {
        | Some(bound) => {
          filter =
            filter.starts_before(bound);
        }
        | None => {
          warn!(
            value = raw,
            "unparseable end_date; \
             ignoring"
          );
        }
      }
    }

    filter
  }

  #[must_use]
  pub fn kind(
    mut self,
    kind: ItemKind
  ) -> Self {
    self.preds.push(Pred::Kind(kind));
    self
  }

  #[must_use]
  pub fn statuses(
    mut self,
    statuses: Vec<Status>
  ) -> Self {
    self
      .preds
      .push(Pred::StatusIn(statuses));
    self
  }

  #[must_use]
  pub fn project(
    mut self,
    project_id: u64
  ) -> Self {
    self
      .preds
      .push(Pred::Project(project_id));
    self
  }

  #[must_use]
  pub fn ends_after(
    mut self,
    bound: NaiveDateTime
  ) -> Self {
    self
      .preds
      .push(Pred::EndsAfter(bound));
    self
  }

  #[must_use]
  pub fn starts_before(
    mut self,
    bound: NaiveDateTime
  ) -> Self {
    self
      .preds
      .push(Pred::StartsBefore(bound));
    self
  }

  #[must_use]
  pub fn never(mut self) -> Self {
    self.preds.push(Pred::Never);
    self
  }

  pub fn preds(&self) -> &[Pred] {
    &self.preds
  }

  /// The window spanned by the date
  /// predicates, when both are set.
  pub fn explicit_range(
    &self
  ) -> Option<DateRange> {
    let start =
      self.preds.iter().find_map(|pred| {
        match pred {
          | Pred::EndsAfter(bound) => {
            Some(*bound)
          }
          | _ => None
        }
      })?;
    let end =
      self.preds.iter().find_map(|pred| {
        match pred {
          | Pred::StartsBefore(bound) => {
            Some(*bound)
          }
          | _ => None
        }
      })?;
    Some(DateRange::new(start, end))
  }

  pub fn matches(
    &self,
    item: &TimelineItem
  ) -> bool {
    self
      .preds
      .iter()
      .all(|pred| eval_pred(pred, item))
  }

  /// Keeps matching items in their
  /// input order.
  #[tracing::instrument(skip(
    self, items
  ), fields(items = items.len(), preds = self.preds.len()))]
  pub fn apply(
    &self,
    items: Vec<TimelineItem>
  ) -> Vec<TimelineItem> {
    let before = items.len();
    let kept: Vec<TimelineItem> = items
      .into_iter()
      .filter(|item| self.matches(item))
      .collect();
    tracing::debug!(
      before,
      after = kept.len(),
      "filtered timeline items"
    );
    kept
  }
}

fn non_blank(
  raw: Option<&str>
) -> Option<&str> {
  raw
    .map(str::trim)
    .filter(|value| !value.is_empty())
}

fn eval_pred(
  pred: &Pred,
  item: &TimelineItem
) -> bool {
  let ok = match pred {
    | Pred::Kind(kind) => {
      item.kind == *kind
    }
    | Pred::StatusIn(statuses) => {
      statuses.contains(&item.status)
    }
    | Pred::Project(id) => {
      item.project_id == Some(*id)
        || (item.kind == ItemKind::Project
          && item.id == *id)
    }
    | Pred::EndsAfter(bound) => {
      item
        .end_date
        .map(|end| end >= *bound)
        .unwrap_or(true)
    }
    | Pred::StartsBefore(bound) => {
      item
        .start_date
        .map(|start| start <= *bound)
        .unwrap_or(true)
    }
    | Pred::Never => false
  };

  trace!(pred = ?pred, id = item.id, kind = %item.kind, ok, "filter predicate evaluation");
  ok
}
