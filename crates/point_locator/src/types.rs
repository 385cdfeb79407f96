//! Value types returned by the locators.

/// Identifier of a point inside a [`PointStore`](crate::PointStore).
///
/// Ids are dense indices assigned by the store and stay stable until the
/// store is reset.
pub type PointId = usize;

/// Result of a unique insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InsertOutcome {
  /// `true` when a new point was stored, `false` when an existing point
  /// within tolerance was found.
  pub inserted: bool,
  /// Id of the new point, or of the existing match.
  pub id: PointId,
}

impl InsertOutcome {
  /// A freshly stored point.
  #[inline]
  pub fn inserted(id: PointId) -> Self {
    Self { inserted: true, id }
  }

  /// An existing point that absorbed the query.
  #[inline]
  pub fn existing(id: PointId) -> Self {
    Self {
      inserted: false,
      id,
    }
  }
}

/// Closest stored point and its squared distance to the query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPoint {
  pub id: PointId,
  pub dist2: f64,
}

/// How a leaf records a point it accepts.
///
/// Mirrors the three insertion flavours of the locator API: the coordinate is
/// already in the store, it must be written at a caller-chosen id, or it is
/// appended and receives the next id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertMode {
  /// Only register the id; the store already holds the coordinate.
  IndexOnly,
  /// Write the coordinate at the given id.
  SetAt,
  /// Append the coordinate, ignoring the given id.
  Append,
}
