//! Resolution of accessor names to projections over [`Record`]s.
//!
//! Names are checked once against a [`Schema`] taken from the feed, so a typo
//! fails at setup instead of on the first render. Projection still verifies
//! the slot on every record and reports [`SamplingError::UnknownAccessor`]
//! rather than reading a neighbouring field.

use crate::error::{Result, SamplingError};
use crate::sample::{Record, Sample};

/// The set of field names a feed provides, in slot order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Schema {
    names: Vec<String>,
}

impl Schema {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Schema {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Schema of a sample feed, taken from its first sample.
    pub fn of(samples: &[Sample]) -> Self {
        match samples.first() {
            Some(first) => Schema::new(first.names()),
            None => Schema::default(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolves `name` to an [`Accessor`].
    pub fn resolve(&self, name: &str) -> Result<Accessor> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|slot| Accessor {
                name: name.to_string(),
                slot,
            })
            .ok_or_else(|| SamplingError::UnknownAccessor(name.to_string()))
    }

    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Accessor>> {
        names.iter().map(|n| self.resolve(n.as_ref())).collect()
    }
}

/// A resolved field projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    name: String,
    slot: usize,
}

impl Accessor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads this accessor's field from `record`.
    ///
    /// The resolved slot is tried first; records whose layout differs from
    /// the schema fall back to a lookup by name.
    #[inline]
    pub fn project<R: Record + ?Sized>(&self, record: &R) -> Result<f64> {
        if let Some((name, value)) = record.slot(self.slot) {
            if name == self.name {
                return Ok(value);
            }
        }
        record
            .slot_of(&self.name)
            .and_then(|slot| record.slot(slot))
            .map(|(_, value)| value)
            .ok_or_else(|| SamplingError::UnknownAccessor(self.name.clone()))
    }
}
