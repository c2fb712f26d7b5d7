//! Fragment → transition table aggregation
//!
//! Fragments are split into fixed-size chunks, each chunk is summed into a
//! partial table, and partial tables are merged left to right. The chunking
//! does not depend on the thread count, so repeated runs produce identical
//! sums.

use crate::maybe_rayon::*;
use crate::vector::FragmentSet;
use landshift_core::io::write_transition_csv;
use landshift_core::vector::ClassValue;
use landshift_core::{Error, Result};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::debug;

const CHUNK_SIZE: usize = 4096;

/// Area in hectares per unique class history, ordered by history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionTable {
    fields: Vec<String>,
    areas: BTreeMap<Vec<ClassValue>, f64>,
}

impl TransitionTable {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            areas: BTreeMap::new(),
        }
    }

    /// Period fields, in history order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Add area to a history
    pub fn add(&mut self, history: Vec<ClassValue>, area_ha: f64) {
        match self.areas.entry(history) {
            Entry::Occupied(mut e) => *e.get_mut() += area_ha,
            Entry::Vacant(e) => {
                e.insert(area_ha);
            }
        }
    }

    /// Combine two tables over the same fields.
    ///
    /// Areas of identical histories are summed; the operation is associative
    /// and commutative up to floating-point rounding.
    pub fn merge(mut self, other: TransitionTable) -> Result<Self> {
        if self.fields != other.fields {
            return Err(Error::InvalidParameter {
                name: "fields",
                value: other.fields.join(","),
                reason: format!("expected {}", self.fields.join(",")),
            });
        }
        for (history, area) in other.areas {
            self.add(history, area);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Area of one history
    pub fn area_of(&self, history: &[ClassValue]) -> Option<f64> {
        self.areas.get(history).copied()
    }

    pub fn total_area_ha(&self) -> f64 {
        self.areas.values().sum()
    }

    /// `(history, area)` in history order
    pub fn iter(&self) -> impl Iterator<Item = (&[ClassValue], f64)> {
        self.areas.iter().map(|(k, v)| (k.as_slice(), *v))
    }

    /// Write as CSV: period fields then `area_ha`, one row per history
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_transition_csv(writer, &self.fields, self.iter())
    }
}

/// Aggregate fragments by their class history over `field_names`.
///
/// Field names are resolved to fragment columns once; they may select a
/// subset of the fragment fields or reorder them.
///
/// # Errors
/// `MissingField` if a name is not a fragment field.
pub fn aggregate<S: AsRef<str>>(fragments: &FragmentSet, field_names: &[S]) -> Result<TransitionTable> {
    let columns = field_names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            fragments
                .fields()
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| Error::MissingField {
                    field: name.to_string(),
                    layer: "fragments".to_string(),
                })
        })
        .collect::<Result<Vec<usize>>>()?;
    let fields: Vec<String> = field_names.iter().map(|f| f.as_ref().to_string()).collect();

    let partials: Vec<TransitionTable> = fragments
        .fragments()
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut table = TransitionTable::new(fields.clone());
            for fragment in chunk {
                let history = columns.iter().map(|&c| fragment.classes[c]).collect();
                table.add(history, fragment.area_ha);
            }
            table
        })
        .collect();

    let table = partials
        .into_iter()
        .try_fold(TransitionTable::new(fields), TransitionTable::merge)?;
    debug!(
        fragments = fragments.len(),
        histories = table.len(),
        "aggregated transitions"
    );
    Ok(table)
}
