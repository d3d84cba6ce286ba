use std::collections::{BTreeMap, BTreeSet};

use msc_core::errors::{ErrorInfo, MscError};
use msc_core::{NodeId, TimeTree};
use serde::{Deserialize, Serialize};

/// Assignment of gene-tree taxa to species-tree leaves.
///
/// Species labels without an explicit entry map to themselves, which covers
/// gene trees whose tips already carry species labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonMap {
    by_species: BTreeMap<String, BTreeSet<String>>,
}

impl TaxonMap {
    /// Creates an empty (identity) map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `(species, taxon)` pairs.
    pub fn from_pairs<I, S, T>(pairs: I) -> Result<Self, MscError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut map = Self::new();
        for (species, taxon) in pairs {
            map.insert(species, taxon)?;
        }
        Ok(map)
    }

    /// Assigns `taxon` to `species`.
    ///
    /// A taxon can belong to one species only.
    pub fn insert(
        &mut self,
        species: impl Into<String>,
        taxon: impl Into<String>,
    ) -> Result<(), MscError> {
        let species = species.into();
        let taxon = taxon.into();
        if let Some(existing) = self.species_of(&taxon) {
            if existing != species {
                return Err(MscError::Tree(
                    ErrorInfo::new("taxon-reassigned", "taxon already belongs to another species")
                        .with_context("taxon", taxon.clone())
                        .with_context("species", existing.to_string())
                        .with_context("requested", species),
                ));
            }
        }
        self.by_species.entry(species).or_default().insert(taxon);
        Ok(())
    }

    /// Returns the species a taxon was assigned to, if any.
    pub fn species_of(&self, taxon: &str) -> Option<&str> {
        self.by_species
            .iter()
            .find(|(_, taxa)| taxa.contains(taxon))
            .map(|(species, _)| species.as_str())
    }

    /// Returns the gene taxa that belong to `species`.
    pub fn taxa_for<'a>(&'a self, species: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self.by_species.get(species) {
            Some(taxa) => Box::new(taxa.iter().map(String::as_str)),
            None => Box::new(std::iter::once(species)),
        }
    }

    /// Returns true if no explicit assignment was made.
    pub fn is_identity(&self) -> bool {
        self.by_species.is_empty()
    }
}

/// Collects the gene taxa that descend from `node` of the species tree.
pub fn leaf_descendants<T: TimeTree + ?Sized>(
    species_tree: &T,
    node: NodeId,
    taxa: &TaxonMap,
) -> BTreeSet<String> {
    let mut descendants = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        match species_tree.children(current) {
            Some((left, right)) => {
                stack.push(right);
                stack.push(left);
            }
            None => {
                if let Some(species) = species_tree.label(current) {
                    descendants.extend(taxa.taxa_for(species).map(str::to_string));
                }
            }
        }
    }
    descendants
}
