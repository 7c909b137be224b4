//! Facet filtering of analysis results by person and theme.
//!
//! The visible image set is a pure function of the analysis results and at
//! most one selected facet per kind:
//!
//! ```text
//! visible = results.filter(|img|
//!     (no person || person.images ∋ img.path) &&
//!     (no theme  || img.tags ∋ theme.name))
//! ```
//!
//! Order follows the analysis results. Display lists are capped for
//! presentation only; filtering always uses the full facet object.

use crate::defaults;
use crate::error::Error;
use crate::models::{AnalysisImage, AnalysisPayload, PersonFacet, PersonId, ThemeFacet};

/// A facet that can be selected, identified by a stable key.
pub trait Facet {
    type Key: PartialEq;

    fn key(&self) -> &Self::Key;
    fn count(&self) -> u32;
}

impl Facet for PersonFacet {
    type Key = PersonId;

    fn key(&self) -> &PersonId {
        &self.id
    }

    fn count(&self) -> u32 {
        self.count
    }
}

impl Facet for ThemeFacet {
    type Key = String;

    fn key(&self) -> &String {
        &self.name
    }

    fn count(&self) -> u32 {
        self.count
    }
}

/// Single-select state for one facet kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetSelection<T> {
    All,
    Only(T),
}

impl<T> Default for FacetSelection<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: Facet + Clone> FacetSelection<T> {
    pub fn active(&self) -> Option<&T> {
        match self {
            Self::All => None,
            Self::Only(facet) => Some(facet),
        }
    }

    pub fn is_active(&self, facet: &T) -> bool {
        self.active().map_or(false, |a| a.key() == facet.key())
    }

    /// Make `facet` the active selection, replacing any other.
    pub fn select(&mut self, facet: T) {
        *self = Self::Only(facet);
    }

    pub fn clear(&mut self) {
        *self = Self::All;
    }

    /// Select `facet`, or clear the selection if it is already active.
    /// Returns `true` if `facet` is active afterwards.
    pub fn toggle(&mut self, facet: T) -> bool {
        if self.is_active(&facet) {
            self.clear();
            false
        } else {
            self.select(facet);
            true
        }
    }

    /// Re-resolve the selection against a fresh facet list.
    ///
    /// A facet with the same key is adopted (picking up its new membership);
    /// otherwise the selection is cleared. Returns `true` if it was cleared.
    pub fn rebind(&mut self, available: &[T]) -> bool {
        let Some(current) = self.active() else {
            return false;
        };
        match available.iter().find(|f| f.key() == current.key()) {
            Some(fresh) => {
                *self = Self::Only(fresh.clone());
                false
            }
            None => {
                self.clear();
                true
            }
        }
    }
}

/// Filter `results` by the given person and theme, preserving order.
pub fn filter_images<'a>(
    results: &'a [AnalysisImage],
    person: Option<&PersonFacet>,
    theme: Option<&ThemeFacet>,
) -> Vec<&'a AnalysisImage> {
    results
        .iter()
        .filter(|img| person.map_or(true, |p| p.contains(&img.path)))
        .filter(|img| theme.map_or(true, |t| img.has_tag(&t.name)))
        .collect()
}

/// The `limit` facets with the highest count; ties keep their original order.
pub fn top_by_count<T: Facet>(facets: &[T], limit: usize) -> Vec<&T> {
    let mut ranked: Vec<&T> = facets.iter().collect();
    ranked.sort_by(|a, b| b.count().cmp(&a.count()));
    ranked.truncate(limit);
    ranked
}

/// Which selections a result replacement dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaleSelections {
    pub person_cleared: bool,
    pub theme_cleared: bool,
}

/// Analysis results plus the active person/theme selections.
#[derive(Debug, Clone, Default)]
pub struct FacetFilter {
    results: Vec<AnalysisImage>,
    people: Vec<PersonFacet>,
    themes: Vec<ThemeFacet>,
    person: FacetSelection<PersonFacet>,
    theme: FacetSelection<ThemeFacet>,
}

impl FacetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace results and facet lists wholesale, then re-resolve selections.
    pub fn replace(&mut self, payload: AnalysisPayload) -> StaleSelections {
        self.results = payload.results;
        self.people = payload.people;
        self.themes = payload.themes;

        let stale = StaleSelections {
            person_cleared: self.person.rebind(&self.people),
            theme_cleared: self.theme.rebind(&self.themes),
        };
        if stale.person_cleared || stale.theme_cleared {
            tracing::debug!(
                person_cleared = stale.person_cleared,
                theme_cleared = stale.theme_cleared,
                "Cleared facet selections missing from new analysis"
            );
        }
        stale
    }

    pub fn results(&self) -> &[AnalysisImage] {
        &self.results
    }

    pub fn people(&self) -> &[PersonFacet] {
        &self.people
    }

    pub fn themes(&self) -> &[ThemeFacet] {
        &self.themes
    }

    pub fn selected_person(&self) -> Option<&PersonFacet> {
        self.person.active()
    }

    pub fn selected_theme(&self) -> Option<&ThemeFacet> {
        self.theme.active()
    }

    pub fn person_selection_mut(&mut self) -> &mut FacetSelection<PersonFacet> {
        &mut self.person
    }

    pub fn theme_selection_mut(&mut self) -> &mut FacetSelection<ThemeFacet> {
        &mut self.theme
    }

    pub fn find_person(&self, id: &PersonId) -> Option<&PersonFacet> {
        self.people.iter().find(|p| &p.id == id)
    }

    pub fn find_theme(&self, name: &str) -> Option<&ThemeFacet> {
        self.themes.iter().find(|t| t.name == name)
    }

    /// Toggle the person with `id`. Returns `None` if no such person exists,
    /// else whether the person is selected afterwards.
    pub fn toggle_person(&mut self, id: &PersonId) -> Option<bool> {
        let facet = self.find_person(id)?.clone();
        Some(self.person.toggle(facet))
    }

    /// Toggle the theme named `name`. Same return contract as [`Self::toggle_person`].
    pub fn toggle_theme(&mut self, name: &str) -> Option<bool> {
        let facet = self.find_theme(name)?.clone();
        Some(self.theme.toggle(facet))
    }

    /// Images passing the current selections, in result order.
    pub fn visible(&self) -> Vec<&AnalysisImage> {
        filter_images(&self.results, self.person.active(), self.theme.active())
    }

    pub fn visible_count(&self) -> usize {
        self.visible().len()
    }

    /// Themes offered for selection.
    pub fn themes_for_display(&self) -> Vec<&ThemeFacet> {
        top_by_count(&self.themes, defaults::THEME_DISPLAY_LIMIT)
    }

    /// People offered for selection (all of them).
    pub fn people_for_display(&self) -> Vec<&PersonFacet> {
        self.people.iter().collect()
    }

    /// First images of the visible set for a preview grid, plus how many
    /// visible images were left out.
    pub fn preview(&self) -> (Vec<&AnalysisImage>, usize) {
        let mut visible = self.visible();
        let hidden = visible.len().saturating_sub(defaults::IMAGE_PREVIEW_LIMIT);
        visible.truncate(defaults::IMAGE_PREVIEW_LIMIT);
        (visible, hidden)
    }

    /// Inline warning shown while the visible set is non-empty but too small
    /// to generate from.
    pub fn deficit_message(&self) -> Option<String> {
        let count = self.visible_count();
        if count > 0 && count < defaults::MIN_GENERATION_IMAGES {
            let deficit = Error::InsufficientImages {
                count,
                required: defaults::MIN_GENERATION_IMAGES,
            };
            Some(deficit.to_string())
        } else {
            None
        }
    }
}
