use std::collections::HashMap;

use crate::models::{CategoryDocument, VenueDocument};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VenueEntry {
    pub label: String,
    pub is_virtual: Option<bool>,
}

/// Venue id to address. Built once per venue fetch.
#[derive(Clone, Debug, Default)]
pub struct VenueLookup {
    entries: HashMap<String, VenueEntry>,
}

impl VenueLookup {
    pub fn from_documents<'a, I>(venues: I) -> Self
    where
        I: IntoIterator<Item = &'a VenueDocument>,
    {
        let mut entries = HashMap::new();
        for venue in venues {
            let label = venue.label().unwrap_or_else(|| venue.id.clone());
            entries.insert(
                venue.id.clone(),
                VenueEntry {
                    label,
                    is_virtual: venue.is_virtual,
                },
            );
        }
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&VenueEntry> {
        self.entries.get(id)
    }

    /// The address for `id`, or `id` itself when the venue is unknown.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.entries
            .get(id)
            .map(|entry| entry.label.as_str())
            .unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Category id to display name.
#[derive(Clone, Debug, Default)]
pub struct CategoryLookup {
    names: HashMap<String, String>,
}

impl CategoryLookup {
    pub fn from_documents<'a, I>(categories: I) -> Self
    where
        I: IntoIterator<Item = &'a CategoryDocument>,
    {
        let names = categories
            .into_iter()
            .map(|category| {
                let name = category
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| category.id.clone());
                (category.id.clone(), name)
            })
            .collect();
        Self { names }
    }

    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(String, String)> for CategoryLookup {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<(String, String)> for VenueLookup {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(id, label)| {
                    (
                        id,
                        VenueEntry {
                            label,
                            is_virtual: None,
                        },
                    )
                })
                .collect(),
        }
    }
}
