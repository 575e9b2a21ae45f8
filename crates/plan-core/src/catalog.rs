use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::error::CatalogError;

/// A named, page-ranged unit of the reading catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(alias = "chapter_number")]
    pub number: u32,
    #[serde(alias = "chapter_name_arabic")]
    pub name: String,
    #[serde(alias = "starting_page")]
    pub start_page: u32,
    #[serde(alias = "ending_page")]
    pub end_page: u32,
}

impl Chapter {
    pub fn new(number: u32, name: impl Into<String>, start_page: u32, end_page: u32) -> Self {
        Self {
            number,
            name: name.into(),
            start_page,
            end_page,
        }
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start_page..=self.end_page
    }

    pub fn page_count(&self) -> u32 {
        self.end_page - self.start_page + 1
    }

    pub fn contains_page(&self, page: u32) -> bool {
        self.pages().contains(&page)
    }
}

/// Ordered, immutable list of chapters.
///
/// Chapters are sorted by number on construction. Page contiguity between
/// neighbours is expected of the data but not enforced; see [`Catalog::gaps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    chapters: Vec<Chapter>,
}

/// A place where one chapter does not start right after the previous one ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogGap {
    pub after_chapter: u32,
    pub expected_page: u32,
    pub found_page: u32,
}

impl Catalog {
    pub fn new(mut chapters: Vec<Chapter>) -> Result<Self, CatalogError> {
        if chapters.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::with_capacity(chapters.len());
        for chapter in &chapters {
            if chapter.start_page == 0 || chapter.start_page > chapter.end_page {
                return Err(CatalogError::InvalidRange {
                    number: chapter.number,
                    start_page: chapter.start_page,
                    end_page: chapter.end_page,
                });
            }
            if !seen.insert(chapter.number) {
                return Err(CatalogError::DuplicateChapter(chapter.number));
            }
        }

        chapters.sort_by_key(|c| c.number);
        let catalog = Self { chapters };
        for gap in catalog.gaps() {
            tracing::warn!(
                after_chapter = gap.after_chapter,
                expected_page = gap.expected_page,
                found_page = gap.found_page,
                "catalog pages are not contiguous"
            );
        }
        Ok(catalog)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    /// Index of the chapter with the given number.
    pub fn position(&self, number: u32) -> Option<usize> {
        self.chapters
            .binary_search_by_key(&number, |c| c.number)
            .ok()
    }

    pub fn find(&self, number: u32) -> Option<&Chapter> {
        self.position(number).map(|idx| &self.chapters[idx])
    }

    pub fn first_page(&self) -> u32 {
        self.chapters[0].start_page
    }

    pub fn last_page(&self) -> u32 {
        self.chapters[self.chapters.len() - 1].end_page
    }

    pub fn gaps(&self) -> Vec<CatalogGap> {
        self.chapters
            .windows(2)
            .filter_map(|pair| {
                let expected = pair[0].end_page + 1;
                (pair[1].start_page != expected).then_some(CatalogGap {
                    after_chapter: pair[0].number,
                    expected_page: expected,
                    found_page: pair[1].start_page,
                })
            })
            .collect()
    }

    pub fn is_contiguous(&self) -> bool {
        self.gaps().is_empty()
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let chapters = Vec::<Chapter>::deserialize(deserializer)?;
        Catalog::new(chapters).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_report_missing_pages() {
        let catalog = Catalog::new(vec![
            Chapter::new(1, "A", 1, 5),
            Chapter::new(2, "B", 8, 10),
        ])
        .unwrap();
        assert_eq!(
            catalog.gaps(),
            vec![CatalogGap {
                after_chapter: 1,
                expected_page: 6,
                found_page: 8,
            }]
        );
    }
}
