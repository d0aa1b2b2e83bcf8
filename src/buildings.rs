//! Building and source geometry from BPIP-style input files.
//!
//! The file carries two header lines, a units line, a UTM line and the
//! building count. Each building lists its stories, each story its vertices.
//! An optional source list follows the buildings.

use crate::error::{PostError, Result};
use crate::models::Points;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::{debug, info};

const HEADER_LINES: usize = 2;

/// A building and its tier count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub name: String,
    pub stories: usize,
    pub base_elevation: f64,
}

/// One tier of a building footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub height: f64,
    /// Footprint corners; z is the tier height
    pub vertices: Points,
}

/// An emission source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub elevation: f64,
    pub height: f64,
    /// Single point holding the stack location
    pub location: Points,
}

/// Everything read from a building file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingSet {
    pub units: String,
    pub unit_value: f64,
    pub buildings: Vec<Building>,
    /// Tiers keyed by building name and 1-based story number
    pub stories: BTreeMap<(String, usize), Story>,
    pub sources: BTreeMap<String, Source>,
}

impl BuildingSet {
    /// Tiers of one building in story order
    pub fn stories_of<'a>(&'a self, building: &'a str) -> impl Iterator<Item = (usize, &'a Story)> {
        self.stories
            .iter()
            .filter(move |((name, _), _)| name == building)
            .map(|((_, story), tier)| (*story, tier))
    }

    pub fn vertex_count(&self) -> usize {
        self.stories.values().map(|s| s.vertices.len()).sum()
    }
}

/// Read a building file from disk
pub fn read_buildings(path: &Path, include_sources: bool) -> Result<BuildingSet> {
    if !path.exists() {
        return Err(PostError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    info!("Reading building data from {}", path.display());
    let file = File::open(path)?;
    parse_buildings(BufReader::new(file), include_sources)
}

/// Parse building (and optionally source) geometry from a reader
pub fn parse_buildings<R: BufRead>(reader: R, include_sources: bool) -> Result<BuildingSet> {
    let mut cursor = GeometryCursor::new(reader);

    for _ in 0..HEADER_LINES {
        cursor.next_tokens()?;
    }

    let units_line = cursor.next_tokens()?;
    let [units, unit_value] = cursor.expect_fields::<2>(&units_line, "units line")?;
    let unit_value = cursor.number::<f64>(unit_value, "unit value")?;
    cursor.next_tokens()?; // UTMY line

    let count_line = cursor.next_tokens()?;
    let [count] = cursor.expect_fields::<1>(&count_line, "building count")?;
    let building_count = cursor.number::<usize>(count, "building count")?;
    debug!("Units {} {}, {} buildings", units, unit_value, building_count);

    let mut set = BuildingSet {
        units: units.to_string(),
        unit_value,
        ..Default::default()
    };

    for _ in 0..building_count {
        let building = read_building(&mut cursor)?;
        for story in 1..=building.stories {
            let tier = read_story(&mut cursor)?;
            set.stories.insert((building.name.clone(), story), tier);
        }
        debug!("Building {} with {} stories", building.name, building.stories);
        set.buildings.push(building);
    }

    if include_sources {
        let count_line = cursor.next_tokens()?;
        let [count] = cursor.expect_fields::<1>(&count_line, "source count")?;
        let source_count = cursor.number::<usize>(count, "source count")?;
        for _ in 0..source_count {
            let source = read_source(&mut cursor)?;
            set.sources.insert(source.name.clone(), source);
        }
    }

    info!(
        "Read {} buildings ({} vertices) and {} sources",
        set.buildings.len(),
        set.vertex_count(),
        set.sources.len()
    );
    Ok(set)
}

/// `name stories elevation` or `flag stories elevation name`
fn read_building<R: BufRead>(cursor: &mut GeometryCursor<R>) -> Result<Building> {
    let tokens = cursor.next_tokens()?;
    let (name, stories, elevation) = match tokens.as_slice() {
        [name, stories, elevation] => (name.clone(), stories, elevation),
        [_, stories, elevation, name @ ..] if !name.is_empty() => {
            (name.join(" "), stories, elevation)
        }
        _ => return Err(cursor.error("expected building name, stories and elevation")),
    };

    Ok(Building {
        name,
        stories: cursor.number(stories, "story count")?,
        base_elevation: cursor.number(elevation, "base elevation")?,
    })
}

fn read_story<R: BufRead>(cursor: &mut GeometryCursor<R>) -> Result<Story> {
    let tokens = cursor.next_tokens()?;
    let [count, height] = cursor.expect_fields::<2>(&tokens, "story line")?;
    let vertex_count = cursor.number::<usize>(count, "vertex count")?;
    let height = cursor.number::<f64>(height, "story height")?;

    let mut vertices = Points::new(vertex_count);
    for index in 0..vertex_count {
        let tokens = cursor.next_tokens()?;
        let [x, y] = cursor.expect_fields::<2>(&tokens, "vertex")?;
        let x = cursor.number(x, "vertex x")?;
        let y = cursor.number(y, "vertex y")?;
        vertices.set(index, x, y, height)?;
    }

    Ok(Story { height, vertices })
}

/// `name elev height x y` or `flag elev height x y name`
fn read_source<R: BufRead>(cursor: &mut GeometryCursor<R>) -> Result<Source> {
    let tokens = cursor.next_tokens()?;
    let (name, fields) = match tokens.as_slice() {
        [name, rest @ ..] if rest.len() == 4 => (name.clone(), rest),
        [_, rest @ ..] if rest.len() >= 5 => (rest[4..].join(" "), &rest[..4]),
        _ => return Err(cursor.error("expected source name, elevation, height, x and y")),
    };

    let elevation = cursor.number(&fields[0], "source elevation")?;
    let height = cursor.number(&fields[1], "source height")?;
    let x = cursor.number(&fields[2], "source x")?;
    let y = cursor.number(&fields[3], "source y")?;

    Ok(Source {
        name,
        elevation,
        height,
        location: Points::from_xy(vec![x], vec![y])?,
    })
}

/// Line reader that remembers its position for error messages
struct GeometryCursor<R: BufRead> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> GeometryCursor<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Whitespace tokens of the next line with quotes removed
    fn next_tokens(&mut self) -> Result<Vec<String>> {
        self.line += 1;
        let line = self
            .lines
            .next()
            .ok_or_else(|| self.error("unexpected end of file"))??;
        Ok(line
            .replace(['\'', '"'], "")
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    fn expect_fields<'a, const N: usize>(
        &self,
        tokens: &'a [String],
        what: &str,
    ) -> Result<[&'a str; N]> {
        if tokens.len() < N {
            return Err(self.error(format!(
                "{} needs {} fields, found {}",
                what,
                N,
                tokens.len()
            )));
        }
        Ok(std::array::from_fn(|i| tokens[i].as_str()))
    }

    fn number<T: std::str::FromStr>(&self, token: &str, what: &str) -> Result<T> {
        token
            .parse::<T>()
            .map_err(|_| self.error(format!("{} '{}' is not a number", what, token)))
    }

    fn error(&self, reason: impl Into<String>) -> PostError {
        PostError::GeometryFormat {
            line: self.line,
            reason: reason.into(),
        }
    }
}
