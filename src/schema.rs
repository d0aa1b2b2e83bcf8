//! Column schema registry for fixed-width data rows.
//!
//! Maps named file variants (POST files, PLOT/GRF files) to the byte
//! offsets and parse kinds of every field in a data row. Schemas are data:
//! supporting a new variant means registering another entry.

use crate::constants::{SCHEMA_GRF, SCHEMA_POST, fields};
use crate::error::{PostError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// How the text of a field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseKind {
    Integer,
    Real,
    Text,
}

/// Position and type of a single field within a data row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Inclusive start byte
    pub start: usize,
    /// Exclusive end byte
    pub end: usize,
    pub kind: ParseKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, start: usize, end: usize, kind: ParseKind) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            kind,
        }
    }
}

/// Immutable fixed-column layout of one file variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Build a schema, rejecting empty or inverted column ranges and duplicate names
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self> {
        let name = name.into();

        for (i, spec) in fields.iter().enumerate() {
            if spec.start >= spec.end {
                return Err(PostError::configuration(format!(
                    "Schema '{}': field '{}' has empty column range {}..{}",
                    name, spec.name, spec.start, spec.end
                )));
            }
            if fields[..i].iter().any(|other| other.name == spec.name) {
                return Err(PostError::configuration(format!(
                    "Schema '{}': field '{}' declared twice",
                    name, spec.name
                )));
            }
        }

        for required in fields::REQUIRED {
            if !fields.iter().any(|spec| spec.name == *required) {
                return Err(PostError::configuration(format!(
                    "Schema '{}' is missing required field '{}'",
                    name, required
                )));
            }
        }

        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Minimum line length (in bytes) a data row must have
    pub fn line_width(&self) -> usize {
        self.fields.iter().map(|spec| spec.end).max().unwrap_or(0)
    }

    /// True if rows carry a full date-hour stamp, i.e. the file is streamed hour by hour
    pub fn has_time_axis(&self) -> bool {
        fields::DATE_PARTS
            .iter()
            .all(|part| self.field(part).is_some())
    }

    /// The AERMOD POSTFILE layout with a YYMMDDHH stamp per row
    pub fn post() -> Self {
        use ParseKind::*;
        Self {
            name: SCHEMA_POST.to_string(),
            fields: vec![
                FieldSpec::new(fields::X, 0, 14, Real),
                FieldSpec::new(fields::Y, 15, 28, Real),
                FieldSpec::new(fields::CONC, 29, 42, Real),
                FieldSpec::new(fields::Z, 43, 51, Real),
                FieldSpec::new(fields::ZHILL, 52, 60, Real),
                FieldSpec::new(fields::ZFLAG, 61, 69, Real),
                FieldSpec::new(fields::AVE, 70, 77, Text),
                FieldSpec::new(fields::GROUP, 78, 87, Text),
                FieldSpec::new(fields::NETID, 98, 107, Text),
                FieldSpec::new(fields::YEAR, 89, 91, Integer),
                FieldSpec::new(fields::MONTH, 91, 93, Integer),
                FieldSpec::new(fields::DAY, 93, 95, Integer),
                FieldSpec::new(fields::HOUR, 95, 97, Integer),
            ],
        }
    }

    /// The AERMOD PLOTFILE (.GRF) layout: one block of results with a year count
    pub fn grf() -> Self {
        use ParseKind::*;
        Self {
            name: SCHEMA_GRF.to_string(),
            fields: vec![
                FieldSpec::new(fields::X, 0, 14, Real),
                FieldSpec::new(fields::Y, 15, 28, Real),
                FieldSpec::new(fields::CONC, 29, 42, Real),
                FieldSpec::new(fields::Z, 43, 51, Real),
                FieldSpec::new(fields::ZHILL, 52, 60, Real),
                FieldSpec::new(fields::ZFLAG, 61, 69, Real),
                FieldSpec::new(fields::AVE, 70, 77, Text),
                FieldSpec::new(fields::GROUP, 78, 87, Text),
                FieldSpec::new(fields::N_YRS, 88, 97, Integer),
                FieldSpec::new(fields::NETID, 98, 107, Text),
            ],
        }
    }
}

/// Registry of known schemas, passed explicitly to processors
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Registry holding the built-in `post` and `grf` layouts
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Schema::post());
        registry.register(Schema::grf());
        registry
    }

    /// Registry without any schema
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Add or replace a schema under its own name
    pub fn register(&mut self, schema: Schema) {
        debug!(
            "Registering schema '{}' ({} fields, width {})",
            schema.name(),
            schema.fields().len(),
            schema.line_width()
        );
        self.schemas.insert(schema.name().to_string(), schema);
    }

    /// Find a schema by name
    pub fn lookup(&self, name: &str) -> Result<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| PostError::UnknownSchema {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
