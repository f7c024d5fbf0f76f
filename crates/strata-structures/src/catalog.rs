use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use strata_world::Biome;

use crate::{StructureTemplate, builtin_templates};

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    structure: Vec<StructureTemplate>,
}

/// Structure templates available to the decorator, in placement order.
#[derive(Clone, Debug)]
pub struct StructureCatalog {
    templates: Vec<StructureTemplate>,
}

impl Default for StructureCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StructureCatalog {
    pub fn builtin() -> Self {
        Self {
            templates: builtin_templates(),
        }
    }

    pub fn empty() -> Self {
        Self { templates: Vec::new() }
    }

    pub fn from_templates(templates: Vec<StructureTemplate>) -> Result<Self, Box<dyn Error>> {
        for (i, t) in templates.iter().enumerate() {
            t.validate()?;
            if templates[..i].iter().any(|o| o.name == t.name) {
                return Err(format!("duplicate structure name '{}'", t.name).into());
            }
        }
        Ok(Self { templates })
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let file: CatalogFile = toml::from_str(s)?;
        Self::from_templates(file.structure)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&s)?;
        log::info!("loaded {} structures from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    #[inline]
    pub fn templates(&self) -> &[StructureTemplate] {
        &self.templates
    }

    pub fn get(&self, name: &str) -> Option<&StructureTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn for_biome(&self, biome: Biome) -> impl Iterator<Item = &StructureTemplate> + '_ {
        self.templates.iter().filter(move |t| t.grows_in(biome))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
