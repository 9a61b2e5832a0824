use crate::error::{Result, StagingError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Style {
    pub id: String,
    pub name: String,
    /// Descriptive fragment appended to the staging prompt.
    pub prompt: String,
    /// Label understood by the dedicated staging model.
    pub staging_style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomType {
    pub id: String,
    pub name: String,
    /// Furniture list for this kind of room.
    pub prompt_hint: String,
    pub staging_room: String,
}

/// Summary row returned by the listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

const BUILTIN_STYLES: &[(&str, &str, &str, &str)] = &[
    (
        "modern",
        "Modern",
        "modern interior design, sleek furniture, clean lines, neutral colors with accent pieces, contemporary lighting, minimalist decor, high-end finishes",
        "Modern",
    ),
    (
        "scandinavian",
        "Scandinavian",
        "scandinavian interior design, light wood furniture, white and beige tones, cozy textiles, hygge atmosphere, natural materials, simple elegant forms",
        "Scandinavian",
    ),
    (
        "classic",
        "Classic",
        "classic traditional interior design, elegant furniture, rich fabrics, warm wood tones, ornamental details, sophisticated lighting, timeless decor",
        "Traditional",
    ),
    (
        "industrial",
        "Industrial",
        "industrial interior design, exposed brick, metal accents, raw wood, Edison bulbs, leather furniture, loft-style decor, urban atmosphere",
        "Urban Industrial",
    ),
    (
        "minimalist",
        "Minimalist",
        "minimalist interior design, essential furniture only, monochromatic palette, clean surfaces, plenty of open space, zen-like atmosphere, less is more",
        "Modern Organic",
    ),
    (
        "boho",
        "Boho",
        "bohemian interior design, eclectic mix of patterns and textures, warm earthy colors, plants, macrame, vintage furniture, layered textiles, cozy and artistic",
        "Farmhouse",
    ),
];

const BUILTIN_ROOM_TYPES: &[(&str, &str, &str, &str)] = &[
    (
        "living-room",
        "Living room",
        "living room furnished with: one large sofa, one coffee table, one TV stand with TV, one area rug, curtains on windows",
        "Living Room",
    ),
    (
        "living-kitchen",
        "Living room with kitchenette",
        "open-plan living room with kitchen area furnished with: one sofa, one coffee table, one kitchen island with two bar stools, one small dining table with chairs",
        "Living Room",
    ),
    (
        "bedroom",
        "Bedroom",
        "bedroom furnished with: one double bed with headboard and bedding, two nightstands with lamps, one wardrobe or dresser",
        "Bedroom",
    ),
    (
        "kitchen",
        "Kitchen",
        "kitchen furnished with: one dining table, four chairs, organized countertops with small appliances",
        "Kitchen",
    ),
    (
        "bathroom",
        "Bathroom",
        "bathroom with: towels on rack, bath mat on floor, soap dispenser, one small plant, organized vanity with mirror",
        "Bathroom",
    ),
    (
        "office",
        "Home office",
        "home office furnished with: one large desk, one ergonomic office chair, one bookshelf with books, one desk lamp, monitor on desk",
        "Office",
    ),
    (
        "dining",
        "Dining room",
        "dining room furnished with: one large dining table, six dining chairs, one pendant light above table, one sideboard cabinet",
        "Dining Room",
    ),
    (
        "hallway",
        "Hallway",
        "hallway furnished with: one narrow console table, one wall mirror, coat hooks on wall, one shoe cabinet, one pendant light",
        "Hallway",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub styles: Vec<Style>,
    pub room_types: Vec<RoomType>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        let styles = BUILTIN_STYLES
            .iter()
            .map(|(id, name, prompt, staging_style)| Style {
                id: id.to_string(),
                name: name.to_string(),
                prompt: prompt.to_string(),
                staging_style: staging_style.to_string(),
            })
            .collect();
        let room_types = BUILTIN_ROOM_TYPES
            .iter()
            .map(|(id, name, prompt_hint, staging_room)| RoomType {
                id: id.to_string(),
                name: name.to_string(),
                prompt_hint: prompt_hint.to_string(),
                staging_room: staging_room.to_string(),
            })
            .collect();

        Catalog { styles, room_types }
    }

    /// Load a replacement catalog. Ids must be unique within each table.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StagingError::Config(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        let catalog: Catalog = serde_json::from_str(&raw)?;
        catalog.check_unique_ids()?;
        Ok(catalog)
    }

    fn check_unique_ids(&self) -> Result<()> {
        for (idx, style) in self.styles.iter().enumerate() {
            if self.styles[..idx].iter().any(|other| other.id == style.id) {
                return Err(StagingError::Config(format!(
                    "duplicate style id '{}'",
                    style.id
                )));
            }
        }
        for (idx, room) in self.room_types.iter().enumerate() {
            if self.room_types[..idx].iter().any(|other| other.id == room.id) {
                return Err(StagingError::Config(format!(
                    "duplicate room type id '{}'",
                    room.id
                )));
            }
        }
        if self.styles.is_empty() || self.room_types.is_empty() {
            return Err(StagingError::Config(
                "catalog needs at least one style and one room type".into(),
            ));
        }
        Ok(())
    }

    pub fn style(&self, id: &str) -> Result<&Style> {
        self.styles
            .iter()
            .find(|style| style.id == id)
            .ok_or_else(|| StagingError::Validation(format!("Invalid style: '{}'", id)))
    }

    pub fn room_type(&self, id: &str) -> Result<&RoomType> {
        self.room_types
            .iter()
            .find(|room| room.id == id)
            .ok_or_else(|| StagingError::Validation(format!("Invalid room type: '{}'", id)))
    }

    pub fn style_entries(&self) -> Vec<CatalogEntry> {
        self.styles
            .iter()
            .map(|style| CatalogEntry {
                id: style.id.clone(),
                name: style.name.clone(),
            })
            .collect()
    }

    pub fn room_type_entries(&self) -> Vec<CatalogEntry> {
        self.room_types
            .iter()
            .map(|room| CatalogEntry {
                id: room.id.clone(),
                name: room.name.clone(),
            })
            .collect()
    }
}
