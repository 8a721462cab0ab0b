//! Name-based lookup of the built-in materials.

use crate::drude::DrudeMaterial;
use crate::provider::{MaterialError, MaterialProvider};
use crate::sellmeier::SellmeierMaterial;

const NAMES: &[&str] = &[
    "titanium_oxide",
    "zinc_oxide",
    "gallium_arsenide",
    "silicon_nitride",
    "gold",
    "silver",
    "aluminium",
    "zirconium",
];

/// Identifiers accepted by [`by_name`].
pub fn available() -> &'static [&'static str] {
    NAMES
}

/// Look up a material by identifier.
pub fn by_name(name: &str) -> Result<Box<dyn MaterialProvider>, MaterialError> {
    let material: Box<dyn MaterialProvider> = match name {
        "titanium_oxide" => Box::new(SellmeierMaterial::titanium_oxide()),
        "zinc_oxide" => Box::new(SellmeierMaterial::zinc_oxide()),
        "gallium_arsenide" => Box::new(SellmeierMaterial::gallium_arsenide()),
        "silicon_nitride" => Box::new(SellmeierMaterial::silicon_nitride()),
        "gold" => Box::new(DrudeMaterial::gold()),
        "silver" => Box::new(DrudeMaterial::silver()),
        "aluminium" => Box::new(DrudeMaterial::aluminium()),
        "zirconium" => Box::new(DrudeMaterial::zirconium()),
        other => return Err(MaterialError::NotFound(other.to_string())),
    };
    Ok(material)
}
