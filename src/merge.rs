use tracing::debug;

use crate::error::{ConfigError, Location};
use crate::map::PropertyMap;
use crate::property::Property;
use crate::types::DuplicateMode;

/// Insert `property` into `target`, applying `mode` if the name is taken.
///
/// `column` is only used to locate a duplicate error; pass 0 when the
/// column is unknown.
pub fn insert_property(
    target: &mut PropertyMap,
    property: Property,
    mode: DuplicateMode,
    column: usize,
) -> Result<(), ConfigError> {
    let Some(existing) = target.find(&property.name) else {
        target.add(property);
        return Ok(());
    };

    match mode {
        DuplicateMode::Error => Err(ConfigError::DuplicateProperty {
            location: Location::new(property.source.clone(), property.line, column),
            original: existing.location(),
            name: property.name,
        }),
        DuplicateMode::Ignore => {
            debug!(name = %property.name, kept = %existing, "ignoring duplicate property");
            Ok(())
        }
        DuplicateMode::Overwrite => {
            debug!(name = %property.name, replaced = %existing, "overwriting duplicate property");
            target.add(property);
            Ok(())
        }
    }
}

/// Merge every property of `overlay` into `base` under `mode`.
pub fn merge_properties(
    base: &mut PropertyMap,
    overlay: PropertyMap,
    mode: DuplicateMode,
) -> Result<(), ConfigError> {
    for property in overlay {
        insert_property(base, property, mode, 0)?;
    }
    Ok(())
}
