//! Built-in change catalogs and catalog file loading
//!
//! The Silverstripe 6 catalogs are compiled into the binary. A catalog file on
//! disk can replace any of them.

use std::fs;
use std::path::Path;

use ssu_core::{Catalog, CatalogError};
use tracing::{debug, warn};

/// Embedded catalog sources, keyed by catalog name
pub const SILVERSTRIPE6: &[(&str, &str)] = &[
    (
        "add_new_parameter",
        include_str!("../catalogs/silverstripe6/add_new_parameter.yaml"),
    ),
    (
        "changed_default_parameter_value",
        include_str!("../catalogs/silverstripe6/changed_default_parameter_value.yaml"),
    ),
    (
        "changed_parameter_type",
        include_str!("../catalogs/silverstripe6/changed_parameter_type.yaml"),
    ),
    (
        "moved_to_extension",
        include_str!("../catalogs/silverstripe6/moved_to_extension.yaml"),
    ),
    (
        "obsolete_method",
        include_str!("../catalogs/silverstripe6/obsolete_method.yaml"),
    ),
    (
        "other_method",
        include_str!("../catalogs/silverstripe6/other_method.yaml"),
    ),
    (
        "removed_parameter",
        include_str!("../catalogs/silverstripe6/removed_parameter.yaml"),
    ),
    (
        "renamed_parameter",
        include_str!("../catalogs/silverstripe6/renamed_parameter.yaml"),
    ),
    (
        "renamed_to",
        include_str!("../catalogs/silverstripe6/renamed_to.yaml"),
    ),
    (
        "replaced_with",
        include_str!("../catalogs/silverstripe6/replaced_with.yaml"),
    ),
    (
        "return_type",
        include_str!("../catalogs/silverstripe6/return_type.yaml"),
    ),
    (
        "use_instead",
        include_str!("../catalogs/silverstripe6/use_instead.yaml"),
    ),
    (
        "visibility",
        include_str!("../catalogs/silverstripe6/visibility.yaml"),
    ),
];

/// Parse an embedded catalog by name
///
/// Returns `None` for unknown names. The embedded documents are fixed data,
/// so a parse failure is logged and yields an empty catalog.
pub fn builtin_catalog(name: &str) -> Option<Catalog> {
    let (_, content) = SILVERSTRIPE6.iter().find(|(n, _)| *n == name)?;
    match Catalog::from_yaml_str(content, name) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            warn!(catalog = name, error = %e, "embedded catalog failed to parse");
            Some(Catalog {
                name: name.to_string(),
                records: Vec::new(),
            })
        }
    }
}

/// Load a catalog from a YAML file
pub fn load_catalog_file(path: &Path) -> Result<Catalog, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let fallback = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("catalog");
    let catalog = Catalog::from_yaml_str(&content, fallback)?;
    debug!(path = %path.display(), name = %catalog.name, records = catalog.len(), "loaded catalog");
    Ok(catalog)
}

/// Load every `.yaml`/`.yml` catalog below a directory
///
/// Files that fail to load are skipped with a warning.
pub fn load_catalog_dir(dir: &Path) -> Result<Vec<Catalog>, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::Io {
            path: dir.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
        });
    }

    let mut catalogs = Vec::new();
    walk_dir(dir, &mut catalogs)?;
    catalogs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(catalogs)
}

fn walk_dir(dir: &Path, catalogs: &mut Vec<Catalog>) -> Result<(), CatalogError> {
    let io_error = |source| CatalogError::Io {
        path: dir.display().to_string(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();

        if path.is_dir() {
            walk_dir(&path, catalogs)?;
        } else if let Some(ext) = path.extension() {
            if ext == "yaml" || ext == "yml" {
                match load_catalog_file(&path) {
                    Ok(catalog) => catalogs.push(catalog),
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping catalog"),
                }
            }
        }
    }

    Ok(())
}
