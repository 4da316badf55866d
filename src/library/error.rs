use std::path::PathBuf;

use crate::domain::TileCoord;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("template name is required")]
    EmptyName,

    #[error("a template named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("no template named \"{0}\"")]
    NotFound(String),

    #[error("coordinates {0} are outside the tile grid")]
    InvalidCoords(TileCoord),

    #[error("{} is not a readable image: {source}", .path.display())]
    InvalidImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{} is not a template export", .0.display())]
    InvalidExport(PathBuf),

    #[error("cannot export into the library directory itself")]
    ExportIntoLibrary,

    #[error("no valid templates found")]
    NoValidTemplates,

    #[error("nothing new to import (all entries already exist)")]
    NothingToImport,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
