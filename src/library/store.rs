//! On-disk template catalogue: `templates.json` plus the image files

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::LibraryError;
use super::template::{Template, make_unique_name, norm_name};
use crate::domain::{TileCoord, TileGrid};

const INDEX_FILE: &str = "templates.json";
const EXPORT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ExportDocument<'a> {
    version: u32,
    exported_at: String,
    templates: &'a [Template],
}

#[derive(Deserialize)]
struct ImportDocument {
    #[serde(default)]
    version: u32,
    templates: Vec<serde_json::Value>,
}

/// Ordered list of templates, newest first unless reordered
pub struct TemplateLibrary {
    dir: PathBuf,
    grid: TileGrid,
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Open the library in `dir`, creating an empty one if it does not exist
    pub fn open(dir: impl Into<PathBuf>, grid: TileGrid) -> Result<Self, LibraryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let index = dir.join(INDEX_FILE);
        let templates = if index.exists() {
            serde_json::from_str(&fs::read_to_string(&index)?)?
        } else {
            Vec::new()
        };
        let library = Self {
            dir,
            grid,
            templates,
        };
        log::debug!(
            "Opened template library at {} ({} entries)",
            library.dir.display(),
            library.templates.len()
        );
        Ok(library)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// One `name — [tlx,tly,px,py]` line per entry, in stored order
    pub fn list(&self) -> Vec<String> {
        self.templates.iter().map(ToString::to_string).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.position(name).map(|idx| &self.templates[idx])
    }

    pub fn image_path(&self, template: &Template) -> PathBuf {
        self.dir.join(&template.image)
    }

    fn position(&self, name: &str) -> Option<usize> {
        let wanted = norm_name(name);
        self.templates
            .iter()
            .position(|t| norm_name(&t.name) == wanted)
    }

    /// Add a template at the top of the list, copying its image into the library
    pub fn add(
        &mut self,
        name: &str,
        coords: TileCoord,
        image_path: &Path,
    ) -> Result<&Template, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        if self.position(name).is_some() {
            return Err(LibraryError::DuplicateName(name.to_string()));
        }
        if !coords.is_valid_for(self.grid) {
            return Err(LibraryError::InvalidCoords(coords));
        }
        let (width, height, mime) = inspect_image(image_path)?;

        let filename = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template.png".to_string());
        let image = self.unique_image_name(&filename);
        let stored = self.dir.join(&image);
        fs::copy(image_path, &stored)?;
        let size = fs::metadata(&stored)?.len();

        self.templates.insert(
            0,
            Template {
                name: name.to_string(),
                filename,
                mime,
                image,
                size,
                width,
                height,
                coords,
                created_at: chrono::Utc::now().timestamp_millis(),
            },
        );
        self.save()?;
        log::info!("Added template \"{}\" at {}", name, coords);
        Ok(&self.templates[0])
    }

    /// Remove a template and its stored image
    pub fn remove(&mut self, name: &str) -> Result<Template, LibraryError> {
        let idx = self
            .position(name)
            .ok_or_else(|| LibraryError::NotFound(name.to_string()))?;
        let removed = self.templates.remove(idx);
        self.save()?;
        if let Err(err) = fs::remove_file(self.image_path(&removed)) {
            log::warn!("Failed to delete image of \"{}\": {}", removed.name, err);
        }
        Ok(removed)
    }

    /// Move a template `delta` places; moves past either end are ignored.
    /// Returns the entry's index afterwards.
    pub fn move_entry(&mut self, name: &str, delta: isize) -> Result<usize, LibraryError> {
        let idx = self
            .position(name)
            .ok_or_else(|| LibraryError::NotFound(name.to_string()))?;
        let Some(to) = idx
            .checked_add_signed(delta)
            .filter(|to| *to < self.templates.len())
        else {
            return Ok(idx);
        };
        if to != idx {
            let entry = self.templates.remove(idx);
            self.templates.insert(to, entry);
            self.save()?;
        }
        Ok(to)
    }

    /// Write every template and its image into `dir`
    pub fn export(&self, dir: &Path) -> Result<usize, LibraryError> {
        fs::create_dir_all(dir)?;
        if fs::canonicalize(dir)? == fs::canonicalize(&self.dir)? {
            return Err(LibraryError::ExportIntoLibrary);
        }
        for template in &self.templates {
            fs::copy(self.image_path(template), dir.join(&template.image))?;
        }
        let document = ExportDocument {
            version: EXPORT_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            templates: &self.templates,
        };
        write_json_atomic(&dir.join(INDEX_FILE), &document)?;
        log::info!(
            "Exported {} template(s) to {}",
            self.templates.len(),
            dir.display()
        );
        Ok(self.templates.len())
    }

    /// Merge an export from `dir` into the library, returning how many
    /// entries were imported
    ///
    /// Invalid entries are skipped. Entries matching an existing one exactly
    /// (coordinates, file name and image size) are skipped. Name collisions
    /// are renamed `Name (2)`, `Name (3)`, ... Imported entries go first.
    pub fn import(&mut self, dir: &Path) -> Result<usize, LibraryError> {
        let index = dir.join(INDEX_FILE);
        let json = fs::read_to_string(&index)?;
        let document: ImportDocument =
            serde_json::from_str(&json).map_err(|_| LibraryError::InvalidExport(index.clone()))?;
        if document.version != EXPORT_VERSION {
            log::warn!(
                "Import file has version {}, expected {}",
                document.version,
                EXPORT_VERSION
            );
        }

        let candidates: Vec<(Template, PathBuf)> = document
            .templates
            .into_iter()
            .filter_map(|value| self.validate_import(value, dir))
            .collect();
        if candidates.is_empty() {
            return Err(LibraryError::NoValidTemplates);
        }
        if has_duplicate_names(candidates.iter().map(|(t, _)| t.name.as_str())) {
            log::info!("Import contains duplicate names, renaming them");
        }

        let mut seen_exact: HashSet<_> = self.templates.iter().map(Template::exact_key).collect();
        let mut used_names: HashSet<_> = self.templates.iter().map(|t| norm_name(&t.name)).collect();

        let mut incoming = Vec::new();
        for (mut template, source) in candidates {
            if !seen_exact.insert(template.exact_key()) {
                log::debug!("Skipping \"{}\", already in the library", template.name);
                continue;
            }
            template.name = make_unique_name(&template.name, &mut used_names);
            template.image = self.unique_image_name(&template.image);
            fs::copy(&source, self.image_path(&template))?;
            incoming.push(template);
        }
        if incoming.is_empty() {
            return Err(LibraryError::NothingToImport);
        }

        let count = incoming.len();
        incoming.append(&mut self.templates);
        self.templates = incoming;
        self.save()?;
        log::info!("Imported {} template(s) from {}", count, dir.display());
        Ok(count)
    }

    fn validate_import(&self, value: serde_json::Value, dir: &Path) -> Option<(Template, PathBuf)> {
        let mut template: Template = match serde_json::from_value(value) {
            Ok(template) => template,
            Err(err) => {
                log::warn!("Skipping malformed template entry: {}", err);
                return None;
            }
        };
        template.name = template.name.trim().to_string();
        if template.name.is_empty() {
            log::warn!("Skipping template without a name");
            return None;
        }
        if !template.coords.is_valid_for(self.grid) {
            log::warn!("Skipping \"{}\": invalid coordinates", template.name);
            return None;
        }
        // Only plain file names next to the index
        if Path::new(&template.image).file_name() != Some(OsStr::new(&template.image)) {
            log::warn!("Skipping \"{}\": bad image path", template.name);
            return None;
        }
        let source = dir.join(&template.image);
        match fs::metadata(&source) {
            Ok(meta) if meta.is_file() => template.size = meta.len(),
            _ => {
                log::warn!("Skipping \"{}\": image missing", template.name);
                return None;
            }
        }
        Some((template, source))
    }

    /// `filename`, or `stem-2.ext`, `stem-3.ext`, ... if already taken
    fn unique_image_name(&self, filename: &str) -> String {
        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string());
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let taken = |name: &str| name == INDEX_FILE || self.dir.join(name).exists();

        let mut candidate = format!("{stem}{ext}");
        let mut n = 2;
        while taken(&candidate) {
            candidate = format!("{stem}-{n}{ext}");
            n += 1;
        }
        candidate
    }

    fn save(&self) -> Result<(), LibraryError> {
        write_json_atomic(&self.dir.join(INDEX_FILE), &self.templates)
    }
}

fn inspect_image(path: &Path) -> Result<(u32, u32, String), LibraryError> {
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let mime = reader
        .format()
        .map(|format| format.to_mime_type())
        .unwrap_or("image/png")
        .to_string();
    let decoded = reader.decode().map_err(|source| LibraryError::InvalidImage {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((decoded.width(), decoded.height(), mime))
}

fn has_duplicate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> bool {
    let mut seen = HashSet::new();
    names.into_iter().any(|name| !seen.insert(norm_name(name)))
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), LibraryError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn library(dir: &Path) -> TemplateLibrary {
        TemplateLibrary::open(dir, TileGrid::default()).unwrap()
    }

    #[test]
    fn test_add_lists_newest_first_and_persists() {
        let root = tempfile::tempdir().unwrap();
        let src = write_image(root.path(), "castle.png", 3, 2);
        let lib_dir = root.path().join("lib");

        let mut lib = library(&lib_dir);
        lib.add(" Castle ", TileCoord::new(1, 2, 3, 4), &src).unwrap();
        lib.add("Moat", TileCoord::new(5, 6, 7, 8), &src).unwrap();
        assert_eq!(lib.list(), vec!["Moat — [5,6,7,8]", "Castle — [1,2,3,4]"]);

        let castle = lib.get("castle").unwrap();
        assert_eq!((castle.width, castle.height), (3, 2));
        assert_eq!(castle.mime, "image/png");
        assert_eq!(castle.filename, "castle.png");
        // Same source file twice gets two stored copies
        assert_ne!(lib.get("moat").unwrap().image, castle.image);
        assert!(lib.image_path(castle).is_file());

        let reopened = library(&lib_dir);
        assert_eq!(reopened.templates(), lib.templates());
    }

    #[test]
    fn test_add_rejects_invalid_entries() {
        let root = tempfile::tempdir().unwrap();
        let src = write_image(root.path(), "castle.png", 3, 2);
        let junk = root.path().join("junk.png");
        fs::write(&junk, b"definitely not a png").unwrap();
        let coords = TileCoord::new(1, 2, 3, 4);

        let mut lib = library(&root.path().join("lib"));
        lib.add("Castle", coords, &src).unwrap();

        assert!(matches!(lib.add("   ", coords, &src), Err(LibraryError::EmptyName)));
        assert!(matches!(
            lib.add("CASTLE", coords, &src),
            Err(LibraryError::DuplicateName(_))
        ));
        assert!(matches!(
            lib.add("Far", TileCoord::new(1, 2, 1000, 0), &src),
            Err(LibraryError::InvalidCoords(_))
        ));
        assert!(matches!(
            lib.add("Junk", coords, &junk),
            Err(LibraryError::InvalidImage { .. })
        ));
        assert!(matches!(
            lib.add("Gone", coords, &root.path().join("missing.png")),
            Err(LibraryError::Io(_))
        ));
        assert_eq!(lib.templates().len(), 1);
    }

    #[test]
    fn test_move_and_remove() {
        let root = tempfile::tempdir().unwrap();
        let src = write_image(root.path(), "a.png", 1, 1);
        let lib_dir = root.path().join("lib");
        let mut lib = library(&lib_dir);
        for name in ["C", "B", "A"] {
            lib.add(name, TileCoord::default(), &src).unwrap();
        }

        assert_eq!(lib.move_entry("A", -1).unwrap(), 0);
        assert_eq!(lib.move_entry("C", 1).unwrap(), 2);
        assert_eq!(lib.move_entry("A", 1).unwrap(), 1);
        let names: Vec<_> = lib.templates().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["B", "A", "C"]);

        let stored = lib.image_path(lib.get("A").unwrap());
        let removed = lib.remove("a").unwrap();
        assert_eq!(removed.name, "A");
        assert!(!stored.exists());
        assert!(matches!(lib.remove("A"), Err(LibraryError::NotFound(_))));
        assert!(matches!(lib.move_entry("A", 1), Err(LibraryError::NotFound(_))));
        assert_eq!(library(&lib_dir).templates().len(), 2);
    }

    #[test]
    fn test_export_then_import_renames_and_skips_duplicates() {
        let root = tempfile::tempdir().unwrap();
        let castle = write_image(root.path(), "castle.png", 3, 2);
        let moat = write_image(root.path(), "moat.png", 4, 4);
        let export_dir = root.path().join("export");

        let mut source = library(&root.path().join("a"));
        source.add("Castle", TileCoord::new(1, 2, 3, 4), &castle).unwrap();
        source.add("Moat", TileCoord::new(5, 6, 7, 8), &moat).unwrap();
        assert_eq!(source.export(&export_dir).unwrap(), 2);

        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(export_dir.join(INDEX_FILE)).unwrap())
                .unwrap();
        assert_eq!(document["version"], 1);
        assert!(document["exported_at"].is_string());

        let mut target = library(&root.path().join("b"));
        target.add("castle", TileCoord::new(9, 9, 9, 9), &castle).unwrap();

        assert_eq!(target.import(&export_dir).unwrap(), 2);
        assert_eq!(
            target.list(),
            vec![
                "Moat — [5,6,7,8]",
                "Castle (2) — [1,2,3,4]",
                "castle — [9,9,9,9]"
            ]
        );
        for template in target.templates() {
            assert!(target.image_path(template).is_file());
        }

        assert!(matches!(
            target.import(&export_dir),
            Err(LibraryError::NothingToImport)
        ));
        assert_eq!(target.templates().len(), 3);
    }

    #[test]
    fn test_import_keeps_only_valid_entries() {
        let root = tempfile::tempdir().unwrap();
        let export_dir = root.path().join("export");
        fs::create_dir_all(&export_dir).unwrap();
        write_image(&export_dir, "ok.png", 2, 2);
        let entry = |name: &str, image: &str, px: u32| {
            serde_json::json!({
                "name": name,
                "filename": "ok.png",
                "image": image,
                "coords": { "tlx": 1, "tly": 1, "px": px, "py": 0 },
            })
        };
        let document = serde_json::json!({
            "version": 1,
            "templates": [
                entry("Keep", "ok.png", 0),
                entry("Keep", "ok.png", 1),
                entry("  ", "ok.png", 2),
                entry("Missing", "gone.png", 3),
                entry("Escape", "../ok.png", 4),
                entry("Outside", "ok.png", 1000),
                { "name": "No coords", "image": "ok.png" },
            ],
        });
        fs::write(export_dir.join(INDEX_FILE), document.to_string()).unwrap();

        let mut lib = library(&root.path().join("lib"));
        assert_eq!(lib.import(&export_dir).unwrap(), 2);
        assert_eq!(lib.list(), vec!["Keep — [1,1,0,0]", "Keep (2) — [1,1,1,0]"]);
    }

    #[test]
    fn test_import_rejects_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let export_dir = root.path().join("export");
        fs::create_dir_all(&export_dir).unwrap();
        let mut lib = library(&root.path().join("lib"));

        fs::write(export_dir.join(INDEX_FILE), r#"{"hello": "world"}"#).unwrap();
        assert!(matches!(
            lib.import(&export_dir),
            Err(LibraryError::InvalidExport(_))
        ));

        fs::write(export_dir.join(INDEX_FILE), r#"{"version": 1, "templates": [42]}"#).unwrap();
        assert!(matches!(
            lib.import(&export_dir),
            Err(LibraryError::NoValidTemplates)
        ));
    }

    #[test]
    fn test_export_into_library_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let lib = library(root.path());
        assert!(matches!(
            lib.export(root.path()),
            Err(LibraryError::ExportIntoLibrary)
        ));
    }
}
