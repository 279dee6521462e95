//! Font catalog.
//!
//! Maps a font family and style, as named in the font's own name table, to
//! the font file on disk. The catalog is filled once at start-up from a
//! `fontdb` database and only read afterwards.

use fontdb::{Database, Source};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use ttf_parser::{name_id, Face, Language};

use crate::error::Error;

#[derive(Debug, Clone, Default)]
pub struct FontCatalog {
    families: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

impl FontCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        family: impl Into<String>,
        style: impl Into<String>,
        path: impl Into<PathBuf>,
    ) {
        self.families
            .entry(family.into())
            .or_default()
            .insert(style.into(), path.into());
    }

    pub fn get(&self, family: &str, style: &str) -> Option<&Path> {
        self.families
            .get(family)
            .and_then(|styles| styles.get(style))
            .map(PathBuf::as_path)
    }

    /// Family names in sorted order.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    pub fn styles(&self, family: &str) -> impl Iterator<Item = &str> {
        self.families
            .get(family)
            .into_iter()
            .flat_map(|styles| styles.keys().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Adds every font of `other`, replacing entries with the same family and style.
    pub fn merge(&mut self, other: FontCatalog) {
        for (family, styles) in other.families {
            self.families.entry(family).or_default().extend(styles);
        }
    }

    /// Fonts installed on the system.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        Self::from_database(&db)
    }

    /// Fonts found anywhere below `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "font folder {:?} is not a directory",
                dir
            )));
        }
        let mut db = Database::new();
        db.load_fonts_dir(dir);
        let catalog = Self::from_database(&db);
        debug!(
            "Found {} font families in {:?}",
            catalog.families.len(),
            dir
        );
        Ok(catalog)
    }

    /// Register every face of `db` that was loaded from a file.
    ///
    /// Only the first face of a font collection is used, that is the one
    /// the rasterizer opens.
    pub fn from_database(db: &Database) -> Self {
        let mut catalog = FontCatalog::new();
        for face in db.faces() {
            let path = match &face.source {
                Source::File(path) | Source::SharedFile(path, _) => path.clone(),
                Source::Binary(_) => continue,
            };
            if face.index != 0 {
                debug!("Skipping face {} of {:?}", face.index, path);
                continue;
            }
            match db.with_face_data(face.id, face_names).flatten() {
                Some((family, style)) => catalog.insert(family, style, path),
                None => warn!("Skipping font {:?} without family or style name", path),
            }
        }
        catalog
    }
}

/// Family and style from the name table, typographic names first.
fn face_names(data: &[u8], index: u32) -> Option<(String, String)> {
    let face = Face::parse(data, index).ok()?;
    let family = name(&face, &[name_id::TYPOGRAPHIC_FAMILY, name_id::FAMILY])?;
    let style = name(&face, &[name_id::TYPOGRAPHIC_SUBFAMILY, name_id::SUBFAMILY])?;
    Some((family, style))
}

/// First non-empty name among `ids`, preferring the US English record.
fn name(face: &Face<'_>, ids: &[u16]) -> Option<String> {
    ids.iter().find_map(|id| {
        let mut found = None;
        for record in face.names() {
            if record.name_id != *id {
                continue;
            }
            let value = match record.to_string() {
                Some(value) if !value.trim().is_empty() => value,
                _ => continue,
            };
            if record.language() == Language::English_UnitedStates {
                return Some(value);
            }
            found.get_or_insert(value);
        }
        found
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lookup_and_listing() {
        let mut catalog = FontCatalog::new();
        catalog.insert("Noto Sans", "Bold", "/fonts/NotoSans-Bold.ttf");
        catalog.insert("DejaVu Sans", "Book", "/fonts/DejaVuSans.ttf");
        catalog.insert("Noto Sans", "Regular", "/fonts/NotoSans-Regular.ttf");

        assert_eq!(
            catalog.get("Noto Sans", "Bold"),
            Some(Path::new("/fonts/NotoSans-Bold.ttf"))
        );
        assert_eq!(catalog.get("Noto Sans", "Italic"), None);
        assert_eq!(catalog.get("Arial", "Bold"), None);
        assert_eq!(
            catalog.families().collect::<Vec<_>>(),
            vec!["DejaVu Sans", "Noto Sans"]
        );
        assert_eq!(
            catalog.styles("Noto Sans").collect::<Vec<_>>(),
            vec!["Bold", "Regular"]
        );
        assert_eq!(catalog.styles("Arial").count(), 0);
    }

    #[test]
    fn merge_overrides_same_style() {
        let mut base = FontCatalog::new();
        base.insert("Mono", "Regular", "/a/Mono.ttf");
        let mut extra = FontCatalog::new();
        extra.insert("Mono", "Regular", "/b/Mono.ttf");
        extra.insert("Mono", "Bold", "/b/Mono-Bold.ttf");
        base.merge(extra);

        assert_eq!(base.get("Mono", "Regular"), Some(Path::new("/b/Mono.ttf")));
        assert_eq!(base.styles("Mono").count(), 2);
    }

    const DEJAVU_DIRS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu",
        "/usr/share/fonts/TTF",
        "/usr/share/fonts/dejavu",
    ];

    fn dejavu_sans() -> Option<PathBuf> {
        DEJAVU_DIRS
            .iter()
            .map(|dir| Path::new(dir).join("DejaVuSans.ttf"))
            .find(|path| path.is_file())
    }

    #[test]
    fn names_come_from_font_metadata() {
        let source = match dejavu_sans() {
            Some(path) => path,
            None => {
                eprintln!("DejaVuSans.ttf not found, skipping");
                return;
            }
        };
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        // the file name says nothing about the family
        let copy = nested.join("label-font.ttf");
        fs::copy(&source, &copy).unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let catalog = FontCatalog::load_dir(dir.path()).unwrap();
        assert_eq!(catalog.get("DejaVu Sans", "Book"), Some(copy.as_path()));
        assert_eq!(catalog.get("DejaVuSans", "Regular"), None);
        assert_eq!(catalog.families().collect::<Vec<_>>(), vec!["DejaVu Sans"]);
    }

    #[test]
    fn broken_font_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Broken-Bold.ttf"), b"not a font").unwrap();
        fs::write(dir.path().join("Empty.otf"), b"").unwrap();

        let catalog = FontCatalog::load_dir(dir.path()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn missing_font_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FontCatalog::load_dir(dir.path().join("missing")),
            Err(Error::InvalidConfig(_))
        ));
    }
}
