// ============================================================================
// PROJECT FILES — layered document save/load (.rcp)
// ============================================================================
//
// Format: 8-byte magic, little-endian u16 format version, then a bincode
// body. Layer pixels are stored raw (RGBA8, row-major); the format carries
// enough geometry to rebuild the layer stack exactly.
// ============================================================================

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{CompositeRule, Layer, LayerSet};

const MAGIC: &[u8; 8] = b"RCPROJ\0\0";
const FORMAT_VERSION: u16 = 1;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    Codec(Box<bincode::ErrorKind>),
    /// The file does not start with the project magic.
    BadMagic,
    UnsupportedVersion(u16),
    /// A layer record's pixel buffer does not match its dimensions.
    BadLayer(usize),
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::Io(e) => write!(f, "I/O error: {}", e),
            ProjectError::Codec(e) => write!(f, "encoding error: {}", e),
            ProjectError::BadMagic => write!(f, "not a RasterCore project file"),
            ProjectError::UnsupportedVersion(v) => {
                write!(f, "unsupported project format version {}", v)
            }
            ProjectError::BadLayer(i) => write!(f, "corrupt pixel data in layer {}", i),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(e: std::io::Error) -> Self {
        ProjectError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for ProjectError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ProjectError::Codec(e)
    }
}

// ============================================================================
// ON-DISK RECORDS
// ============================================================================

#[derive(Serialize, Deserialize)]
struct LayerRecordV1 {
    location: (i32, i32),
    width: u32,
    height: u32,
    rule: u8,
    pixels: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct ProjectFileV1 {
    /// Document identity, preserved across save/load.
    id: [u8; 16],
    layers: Vec<LayerRecordV1>,
}

// ============================================================================
// SAVE / LOAD
// ============================================================================

/// Serialize a layer stack to `path`.
pub fn save_project(set: &LayerSet, id: Uuid, path: &Path) -> Result<(), ProjectError> {
    let project = ProjectFileV1 {
        id: *id.as_bytes(),
        layers: set
            .iter()
            .map(|layer| LayerRecordV1 {
                location: layer.location(),
                width: layer.pixels().width(),
                height: layer.pixels().height(),
                rule: layer.rule().to_u8(),
                pixels: layer.pixels().as_raw().clone(),
            })
            .collect(),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    bincode::serialize_into(&mut writer, &project)?;
    writer.flush()?;
    Ok(())
}

/// Load a layer stack from `path`. Returns the document id and the stack
/// (version counter reflects the appends performed while rebuilding).
pub fn load_project(path: &Path) -> Result<(Uuid, LayerSet), ProjectError> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ProjectError::BadMagic);
    }
    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;
    let version = u16::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(ProjectError::UnsupportedVersion(version));
    }

    let project: ProjectFileV1 = bincode::deserialize_from(&mut reader)?;

    let mut set = LayerSet::new();
    for (i, record) in project.layers.into_iter().enumerate() {
        let LayerRecordV1 { location, width, height, rule, pixels } = record;
        let image = RgbaImage::from_raw(width, height, pixels)
            .ok_or(ProjectError::BadLayer(i))?;
        set.push(Layer::new(location, image, CompositeRule::from_u8(rule)));
    }
    Ok((Uuid::from_bytes(project.id), set))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rastercore-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn save_load_round_trips_layers() {
        let mut set = LayerSet::new();
        set.push(Layer::new(
            (0, 0),
            RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255])),
            CompositeRule::Paint,
        ));
        set.push(Layer::new(
            (-4, 7),
            RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])),
            CompositeRule::Erase,
        ));
        let id = Uuid::new_v4();

        let path = temp_path("roundtrip.rcp");
        save_project(&set, id, &path).unwrap();
        let (loaded_id, loaded) = load_project(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded_id, id);
        assert_eq!(loaded.len(), 2);
        let layers: Vec<_> = loaded.iter().collect();
        assert_eq!(layers[0].location(), (0, 0));
        assert_eq!(layers[0].rule(), CompositeRule::Paint);
        assert_eq!(*layers[0].pixels().get_pixel(2, 1), Rgba([10, 20, 30, 255]));
        assert_eq!(layers[1].location(), (-4, 7));
        assert_eq!(layers[1].rule(), CompositeRule::Erase);
    }

    #[test]
    fn rejects_foreign_files() {
        let path = temp_path("foreign.rcp");
        std::fs::write(&path, b"definitely not a project file").unwrap();
        let result = load_project(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ProjectError::BadMagic)));
    }

    #[test]
    fn rejects_unknown_format_version() {
        let path = temp_path("version.rcp");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&99u16.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        let result = load_project(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ProjectError::UnsupportedVersion(99))));
    }
}
