use std::path::{Path, PathBuf};

use rasterreg_geometry::{ControlPointPair, ControlPointSet, Point2D};
use rasterreg_image::ImageSize;

/// Tag written as the first field of a control point file.
const FORMAT_TAG: &str = "rasterreg control points";

/// Format version written next to the tag.
const FORMAT_VERSION: &str = "1";

/// An error type for reading and writing control point files.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    /// Error to open or write the file.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),

    /// Error when the file does not carry the expected format tag.
    #[error("Not a control point file (missing '{FORMAT_TAG}' tag)")]
    MissingFormatTag,

    /// Error when a metadata section is missing.
    #[error("Control point file is missing its {0} section")]
    MissingSection(&'static str),

    /// Error when a row cannot be parsed.
    #[error("Invalid control point row at line {line}: {message}")]
    InvalidRow {
        /// 1-based line number of the offending row.
        line: usize,
        /// What went wrong.
        message: String,
    },
}

/// A warning raised when importing a ledger entry into a session whose
/// loaded images do not match the entry's metadata.
///
/// Warnings leave the import decision to the caller; they never abort it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerWarning {
    /// The entry was recorded against a different reference image.
    ReferenceNameMismatch {
        /// Name recorded in the entry.
        entry: String,
        /// Name of the currently loaded reference image.
        loaded: String,
    },
    /// The entry was recorded against different moving image(s).
    MovingNameMismatch {
        /// Names recorded in the entry.
        entry: Vec<String>,
        /// Name of the currently loaded moving image.
        loaded: String,
    },
    /// The entry was recorded for a different canvas size.
    CanvasMismatch {
        /// Canvas size recorded in the entry.
        entry: ImageSize,
        /// Canvas size of the current session.
        loaded: ImageSize,
    },
}

impl std::fmt::Display for LedgerWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LedgerWarning::ReferenceNameMismatch { entry, loaded } => write!(
                f,
                "reference image name mismatch: file has '{entry}', loaded is '{loaded}'"
            ),
            LedgerWarning::MovingNameMismatch { entry, loaded } => write!(
                f,
                "moving image name mismatch: file has {entry:?}, loaded is '{loaded}'"
            ),
            LedgerWarning::CanvasMismatch { entry, loaded } => write!(
                f,
                "canvas size mismatch: file has {entry}, session is {loaded}"
            ),
        }
    }
}

/// The persisted form of a control point set together with the registration
/// metadata it was recorded under.
///
/// Round-trips losslessly through the CSV control point format: one metadata
/// block identifying the reference image, the moving image(s) and the canvas
/// size, then one row per pair with 1-based index and the four coordinates.
/// Coordinates are printed with Rust's shortest round-trip `f64` formatting,
/// so loading a saved entry reproduces the identical point set.
///
/// The destination folder is in-memory metadata describing where a batch run
/// wrote its outputs; it is not part of the CSV rows and loads back as `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerEntry {
    /// Folder the registered image(s) were written to, for batch runs.
    pub destination: Option<PathBuf>,
    /// File name of the reference image.
    pub reference_name: String,
    /// File name(s) of the moving image(s); several for a batch run.
    pub moving_names: Vec<String>,
    /// The output canvas size, equal to the reference image size.
    pub canvas: ImageSize,
    /// The control point pairs.
    pub points: ControlPointSet,
}

impl LedgerEntry {
    /// Serialize the entry to the CSV control point format.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("{FORMAT_TAG},{FORMAT_VERSION}\n"));
        out.push_str(&format!(
            "canvas,{},{}\n",
            self.canvas.width, self.canvas.height
        ));
        out.push_str(&format!("reference,{}\n", self.reference_name));
        out.push_str(&format!("moving,{}\n", self.moving_names.join(",")));
        out.push_str("index,ref_x,ref_y,mov_x,mov_y\n");

        for (i, pair) in self.points.pairs().iter().enumerate() {
            out.push_str(&format!(
                "{},{},{},{},{}\n",
                i + 1,
                pair.reference.x,
                pair.reference.y,
                pair.moving.x,
                pair.moving.y
            ));
        }

        out
    }

    /// Parse an entry from the CSV control point format.
    ///
    /// # Errors
    ///
    /// Returns an error when the format tag, a metadata section or the column
    /// header is missing, or a point row does not parse.
    pub fn from_csv(text: &str) -> Result<Self, LedgerError> {
        let mut lines = text.lines().enumerate();

        let (_, tag_line) = lines.next().ok_or(LedgerError::MissingFormatTag)?;
        if !tag_line.starts_with(FORMAT_TAG) {
            return Err(LedgerError::MissingFormatTag);
        }

        let canvas_line = expect_section(lines.next(), "canvas")?;
        let mut canvas_fields = canvas_line.split(',');
        let width = parse_field::<usize>(canvas_fields.next(), 2, "canvas width")?;
        let height = parse_field::<usize>(canvas_fields.next(), 2, "canvas height")?;

        let reference_name = expect_section(lines.next(), "reference")?.to_string();

        let moving_line = expect_section(lines.next(), "moving")?;
        let moving_names: Vec<String> = moving_line
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let (_, header) = lines.next().ok_or(LedgerError::MissingSection("index"))?;
        if !header.starts_with("index,") {
            return Err(LedgerError::MissingSection("index"));
        }

        let mut pairs = Vec::new();
        for (i, row) in lines {
            let line = i + 1;
            if row.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = row.split(',').collect();
            if fields.len() != 5 {
                return Err(LedgerError::InvalidRow {
                    line,
                    message: format!("expected 5 fields, got {}", fields.len()),
                });
            }

            let coords: Vec<f64> = fields[1..]
                .iter()
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|e| LedgerError::InvalidRow {
                        line,
                        message: format!("'{field}': {e}"),
                    })
                })
                .collect::<Result<_, _>>()?;

            pairs.push(ControlPointPair::new(
                Point2D::new(coords[0], coords[1]),
                Point2D::new(coords[2], coords[3]),
            ));
        }

        Ok(LedgerEntry {
            destination: None,
            reference_name,
            moving_names,
            canvas: ImageSize { width, height },
            points: ControlPointSet::from_pairs(pairs),
        })
    }

    /// Write the entry to a control point file.
    pub fn save(&self, file_path: impl AsRef<Path>) -> Result<(), LedgerError> {
        std::fs::write(file_path, self.to_csv())?;
        Ok(())
    }

    /// Read an entry from a control point file.
    pub fn load(file_path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let text = std::fs::read_to_string(file_path)?;
        Self::from_csv(&text)
    }
}

fn expect_section<'a>(
    line: Option<(usize, &'a str)>,
    section: &'static str,
) -> Result<&'a str, LedgerError> {
    let (_, line) = line.ok_or(LedgerError::MissingSection(section))?;
    line.strip_prefix(section)
        .and_then(|rest| rest.strip_prefix(','))
        .ok_or(LedgerError::MissingSection(section))
}

fn parse_field<T: std::str::FromStr>(
    field: Option<&str>,
    line: usize,
    what: &str,
) -> Result<T, LedgerError>
where
    T::Err: std::fmt::Display,
{
    let field = field.ok_or_else(|| LedgerError::InvalidRow {
        line,
        message: format!("missing {what}"),
    })?;
    field.trim().parse::<T>().map_err(|e| LedgerError::InvalidRow {
        line,
        message: format!("{what} '{field}': {e}"),
    })
}
