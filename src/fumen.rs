//! Example solutions (fumens) as seen through their page model.
//!
//! The serialized diagram format belongs to an external codec implementing [`FumenCodec`]; this
//! module only combines, splits and inspects decoded pages.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::piece::Piece;

/// An opaque serialized diagram such as `v115@...`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fumen(String);

impl Fumen {
    /// Wrap fumen data without validating it.
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    /// The raw fumen data.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fumen {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Fumen {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Fumen {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contents of one field cell.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Mino {
    /// Empty cell, `_`.
    #[default]
    Empty,
    /// A coloured mino, written as its letter.
    Piece(Piece),
    /// Garbage, `X`.
    Gray,
}

impl Mino {
    fn to_char(self) -> char {
        match self {
            Mino::Empty => '_',
            Mino::Piece(piece) => piece.to_char(),
            Mino::Gray => 'X',
        }
    }
}

impl TryFrom<char> for Mino {
    type Error = ();

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '_' => Ok(Mino::Empty),
            'X' => Ok(Mino::Gray),
            other => Piece::try_from(other).map(Mino::Piece).map_err(|_| ()),
        }
    }
}

/// Board contents of one page, top row first, without the garbage row.
///
/// Serialized as rows of `_` (empty), `X` (gray) and piece letters.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Field {
    cells: Array2<Mino>,
}

impl Field {
    /// Columns of a playfield.
    pub const WIDTH: usize = 10;

    /// Parse rows written top to bottom with one character per cell.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, CodecError> {
        let mut cells = Vec::with_capacity(rows.len() * Self::WIDTH);
        for row in rows {
            let row = row.as_ref();
            let parsed: Vec<Mino> = row.chars().map(Mino::try_from).collect::<Result<_, _>>()
                .map_err(|_| CodecError::InvalidField(row.to_string()))?;
            if parsed.len() != Self::WIDTH {
                return Err(CodecError::InvalidField(row.to_string()));
            }
            cells.extend(parsed);
        }
        let cells = Array2::from_shape_vec((rows.len(), Self::WIDTH), cells)
            .map_err(|e| CodecError::InvalidField(e.to_string()))?;
        Ok(Self { cells })
    }

    /// Rows top to bottom, as written by [`Field::from_rows`].
    pub fn rows(&self) -> Vec<String> {
        self.cells.axis_iter(Axis(0))
            .map(|row| row.iter().map(|mino| mino.to_char()).collect())
            .collect()
    }

    /// Rows from the highest occupied one down.
    pub fn reduced_rows(&self) -> Vec<String> {
        let first_occupied = self.cells.axis_iter(Axis(0))
            .position(|row| row.iter().any(|mino| *mino != Mino::Empty))
            .unwrap_or(self.cells.nrows());
        self.rows().split_off(first_occupied)
    }

    /// Rows up to the highest occupied one.
    pub fn height(&self) -> usize {
        self.reduced_rows().len()
    }

    /// Whether every row from the top occupied one down is full.
    pub fn is_cleared_shape(&self) -> bool {
        self.reduced_rows().iter().all(|row| !row.contains('_'))
    }

    /// The same field with every coloured mino turned gray.
    pub fn grayed(&self) -> Self {
        Self {
            cells: self.cells.mapv(|mino| match mino {
                Mino::Piece(_) => Mino::Gray,
                other => other,
            }),
        }
    }
}

impl TryFrom<Vec<String>> for Field {
    type Error = CodecError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_rows(&value)
    }
}

impl From<Field> for Vec<String> {
    fn from(value: Field) -> Self {
        value.rows()
    }
}

/// One page of a diagram.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// The playfield, if the page shows one.
    #[serde(default)]
    pub field: Option<Field>,
    /// The page comment.
    #[serde(default)]
    pub comment: Option<String>,
}

/// The serialization format of example solutions.
pub trait FumenCodec {
    /// Pages of `fumen`.
    fn decode(&self, fumen: &Fumen) -> Result<Vec<Page>, CodecError>;
    /// A single fumen holding `pages` in order.
    fn encode(&self, pages: &[Page]) -> Result<Fumen, CodecError>;
}

/// Comment of every page, empty for pages without one.
pub fn comments(codec: &dyn FumenCodec, fumen: &Fumen) -> Result<Vec<String>, CodecError> {
    Ok(codec.decode(fumen)?.into_iter().map(|page| page.comment.unwrap_or_default()).collect())
}

/// All pages of `fumens`, in order, as one diagram.
pub fn combine<'f>(codec: &dyn FumenCodec, fumens: impl IntoIterator<Item = &'f Fumen>) -> Result<Fumen, CodecError> {
    let mut pages = Vec::new();
    for fumen in fumens {
        pages.extend(codec.decode(fumen)?);
    }
    if pages.is_empty() {
        return Err(CodecError::Empty);
    }
    codec.encode(&pages)
}

/// Like [`combine`], with the first page of each fumen commented with the matching entry of `comments`.
pub fn combine_with_comments(codec: &dyn FumenCodec, fumens: &[Fumen], comments: &[String]) -> Result<Fumen, CodecError> {
    let mut pages = Vec::new();
    for (fumen, comment) in fumens.iter().zip_eq(comments) {
        let mut decoded = codec.decode(fumen)?;
        if let Some(first) = decoded.first_mut() {
            first.comment = Some(comment.clone());
        }
        pages.extend(decoded);
    }
    if pages.is_empty() {
        return Err(CodecError::Empty);
    }
    codec.encode(&pages)
}

/// Every page of `fumen` as its own single page diagram.
pub fn split(codec: &dyn FumenCodec, fumen: &Fumen) -> Result<Vec<Fumen>, CodecError> {
    codec.decode(fumen)?
        .into_iter()
        .map(|page| codec.encode(std::slice::from_ref(&page)))
        .collect()
}

fn fields(codec: &dyn FumenCodec, fumen: &Fumen) -> Result<Vec<Field>, CodecError> {
    Ok(codec.decode(fumen)?.into_iter().filter_map(|page| page.field).collect())
}

/// Whether every page shows a completely filled bottom.
pub fn is_pc(codec: &dyn FumenCodec, fumen: &Fumen) -> Result<bool, CodecError> {
    Ok(fields(codec, fumen)?.iter().all(Field::is_cleared_shape))
}

/// Whether every page shows exactly two full rows.
pub fn is_two_line(codec: &dyn FumenCodec, fumen: &Fumen) -> Result<bool, CodecError> {
    Ok(fields(codec, fumen)?.iter().all(|field| field.height() == 2 && field.is_cleared_shape()))
}

/// Tallest occupied height over all pages.
pub fn height(codec: &dyn FumenCodec, fumen: &Fumen) -> Result<usize, CodecError> {
    Ok(fields(codec, fumen)?.iter().map(Field::height).max().unwrap_or(0))
}

/// The diagram with every coloured mino turned gray.
pub fn gray(codec: &dyn FumenCodec, fumen: &Fumen) -> Result<Fumen, CodecError> {
    let pages = codec.decode(fumen)?
        .into_iter()
        .map(|page| Page { field: page.field.map(|field| field.grayed()), ..page })
        .collect_vec();
    codec.encode(&pages)
}
