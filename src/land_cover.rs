//! Land cover classification metadata.
//!
//! The classification source itself lives outside this crate; it is described to the archive
//! through the [`LandCoverClassifier`] trait. What gets persisted is a palette table: every
//! classification value with its name and display color.

use crate::container::error::{self, ContainerError};
use crate::container::{ContainerReader, ContainerWriter, DType, Member, MemberKind};
use crate::Error;

use std::collections::BTreeSet;
use std::io::{Read, Seek, Write};

/// bytes reserved for the name of a land cover in the palette table
pub const NAME_LEN: usize = 100;

pub(crate) const INFORMATION_GROUP: &str = "/information";
pub(crate) const LAND_COVERS: &str = "/information/land_covers";
pub(crate) const LAND_COVER_TYPE: &str = "land_cover_type";

/// A source of land cover classes.
pub trait LandCoverClassifier {
    /// name recorded as the `land_cover_type` of an archive entry
    fn type_name(&self) -> &str;

    /// every classification value this classifier can produce, with its name
    fn land_covers(&self) -> Vec<(i32, String)>;

    /// display color of a classification value
    fn color(&self, value: i32) -> Option<[i32; 3]>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One row of the palette table
pub struct LandCoverEntry {
    pub value: i32,
    pub name: String,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
}

impl LandCoverEntry {
    pub fn new<T: Into<String>>(value: i32, name: T, [red, green, blue]: [i32; 3]) -> Self {
        Self {
            value,
            name: name.into(),
            red,
            green,
            blue,
        }
    }

    pub fn color(&self) -> [i32; 3] {
        [self.red, self.green, self.blue]
    }

    pub(crate) fn members() -> Vec<Member> {
        vec![
            Member::new("value", MemberKind::Int32),
            Member::new("name", MemberKind::FixedString(NAME_LEN)),
            Member::new("red", MemberKind::Int32),
            Member::new("green", MemberKind::Int32),
            Member::new("blue", MemberKind::Int32),
        ]
    }

    /// fixed width record; names longer than [`NAME_LEN`] bytes are cut at a char boundary
    pub(crate) fn to_record(&self) -> Vec<u8> {
        let mut end = self.name.len().min(NAME_LEN);
        while !self.name.is_char_boundary(end) {
            end -= 1;
        }

        let mut name = [0u8; NAME_LEN];
        name[..end].copy_from_slice(&self.name.as_bytes()[..end]);

        let mut record = Vec::with_capacity(4 * 4 + NAME_LEN);
        record.extend_from_slice(&self.value.to_le_bytes());
        record.extend_from_slice(&name);
        record.extend_from_slice(&self.red.to_le_bytes());
        record.extend_from_slice(&self.green.to_le_bytes());
        record.extend_from_slice(&self.blue.to_le_bytes());
        record
    }

    pub(crate) fn from_record(record: &[u8]) -> Result<Self, ContainerError> {
        let int_at = |offset: usize| {
            let mut bytes = [0; 4];
            bytes.copy_from_slice(&record[offset..offset + 4]);
            i32::from_le_bytes(bytes)
        };

        let name_bytes = &record[4..4 + NAME_LEN];
        let name_len = name_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(NAME_LEN);
        let name = String::from_utf8(name_bytes[..name_len].to_vec())?;

        let colors = 4 + NAME_LEN;
        Ok(Self {
            value: int_at(0),
            name,
            red: int_at(colors),
            green: int_at(colors + 4),
            blue: int_at(colors + 8),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Land cover block of an archive entry
pub struct LandCoverInfo {
    pub land_cover_type: String,
    pub land_covers: Vec<LandCoverEntry>,
}

impl LandCoverInfo {
    /// The palette to persist for `classifier`.
    ///
    /// With `cover_types`, only the classes that occur among the faces are kept. Every
    /// occurring value must belong to the classifier, and every kept class needs a color.
    pub fn from_classifier<C: LandCoverClassifier + ?Sized>(
        classifier: &C,
        cover_types: Option<&[i32]>,
    ) -> Result<Self, Error> {
        let domain = classifier.land_covers();

        let used: Option<BTreeSet<i32>> = cover_types.map(|values| values.iter().copied().collect());

        if let Some(used) = &used {
            let known: BTreeSet<i32> = domain.iter().map(|(value, _)| *value).collect();
            if let Some(value) = used.difference(&known).next() {
                return Err(Error::UnknownCoverType {
                    value: *value,
                    classifier: classifier.type_name().into(),
                });
            }
        }

        let land_covers = domain
            .into_iter()
            .filter(|(value, _)| used.as_ref().map_or(true, |used| used.contains(value)))
            .map(|(value, name)| {
                let color = classifier.color(value).ok_or_else(|| Error::MissingColor {
                    value,
                    classifier: classifier.type_name().into(),
                })?;
                Ok(LandCoverEntry::new(value, name, color))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self {
            land_cover_type: classifier.type_name().into(),
            land_covers,
        })
    }

    pub(crate) fn write_to<W: Write>(
        &self,
        writer: &mut ContainerWriter<W>,
    ) -> Result<(), ContainerError> {
        writer.create_group(INFORMATION_GROUP)?;
        writer.set_attribute(INFORMATION_GROUP, LAND_COVER_TYPE, self.land_cover_type.as_str())?;

        let rows: Vec<Vec<u8>> = self.land_covers.iter().map(LandCoverEntry::to_record).collect();
        writer.write_compound(LAND_COVERS, LandCoverEntry::members(), &rows)
    }

    /// the land cover block of a container, if it has one
    pub(crate) fn read_from<R: Read + Seek>(
        reader: &mut ContainerReader<R>,
    ) -> Result<Option<Self>, ContainerError> {
        if !reader.is_group(INFORMATION_GROUP) {
            return Ok(None);
        }

        let land_cover_type = reader
            .require_str(INFORMATION_GROUP, LAND_COVER_TYPE)?
            .to_string();

        let mut land_covers = Vec::new();
        if reader.is_dataset(LAND_COVERS) {
            let (members, rows) = reader.read_compound(LAND_COVERS)?;
            if members != LandCoverEntry::members() {
                let expected = DType::Compound(LandCoverEntry::members());
                let actual = DType::Compound(members);
                return Err(error::TypeMismatch::new(LAND_COVERS.into(), expected, actual).into());
            }
            for row in rows {
                land_covers.push(LandCoverEntry::from_record(&row)?);
            }
        }

        Ok(Some(Self {
            land_cover_type,
            land_covers,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An in-memory classifier, for classes known ahead of time.
///
/// ```
/// use tin_archive::{LandCoverClassifier, LandCoverEntry, LandCoverTable};
///
/// let table = LandCoverTable::new(
///     "CorineLandCover",
///     vec![
///         LandCoverEntry::new(311, "Broad-leaved forest", [128, 255, 0]),
///         LandCoverEntry::new(512, "Water bodies", [128, 242, 230]),
///     ],
/// );
///
/// assert_eq!(table.color(512), Some([128, 242, 230]));
/// assert_eq!(table.color(999), None);
/// ```
pub struct LandCoverTable {
    type_name: String,
    entries: Vec<LandCoverEntry>,
}

impl LandCoverTable {
    pub fn new<T: Into<String>>(type_name: T, entries: Vec<LandCoverEntry>) -> Self {
        Self {
            type_name: type_name.into(),
            entries,
        }
    }

    pub fn entries(&self) -> &[LandCoverEntry] {
        &self.entries
    }
}

impl LandCoverClassifier for LandCoverTable {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn land_covers(&self) -> Vec<(i32, String)> {
        self.entries
            .iter()
            .map(|entry| (entry.value, entry.name.clone()))
            .collect()
    }

    fn color(&self, value: i32) -> Option<[i32; 3]> {
        self.entries
            .iter()
            .find(|entry| entry.value == value)
            .map(LandCoverEntry::color)
    }
}
