use crate::commit::{self, Mode};
use crate::container::{ContainerReader, ContainerWriter, ROOT};
use crate::field::{self, FaceFields, FieldData, COVER_COLOR, COVER_TYPE, FACE_FIELDS_GROUP};
use crate::land_cover::{LandCoverClassifier, LandCoverInfo};
use crate::utils::{check_uid, format_float, now_timestamp};
use crate::xdmf::{self, Document, Element};
use crate::{ArchiveConfig, Error, Geometry, NumberType, Result};

use ndarray::Array2;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

const TIN_GROUP: &str = "/tin";
const POINTS: &str = "/tin/points";
const FACES: &str = "/tin/faces";
const TIMESTAMP: &str = "timestamp";
const PROJECTION: &str = "projection";

#[derive(Debug, Clone, PartialEq)]
/// Summary of an archive entry, gathered from the container's record headers
pub struct MeshInfo {
    /// creation time, in seconds since the unix epoch
    pub timestamp: f64,
    pub tin: TinInfo,
    pub land_cover: Option<LandCoverInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TinInfo {
    pub projection: String,
    pub num_points: usize,
    pub num_faces: usize,
    /// shape of every stored face field
    pub face_fields: BTreeMap<String, Vec<usize>>,
}

#[derive(Debug, Clone)]
/// A directory of triangulated meshes, each stored as a binary container plus a metadata
/// document sharing the entry's uid as file stem.
pub struct MeshArchive {
    path: PathBuf,
    config: ArchiveConfig,
}

impl MeshArchive {
    /// open the archive at `path` with the default file layout, creating the directory if needed
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        Self::with_config(path, ArchiveConfig::default())
    }

    pub fn with_config<P: Into<PathBuf>>(path: P, config: ArchiveConfig) -> Result<Self> {
        let path = path.into();
        if path.exists() && !path.is_dir() {
            return Err(Error::NotADirectory(path));
        }
        fs::create_dir_all(&path)?;

        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn data_file(&self, uid: &str) -> PathBuf {
        self.config.data_file(&self.path, uid)
    }

    pub fn metadata_file(&self, uid: &str) -> PathBuf {
        self.config.metadata_file(&self.path, uid)
    }

    /// Store `geometry` as a new entry.
    ///
    /// With a `classifier` the entry gets a land cover palette. When `face_fields` holds a
    /// [`COVER_TYPE`] field the palette only lists the classes that occur among the faces.
    ///
    /// The binary container marks an entry as present. A metadata document without one is
    /// what an interrupted save leaves behind, and it is replaced.
    #[tracing::instrument(skip(self, geometry, classifier, face_fields), fields(dir = %self.path.display()))]
    pub fn save(
        &self,
        uid: &str,
        geometry: &Geometry,
        classifier: Option<&dyn LandCoverClassifier>,
        face_fields: Option<&FaceFields>,
    ) -> Result<()> {
        check_uid(uid)?;

        let data_path = self.data_file(uid);
        let metadata_path = self.metadata_file(uid);
        if data_path.exists() {
            return Err(Error::AlreadyExists { uid: uid.into() });
        }

        geometry.validate()?;

        let empty = FaceFields::new();
        let face_fields = face_fields.unwrap_or(&empty);

        let num_faces = geometry.num_faces();
        for (name, field) in face_fields {
            let rows = field.data().rows();
            if rows != num_faces {
                return Err(Error::FieldRows {
                    field: name.clone(),
                    rows,
                    faces: num_faces,
                });
            }
        }

        // reserved fields must read back the way read and extract expect them
        if let Some(field) = face_fields.get(COVER_COLOR) {
            field.data().to_rgb_rows(COVER_COLOR)?;
        }
        let cover_types = match face_fields.get(COVER_TYPE) {
            Some(field) => Some(field.data().to_int_rows(COVER_TYPE)?),
            None => None,
        };

        let land_cover = match classifier {
            Some(classifier) => Some(LandCoverInfo::from_classifier(
                classifier,
                cover_types.as_deref(),
            )?),
            None => None,
        };

        let timestamp = now_timestamp();

        let mut container = ContainerWriter::new(commit::stage(&self.path, uid)?)?;
        write_container(&mut container, timestamp, geometry, face_fields, land_cover.as_ref())?;
        let document = self.document(
            uid,
            timestamp,
            geometry,
            face_fields,
            land_cover.as_ref(),
            &container,
        )?;
        let data = commit::seal(container.into_inner(), self.config.durable)?;

        let mut writer = commit::stage(&self.path, uid)?;
        document.write(&mut writer)?;
        let metadata = commit::seal(writer, self.config.durable)?;

        if metadata_path.is_file() {
            tracing::warn!(uid, path = %metadata_path.display(), "replacing metadata without a container");
            fs::remove_file(&metadata_path)?;
        }

        commit::commit(uid, metadata, &metadata_path, data, &data_path, Mode::NoClobber)?;

        tracing::info!(
            uid,
            num_points = geometry.num_points(),
            num_faces,
            num_fields = face_fields.len(),
            "saved mesh"
        );

        Ok(())
    }

    /// Load the points, faces and projection of an entry, along with its per-face colors if
    /// it has a [`COVER_COLOR`] field.
    #[tracing::instrument(skip(self), fields(dir = %self.path.display()))]
    pub fn read(&self, uid: &str) -> Result<Geometry> {
        let mut reader = self.open_container(uid)?;
        let geometry = read_geometry(&mut reader)?;

        let color_path = field::field_path(COVER_COLOR);
        if !reader.is_dataset(&color_path) {
            return Ok(geometry);
        }

        let colors = FieldData::read_from(&mut reader, &color_path)?.to_rgb_rows(COVER_COLOR)?;
        Ok(geometry.with_colors(Array2::from(colors))?)
    }

    /// The sub-mesh made of every face classified as `face_id`.
    ///
    /// The result is colored with the color of the first matching face.
    #[tracing::instrument(skip(self), fields(dir = %self.path.display()))]
    pub fn extract(&self, uid: &str, face_id: i32) -> Result<Geometry> {
        let mut reader = self.open_container(uid)?;

        let type_path = field::field_path(COVER_TYPE);
        let color_path = field::field_path(COVER_COLOR);
        for (name, path) in [(COVER_TYPE, &type_path), (COVER_COLOR, &color_path)] {
            if !reader.is_dataset(path) {
                return Err(Error::MissingField {
                    uid: uid.into(),
                    field: name.into(),
                });
            }
        }

        let geometry = read_geometry(&mut reader)?;
        let cover_types = FieldData::read_from(&mut reader, &type_path)?.to_int_rows(COVER_TYPE)?;

        let indices: Vec<usize> = cover_types
            .iter()
            .enumerate()
            .filter(|(_, cover_type)| **cover_type == face_id)
            .map(|(idx, _)| idx)
            .collect();

        let first = match indices.first() {
            Some(first) => *first,
            None => {
                return Err(Error::EmptyResult {
                    uid: uid.into(),
                    face_id,
                })
            }
        };

        let colors = FieldData::read_from(&mut reader, &color_path)?.to_rgb_rows(COVER_COLOR)?;
        let base_color = colors.get(first).copied().ok_or_else(|| Error::FieldRows {
            field: COVER_COLOR.into(),
            rows: colors.len(),
            faces: geometry.num_faces(),
        })?;

        let sub_mesh = geometry.extract_sub_mesh(&indices)?.with_base_color(base_color);

        tracing::debug!(uid, face_id, num_faces = sub_mesh.num_faces(), "extracted sub-mesh");

        Ok(sub_mesh)
    }

    /// Describe an entry without reading its point or face arrays.
    pub fn info(&self, uid: &str) -> Result<MeshInfo> {
        let mut reader = self.open_container(uid)?;

        let timestamp = reader.require_f64(ROOT, TIMESTAMP)?;
        let projection = reader.require_str(POINTS, PROJECTION)?.to_string();
        let num_points = leading_dim(&reader, POINTS)?;
        let num_faces = leading_dim(&reader, FACES)?;

        let mut face_fields = BTreeMap::new();
        if reader.is_group(FACE_FIELDS_GROUP) {
            for name in reader.children(FACE_FIELDS_GROUP) {
                let shape = reader.dataset(&field::field_path(name))?.shape.clone();
                face_fields.insert(name.to_string(), shape);
            }
        }

        let land_cover = LandCoverInfo::read_from(&mut reader)?;

        Ok(MeshInfo {
            timestamp,
            tin: TinInfo {
                projection,
                num_points,
                num_faces,
                face_fields,
            },
            land_cover,
        })
    }

    /// Every entry of the archive, by uid.
    pub fn content(&self) -> Result<BTreeMap<String, MeshInfo>> {
        let mut content = BTreeMap::new();

        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(uid) = self.config.uid_of_data_file(&path) {
                content.insert(uid.to_string(), self.info(uid)?);
            }
        }

        Ok(content)
    }

    /// Remove an entry. Unknown and invalid uids are ignored.
    ///
    /// A metadata document left without its container is removed as well.
    #[tracing::instrument(skip(self), fields(dir = %self.path.display()))]
    pub fn delete(&self, uid: &str) -> Result<()> {
        if check_uid(uid).is_err() {
            tracing::debug!(uid, "invalid uid names no entry");
            return Ok(());
        }

        let data_path = self.data_file(uid);
        if !data_path.is_file() {
            let metadata_path = self.metadata_file(uid);
            if metadata_path.is_file() {
                fs::remove_file(&metadata_path)?;
                tracing::warn!(uid, "removed metadata without a container");
            } else {
                tracing::debug!(uid, "nothing to delete");
            }
            return Ok(());
        }

        // the container goes first so the entry disappears before its metadata does
        fs::remove_file(&data_path)?;
        match fs::remove_file(self.metadata_file(uid)) {
            Ok(()) => (),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(uid, "entry had no metadata document");
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(uid, "deleted mesh");

        Ok(())
    }

    fn open_container(&self, uid: &str) -> Result<ContainerReader<BufReader<File>>> {
        check_uid(uid)?;

        let data_path = self.data_file(uid);
        if !data_path.is_file() {
            return Err(Error::NotFound {
                uid: uid.into(),
                path: self.path.clone(),
            });
        }

        Ok(ContainerReader::open(&data_path)?)
    }

    /// the metadata document mirroring the layout of the freshly written `container`
    fn document<W: Write>(
        &self,
        uid: &str,
        timestamp: f64,
        geometry: &Geometry,
        face_fields: &FaceFields,
        land_cover: Option<&LandCoverInfo>,
        container: &ContainerWriter<W>,
    ) -> Result<Document> {
        let file = self.config.data_file_name(uid);

        let points = xdmf::data_item(
            &file,
            POINTS,
            container.payload_offset(POINTS)?,
            NumberType::Float,
            geometry.points.shape(),
        );

        let faces = xdmf::data_item(
            &file,
            FACES,
            container.payload_offset(FACES)?,
            NumberType::Int,
            geometry.faces.shape(),
        );

        let mut grid = Element::new("Grid")
            .with_attribute("Name", "tin")
            .with_child(
                Element::new("Geometry")
                    .with_attribute("GeometryType", "XYZ")
                    .with_child(points)
                    .with_child(xdmf::information(PROJECTION, geometry.projection.as_str())),
            )
            .with_child(
                Element::new("Topology")
                    .with_attribute("TopologyType", "Triangle")
                    .with_attribute("NumberOfElements", geometry.num_faces().to_string())
                    .with_child(faces),
            );

        for (name, field) in face_fields {
            let path = field::field_path(name);
            let item = xdmf::data_item(
                &file,
                &path,
                container.payload_offset(&path)?,
                field.data().number_type(),
                field.data().shape(),
            );
            grid.push(xdmf::cell_attribute(name, field.attribute_type(), item));
        }

        let mut document = xdmf::xdmf_document(Element::new("Domain").with_child(grid));
        document
            .root
            .push(xdmf::information(TIMESTAMP, format_float(timestamp)));

        if let Some(land_cover) = land_cover {
            let mut block = xdmf::information(
                crate::land_cover::LAND_COVER_TYPE,
                land_cover.land_cover_type.as_str(),
            );
            for entry in &land_cover.land_covers {
                let [red, green, blue] = entry.color();
                block.push(
                    xdmf::information("land_cover", entry.value.to_string())
                        .with_attribute("Label", entry.name.as_str())
                        .with_attribute("Color", format!("{red} {green} {blue}")),
                );
            }
            document.root.push(block);
        }

        xdmf::indent(&mut document.root, 0);
        Ok(document)
    }
}

fn write_container<W: Write>(
    container: &mut ContainerWriter<W>,
    timestamp: f64,
    geometry: &Geometry,
    face_fields: &FaceFields,
    land_cover: Option<&LandCoverInfo>,
) -> Result<()> {
    container.set_attribute(ROOT, TIMESTAMP, timestamp)?;

    container.create_group(TIN_GROUP)?;
    container.write_array(POINTS, &geometry.points)?;
    container.set_attribute(POINTS, PROJECTION, geometry.projection.as_str())?;
    container.write_array(FACES, &geometry.faces)?;

    if !face_fields.is_empty() {
        container.create_group(FACE_FIELDS_GROUP)?;
        for (name, field) in face_fields {
            field.write_to(container, &field::field_path(name))?;
        }
    }

    if let Some(land_cover) = land_cover {
        land_cover.write_to(container)?;
    }

    container.flush()?;

    Ok(())
}

fn read_geometry<R: Read + Seek>(reader: &mut ContainerReader<R>) -> Result<Geometry> {
    let projection = reader.require_str(POINTS, PROJECTION)?.to_string();
    let points = reader.read_2d::<f64>(POINTS)?;
    let faces = reader.read_2d::<i32>(FACES)?;

    Ok(Geometry::new(points, faces, projection)?)
}

fn leading_dim<R: Read + Seek>(reader: &ContainerReader<R>, path: &str) -> Result<usize> {
    let shape = &reader.dataset(path)?.shape;
    Ok(shape.first().copied().unwrap_or(0))
}
