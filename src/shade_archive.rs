//! Time series of per-face values attached to an archived mesh.
//!
//! A shade entry is written in one [`ShadeWriter`] session. Opening the session takes the
//! metadata document of the parent mesh as a template; every saved sample becomes one grid of
//! a temporal collection, pointing at one dataset of the shade container.

use crate::commit::{self, Mode};
use crate::container::{self, ContainerReader, ContainerWriter, ROOT};
use crate::field::AttributeType;
use crate::utils::{check_uid, timestamp_key};
use crate::xdmf::{self, error as document_error, Document, Element};
use crate::{ArchiveConfig, Error, MeshArchive, Numeric, Result};

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const COLLECTION_NAME: &str = "shadow_times";
const SHADE: &str = "shade";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadeInfo {
    /// uid of the mesh the samples belong to
    pub tin_uid: String,
    /// sample keys, sorted as strings
    pub timestamps: Vec<String>,
}

#[derive(Debug, Clone)]
/// A directory of shade entries.
pub struct ShadeArchive {
    path: PathBuf,
    config: ArchiveConfig,
}

impl ShadeArchive {
    /// use the existing directory at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        Self::with_config(path, ArchiveConfig::default())
    }

    pub fn with_config<P: Into<PathBuf>>(path: P, config: ArchiveConfig) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(Error::NotADirectory(path));
        }
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

    /// Start a writer session for `shade_uid`, bound to entry `tin_uid` of `tin_archive`.
    ///
    /// Without `overwrite`, existing files for `shade_uid` are an error. All checks happen
    /// before anything on disk is changed.
    #[tracing::instrument(skip(self, tin_archive), fields(dir = %self.path.display()))]
    pub fn open<'a>(
        &'a self,
        shade_uid: &str,
        tin_archive: &MeshArchive,
        tin_uid: &str,
        overwrite: bool,
    ) -> Result<ShadeWriter<'a>> {
        check_uid(shade_uid)?;
        check_uid(tin_uid)?;

        let data_path = self.data_file(shade_uid);
        let metadata_path = self.metadata_file(shade_uid);
        let existing = data_path.exists() || metadata_path.exists();
        if existing && !overwrite {
            return Err(Error::AlreadyExists {
                uid: shade_uid.into(),
            });
        }

        let template_path = tin_archive.metadata_file(tin_uid);
        if !template_path.is_file() {
            return Err(Error::NotFound {
                uid: tin_uid.into(),
                path: tin_archive.path().to_path_buf(),
            });
        }

        let mut document = Document::from_path(&template_path)?;
        let tin_dir = fs::canonicalize(tin_archive.path())?;

        let grid = document.root.require_path_mut(xdmf::GRID)?;
        for item in [xdmf::GEOMETRY_ITEM, xdmf::TOPOLOGY_ITEM] {
            let item = grid.require_path_mut(item)?;
            let file = tin_dir.join(item.trimmed_text()).display().to_string();
            item.text = Some(file);
        }

        let num_faces = number_of_elements(grid.require_path(xdmf::TOPOLOGY)?)?;

        let mut template = grid.clone();
        template.retain_children(|child| child.name != "Attribute");

        let domain = document.root.require_path_mut("Domain")?;
        domain.retain_children(|child| child.name != "Grid");
        domain.push(
            Element::new("Grid")
                .with_attribute("Name", COLLECTION_NAME)
                .with_attribute("GridType", "Collection")
                .with_attribute("CollectionType", "Temporal"),
        );

        let data_file = fs::canonicalize(&self.path)?
            .join(self.config.data_file_name(shade_uid))
            .display()
            .to_string();

        if existing {
            remove_if_present(&data_path)?;
            remove_if_present(&metadata_path)?;
            tracing::debug!(shade_uid, "removed previous shade entry");
        }

        let tin_group = container::join(ROOT, tin_uid);
        let mut container = ContainerWriter::new(commit::stage(&self.path, shade_uid)?)?;
        container.create_group(&tin_group)?;

        tracing::info!(shade_uid, tin_uid, num_faces, "opened shade session");

        Ok(ShadeWriter {
            archive: self,
            uid: shade_uid.into(),
            tin_uid: tin_uid.into(),
            tin_group,
            data_file,
            num_faces,
            template,
            session: Some(Session {
                document,
                container,
                keys: BTreeSet::new(),
            }),
        })
    }

    /// The parent mesh and sample keys of a shade entry, or `None` if either file is missing.
    pub fn info(&self, uid: &str) -> Result<Option<ShadeInfo>> {
        check_uid(uid)?;
        if !self.data_file(uid).is_file() || !self.metadata_file(uid).is_file() {
            return Ok(None);
        }

        let reader = ContainerReader::open(&self.data_file(uid))?;
        let tin_uid = tin_group_name(&reader)?;

        let mut timestamps: Vec<String> = reader
            .children(&container::join(ROOT, &tin_uid))
            .into_iter()
            .map(String::from)
            .collect();
        timestamps.sort();

        Ok(Some(ShadeInfo {
            tin_uid,
            timestamps,
        }))
    }

    /// Load the sample stored for `timestamp`.
    pub fn read<T: Numeric>(&self, uid: &str, timestamp: f64) -> Result<Vec<T>> {
        check_uid(uid)?;
        if !self.data_file(uid).is_file() || !self.metadata_file(uid).is_file() {
            return Err(Error::NotFound {
                uid: uid.into(),
                path: self.path.clone(),
            });
        }

        let mut reader = ContainerReader::open(&self.data_file(uid))?;
        let tin_uid = tin_group_name(&reader)?;

        let key = timestamp_key(timestamp);
        let path = container::join(&container::join(ROOT, &tin_uid), &key);
        if !reader.is_dataset(&path) {
            return Err(Error::MissingSample {
                uid: uid.into(),
                key,
            });
        }

        Ok(reader.read::<T>(&path)?.into_raw_vec())
    }
}

struct Session {
    document: Document,
    container: ContainerWriter<BufWriter<NamedTempFile>>,
    keys: BTreeSet<String>,
}

/// An open shade entry that accepts samples until it is closed.
///
/// Nothing is visible in the archive until the session ends. [`ShadeWriter::close`] finalizes
/// the entry and reports failures; dropping the writer finalizes it too, logging failures
/// instead.
pub struct ShadeWriter<'a> {
    archive: &'a ShadeArchive,
    uid: String,
    tin_uid: String,
    tin_group: String,
    /// absolute path of the final container, as referenced from the document
    data_file: String,
    num_faces: usize,
    /// the parent grid without its face attributes
    template: Element,
    session: Option<Session>,
}

impl<'a> ShadeWriter<'a> {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn tin_uid(&self) -> &str {
        &self.tin_uid
    }

    /// number of values every sample must have
    pub fn num_faces(&self) -> usize {
        self.num_faces
    }

    /// Append the sample for `timestamp`, one value per face of the parent mesh.
    pub fn save<T: Numeric>(&mut self, timestamp: f64, data: &[T]) -> Result<()> {
        if data.len() != self.num_faces {
            return Err(Error::ShapeMismatch {
                expected: self.num_faces,
                actual: data.len(),
            });
        }

        let session = self.session.as_mut().ok_or_else(|| Error::SessionClosed {
            uid: self.uid.clone(),
        })?;

        let key = timestamp_key(timestamp);
        if session.keys.contains(&key) {
            return Err(Error::DuplicateTimestamp { key });
        }

        let path = container::join(&self.tin_group, &key);
        session.container.write_dataset(&path, &[data.len()], data)?;
        let seek = session.container.payload_offset(&path)?;

        let item = xdmf::data_item(
            &self.data_file,
            &path,
            seek,
            T::number_type(),
            &[self.num_faces],
        );

        let mut grid = self.template.clone();
        grid.push(Element::new("Time").with_attribute("Value", key.as_str()));
        grid.push(xdmf::cell_attribute(SHADE, AttributeType::Scalar, item));

        session
            .document
            .root
            .require_path_mut(xdmf::GRID)?
            .push(grid);

        tracing::debug!(uid = %self.uid, key = %key, "saved shade sample");
        session.keys.insert(key);

        Ok(())
    }

    /// Finalize the entry: write the document and move both files into place.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => return Ok(()),
        };

        let durable = self.archive.config.durable;
        let dir = &self.archive.path;

        xdmf::indent(&mut session.document.root, 0);

        let data = commit::seal(session.container.into_inner(), durable)?;

        let mut writer = commit::stage(dir, &self.uid)?;
        session.document.write(&mut writer)?;
        let metadata = commit::seal(writer, durable)?;

        commit::commit(
            &self.uid,
            metadata,
            &self.archive.metadata_file(&self.uid),
            data,
            &self.archive.data_file(&self.uid),
            Mode::Replace,
        )?;

        tracing::info!(
            uid = %self.uid,
            tin_uid = %self.tin_uid,
            samples = session.keys.len(),
            "closed shade session"
        );

        Ok(())
    }
}

impl<'a> Drop for ShadeWriter<'a> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::error!(uid = %self.uid, error = %err, "failed to finalize shade session");
        }
    }
}

fn number_of_elements(topology: &Element) -> Result<usize> {
    let value = topology.require_attribute("NumberOfElements")?;
    value.trim().parse().map_err(|_| {
        let err = document_error::InvalidAttributeValue::new(
            topology.name.clone(),
            "NumberOfElements".into(),
            value.into(),
        );
        Error::Document(err.into())
    })
}

/// the first top level group of a shade container is named after the parent mesh
fn tin_group_name(reader: &ContainerReader<BufReader<File>>) -> Result<String> {
    let name = reader.children(ROOT).into_iter().find(|name| {
        reader.is_group(&container::join(ROOT, name))
    });

    match name {
        Some(name) => Ok(name.to_string()),
        None => {
            let err = container::error::MissingObject::new("group", "/<tin uid>".into());
            Err(Error::Container(err.into()))
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
