use std::path::{Path, PathBuf};

/// File layout and durability settings shared by [`MeshArchive`](crate::MeshArchive) and
/// [`ShadeArchive`](crate::ShadeArchive).
///
/// ```
/// let config = tin_archive::ArchiveConfig::default()
///     .data_extension("bin")
///     .durable(true);
///
/// assert_eq!(config.data_file(std::path::Path::new("/tmp"), "m1"), std::path::Path::new("/tmp/m1.bin"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    pub data_extension: String,
    pub metadata_extension: String,
    /// `fsync` staged files before they are renamed into place
    pub durable: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            data_extension: "tbc".into(),
            metadata_extension: "xmf".into(),
            durable: false,
        }
    }
}

impl ArchiveConfig {
    pub fn data_extension<T: Into<String>>(mut self, extension: T) -> Self {
        self.data_extension = extension.into();
        self
    }

    pub fn metadata_extension<T: Into<String>>(mut self, extension: T) -> Self {
        self.metadata_extension = extension.into();
        self
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// name of the binary container for `uid`, relative to the archive directory
    pub fn data_file_name(&self, uid: &str) -> String {
        format!("{uid}.{}", self.data_extension)
    }

    pub fn data_file(&self, dir: &Path, uid: &str) -> PathBuf {
        dir.join(self.data_file_name(uid))
    }

    pub fn metadata_file(&self, dir: &Path, uid: &str) -> PathBuf {
        dir.join(format!("{uid}.{}", self.metadata_extension))
    }

    /// the uid of a directory entry if it is a binary container
    pub(crate) fn uid_of_data_file<'a>(&self, path: &'a Path) -> Option<&'a str> {
        let extension = path.extension()?.to_str()?;
        if extension != self.data_extension {
            return None;
        }
        path.file_stem()?.to_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_files_are_recognized_by_extension() {
        let config = ArchiveConfig::default();

        assert_eq!(config.uid_of_data_file(Path::new("/a/m1.tbc")), Some("m1"));
        assert_eq!(config.uid_of_data_file(Path::new("/a/m1.xmf")), None);
        assert_eq!(config.uid_of_data_file(Path::new("/a/.m1.tbc.tmp")), None);
        assert_eq!(config.uid_of_data_file(Path::new("/a/noext")), None);
    }
}
