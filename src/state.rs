use crate::hasher::ContentDigest;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A planned copy of one canonical source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAssignment {
    #[serde(with = "raw_path::single")]
    pub source: PathBuf,
    #[serde(with = "raw_path::single")]
    pub destination: PathBuf,
}

/// Target subdirectory (e.g. `2021/images`) to the assignments filed under it.
pub type Plan = BTreeMap<String, Vec<TargetAssignment>>;

/// Resumable working set for one input set.
///
/// Every phase consumes a state and hands back the next snapshot; the
/// checkpoint store only ever sees a snapshot by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Paths fingerprinted in this or any earlier run.
    #[serde(with = "raw_path::set")]
    pub processed_paths: BTreeSet<PathBuf>,
    /// Digest to the first path seen with that content.
    #[serde(with = "raw_path::by_digest")]
    pub digest_to_first_path: BTreeMap<ContentDigest, PathBuf>,
    /// Canonical paths in first-seen order, one per digest.
    #[serde(with = "raw_path::list")]
    pub surviving_paths: Vec<PathBuf>,
    pub target_directories: BTreeSet<String>,
    pub plan: Plan,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSummary {
    pub processed: usize,
    pub surviving: usize,
    pub target_directories: usize,
    pub planned_files: usize,
    pub complete: bool,
}

impl EngineState {
    pub fn is_processed(&self, path: &Path) -> bool {
        self.processed_paths.contains(path)
    }

    pub fn planned_files(&self) -> usize {
        self.plan.values().map(Vec::len).sum()
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            processed: self.processed_paths.len(),
            surviving: self.surviving_paths.len(),
            target_directories: self.target_directories.len(),
            planned_files: self.planned_files(),
            complete: self.complete,
        }
    }

    /// Iterate every assignment, subdirectories in sorted order.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &TargetAssignment)> {
        self.plan
            .iter()
            .flat_map(|(dir, items)| items.iter().map(move |item| (dir.as_str(), item)))
    }
}

/// Serde adapters that persist paths as raw OS bytes, so file names that
/// are not valid UTF-8 survive a checkpoint round trip.
mod raw_path {
    use crate::hasher::ContentDigest;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};

    #[cfg(unix)]
    fn encode(path: &Path) -> Result<&[u8], String> {
        use std::os::unix::ffi::OsStrExt;
        Ok(path.as_os_str().as_bytes())
    }

    #[cfg(not(unix))]
    fn encode(path: &Path) -> Result<&[u8], String> {
        path.to_str()
            .map(str::as_bytes)
            .ok_or_else(|| format!("path {} is not valid Unicode", path.display()))
    }

    #[cfg(unix)]
    fn decode(bytes: Vec<u8>) -> Result<PathBuf, String> {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;
        Ok(PathBuf::from(OsString::from_vec(bytes)))
    }

    #[cfg(not(unix))]
    fn decode(bytes: Vec<u8>) -> Result<PathBuf, String> {
        String::from_utf8(bytes)
            .map(PathBuf::from)
            .map_err(|e| e.to_string())
    }

    struct Encoded<'a>(&'a Path);

    impl Serialize for Encoded<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            encode(self.0)
                .map_err(S::Error::custom)?
                .serialize(serializer)
        }
    }

    struct Decoded(PathBuf);

    impl<'de> Deserialize<'de> for Decoded {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            decode(bytes).map(Decoded).map_err(D::Error::custom)
        }
    }

    pub mod single {
        use super::*;

        pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
            Encoded(path).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
            Ok(Decoded::deserialize(deserializer)?.0)
        }
    }

    pub mod set {
        use super::*;

        pub fn serialize<S: Serializer>(
            paths: &BTreeSet<PathBuf>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(paths.iter().map(|p| Encoded(p)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<BTreeSet<PathBuf>, D::Error> {
            let items = Vec::<Decoded>::deserialize(deserializer)?;
            Ok(items.into_iter().map(|d| d.0).collect())
        }
    }

    pub mod list {
        use super::*;

        pub fn serialize<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(paths.iter().map(|p| Encoded(p)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<PathBuf>, D::Error> {
            let items = Vec::<Decoded>::deserialize(deserializer)?;
            Ok(items.into_iter().map(|d| d.0).collect())
        }
    }

    pub mod by_digest {
        use super::*;

        pub fn serialize<S: Serializer>(
            map: &BTreeMap<ContentDigest, PathBuf>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_map(map.iter().map(|(digest, path)| (digest, Encoded(path))))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<BTreeMap<ContentDigest, PathBuf>, D::Error> {
            let items = BTreeMap::<ContentDigest, Decoded>::deserialize(deserializer)?;
            Ok(items.into_iter().map(|(digest, d)| (digest, d.0)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut state = EngineState::default();
        state.processed_paths.insert(PathBuf::from("/src/a.txt"));
        state.processed_paths.insert(PathBuf::from("/src/b.txt"));
        state.surviving_paths.push(PathBuf::from("/src/a.txt"));
        state.target_directories.insert("2021/text".to_string());
        state.plan.insert(
            "2021/text".to_string(),
            vec![TargetAssignment {
                source: PathBuf::from("/src/a.txt"),
                destination: PathBuf::from("/dst/2021/text/a.txt"),
            }],
        );

        let summary = state.summary();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.surviving, 1);
        assert_eq!(summary.target_directories, 1);
        assert_eq!(summary.planned_files, 1);
        assert!(!summary.complete);
        assert_eq!(state.assignments().count(), 1);
    }
}
