use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Enumerated remote-access surface
// ---------------------------------------------------------------------------

/// Storage location a remote file is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Tape,
    Disk,
    Scratch,
    Nersc,
}

/// URL schema used when assembling the remote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlSchema {
    Root,
    Http,
    Path,
    Dcap,
    #[serde(rename = "samFile")]
    SamFile,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Tape => "tape",
            Location::Disk => "disk",
            Location::Scratch => "scratch",
            Location::Nersc => "nersc",
        }
    }

    /// Dataset root this location serves files under.
    fn base_path(self) -> &'static str {
        match self {
            Location::Tape => "/pnfs/tape",
            Location::Disk => "/pnfs/persistent",
            Location::Scratch => "/pnfs/scratch",
            Location::Nersc => "/global/cfs/cdirs",
        }
    }

    /// Whether this location can serve the given schema. The nersc archive
    /// has no dCache doors, so only plain paths and https work there.
    pub fn supports(self, schema: UrlSchema) -> bool {
        match self {
            Location::Nersc => matches!(schema, UrlSchema::Http | UrlSchema::Path),
            _ => true,
        }
    }
}

impl UrlSchema {
    pub fn as_str(self) -> &'static str {
        match self {
            UrlSchema::Root => "root",
            UrlSchema::Http => "http",
            UrlSchema::Path => "path",
            UrlSchema::Dcap => "dcap",
            UrlSchema::SamFile => "samFile",
        }
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tape" => Ok(Location::Tape),
            "disk" => Ok(Location::Disk),
            "scratch" => Ok(Location::Scratch),
            "nersc" => Ok(Location::Nersc),
            other => Err(Error::Schema(format!(
                "unknown location '{other}', expected one of tape, disk, scratch, nersc"
            ))),
        }
    }
}

impl FromStr for UrlSchema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root" => Ok(UrlSchema::Root),
            "http" => Ok(UrlSchema::Http),
            "path" => Ok(UrlSchema::Path),
            "dcap" => Ok(UrlSchema::Dcap),
            "samFile" => Ok(UrlSchema::SamFile),
            other => Err(Error::Schema(format!(
                "unknown schema '{other}', expected one of root, http, path, dcap, samFile"
            ))),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UrlSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RemoteConfig – how remote URLs are assembled
// ---------------------------------------------------------------------------

/// Configuration for remote locator assembly.
///
/// The location/schema pair is validated when a locator is built, before any
/// I/O; the door hosts only matter for the URL text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub location: Location,
    pub schema: UrlSchema,
    /// Host:port of the xrootd door.
    pub xroot_door: String,
    /// Host:port of the WebDAV door.
    pub http_door: String,
    /// Host:port of the dcap door.
    pub dcap_door: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            location: Location::Tape,
            schema: UrlSchema::Root,
            xroot_door: "fndca1.fnal.gov:1094".to_string(),
            http_door: "fndcadoor.fnal.gov:2880".to_string(),
            dcap_door: "fndca1.fnal.gov:24125".to_string(),
        }
    }
}

impl RemoteConfig {
    /// Fail fast on a location/schema pair we cannot assemble a URL for.
    pub fn validate(&self) -> Result<()> {
        if !self.location.supports(self.schema) {
            return Err(Error::Schema(format!(
                "location '{}' does not support schema '{}'",
                self.location, self.schema
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileLocator – resolved reference to one physical file
// ---------------------------------------------------------------------------

/// A resolved, schema-qualified reference to one physical file. Immutable
/// once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocator {
    url: String,
}

impl FileLocator {
    /// Locator for a local filesystem path, used verbatim.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        FileLocator {
            url: path.into().display().to_string(),
        }
    }

    /// Assemble a remote locator from a bare file name and the remote
    /// configuration. Pure string assembly: no catalog lookup, no I/O.
    ///
    /// The file name must follow the dataset naming convention
    /// `tier.owner.description.configuration.sequencer.format`; its dataset
    /// fields plus two SHA-256 spreader directories determine the path.
    pub fn remote(file_name: &str, config: &RemoteConfig) -> Result<Self> {
        config.validate()?;

        let fields: Vec<&str> = file_name.split('.').collect();
        if fields.len() != 6 || fields.iter().any(|f| f.is_empty()) {
            return Err(Error::unavailable(
                file_name,
                "malformed file name, expected 'tier.owner.description.configuration.sequencer.format'",
            ));
        }
        let (tier, owner, description, configuration, format) =
            (fields[0], fields[1], fields[2], fields[3], fields[5]);

        let digest = Sha256::digest(file_name.as_bytes());
        let spread = hex::encode(&digest[..2]);
        let path = format!(
            "{base}/{tier}/{owner}/{description}/{configuration}/{format}/{}/{}/{file_name}",
            &spread[..2],
            &spread[2..],
            base = config.location.base_path(),
        );

        let url = match config.schema {
            UrlSchema::Path => path,
            UrlSchema::Root => format!("xroot://{}/{}", config.xroot_door, path),
            UrlSchema::Http => format!("https://{}{}", config.http_door, path),
            UrlSchema::Dcap => format!("dcap://{}{}", config.dcap_door, path),
            UrlSchema::SamFile => format!("sam://{file_name}"),
        };
        Ok(FileLocator { url })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The local filesystem path behind this locator, if it has one. Plain
    /// paths (local files, mounted `path`-schema URLs) qualify; network
    /// schemes do not.
    pub fn filesystem_path(&self) -> Option<&Path> {
        if self.url.contains("://") {
            None
        } else {
            Some(Path::new(&self.url))
        }
    }
}

impl fmt::Display for FileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "nts.mu2e.CeEndpoint.MDC2020az_v1.001210_00000699.root";

    #[test]
    fn unknown_names_fail_to_parse() {
        assert!(matches!("cloud".parse::<Location>(), Err(Error::Schema(_))));
        assert!(matches!("ftp".parse::<UrlSchema>(), Err(Error::Schema(_))));
    }

    #[test]
    fn unsupported_pair_fails_before_any_io() {
        let config = RemoteConfig {
            location: Location::Nersc,
            schema: UrlSchema::Root,
            ..RemoteConfig::default()
        };
        // Pure string assembly: the error proves nothing was opened.
        assert!(matches!(
            FileLocator::remote(NAME, &config),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn assembly_is_deterministic() {
        let config = RemoteConfig::default();
        let a = FileLocator::remote(NAME, &config).unwrap();
        let b = FileLocator::remote(NAME, &config).unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("xroot://fndca1.fnal.gov:1094//pnfs/tape/"));
        assert!(a.as_str().ends_with(NAME));
    }

    #[test]
    fn path_schema_yields_filesystem_path() {
        let config = RemoteConfig {
            schema: UrlSchema::Path,
            ..RemoteConfig::default()
        };
        let locator = FileLocator::remote(NAME, &config).unwrap();
        let path = locator.filesystem_path().expect("plain path");
        assert!(path.starts_with("/pnfs/tape/nts/mu2e"));
    }

    #[test]
    fn malformed_name_is_resource_unavailable() {
        let config = RemoteConfig::default();
        assert!(matches!(
            FileLocator::remote("not-a-dataset-file", &config),
            Err(Error::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn local_locator_is_verbatim() {
        let locator = FileLocator::local("/data/events.parquet");
        assert_eq!(locator.as_str(), "/data/events.parquet");
        assert!(locator.filesystem_path().is_some());
    }
}
