//! Frame sources: indexed access to per-timestamp image stacks.
//!
//! A frame is one timestamp's fixed set of co-registered image products.
//! The session only needs indexed, grouped access and a length query, so the
//! contract is a small trait; `FolderFrameSource` implements it over a flat
//! image directory whose file names follow a configurable mask.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Display format for frame timestamps (also the store/export key format).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Indexed access to time-ordered frames.
pub trait FrameSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of frame `index`, formatted with [`TIMESTAMP_FORMAT`].
    fn timestamp(&self, index: usize) -> Option<String>;

    /// Ordered product names of frame `index`.
    fn products(&self, index: usize) -> Option<Vec<String>>;
}

/// Step a frame index by `step`, wrapping modulo `len` (cyclic navigation).
pub fn wrap_index(current: usize, step: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as i64 + step).rem_euclid(len as i64) as usize
}

/// In-memory frame source, the seam for tests and external dataloaders.
#[derive(Clone, Debug, Default)]
pub struct MemoryFrameSource {
    frames: Vec<(String, Vec<String>)>,
}

impl MemoryFrameSource {
    pub fn new(frames: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn timestamp(&self, index: usize) -> Option<String> {
        self.frames.get(index).map(|(ts, _)| ts.clone())
    }

    fn products(&self, index: usize) -> Option<Vec<String>> {
        self.frames.get(index).map(|(_, products)| products.clone())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MaskError {
    #[error("unclosed field in file mask: {0:?}")]
    UnclosedField(String),

    #[error("unknown field {0:?} in file mask")]
    UnknownField(String),

    #[error("file mask must contain a {{datetime:...}} field")]
    MissingDatetime,

    #[error("file mask must contain a {{product}} field")]
    MissingProduct,

    #[error("file mask has two adjacent fields with no literal separator")]
    AdjacentFields,
}

#[derive(Clone, Debug, PartialEq)]
enum MaskToken {
    Literal(String),
    Projection,
    Resolution,
    Product,
    /// chrono format string, e.g. `%Y%m%d.%H%M`.
    Datetime(String),
}

/// Parsed file-name mask, e.g.
/// `{projection}-{resolution}.{product}.{datetime:%Y%m%d.%H%M}.0.jpg`.
#[derive(Clone, Debug)]
pub struct FileMask {
    tokens: Vec<MaskToken>,
}

/// Fields extracted from one file name.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedName {
    pub projection: String,
    pub resolution: String,
    pub product: String,
    pub datetime: NaiveDateTime,
}

impl FileMask {
    pub fn parse(mask: &str) -> Result<Self, MaskError> {
        let mut tokens = Vec::new();
        let mut rest = mask;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                tokens.push(MaskToken::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| MaskError::UnclosedField(rest.to_string()))?;
            let field = &after[..close];
            tokens.push(match field {
                "projection" => MaskToken::Projection,
                "resolution" => MaskToken::Resolution,
                "product" => MaskToken::Product,
                _ => match field.strip_prefix("datetime:") {
                    Some(fmt) => MaskToken::Datetime(fmt.to_string()),
                    None => return Err(MaskError::UnknownField(field.to_string())),
                },
            });
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            tokens.push(MaskToken::Literal(rest.to_string()));
        }

        if !tokens.iter().any(|t| matches!(t, MaskToken::Datetime(_))) {
            return Err(MaskError::MissingDatetime);
        }
        if !tokens.contains(&MaskToken::Product) {
            return Err(MaskError::MissingProduct);
        }
        // two captures in a row cannot be split unambiguously
        let adjacent = tokens
            .windows(2)
            .any(|w| !matches!(w[0], MaskToken::Literal(_)) && !matches!(w[1], MaskToken::Literal(_)));
        if adjacent {
            return Err(MaskError::AdjacentFields);
        }

        Ok(Self { tokens })
    }

    /// Match a file name against the mask; `None` if it does not conform.
    pub fn match_name(&self, name: &str) -> Option<ParsedName> {
        let mut pos = 0;
        let mut projection = String::new();
        let mut resolution = String::new();
        let mut product = String::new();
        let mut datetime: Option<NaiveDateTime> = None;

        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                MaskToken::Literal(lit) => {
                    if !name[pos..].starts_with(lit.as_str()) {
                        return None;
                    }
                    pos += lit.len();
                }
                capture => {
                    // capture runs until the next literal (or the name's end)
                    let end = match self.tokens.get(i + 1) {
                        Some(MaskToken::Literal(lit)) => pos + name[pos..].find(lit.as_str())?,
                        _ => name.len(),
                    };
                    let text = &name[pos..end];
                    if text.is_empty() {
                        return None;
                    }
                    match capture {
                        MaskToken::Projection => projection = text.to_string(),
                        MaskToken::Resolution => resolution = text.to_string(),
                        MaskToken::Product => product = text.to_string(),
                        MaskToken::Datetime(fmt) => {
                            datetime = Some(NaiveDateTime::parse_from_str(text, fmt).ok()?);
                        }
                        MaskToken::Literal(_) => unreachable!(),
                    }
                    pos = end;
                }
            }
        }

        if pos != name.len() {
            return None;
        }
        Some(ParsedName {
            projection,
            resolution,
            product,
            datetime: datetime?,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FrameScanError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One product image file inside a frame.
#[derive(Clone, Debug)]
pub struct ProductFile {
    pub product: String,
    pub path: PathBuf,
    pub projection: String,
    pub resolution: String,
}

/// One timestamp's product stack.
#[derive(Clone, Debug)]
pub struct Frame {
    pub datetime: NaiveDateTime,
    pub products: Vec<ProductFile>,
}

/// Frame source over a flat image directory, grouped by datetime and sorted
/// by (datetime, product).
#[derive(Clone, Debug)]
pub struct FolderFrameSource {
    frames: Vec<Frame>,
}

impl FolderFrameSource {
    pub fn scan(dir: &Path, mask: &FileMask) -> Result<Self, FrameScanError> {
        let mut groups: BTreeMap<NaiveDateTime, Vec<ProductFile>> = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(parsed) = mask.match_name(name) else {
                log::debug!("skipping {name:?}: does not match the file mask");
                continue;
            };
            groups.entry(parsed.datetime).or_default().push(ProductFile {
                product: parsed.product,
                path: path.clone(),
                projection: parsed.projection,
                resolution: parsed.resolution,
            });
        }

        let frames = groups
            .into_iter()
            .map(|(datetime, mut products)| {
                products.sort_by(|a, b| a.product.cmp(&b.product));
                Frame { datetime, products }
            })
            .collect::<Vec<_>>();
        log::info!("scanned {} frames from {}", frames.len(), dir.display());
        Ok(Self { frames })
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }
}

impl FrameSource for FolderFrameSource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn timestamp(&self, index: usize) -> Option<String> {
        self.frames
            .get(index)
            .map(|f| f.datetime.format(TIMESTAMP_FORMAT).to_string())
    }

    fn products(&self, index: usize) -> Option<Vec<String>> {
        self.frames
            .get(index)
            .map(|f| f.products.iter().map(|p| p.product.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FILE_MASK;
    use std::fs::File;

    #[test]
    fn wrap_index_is_cyclic_in_both_directions() {
        assert_eq!(wrap_index(4, 1, 5), 0);
        assert_eq!(wrap_index(0, -1, 5), 4);
        assert_eq!(wrap_index(2, 1, 5), 3);
        assert_eq!(wrap_index(2, -1, 5), 1);
        assert_eq!(wrap_index(0, 1, 0), 0);
    }

    #[test]
    fn default_mask_parses_standard_names() {
        let mask = FileMask::parse(DEFAULT_FILE_MASK).expect("mask");
        let parsed = mask
            .match_name("msgce-1160x800.hrv.20191127.1130.0.jpg")
            .expect("match");
        assert_eq!(parsed.projection, "msgce");
        assert_eq!(parsed.resolution, "1160x800");
        assert_eq!(parsed.product, "hrv");
        assert_eq!(
            parsed.datetime.format(TIMESTAMP_FORMAT).to_string(),
            "2019-11-27 11:30"
        );

        assert!(mask.match_name("notes.txt").is_none());
        assert!(mask.match_name("msgce-1160x800.hrv.2019x127.1130.0.jpg").is_none());
    }

    #[test]
    fn mask_validation_rejects_bad_patterns() {
        assert!(matches!(
            FileMask::parse("{product}.jpg"),
            Err(MaskError::MissingDatetime)
        ));
        assert!(matches!(
            FileMask::parse("{datetime:%Y%m%d}.jpg"),
            Err(MaskError::MissingProduct)
        ));
        assert!(matches!(
            FileMask::parse("{product}{datetime:%Y%m%d}.jpg"),
            Err(MaskError::AdjacentFields)
        ));
        assert!(matches!(
            FileMask::parse("{product.{datetime:%Y%m%d}.jpg"),
            Err(MaskError::UnknownField(_)) | Err(MaskError::UnclosedField(_))
        ));
    }

    #[test]
    fn scan_groups_by_datetime_and_sorts_by_product() {
        let dir = tempfile::tempdir().expect("tempdir");
        let names = [
            "msgce-1160x800.wv.20191127.1130.0.jpg",
            "msgce-1160x800.hrv.20191127.1130.0.jpg",
            "msgce-1160x800.hrv.20191127.1145.0.jpg",
            "msgce-1160x800.wv.20191127.1145.0.jpg",
            "README.md",
        ];
        for name in names {
            File::create(dir.path().join(name)).expect("create");
        }

        let mask = FileMask::parse(DEFAULT_FILE_MASK).expect("mask");
        let source = FolderFrameSource::scan(dir.path(), &mask).expect("scan");
        assert_eq!(source.len(), 2);
        assert_eq!(
            source.timestamp(0).as_deref(),
            Some("2019-11-27 11:30")
        );
        assert_eq!(
            source.products(0),
            Some(vec!["hrv".to_string(), "wv".to_string()])
        );
        assert_eq!(
            source.timestamp(1).as_deref(),
            Some("2019-11-27 11:45")
        );
        assert!(source.timestamp(2).is_none());
    }
}
