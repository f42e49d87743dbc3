use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kinds of user-supplied input files the bundle can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    /// Protein structure (text).
    Pdb,
    /// AMBER coordinates.
    Inpcrd,
    /// AMBER topology.
    Prmtop,
    /// AMBER restart.
    Rst,
}

impl UploadKind {
    pub const ALL: [UploadKind; 4] = [
        UploadKind::Pdb,
        UploadKind::Inpcrd,
        UploadKind::Prmtop,
        UploadKind::Rst,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            UploadKind::Pdb => "pdb",
            UploadKind::Inpcrd => "inpcrd",
            UploadKind::Prmtop => "prmtop",
            UploadKind::Rst => "rst",
        }
    }

    /// Text kinds are embedded as decoded text, everything else as base64.
    pub fn is_text(&self) -> bool {
        matches!(self, UploadKind::Pdb)
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown upload kind '{0}'. Expected one of: pdb, inpcrd, prmtop, rst.")]
pub struct UnknownUploadKind(pub String);

impl FromStr for UploadKind {
    type Err = UnknownUploadKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdb" => Ok(UploadKind::Pdb),
            "inpcrd" => Ok(UploadKind::Inpcrd),
            "prmtop" => Ok(UploadKind::Prmtop),
            "rst" | "rst7" => Ok(UploadKind::Rst),
            _ => Err(UnknownUploadKind(s.to_string())),
        }
    }
}

/// How an uploaded text file had to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Decodes text as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte to the code point of the same value, so the
/// fallback cannot fail.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            bytes.iter().map(|&b| char::from(b)).collect(),
            TextEncoding::Latin1,
        ),
    }
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded.trim())
}

/// The set of files uploaded for one generation request, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uploads {
    files: BTreeMap<UploadKind, Vec<u8>>,
}

impl Uploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: UploadKind, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(kind, bytes);
        self
    }

    /// Stores the file, replacing any earlier upload of the same kind.
    pub fn insert(&mut self, kind: UploadKind, bytes: impl Into<Vec<u8>>) {
        self.files.insert(kind, bytes.into());
    }

    pub fn remove(&mut self, kind: UploadKind) -> Option<Vec<u8>> {
        self.files.remove(&kind)
    }

    pub fn get(&self, kind: UploadKind) -> Option<&[u8]> {
        self.files.get(&kind).map(Vec::as_slice)
    }

    pub fn contains(&self, kind: UploadKind) -> bool {
        self.files.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = UploadKind> + '_ {
        self.files.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_is_decoded_as_is() {
        let (text, encoding) = decode_text("ATOM      1  N   TYR A   1\n".as_bytes());
        assert_eq!(encoding, TextEncoding::Utf8);
        assert!(text.starts_with("ATOM"));
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        let bytes = b"REMARK caf\xe9 \xff\n";
        let (text, encoding) = decode_text(bytes);
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(text, "REMARK café ÿ\n");
    }

    #[test]
    fn base64_round_trips_binary_content() {
        let bytes = [0u8, 159, 146, 150, 255, 10];
        let encoded = encode_base64(&bytes);
        assert_eq!(decode_base64(&encoded).unwrap(), bytes);
    }

    #[test]
    fn upload_kind_parses_case_insensitively() {
        assert_eq!("PDB".parse::<UploadKind>(), Ok(UploadKind::Pdb));
        assert_eq!(" prmtop ".parse::<UploadKind>(), Ok(UploadKind::Prmtop));
        assert_eq!("rst7".parse::<UploadKind>(), Ok(UploadKind::Rst));
        assert!("mol2".parse::<UploadKind>().is_err());
    }

    #[test]
    fn only_pdb_is_a_text_kind() {
        let text_kinds: Vec<_> = UploadKind::ALL.iter().filter(|k| k.is_text()).collect();
        assert_eq!(text_kinds, vec![&UploadKind::Pdb]);
    }

    #[test]
    fn later_upload_of_same_kind_replaces_earlier() {
        let mut uploads = Uploads::new().with(UploadKind::Pdb, b"first".to_vec());
        uploads.insert(UploadKind::Pdb, b"second".to_vec());
        assert_eq!(uploads.get(UploadKind::Pdb), Some(&b"second"[..]));
        assert_eq!(uploads.kinds().count(), 1);
        assert!(uploads.remove(UploadKind::Pdb).is_some());
        assert!(uploads.is_empty());
    }
}
