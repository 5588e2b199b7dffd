//! Transparent opening of plain, gzip and bzip2 result files.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;

/// Compression applied to a pipeline output file, judged by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Self::Gzip,
            Some("bz2") => Self::Bzip2,
            _ => Self::None,
        }
    }

    /// File name suffix including the dot
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
            Self::Bzip2 => ".bz2",
        }
    }
}

/// True if the file name ends in a compression suffix we can read
#[must_use]
pub fn is_compressed(path: &Path) -> bool {
    Compression::from_path(path) != Compression::None
}

/// Open a file for line reading, decompressing `.gz` and `.bz2` on the fly.
///
/// # Errors
///
/// Returns an IO error if the file cannot be opened.
pub fn open_maybe_compressed(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    Ok(match Compression::from_path(path) {
        Compression::None => Box::new(BufReader::new(file)),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Compression::Bzip2 => Box::new(BufReader::new(MultiBzDecoder::new(file))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_compression_from_path() {
        assert_eq!(
            Compression::from_path(Path::new("s_1_export.txt.gz")),
            Compression::Gzip
        );
        assert_eq!(
            Compression::from_path(Path::new("s_1_eland_result.txt.bz2")),
            Compression::Bzip2
        );
        assert_eq!(
            Compression::from_path(Path::new("s_1_sequence.txt")),
            Compression::None
        );
        assert!(is_compressed(Path::new("a.bz2")));
        assert!(!is_compressed(Path::new("a.txt")));
    }

    #[test]
    fn test_open_plain_gzip_and_bzip2() {
        let dir = tempfile::tempdir().unwrap();
        let body = "line one\nline two\n";

        let plain = dir.path().join("a.txt");
        std::fs::write(&plain, body).unwrap();

        let gz = dir.path().join("a.txt.gz");
        let mut enc = flate2::write::GzEncoder::new(
            File::create(&gz).unwrap(),
            flate2::Compression::default(),
        );
        enc.write_all(body.as_bytes()).unwrap();
        enc.finish().unwrap();

        let bz = dir.path().join("a.txt.bz2");
        let mut enc = bzip2::write::BzEncoder::new(
            File::create(&bz).unwrap(),
            bzip2::Compression::default(),
        );
        enc.write_all(body.as_bytes()).unwrap();
        enc.finish().unwrap();

        for path in [plain, gz, bz] {
            let mut text = String::new();
            open_maybe_compressed(&path)
                .unwrap()
                .read_to_string(&mut text)
                .unwrap();
            assert_eq!(text, body, "{}", path.display());
        }
    }
}
