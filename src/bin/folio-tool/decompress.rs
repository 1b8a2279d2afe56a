use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

const RESOURCES: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/res.tar.gz"));

/// Unpacks the bundled templates, public assets and about page into `output`.
pub fn decompress_files(output: &Path) -> io::Result<()> {
    let tar = GzDecoder::new(RESOURCES);
    let mut archive = Archive::new(tar);
    archive.unpack(output)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_uncompress() {
        let out_path = std::env::temp_dir().join(format!("folio-res-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&out_path).unwrap();

        decompress_files(&out_path).unwrap();
        assert!(out_path.join("template").join("editor.tpl").exists());
        assert!(out_path.join("public").join("style.css").exists());
        assert!(out_path.join("about.md").exists());

        fs::remove_dir_all(&out_path).unwrap();
    }
}
