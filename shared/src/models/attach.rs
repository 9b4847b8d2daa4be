//! Attachment naming rules

use chrono::{Datelike, NaiveDate};

const MAX_EXTENSION_LEN: usize = 10;

/// Date-based folder an upload lands in, e.g. `2024/3/7`
pub fn dated_folder(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.year(), date.month(), date.day())
}

/// Lowercase extension of an uploaded file name.
///
/// Returns `None` for names without a usable extension so nothing from the
/// client ever reaches the file system path besides alphanumeric characters.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Name a file is stored under on disk
pub fn stored_file_name(hash: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{}.{}", hash, ext),
        None => hash.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dated_folder_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(dated_folder(date), "2024/3/7");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension(".bashrc"), None);
        assert_eq!(file_extension("evil.ph/p"), None);
        assert_eq!(file_extension("name."), None);
    }

    #[test]
    fn test_stored_file_name() {
        assert_eq!(stored_file_name("aB3dE5gH7j", Some("png")), "aB3dE5gH7j.png");
        assert_eq!(stored_file_name("aB3dE5gH7j", None), "aB3dE5gH7j");
    }
}
