//! Streaming persistence of upload bodies.
//!
//! The body is written to a temporary file while four content digests and
//! a byte counter update incrementally, so nothing is buffered in full.

use crate::{Result, UploadError};
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// A persisted upload: where it landed, how big it is, and its digests.
#[derive(Debug, Clone)]
pub struct SavedFile {
    /// Final location of the body on disk.
    pub path: PathBuf,
    /// Total bytes written.
    pub size: u64,
    /// Hex-encoded MD5 digest.
    pub md5: String,
    /// Hex-encoded SHA-1 digest.
    pub sha1: String,
    /// Hex-encoded SHA-256 digest.
    pub sha256: String,
    /// Hex-encoded SHA-512 digest.
    pub sha512: String,
}

impl SavedFile {
    /// Form fields substituted for the original body: one per digest,
    /// plus the resolved path and size.
    pub fn form_fields(&self, prefix: &str) -> Vec<(String, String)> {
        vec![
            (format!("{}.md5", prefix), self.md5.clone()),
            (format!("{}.sha1", prefix), self.sha1.clone()),
            (format!("{}.sha256", prefix), self.sha256.clone()),
            (format!("{}.sha512", prefix), self.sha512.clone()),
            (format!("{}.path", prefix), self.path.display().to_string()),
            (format!("{}.size", prefix), self.size.to_string()),
        ]
    }
}

/// Streams `reader` into a fresh temporary file under `dir`.
///
/// Every byte feeds the digests exactly once, in stream order. The file
/// is kept on success; any earlier failure removes it when the temporary
/// file guard drops.
pub async fn save_stream<R>(dir: &Path, reader: &mut R) -> Result<SavedFile>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let dir = dir.to_path_buf();
    let temp = blocking_fs(move || tempfile::NamedTempFile::new_in(dir)).await?;
    let mut file = tokio::fs::File::from_std(temp.as_file().try_clone()?);

    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut sha256 = Sha256::new();
    let mut sha512 = Sha512::new();
    let mut size: u64 = 0;
    let mut buf = vec![0u8; 8192];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        file.write_all(&buf[..n]).await?;
        md5.update(&buf[..n]);
        sha1.update(&buf[..n]);
        sha256.update(&buf[..n]);
        sha512.update(&buf[..n]);
        size += n as u64;
    }

    file.flush().await?;
    drop(file);

    let (_keep, path) = blocking_fs(move || temp.keep().map_err(|e| e.error)).await?;

    Ok(SavedFile {
        path,
        size,
        md5: hex::encode(md5.finalize()),
        sha1: hex::encode(sha1.finalize()),
        sha256: hex::encode(sha256.finalize()),
        sha512: hex::encode(sha512.finalize()),
    })
}

/// Runs a blocking filesystem call on the runtime's blocking pool.
async fn blocking_fs<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| UploadError::SaveFile(std::io::Error::new(std::io::ErrorKind::Other, e)))?
        .map_err(UploadError::SaveFile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    const CONTENT: &str = "A test file content";

    #[tokio::test]
    async fn test_save_stream_computes_all_digests() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = Cursor::new(CONTENT.as_bytes().to_vec());

        let saved = save_stream(dir.path(), &mut reader).await.unwrap();

        assert_eq!(saved.size, 19);
        assert_eq!(saved.md5, "1343557864feb5c0fd444e50ee2ea276");
        assert_eq!(saved.sha1, "68eb1f9de42f34d2595625898530efb5ef8ae44b");
        assert_eq!(
            saved.sha256,
            "ea7385278308bb5abb353efe8c840e19bb423aae9760f4023a15dcae045bf20a"
        );
        assert_eq!(
            saved.sha512,
            "b84624501d3c32bc671303d88bdb2d1fcc3c610c53ab080fed7fb5e7ad5d52c36ddd46a966066cc68f438d626443a58394018a46a5943e525ac291bcd63fac75"
        );

        assert!(saved.path.starts_with(dir.path()));
        assert_eq!(std::fs::read_to_string(&saved.path).unwrap(), CONTENT);
    }

    #[tokio::test]
    async fn test_save_stream_empty_body() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = Cursor::new(Vec::new());

        let saved = save_stream(dir.path(), &mut reader).await.unwrap();

        assert_eq!(saved.size, 0);
        assert_eq!(saved.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(saved.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[tokio::test]
    async fn test_save_stream_digests_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();

        let first = save_stream(dir.path(), &mut Cursor::new(CONTENT.as_bytes().to_vec()))
            .await
            .unwrap();
        let second = save_stream(dir.path(), &mut Cursor::new(CONTENT.as_bytes().to_vec()))
            .await
            .unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(first.md5, second.md5);
        assert_eq!(first.sha1, second.sha1);
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.sha512, second.sha512);
    }

    #[test]
    fn test_form_fields_layout() {
        let saved = SavedFile {
            path: PathBuf::from("/scratch/upload123"),
            size: 19,
            md5: "m".to_string(),
            sha1: "s1".to_string(),
            sha256: "s256".to_string(),
            sha512: "s512".to_string(),
        };

        let fields = saved.form_fields("file");
        assert_eq!(
            fields,
            vec![
                ("file.md5".to_string(), "m".to_string()),
                ("file.sha1".to_string(), "s1".to_string()),
                ("file.sha256".to_string(), "s256".to_string()),
                ("file.sha512".to_string(), "s512".to_string()),
                ("file.path".to_string(), "/scratch/upload123".to_string()),
                ("file.size".to_string(), "19".to_string()),
            ]
        );
    }

    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let this = self.get_mut();
            if this.sent {
                Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "client went away",
                )))
            } else {
                this.sent = true;
                buf.put_slice(b"partial ");
                Poll::Ready(Ok(()))
            }
        }
    }

    #[tokio::test]
    async fn test_save_stream_removes_file_on_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = FailingReader { sent: false };

        assert!(save_stream(dir.path(), &mut reader).await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
