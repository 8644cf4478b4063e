use async_trait::async_trait;
use std::path::PathBuf;

use parley_llm::MediaStore;

/// Filesystem-backed media storage. Files land under the configured
/// directory and are served from `/images/{name}`.
pub struct LocalMediaStore {
    dir: PathBuf,
}

impl LocalMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, extension: &str, bytes: Vec<u8>) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        tokio::fs::write(self.dir.join(&name), bytes).await?;

        Ok(format!("/images/{}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saved_file_gets_a_servable_path() {
        let dir = std::env::temp_dir().join(format!("parley-media-{}", uuid::Uuid::new_v4()));
        let store = LocalMediaStore::new(&dir);

        let path = store.save("png", vec![1, 2, 3]).await.unwrap();
        assert!(path.starts_with("/images/"));
        assert!(path.ends_with(".png"));

        let name = path.strip_prefix("/images/").unwrap();
        let bytes = tokio::fs::read(dir.join(name)).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
