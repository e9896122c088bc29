use file_format::FileFormat;
use std::{fmt::Write as _, path::PathBuf};
use tokio::fs;
use tracing::info;

/// Subdirectory of the media root holding post images.
pub const POST_IMAGE_DIR: &str = "posts";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ImageKind {
    Gif,
    Png,
    Jpeg,
    WebP,
    Bmp,
}

impl ImageKind {
    /// Recognizes an upload by its content, ignoring whatever name it came with.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match FileFormat::from_bytes(bytes) {
            FileFormat::GraphicsInterchangeFormat => Some(Self::Gif),
            FileFormat::PortableNetworkGraphics | FileFormat::AnimatedPortableNetworkGraphics => {
                Some(Self::Png)
            }
            FileFormat::JointPhotographicExpertsGroup => Some(Self::Jpeg),
            FileFormat::Webp => Some(Self::WebP),
            FileFormat::WindowsBitmap => Some(Self::Bmp),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes a post image under a fresh random name.
    ///
    /// Returns the path relative to the media root, which is what posts store.
    pub async fn save_post_image(&self, bytes: &[u8], kind: ImageKind) -> std::io::Result<String> {
        let dir = self.root.join(POST_IMAGE_DIR);
        fs::create_dir_all(&dir).await?;

        let name = random_file_name(kind);
        fs::write(dir.join(&name), bytes).await?;

        let relative = format!("{POST_IMAGE_DIR}/{name}");
        info!(path = %relative, size = bytes.len(), "Stored post image");
        Ok(relative)
    }
}

fn random_file_name(kind: ImageKind) -> String {
    let stem: [u8; 16] = rand::random();
    let mut name = String::with_capacity(stem.len() * 2 + 5);
    for byte in stem {
        let _ = write!(name, "{byte:02x}");
    }
    name.push('.');
    name.push_str(kind.extension());
    name
}
