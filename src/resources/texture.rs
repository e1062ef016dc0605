//! Asset fetching and image/sheet loading.
//!
//! Natively assets are read from `./assets`; on wasm they are fetched from
//! `<origin>/assets` with `reqwest`.

use anyhow::Context as _;
use serde::Deserialize;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(data)
}

/// Fetches and decodes an image into RGBA8.
pub async fn load_image(file_name: &str) -> anyhow::Result<image::RgbaImage> {
    let bytes = load_binary(file_name).await?;
    let image = image::load_from_memory(&bytes)
        .with_context(|| format!("decoding {}", file_name))?;
    Ok(image.to_rgba8())
}

/// Layout of a tile or sprite sheet, read from `json/<name>.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    #[serde(rename = "tileWidth", alias = "spriteWidth")]
    pub tile_width: u32,
    #[serde(rename = "tileHeight", alias = "spriteHeight")]
    pub tile_height: u32,
    #[serde(default)]
    pub margin: u32,
}

impl SheetInfo {
    /// Parses a sheet description. Tiles must be at least one pixel wide and high.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let info: SheetInfo = serde_json::from_str(text)?;
        if info.tile_width == 0 || info.tile_height == 0 {
            anyhow::bail!(
                "sheet `{}` has an empty {}x{} tile",
                info.name,
                info.tile_width,
                info.tile_height
            );
        }
        Ok(info)
    }

    /// `None` when no tile fits the stride arithmetic.
    pub fn tiles_per_row(&self, image_width: u32) -> Option<u32> {
        let stride = self.tile_width.checked_add(self.margin)?;
        let per_row = image_width.saturating_sub(self.margin).checked_div(stride)?;
        Some(per_row.max(1))
    }

    /// Normalized `[u, v, width, height]` of tile `index`, counted row by row.
    ///
    /// Returns `None` for a degenerate sheet or an index whose offset overflows.
    pub fn tile_uv(&self, index: u32, image_width: u32, image_height: u32) -> Option<[f32; 4]> {
        let per_row = self.tiles_per_row(image_width)?;
        let (column, row) = (index % per_row, index / per_row);
        let offset = |tile: u32, slot: u32| {
            tile.checked_add(self.margin)?
                .checked_mul(slot)?
                .checked_add(self.margin)
        };
        let u = offset(self.tile_width, column)?;
        let v = offset(self.tile_height, row)?;
        let (width, height) = (image_width.max(1) as f32, image_height.max(1) as f32);
        Some([
            u as f32 / width,
            v as f32 / height,
            self.tile_width as f32 / width,
            self.tile_height as f32 / height,
        ])
    }
}

/// Images named `*tilesheet` or `*spritesheet` come with a [`SheetInfo`].
pub fn is_sheet(image_file: &str) -> bool {
    let stem = image_stem(image_file);
    stem.ends_with("tilesheet") || stem.ends_with("spritesheet")
}

/// File name without directories or extension, used as the texture name.
pub fn image_stem(image_file: &str) -> &str {
    let file = image_file.rsplit('/').next().unwrap_or(image_file);
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

pub async fn load_sheet_info(name: &str) -> anyhow::Result<SheetInfo> {
    let path = format!("json/{}.json", name);
    let text = load_string(&path).await?;
    SheetInfo::from_json(&text).with_context(|| format!("parsing {}", path))
}
