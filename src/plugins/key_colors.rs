// src/plugins/key_colors.rs

//! Dominant icon colors
//!
//! The icon is downscaled and its opaque pixels are binned by color. The
//! bin size shrinks until enough distinct bins exist; the bin averages,
//! most populated first, are the key colors. Icons too uniform to produce
//! enough bins get a grey ramp instead.

use crate::app::{App, AppList, KeyColor};
use crate::error::{Error, Result};
use crate::icon::Pixbuf;
use crate::plugin::helpers::for_each_app;
use crate::plugin::{Capabilities, Plugin, PluginContext, PluginRule, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "key-colors";

const SAMPLE_SIZE: u32 = 32;
const MIN_BINS: usize = 10;
const FALLBACK_COLORS: u8 = 3;

#[derive(Default)]
struct Bin {
    red: u64,
    green: u64,
    blue: u64,
    count: u64,
}

impl Bin {
    fn average(&self) -> KeyColor {
        KeyColor::new(
            (self.red / self.count) as u8,
            (self.green / self.count) as u8,
            (self.blue / self.count) as u8,
        )
    }
}

/// Key colors of an image, most dominant first
pub fn calculate_key_colors(pixbuf: &Pixbuf) -> Vec<KeyColor> {
    let sample = pixbuf.scale_nearest(SAMPLE_SIZE, SAMPLE_SIZE);
    let opaque: Vec<[u8; 4]> = sample.pixels().filter(|p| p[3] == 255).collect();

    for bin_size in (2..=250u32).rev().step_by(2) {
        let mut index: HashMap<(u32, u32, u32), usize> = HashMap::new();
        let mut bins: Vec<Bin> = Vec::new();
        for [r, g, b, _] in &opaque {
            let key = (*r as u32 / bin_size, *g as u32 / bin_size, *b as u32 / bin_size);
            let slot = *index.entry(key).or_insert_with(|| {
                bins.push(Bin::default());
                bins.len() - 1
            });
            let bin = &mut bins[slot];
            bin.red += *r as u64;
            bin.green += *g as u64;
            bin.blue += *b as u64;
            bin.count += 1;
        }
        if bins.len() >= MIN_BINS {
            bins.sort_by(|a, b| b.count.cmp(&a.count));
            return bins.iter().map(Bin::average).collect();
        }
    }

    (0..FALLBACK_COLORS)
        .map(|i| {
            let v = (i as u32 * 255 / FALLBACK_COLORS as u32) as u8;
            KeyColor::new(v, v, v)
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct KeyColorsPlugin;

impl KeyColorsPlugin {
    pub fn new() -> Self {
        Self
    }
}

fn needs_key_colors(app: &App) -> bool {
    let data = app.read();
    data.key_colors.is_empty() && data.pixbuf.is_some()
}

#[async_trait]
impl Plugin for KeyColorsPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REFINE
    }

    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::run_after(super::icons::NAME)]
    }

    async fn refine(
        &self,
        ctx: &PluginContext,
        list: &mut AppList,
        flags: RefineFlags,
        _job_flags: RefineJobFlags,
    ) -> Result<()> {
        if !flags.contains(RefineFlags::KEY_COLORS) {
            return Ok(());
        }
        let apps: Vec<Arc<App>> = list.iter().filter(|a| needs_key_colors(a)).cloned().collect();
        debug!("calculating key colors for {} apps", apps.len());

        for_each_app(ctx, apps, |app| async move {
            let pixbuf = app.read().pixbuf.clone();
            let Some(pixbuf) = pixbuf else {
                return Ok(());
            };
            let colors = match tokio::task::spawn_blocking(move || calculate_key_colors(&pixbuf)).await {
                Ok(colors) => colors,
                Err(e) => {
                    return Err(Error::DataFormat(format!("key color calculation failed: {}", e)));
                }
            };
            app.update(|data| {
                if data.key_colors.is_empty() {
                    data.key_colors = colors;
                }
            });
            Ok(())
        })
        .await?;
        Ok(())
    }
}
