//! Turning one release into one table row.
//!
//! The release metadata seeds the row with its tag and date. The asset for
//! the host platform is downloaded, the executable pulled out of the
//! archive, and whatever the [`Prober`] recovers fills in the rest.

use crate::error::{ResolveError, Result};
use crate::extract::{ArchiveFormat, with_executable};
use crate::github::Release;
use crate::platform::Platform;
use crate::probe::Prober;
use crate::record::VersionRecord;
use std::future::Future;
use tracing::info;

/// Downloads a URL in full.
pub trait Fetch {
    fn download(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Produces a table row for a release.
pub trait Resolve {
    fn resolve(
        &self,
        release: &Release,
    ) -> impl Future<Output = std::result::Result<VersionRecord, ResolveError>>;
}

pub struct Resolver<F> {
    fetcher: F,
    prober: Prober,
    platform: Platform,
    product: String,
}

impl<F: Fetch> Resolver<F> {
    pub fn new(fetcher: F, product: &str) -> Self {
        Self {
            fetcher,
            prober: Prober::new(product),
            platform: Platform::current(),
            product: product.to_string(),
        }
    }

    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

/// Row fields known from release metadata alone.
pub fn seed_record(release: &Release) -> VersionRecord {
    VersionRecord {
        version: Some(release.tag_name.clone()),
        runtime: None,
        date: Some(release.created_at.format("%Y-%m-%d").to_string()),
    }
}

impl<F: Fetch> Resolve for Resolver<F> {
    async fn resolve(&self, release: &Release) -> std::result::Result<VersionRecord, ResolveError> {
        let seed = seed_record(release);

        let prefix = self.platform.asset_prefix(&self.product);
        let asset = release
            .assets
            .iter()
            .find(|a| a.name.starts_with(&prefix))
            .ok_or(ResolveError::NoAsset(prefix))?;

        info!("Downloading {}", asset.name);
        let bytes = self.fetcher.download(&asset.browser_download_url).await?;

        let format = ArchiveFormat::from_asset_name(&asset.name);
        let probed = with_executable(&bytes, format, &self.product, |rd| {
            self.prober.probe(rd)
        })??;

        Ok(seed.merge(probed))
    }
}
