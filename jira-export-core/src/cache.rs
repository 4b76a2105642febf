//! Run-scoped memo of embedded resources, keyed by absolute URL.
//!
//! One [`ResourceCache`] is built per export run and lent out as `&mut` to every
//! embedding call, so a URL is downloaded at most once per run. There is no
//! eviction and no locking; pipelines that run concurrently each own a cache.

use std::collections::HashMap;

/// The logical partitions of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePartition {
    /// Stylesheet URL -> stylesheet text with its own `url()` references embedded.
    Css,
    /// Reserved for image-only entries; binary embeds live in `Resources`.
    Images,
    /// Resource URL -> `data:` URL.
    Resources,
}

#[derive(Debug, Default)]
pub struct ResourceCache {
    css: HashMap<String, String>,
    images: HashMap<String, String>,
    resources: HashMap<String, String>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, partition: CachePartition, url: &str) -> Option<&str> {
        self.partition(partition).get(url).map(String::as_str)
    }

    pub fn put(&mut self, partition: CachePartition, url: impl Into<String>, value: impl Into<String>) {
        self.partition_mut(partition).insert(url.into(), value.into());
    }

    pub fn contains(&self, partition: CachePartition, url: &str) -> bool {
        self.partition(partition).contains_key(url)
    }

    pub fn len(&self, partition: CachePartition) -> usize {
        self.partition(partition).len()
    }

    pub fn is_empty(&self) -> bool {
        self.css.is_empty() && self.images.is_empty() && self.resources.is_empty()
    }

    fn partition(&self, partition: CachePartition) -> &HashMap<String, String> {
        match partition {
            CachePartition::Css => &self.css,
            CachePartition::Images => &self.images,
            CachePartition::Resources => &self.resources,
        }
    }

    fn partition_mut(&mut self, partition: CachePartition) -> &mut HashMap<String, String> {
        match partition {
            CachePartition::Css => &mut self.css,
            CachePartition::Images => &mut self.images,
            CachePartition::Resources => &mut self.resources,
        }
    }
}
