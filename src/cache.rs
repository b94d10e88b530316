//! The file cache keeps things between runs: named contexts, and which one is in use.
//!
//! To use the cache system, implement the Cacheable and CacheKey traits, then you can
//! use the read(), write() and read_all() functions.
//!
//! Query results are never written to disk, see [memo] for those.
use crate::context::{Context, ContextName};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod memo;

/// You need a cache key in order to read something for cache.
pub trait CacheKey {
    fn as_path(&self) -> String;
}

/// Anything that can be cached needs to implement this trait.
///
/// Cacheable has an associated type so that we can always pair up a struct to be cached with its
/// cache key. Trying to read() a struct using some other struct's key type does not compile.
pub trait Cacheable {
    type CacheKey;

    fn cache_key(&self) -> Self::CacheKey;

    /// All structs of the same type are saved in the same folder, so they can be read back all at
    /// once. Type ids should be unique.
    fn type_id() -> &'static str;
}

pub fn read<D, K>(cache_key: &K) -> Result<D, crate::Error>
where
    D: Cacheable<CacheKey = K> + DeserializeOwned,
    K: CacheKey,
{
    read_in(&cache_root()?, cache_key)
}

pub fn write<D, K>(data: &D) -> Result<(), crate::Error>
where
    D: Cacheable<CacheKey = K> + Serialize,
    K: CacheKey,
{
    write_in(&cache_root()?, data)
}

/// Reads every cached instance of `D`.
pub fn read_all<D>() -> Result<Vec<D>, crate::Error>
where
    D: Cacheable + DeserializeOwned,
{
    read_all_in(&cache_root()?)
}

fn read_in<D, K>(root: &Path, cache_key: &K) -> Result<D, crate::Error>
where
    D: Cacheable<CacheKey = K> + DeserializeOwned,
    K: CacheKey,
{
    let file_location = require_cache_folder(root, D::type_id())?.join(cache_key.as_path());
    debug!("Reading {}", file_location.display());

    let data = serde_json::from_reader(fs::File::open(file_location)?)?;

    Ok(data)
}

fn write_in<D, K>(root: &Path, data: &D) -> Result<(), crate::Error>
where
    D: Cacheable<CacheKey = K> + Serialize,
    K: CacheKey,
{
    let file_location =
        require_cache_folder(root, D::type_id())?.join(data.cache_key().as_path());
    debug!("Writing {}", file_location.display());

    let data = serde_json::to_string(&data)?;

    fs::write(file_location, data)?;

    Ok(())
}

fn read_all_in<D>(root: &Path) -> Result<Vec<D>, crate::Error>
where
    D: Cacheable + DeserializeOwned,
{
    let folder = require_cache_folder(root, D::type_id())?;

    let mut paths = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    // read_dir() order is platform dependent
    paths.sort();

    let mut all = Vec::with_capacity(paths.len());
    for path in paths {
        all.push(serde_json::from_reader(fs::File::open(path)?)?);
    }

    Ok(all)
}

fn cache_root() -> Result<PathBuf, crate::Error> {
    let home = std::env::var("HOME")?;

    let mut path = PathBuf::from(home);
    path.push(".cache");
    path.push("fitness-shim");
    path.push("v1");

    Ok(path)
}

fn require_cache_folder(root: &Path, type_id: &'static str) -> Result<PathBuf, crate::Error> {
    let path = root.join(type_id);

    fs::create_dir_all(&path)?;

    Ok(path)
}

// Please dump all impls here, so we keep the rest of the code base clean.

impl Cacheable for Context {
    type CacheKey = ContextName;

    fn cache_key(&self) -> Self::CacheKey {
        self.name.clone()
    }

    fn type_id() -> &'static str {
        "context"
    }
}

impl CacheKey for ContextName {
    fn as_path(&self) -> String {
        format!("context_{}.json", self)
    }
}

impl Cacheable for ContextName {
    type CacheKey = SharedCacheKey;

    fn cache_key(&self) -> Self::CacheKey {
        SharedCacheKey(Self::type_id().to_owned())
    }

    fn type_id() -> &'static str {
        "current_context"
    }
}

/// A key every instance of a type shares, for things there's only ever one of.
pub struct SharedCacheKey(String);

impl SharedCacheKey {
    pub fn of<D: Cacheable<CacheKey = SharedCacheKey>>() -> Self {
        SharedCacheKey(D::type_id().to_owned())
    }
}

impl CacheKey for SharedCacheKey {
    fn as_path(&self) -> String {
        self.0.clone()
    }
}
