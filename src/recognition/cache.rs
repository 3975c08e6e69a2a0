//! Cache for detection responses

use crate::error::Result;
use crate::types::DetectionResponse;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Cache manager for detection responses, keyed by image content hash
pub struct ResponseCache {
    cache_dir: PathBuf,
}

impl ResponseCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    /// Cache key for an image file (streaming hash for memory efficiency)
    fn cache_key(image_path: &Path) -> Result<String> {
        let file = File::open(image_path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        io::copy(&mut reader, &mut hasher)?;
        let hash = hasher.finalize();
        Ok(format!("{:x}", hash))
    }

    /// Get the cached response for an image
    pub fn get(&self, image_path: &Path) -> Result<Option<DetectionResponse>> {
        let key = Self::cache_key(image_path)?;
        let cache_path = self.cache_dir.join(format!("{}.json", key));

        if !cache_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&cache_path)?;
        let response: DetectionResponse = serde_json::from_str(&content)?;
        Ok(Some(response))
    }

    /// Store a response in the cache
    pub fn set(&self, image_path: &Path, response: &DetectionResponse) -> Result<()> {
        let key = Self::cache_key(image_path)?;
        let cache_path = self.cache_dir.join(format!("{}.json", key));

        let content = serde_json::to_string_pretty(response)?;
        fs::write(&cache_path, content)?;
        Ok(())
    }

    /// Clear all cached responses; returns the number removed
    pub fn clear(&self) -> Result<usize> {
        let mut count = 0;

        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "json") {
                fs::remove_file(&path)?;
                count += 1;
            }
        }

        Ok(count)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut count = 0;
        let mut total_size = 0u64;

        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "json") {
                count += 1;
                if let Ok(metadata) = fs::metadata(&path) {
                    total_size += metadata.len();
                }
            }
        }

        Ok(CacheStats {
            entry_count: count,
            total_size_bytes: total_size,
            cache_dir: self.cache_dir.clone(),
        })
    }
}

/// Cache statistics
#[derive(Debug)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub cache_dir: PathBuf,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_kb = self.total_size_bytes as f64 / 1024.0;
        writeln!(f, "Cache Statistics")?;
        writeln!(f, "================")?;
        writeln!(f, "Entries:    {}", self.entry_count)?;
        writeln!(f, "Total size: {:.2} KB", size_kb)?;
        write!(f, "Location:   {}", self.cache_dir.display())
    }
}
