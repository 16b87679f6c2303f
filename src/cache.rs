use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::debug;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);
const CACHE_SUBDIR: &str = ".local/k4a/cache";
const ENTRY_EXTENSION: &str = "yaml";

static WRITE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Raw `kafkactl` output keyed by query shape, aged by file mtime.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    scope: Option<String>,
}

impl DiskCache {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, scope: None })
    }

    pub fn default_dir() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CACHE_SUBDIR))
    }

    /// Same directory, keys prefixed with `scope` (context and namespace).
    pub fn scoped(&self, scope: impl Into<String>) -> Self {
        Self {
            dir: self.dir.clone(),
            scope: Some(scope.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(&self, kind: &str, args: &[String]) -> String {
        let mut material = String::new();
        if let Some(scope) = &self.scope {
            material.push_str(scope);
            material.push('/');
        }
        material.push_str(kind);
        for arg in args {
            material.push('_');
            material.push_str(arg);
        }

        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn path_for(&self, kind: &str, args: &[String]) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", self.key(kind, args)))
    }

    /// Returns the payload only when the entry exists and is no older than `max_age`.
    /// Any failure reads as a miss.
    pub fn get(&self, kind: &str, args: &[String], max_age: Duration) -> Option<Vec<u8>> {
        let path = self.path_for(kind, args);
        let age = match entry_age(&path) {
            Ok(age) => age,
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    debug!("cache stat failed for {}: {error}", path.display());
                }
                return None;
            }
        };
        if age > max_age {
            debug!("cache stale for {kind} {args:?} (age {}s)", age.as_secs());
            return None;
        }

        match fs::read(&path) {
            Ok(payload) => Some(payload),
            Err(error) => {
                debug!("cache read failed for {}: {error}", path.display());
                None
            }
        }
    }

    pub fn set(&self, kind: &str, args: &[String], payload: &[u8]) -> io::Result<()> {
        let path = self.path_for(kind, args);
        let tmp_path = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            WRITE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(payload)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &path).inspect_err(|_| {
            let _ = fs::remove_file(&tmp_path);
        })
    }

    pub fn invalidate(&self, kind: &str, args: &[String]) -> io::Result<()> {
        match fs::remove_file(self.path_for(kind, args)) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
            _ => Ok(()),
        }
    }

    /// Removes every file in the cache directory, whatever its scope.
    pub fn invalidate_all(&self) -> io::Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(error),
        };

        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Err(error) if error.kind() != io::ErrorKind::NotFound => return Err(error),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn age(&self, kind: &str, args: &[String]) -> Option<Duration> {
        entry_age(&self.path_for(kind, args)).ok()
    }
}

fn entry_age(path: &Path) -> io::Result<Duration> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::DiskCache;
    use filetime::{FileTime, set_file_mtime};
    use sha2::{Digest, Sha256};
    use std::time::{Duration, SystemTime};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn age_entry(cache: &DiskCache, kind: &str, entry_args: &[String], by: Duration) {
        let path = cache.path_for(kind, entry_args);
        set_file_mtime(&path, FileTime::from_system_time(SystemTime::now() - by)).unwrap();
    }

    #[test]
    fn set_then_get_returns_payload() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let topic_args = args(&["--topic", "orders"]);

        cache.set("consumer-groups", &topic_args, b"name: g1\n").unwrap();

        assert_eq!(
            cache.get("consumer-groups", &topic_args, Duration::from_secs(60)),
            Some(b"name: g1\n".to_vec())
        );
    }

    #[test]
    fn set_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();

        cache.set("topics", &[], b"old").unwrap();
        cache.set("topics", &[], b"new").unwrap();

        assert_eq!(cache.get("topics", &[], Duration::MAX), Some(b"new".to_vec()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn entry_file_is_named_by_key_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(b"topics_a_b");
        let expected = format!("{:x}.yaml", hasher.finalize());

        assert_eq!(
            cache.path_for("topics", &args(&["a", "b"])),
            dir.path().join(expected)
        );
    }

    #[test]
    fn argument_order_changes_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();

        assert_ne!(
            cache.key("topics", &args(&["a", "b"])),
            cache.key("topics", &args(&["b", "a"]))
        );
        assert_eq!(
            cache.key("topics", &args(&["a", "b"])),
            cache.key("topics", &args(&["a", "b"]))
        );
    }

    #[test]
    fn scoped_keys_differ_per_context() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let dev = cache.scoped("dev");
        let prod = cache.scoped("prod");

        dev.set("topics", &[], b"dev-data").unwrap();

        assert_eq!(prod.get("topics", &[], Duration::MAX), None);
        assert_eq!(cache.get("topics", &[], Duration::MAX), None);
        assert_eq!(dev.get("topics", &[], Duration::MAX), Some(b"dev-data".to_vec()));
    }

    #[test]
    fn invalidate_removes_entry_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();

        cache.set("schemas", &[], b"payload").unwrap();
        cache.invalidate("schemas", &[]).unwrap();

        assert_eq!(cache.get("schemas", &[], Duration::MAX), None);
        cache.invalidate("schemas", &[]).unwrap();
    }

    #[test]
    fn invalidate_all_clears_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();

        cache.set("topics", &[], b"t").unwrap();
        cache.scoped("dev").set("connectors", &[], b"c").unwrap();
        cache.invalidate_all().unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(cache.get("topics", &[], Duration::MAX), None);
    }

    #[test]
    fn zero_max_age_misses_once_time_has_passed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();

        cache.set("topics", &[], b"payload").unwrap();
        age_entry(&cache, "topics", &[], Duration::from_secs(2));

        assert_eq!(cache.get("topics", &[], Duration::ZERO), None);
        assert_eq!(cache.get("topics", &[], Duration::MAX), Some(b"payload".to_vec()));
    }

    #[test]
    fn stale_entry_misses_within_window_check() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();

        cache.set("topics", &[], b"payload").unwrap();
        age_entry(&cache, "topics", &[], Duration::from_secs(3600));

        assert_eq!(cache.get("topics", &[], Duration::from_secs(600)), None);
        let age = cache.age("topics", &[]).unwrap();
        assert!(age >= Duration::from_secs(3599));
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path().join("nested")).unwrap();

        assert_eq!(cache.get("acls", &[], Duration::MAX), None);
        assert_eq!(cache.age("acls", &[]), None);
    }
}
