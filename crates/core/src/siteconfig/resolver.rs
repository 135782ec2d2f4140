use crate::siteconfig::directives::SiteConfig;
use crate::siteconfig::parser::ConfigParser;
use crate::siteconfig::store::ConfigFileStore;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

const MAX_HOST_LENGTH: usize = 200;
const GLOBAL_HOST: &str = "global";

static DEFAULT_HOSTNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+(\.[a-z0-9-]+)*$").unwrap());

/// Configuration for [`ConfigResolver`]
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Rule-file directories, in priority order
    pub directories: Vec<PathBuf>,
    /// Override for the hostname validation pattern
    pub hostname_pattern: Option<String>,
}

/// Resolves per-host site configs from rule files.
///
/// Lookup tries the exact host first, then one wildcard level
/// (`.rest-of-host.txt`). `build_for_host` returns the site config merged
/// with `global.txt` and caches the result under `<host>.merged`. The
/// cache tolerates concurrent readers; a build lock keeps at most one
/// builder per key, and published entries are immutable.
pub struct ConfigResolver {
    store: ConfigFileStore,
    hostname_re: Regex,
    cache: RwLock<HashMap<String, Arc<SiteConfig>>>,
    build_lock: Mutex<()>,
}

impl ConfigResolver {
    pub fn new(store: ConfigFileStore) -> Self {
        Self {
            store,
            hostname_re: DEFAULT_HOSTNAME_RE.clone(),
            cache: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        let store = ConfigFileStore::new(&config.directories);
        let hostname_re = config
            .hostname_pattern
            .as_deref()
            .and_then(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!(%err, "invalid hostname pattern, using default");
                    None
                }
            })
            .unwrap_or_else(|| DEFAULT_HOSTNAME_RE.clone());

        Self {
            store,
            hostname_re,
            cache: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
        }
    }

    /// Return the merged config (site-specific plus global) for a host.
    ///
    /// Results are cached under `<host>.merged` for the life of the
    /// process; repeated calls return the same entry. A host that fails
    /// validation or has no rule file still yields a usable config (the
    /// global defaults, or an empty config).
    pub fn build_for_host(&self, host: &str) -> Arc<SiteConfig> {
        let key = normalize_host(host);
        let merged_key = format!("{key}.merged");

        if let Some(hit) = self.cached(&merged_key) {
            return hit;
        }

        let _guard = self.build_lock.lock().unwrap_or_else(|e| e.into_inner());

        // another builder may have published while we waited
        if let Some(hit) = self.cached(&merged_key) {
            return hit;
        }

        let mut config = self
            .load_site_config(&key, false)
            .map(|arc| (*arc).clone())
            .unwrap_or_default();

        if config.should_autodetect() {
            if let Some(global) = self.load_site_config(GLOBAL_HOST, true) {
                config.merge(&global);
            }
        }

        // merged entries carry no source file
        config.cache_key = None;

        let arc = Arc::new(config);
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(merged_key, arc.clone());
        arc
    }

    /// Return the unmerged site-specific config for a host, or `None`.
    ///
    /// Tries `<host>.txt`, then (unless `exact_host_match`) one wildcard
    /// level `.rest.txt`. The first match wins and its host string becomes
    /// the `cache_key`. A rule file with zero usable lines counts as no
    /// config.
    pub fn load_site_config(&self, host: &str, exact_host_match: bool) -> Option<Arc<SiteConfig>> {
        let host = normalize_host(host);
        if !self.valid_host(&host) {
            debug!(host, "rejected hostname");
            return None;
        }

        let mut tries = vec![host.clone()];
        if !exact_host_match {
            if let Some((_, rest)) = host.split_once('.') {
                if !rest.is_empty() {
                    tries.push(format!(".{rest}"));
                }
            }
        }

        for key in &tries {
            if let Some(hit) = self.cached(key) {
                return Some(hit);
            }
        }

        for key in &tries {
            let Some(path) = self.store.lookup(&format!("{key}.txt")) else {
                continue;
            };

            let mut config = match ConfigParser::parse_file(path) {
                Ok(config) => config,
                Err(err) => {
                    warn!(path = %path.display(), %err, "failed to read rule file");
                    continue;
                }
            };

            if config.is_empty() {
                debug!(path = %path.display(), "rule file has no usable lines");
                continue;
            }

            if config.cache_key.is_none() {
                config.cache_key = Some(key.clone());
            }
            let cache_key = normalize_host(config.cache_key.as_deref().unwrap_or(key));

            let arc = Arc::new(config);
            self.cache
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(cache_key, arc.clone());
            return Some(arc);
        }

        None
    }

    fn cached(&self, key: &str) -> Option<Arc<SiteConfig>> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn valid_host(&self, host: &str) -> bool {
        !host.is_empty() && host.len() <= MAX_HOST_LENGTH && self.hostname_re.is_match(host)
    }
}

/// Lowercase a hostname and strip a leading `www.`.
///
/// Applied before every lookup and before every cache insertion so that
/// `H`, `WWW.H`, `h`, and `www.h` all resolve to the same entry.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}
