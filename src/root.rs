//! Game installation root
//!
//! A [`Root`] validates an installation directory and owns the identity
//! context every configuration lookup is resolved against:
//!
//! ```text
//! Empty --load(dir)--> Valid | Invalid
//!   ^                        |
//!   +--------clear()---------+
//! ```
//!
//! Loading checks the directory, the required configuration, detects the
//! platform from its marker files and then reads the platform metadata
//! (banner and disc header on GameCube, `IP.BIN` on Dreamcast). Every check
//! logs one line and the first failure stops the sequence.

use crate::compression::CompressionMethod;
use crate::config::{Config, ConfigSource, Value};
use crate::error::{AlxError, Result};
use crate::io::Endianness;
use crate::metadata::{BnrFile, HdrFile, IpFile};
use crate::pattern;
use crate::resolver::{ContextFields, Resolver, ANY};
use crate::text::TextEncoding;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Known platforms in detection order
pub const PLATFORMS: [(&str, &str); 2] = [("DC", "Dreamcast"), ("GC", "GameCube")];

/// Countries an installation may belong to
pub const COUNTRIES: [&str; 3] = ["EU", "JP", "US"];

/// Attributes that must be defined for at least one platform
const REQUIRED_ATTRIBUTES: [&str; 9] = [
    "platform_files",
    "platform_endianness",
    "platform_compressions",
    "region_ids",
    "country_ids",
    "maker_ids",
    "maker_names",
    "product_ids",
    "product_names",
];

static ROOT: OnceLock<RwLock<Root>> = OnceLock::new();

/// Validation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootState {
    #[default]
    Empty,
    Valid,
    Invalid,
}

/// Identity of an installation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub dirname: PathBuf,
    pub luid: String,
    pub platform_id: String,
    pub platform_name: String,
    pub product_id: String,
    pub product_name: String,
    pub product_version: String,
    pub product_date: String,
    pub region_id: String,
    pub region_name: String,
    pub country_id: String,
    pub maker_id: String,
    pub maker_name: String,
    pub description: String,
}

impl Identity {
    fn context(&self) -> Vec<String> {
        ContextFields {
            platform_id: &self.platform_id,
            region_id: &self.region_id,
            country_id: &self.country_id,
            product_id: &self.product_id,
            product_date: &self.product_date,
            description: &self.description,
        }
        .build()
    }
}

/// Validated game installation
#[derive(Debug)]
pub struct Root {
    config: Arc<Config>,
    identity: Identity,
    state: RootState,
    resolver: Resolver,
}

impl Root {
    /// Create an empty root
    pub fn new(config: Arc<Config>) -> Self {
        Root {
            config,
            identity: Identity::default(),
            state: RootState::Empty,
            resolver: Resolver::new(),
        }
    }

    /// Install the process-wide root. Later calls keep the first instance.
    pub fn init(config: Arc<Config>) -> &'static RwLock<Root> {
        ROOT.get_or_init(|| RwLock::new(Root::new(config)))
    }

    /// The process-wide root, if installed
    pub fn global() -> Option<&'static RwLock<Root>> {
        ROOT.get()
    }

    /// Reset every identity field and forget cached resolutions
    pub fn clear(&mut self) {
        self.identity = Identity::default();
        self.state = RootState::Empty;
        self.refresh();
    }

    /// Validate the installation at `dirname`
    pub fn load<P: AsRef<Path>>(&mut self, dirname: P) -> bool {
        self.clear();

        let mut result = self.init_dir(dirname.as_ref())
            && self.init_config()
            && self.init_platform();

        result = result
            && match self.identity.platform_id.as_str() {
                "DC" => self.init_ip(),
                "GC" => self.init_bnr() && self.init_hdr(),
                _ => false,
            };

        self.state = if result {
            RootState::Valid
        } else {
            RootState::Invalid
        };
        result
    }

    /// Fail with `InstallationInvalid` unless the root is valid
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(AlxError::InstallationInvalid(format!(
                "{} is not a validated installation",
                self.identity.dirname.display()
            )))
        }
    }

    pub fn is_valid(&self) -> bool {
        self.state == RootState::Valid
    }

    pub fn state(&self) -> RootState {
        self.state
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Current resolution context
    pub fn context(&self) -> &[String] {
        self.resolver.context()
    }

    pub fn dirname(&self) -> &Path {
        &self.identity.dirname
    }

    pub fn is_dc(&self) -> bool {
        self.identity.platform_id == "DC"
    }

    pub fn is_gc(&self) -> bool {
        self.identity.platform_id == "GC"
    }

    pub fn is_eu(&self) -> bool {
        self.identity.country_id == "EU"
    }

    pub fn is_jp(&self) -> bool {
        self.identity.country_id == "JP"
    }

    pub fn is_us(&self) -> bool {
        self.identity.country_id == "US"
    }

    /// Byte order of the platform
    pub fn endianness(&self) -> Result<Endianness> {
        let name = self.require_str(&self.config.cfg, "platform_endianness")?;
        Endianness::from_name(&name)
    }

    pub fn is_big_endian(&self) -> bool {
        matches!(self.endianness(), Ok(Endianness::Big))
    }

    pub fn is_little_endian(&self) -> bool {
        matches!(self.endianness(), Ok(Endianness::Little))
    }

    /// Container codec of the platform
    pub fn compression(&self) -> Result<CompressionMethod> {
        let name = self.require_str(&self.config.cfg, "platform_compressions")?;
        CompressionMethod::from_name(&name)
    }

    /// Text encoding of the release, UTF-8 unless configured
    pub fn text_encoding(&self) -> Result<TextEncoding> {
        match self.cfg("platform_encodings") {
            None => Ok(TextEncoding::default()),
            Some(Value::String(label)) => TextEncoding::from_label(label),
            Some(other) => Err(AlxError::TypeMismatch(format!(
                "CFG.platform_encodings is {}, expected a string",
                other.type_str()
            ))),
        }
    }

    /// Resolve an attribute of `source` for the current context
    pub fn etc<'a>(&self, source: &'a dyn ConfigSource, attribute: &str, extension: &str) -> Option<&'a Value> {
        self.resolver.resolve(source, attribute, extension)
    }

    pub fn cfg(&self, attribute: &str) -> Option<&Value> {
        self.etc(&self.config.cfg, attribute, ANY)
    }

    pub fn dscrptr(&self, attribute: &str) -> Option<&Value> {
        self.etc(&self.config.dscrptr, attribute, ANY)
    }

    pub fn voc(&self, attribute: &str) -> Option<&Value> {
        self.etc(&self.config.voc, attribute, ANY)
    }

    /// Resolve an attribute, failing with `ConfigurationMissing`
    pub fn require<'a>(&self, source: &'a dyn ConfigSource, attribute: &str) -> Result<&'a Value> {
        self.etc(source, attribute, ANY)
            .ok_or_else(|| self.missing(source, attribute))
    }

    /// Resolve a string attribute, failing with `ConfigurationMissing`
    pub fn require_str(&self, source: &dyn ConfigSource, attribute: &str) -> Result<String> {
        match self.require(source, attribute)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(AlxError::TypeMismatch(format!(
                "{}.{} is {}, expected a string",
                source.symbol(),
                attribute,
                other.type_str()
            ))),
        }
    }

    fn missing(&self, source: &dyn ConfigSource, attribute: &str) -> AlxError {
        AlxError::ConfigurationMissing {
            symbol: source.symbol().to_string(),
            attribute: attribute.to_string(),
            context: self.context().join("-"),
        }
    }

    /// Path relative to the installation directory
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.identity.dirname.join(path)
    }

    /// Path of a `CFG` attribute relative to the installation directory
    pub fn join_cfg(&self, attribute: &str) -> Result<PathBuf> {
        let path = self.require_str(&self.config.cfg, attribute)?;
        Ok(self.join(path))
    }

    /// First path matching `pattern`, or the joined pattern when none does
    pub fn glob(&self, pattern: &str) -> PathBuf {
        self.glob_all(pattern)
            .into_iter()
            .next()
            .unwrap_or_else(|| self.join(pattern))
    }

    /// Every path matching `pattern`
    pub fn glob_all(&self, pattern: &str) -> Vec<PathBuf> {
        pattern::glob(&self.identity.dirname, pattern)
    }

    /// Serialize the identity of a valid root
    pub fn snapshot(&self) -> Result<String> {
        self.ensure_valid()?;
        Ok(serde_json::to_string(&self.identity)?)
    }

    /// Restore a root from [`Root::snapshot`] output without revalidating
    pub fn restore(&mut self, snapshot: &str) -> Result<()> {
        let identity: Identity = serde_json::from_str(snapshot)?;
        self.clear();
        self.identity = identity;
        self.state = RootState::Valid;
        self.refresh();
        Ok(())
    }

    /// Rebuild the identity context
    fn refresh(&mut self) {
        let context = self.identity.context();
        self.resolver.refresh(context);
    }

    fn word(&self, key: &str, fallback: &str) -> String {
        self.voc(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string()
    }

    /// Log the outcome of one check and pass it through
    fn report(&self, check: &str, ok: bool, value: &str) -> bool {
        if ok {
            info!("{} - {} ({})", check, self.word("valid", "valid"), value);
        } else {
            error!("{} - {} ({})", check, self.word("incorrect", "incorrect"), value);
        }
        ok
    }

    fn has_dir(&self, path: &Path) -> bool {
        let ok = path.is_dir();
        let check = format!("Check directory {}", path.display());
        if ok {
            info!("{} - {}", check, self.word("exists", "exists"));
        } else {
            error!("{} - {}", check, self.word("not_found", "not found"));
        }
        ok
    }

    fn has_file(&self, path: &Path) -> bool {
        let ok = path.is_file();
        let check = format!("Check file {}", path.display());
        if ok {
            info!("{} - {}", check, self.word("exists", "exists"));
        } else {
            error!("{} - {}", check, self.word("not_found", "not found"));
        }
        ok
    }

    /// Test `value` against the regex resolved from `CFG.<attribute>`
    fn matches_cfg(&self, attribute: &str, value: &str) -> bool {
        let Some(pattern) = self.cfg(attribute).and_then(Value::as_str) else {
            error!("Check CFG.{} - {}", attribute, self.word("not_found", "not found"));
            return false;
        };

        match Regex::new(pattern) {
            Ok(re) => re.is_match(value),
            Err(e) => {
                error!("Check CFG.{} - {} ({})", attribute, self.word("incorrect", "incorrect"), e);
                false
            }
        }
    }

    fn resolve_string(&self, attribute: &str) -> String {
        self.cfg(attribute)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn init_dir(&mut self, dirname: &Path) -> bool {
        self.identity.dirname = dirname.to_path_buf();
        self.identity.luid = format!(
            "{:x}",
            Sha256::digest(dirname.to_string_lossy().as_bytes())
        );

        if !self.has_dir(dirname) {
            return false;
        }

        match self.cfg("root_dir").and_then(Value::as_str) {
            Some(root_dir) => {
                let path = dirname.join(root_dir);
                self.has_dir(&path)
            }
            None => {
                error!("Check CFG.root_dir - {}", self.word("not_found", "not found"));
                false
            }
        }
    }

    fn init_config(&mut self) -> bool {
        let config = Arc::clone(&self.config);
        REQUIRED_ATTRIBUTES
            .iter()
            .all(|attribute| self.check_etc(&config.cfg, attribute))
    }

    /// An attribute is defined for a platform when one of its keys starts
    /// with that platform ID. Scalars are defined for every platform.
    fn check_etc(&self, source: &dyn ConfigSource, attribute: &str) -> bool {
        let ids: Vec<&str> = match source.get(attribute) {
            Some(Value::Table(table)) => PLATFORMS
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| table.keys().any(|key| key.split('-').next() == Some(*id)))
                .collect(),
            Some(_) => PLATFORMS.iter().map(|(id, _)| *id).collect(),
            None => Vec::new(),
        };

        let check = format!("Check {}.{}", source.symbol(), attribute);
        if ids.is_empty() {
            error!("{} - {}", check, self.word("incorrect", "incorrect"));
            false
        } else {
            info!("{} - {} ({})", check, self.word("valid", "valid"), ids.join(", "));
            true
        }
    }

    fn init_platform(&mut self) -> bool {
        let config = Arc::clone(&self.config);
        let files = config.cfg.get("platform_files").and_then(Value::as_table);

        let mut result = false;
        for (id, name) in PLATFORMS {
            let patterns: Vec<&str> = files
                .and_then(|table| table.get(id))
                .and_then(Value::as_array)
                .map(|list| list.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            result = !patterns.is_empty()
                && patterns.iter().all(|pattern| {
                    let check = format!("Check file {}", self.join(pattern).display());
                    let found = !self.glob_all(pattern).is_empty();
                    if found {
                        info!("{} - {}", check, self.word("exists", "exists"));
                    } else {
                        warn!("{} - {}", check, self.word("not_found", "not found"));
                    }
                    found
                });

            self.identity.platform_id = id.to_string();
            self.identity.platform_name = name.to_string();
            self.refresh();

            if result {
                break;
            }
        }

        if result {
            info!(
                "Check platform {} - {} ({})",
                self.identity.platform_id,
                self.word("identified", "identified"),
                self.identity.platform_name
            );
        } else {
            let ids: Vec<&str> = PLATFORMS.iter().map(|(id, _)| *id).collect();
            error!(
                "Check platform {} - {}",
                ids.join(", "),
                self.word("not_matched", "not matched")
            );
        }

        result
    }

    fn init_bnr(&mut self) -> bool {
        let Ok(path) = self.join_cfg("bnr_file") else {
            error!("Check CFG.bnr_file - {}", self.word("not_found", "not found"));
            return false;
        };
        if !self.has_file(&path) {
            return false;
        }

        let bnr = match BnrFile::load(&path) {
            Ok(bnr) => bnr,
            Err(e) => {
                error!("Check BNR {} - {}", path.display(), e);
                return false;
            }
        };

        self.identity.product_name = bnr.product_name;
        self.identity.maker_name = bnr.maker_name;
        self.identity.description = bnr.description;
        self.refresh();

        let product_name = self.identity.product_name.clone();
        let maker_name = self.identity.maker_name.clone();

        self.report(
            "Check BNR product name",
            self.matches_cfg("product_names", &product_name),
            &product_name,
        ) && self.report(
            "Check BNR maker name",
            self.matches_cfg("maker_names", &maker_name),
            &maker_name,
        )
    }

    fn init_hdr(&mut self) -> bool {
        let Ok(path) = self.join_cfg("hdr_file") else {
            error!("Check CFG.hdr_file - {}", self.word("not_found", "not found"));
            return false;
        };
        if !self.has_file(&path) {
            return false;
        }

        let hdr = match HdrFile::load(&path) {
            Ok(hdr) => hdr,
            Err(e) => {
                error!("Check HDR {} - {}", path.display(), e);
                return false;
            }
        };

        self.identity.product_id = hdr.product_id.clone();
        self.identity.region_id = hdr.region_id.clone();
        self.refresh();

        self.identity.region_name = self.resolve_string("region_ids");
        self.identity.country_id = self.resolve_string("country_ids");
        self.identity.maker_id = hdr.maker_id.clone();
        self.refresh();

        let id = self.identity.clone();

        self.report(
            "Check HDR product ID",
            self.matches_cfg("product_ids", &id.product_id),
            &id.product_id,
        ) && self.report("Check HDR region ID", !id.region_name.is_empty(), &id.region_id)
            && self.report("Check HDR region name", true, &id.region_name)
            && self.report(
                "Check HDR country ID",
                COUNTRIES.contains(&id.country_id.as_str()),
                &id.country_id,
            )
            && self.report(
                "Check HDR maker ID",
                self.matches_cfg("maker_ids", &id.maker_id),
                &id.maker_id,
            )
            && self.report(
                "Check HDR product name",
                self.matches_cfg("product_names", &hdr.product_name),
                &hdr.product_name,
            )
    }

    fn init_ip(&mut self) -> bool {
        let Ok(path) = self.join_cfg("ip_file") else {
            error!("Check CFG.ip_file - {}", self.word("not_found", "not found"));
            return false;
        };
        if !self.has_file(&path) {
            return false;
        }

        let ip = match IpFile::load(&path) {
            Ok(ip) => ip,
            Err(e) => {
                error!("Check IP {} - {}", path.display(), e);
                return false;
            }
        };

        self.identity.product_id = ip.product_id;
        self.identity.product_name = ip.product_name;
        self.identity.product_version = ip.product_version;
        self.identity.product_date = ip.product_date;
        self.identity.region_id = ip.region_id;
        self.identity.maker_id = ip.maker_id;
        self.identity.maker_name = ip.maker_name;
        self.identity.description = ip.description;
        self.refresh();

        self.identity.region_name = self.resolve_string("region_ids");
        self.identity.country_id = self.resolve_string("country_ids");
        self.refresh();

        let id = self.identity.clone();
        let date_ok = chrono::NaiveDate::parse_from_str(&id.product_date, "%Y%m%d").is_ok();

        self.report(
            "Check IP product ID",
            self.matches_cfg("product_ids", &id.product_id),
            &id.product_id,
        ) && self.report(
            "Check IP product name",
            self.matches_cfg("product_names", &id.product_name),
            &id.product_name,
        ) && self.report("Check IP product version", true, &id.product_version)
            && self.report("Check IP product date", date_ok, &id.product_date)
            && self.report("Check IP region ID", !id.region_name.is_empty(), &id.region_id)
            && self.report("Check IP region name", true, &id.region_name)
            && self.report(
                "Check IP maker ID",
                self.matches_cfg("maker_ids", &id.maker_id),
                &id.maker_id,
            )
            && self.report(
                "Check IP maker name",
                self.matches_cfg("maker_names", &id.maker_name),
                &id.maker_name,
            )
            && self.report(
                "Check IP country ID",
                COUNTRIES.contains(&id.country_id.as_str()),
                &id.country_id,
            )
            && self.report("Check IP description", true, &id.description)
    }
}
