use std::fmt;
use std::str::FromStr;

use gfxpipe_types::limits::{MAX_TABLE_NESTING_DEPTH, MAX_USER_DATA_REGS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Graphics IP version of the target GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GfxIpVersion {
    pub major: u32,
    pub minor: u32,
    pub stepping: u32,
}

impl GfxIpVersion {
    pub const fn new(major: u32, minor: u32, stepping: u32) -> Self {
        Self {
            major,
            minor,
            stepping,
        }
    }

    /// GS rings can only live in LDS from GFX7 on.
    pub fn supports_on_chip_gs(self) -> bool {
        self.major >= 7
    }
}

impl Default for GfxIpVersion {
    fn default() -> Self {
        Self::new(8, 0, 2)
    }
}

impl fmt::Display for GfxIpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.stepping)
    }
}

impl FromStr for GfxIpVersion {
    type Err = OptionsError;

    /// Accepts `major`, `major.minor` or `major.minor.stepping`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionsError::InvalidGfxIp(s.to_owned());
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32, OptionsError> {
            match parts.next() {
                Some(p) => p.trim().parse::<u32>().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let stepping = next(false)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(major, minor, stepping))
    }
}

/// Knobs that shape how a pipeline is compiled.
///
/// Defaults describe a GFX8 part with off-chip GS rings. Tools override individual fields via
/// [`CompileOptions::from_env`] or command-line flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub gfx_ip: GfxIpVersion,
    /// Keep the ES→GS and GS→VS rings in LDS. Ignored (with a debug log) before GFX7.
    pub gs_on_chip: bool,
    /// Accept graphics pipelines without a fragment stage and emit a null PS role for them.
    pub allow_null_fragment: bool,
    /// User-data SGPRs available to each hardware stage before nodes spill to memory.
    pub max_user_data_regs: u32,
    /// Deepest descriptor-table nesting the merger will recurse into.
    pub max_table_nesting_depth: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            gfx_ip: GfxIpVersion::default(),
            gs_on_chip: false,
            allow_null_fragment: true,
            max_user_data_regs: MAX_USER_DATA_REGS,
            max_table_nesting_depth: MAX_TABLE_NESTING_DEPTH,
        }
    }
}

pub const ENV_GFX_IP: &str = "GFXPIPE_GFX_IP";
pub const ENV_GS_ON_CHIP: &str = "GFXPIPE_GS_ON_CHIP";
pub const ENV_ALLOW_NULL_FS: &str = "GFXPIPE_ALLOW_NULL_FS";
pub const ENV_MAX_USER_DATA_REGS: &str = "GFXPIPE_MAX_USER_DATA_REGS";
pub const ENV_MAX_TABLE_DEPTH: &str = "GFXPIPE_MAX_TABLE_DEPTH";

impl CompileOptions {
    /// Defaults overridden by any `GFXPIPE_*` variables present in the process environment.
    pub fn from_env() -> Result<Self, OptionsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CompileOptions::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OptionsError> {
        let mut options = Self::default();

        if let Some(raw) = lookup(ENV_GFX_IP) {
            options.gfx_ip = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_GS_ON_CHIP) {
            options.gs_on_chip = parse_bool(ENV_GS_ON_CHIP, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ALLOW_NULL_FS) {
            options.allow_null_fragment = parse_bool(ENV_ALLOW_NULL_FS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_USER_DATA_REGS) {
            options.max_user_data_regs = parse_u32(ENV_MAX_USER_DATA_REGS, &raw)?;
            if options.max_user_data_regs == 0 || options.max_user_data_regs > MAX_USER_DATA_REGS
            {
                return Err(OptionsError::OutOfRange {
                    var: ENV_MAX_USER_DATA_REGS,
                    value: options.max_user_data_regs,
                    max: MAX_USER_DATA_REGS,
                });
            }
        }
        if let Some(raw) = lookup(ENV_MAX_TABLE_DEPTH) {
            options.max_table_nesting_depth = parse_u32(ENV_MAX_TABLE_DEPTH, &raw)?;
            if options.max_table_nesting_depth == 0 {
                return Err(OptionsError::InvalidValue {
                    var: ENV_MAX_TABLE_DEPTH,
                    value: raw,
                });
            }
        }

        Ok(options)
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, OptionsError> {
    let v = raw.trim();
    if v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
    {
        Ok(true)
    } else if v == "0"
        || v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Ok(false)
    } else {
        Err(OptionsError::InvalidValue {
            var,
            value: raw.to_owned(),
        })
    }
}

fn parse_u32(var: &'static str, raw: &str) -> Result<u32, OptionsError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| OptionsError::InvalidValue {
            var,
            value: raw.to_owned(),
        })
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("invalid GFX IP version {0:?} (expected major[.minor[.stepping]])")]
    InvalidGfxIp(String),

    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{var}={value} is out of range (must be 1..={max})")]
    OutOfRange {
        var: &'static str,
        value: u32,
        max: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn gfx_ip_parses_partial_versions() {
        assert_eq!("9".parse::<GfxIpVersion>().unwrap(), GfxIpVersion::new(9, 0, 0));
        assert_eq!(
            "7.1".parse::<GfxIpVersion>().unwrap(),
            GfxIpVersion::new(7, 1, 0)
        );
        assert_eq!(
            " 8.0.3 ".parse::<GfxIpVersion>().unwrap(),
            GfxIpVersion::new(8, 0, 3)
        );
        assert!("".parse::<GfxIpVersion>().is_err());
        assert!("8.x".parse::<GfxIpVersion>().is_err());
        assert!("8.0.1.4".parse::<GfxIpVersion>().is_err());
        assert_eq!(GfxIpVersion::new(6, 0, 1).to_string(), "6.0.1");
    }

    #[test]
    fn env_overrides_defaults() {
        let options = CompileOptions::from_lookup(lookup(&[
            (ENV_GFX_IP, "6.0.1"),
            (ENV_GS_ON_CHIP, "yes"),
            (ENV_ALLOW_NULL_FS, "off"),
            (ENV_MAX_USER_DATA_REGS, "8"),
            (ENV_MAX_TABLE_DEPTH, "2"),
        ]))
        .unwrap();
        assert_eq!(
            options,
            CompileOptions {
                gfx_ip: GfxIpVersion::new(6, 0, 1),
                gs_on_chip: true,
                allow_null_fragment: false,
                max_user_data_regs: 8,
                max_table_nesting_depth: 2,
            }
        );
    }

    #[test]
    fn empty_env_yields_defaults() {
        let options = CompileOptions::from_lookup(lookup(&[])).unwrap();
        assert_eq!(options, CompileOptions::default());
    }

    #[test]
    fn malformed_env_values_are_rejected() {
        let err = CompileOptions::from_lookup(lookup(&[(ENV_GS_ON_CHIP, "maybe")])).unwrap_err();
        assert_eq!(
            err,
            OptionsError::InvalidValue {
                var: ENV_GS_ON_CHIP,
                value: "maybe".into()
            }
        );

        let err =
            CompileOptions::from_lookup(lookup(&[(ENV_MAX_USER_DATA_REGS, "32")])).unwrap_err();
        assert!(matches!(err, OptionsError::OutOfRange { value: 32, .. }), "{err:?}");

        let err = CompileOptions::from_lookup(lookup(&[(ENV_MAX_TABLE_DEPTH, "0")])).unwrap_err();
        assert!(matches!(err, OptionsError::InvalidValue { .. }), "{err:?}");
    }
}
