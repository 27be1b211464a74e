use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable overriding `cse` (`1`/`true` or `0`/`false`).
pub const ENV_CSE: &str = "CLIFFGEN_CSE";

/// Environment variable overriding `jit`.
pub const ENV_JIT: &str = "CLIFFGEN_JIT";

/// Everything needed to build an `Algebra`.
///
/// ```toml
/// p = 3
/// r = 1
/// cse = true
/// jit = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgebraConfig {
    /// Basis vectors squaring to +1.
    pub p: usize,
    /// Basis vectors squaring to -1.
    pub q: usize,
    /// Degenerate basis vectors (squaring to 0).
    pub r: usize,
    /// Label of the first basis vector; defaults to 0 when `r == 1`, else 1.
    pub start_index: Option<usize>,
    /// Common-subexpression elimination when compiling kernels.
    pub cse: bool,
    /// Native `f64` lowering of kernels.
    pub jit: bool,
    /// Cap on Shirokov inverse iterations; defaults to the representation size.
    pub max_inverse_iterations: Option<usize>,
}

impl Default for AlgebraConfig {
    fn default() -> Self {
        Self {
            p: 0,
            q: 0,
            r: 0,
            start_index: None,
            cse: true,
            jit: false,
            max_inverse_iterations: None,
        }
    }
}

impl AlgebraConfig {
    pub fn new(p: usize, q: usize, r: usize) -> Self {
        Self {
            p,
            q,
            r,
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CLIFFGEN_CSE` / `CLIFFGEN_JIT` when set to a recognizable flag.
    pub fn with_env_overrides(self) -> Self {
        let cse = std::env::var(ENV_CSE).ok();
        let jit = std::env::var(ENV_JIT).ok();
        self.with_overrides(cse.as_deref(), jit.as_deref())
    }

    fn with_overrides(mut self, cse: Option<&str>, jit: Option<&str>) -> Self {
        if let Some(flag) = cse.and_then(parse_flag) {
            self.cse = flag;
        }
        if let Some(flag) = jit.and_then(parse_flag) {
            self.jit = flag;
        }
        self
    }

    pub fn dimension(&self) -> usize {
        self.p + self.q + self.r
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!("ignoring unrecognized flag value '{other}'");
            None
        }
    }
}
