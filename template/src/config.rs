//! Template configuration.
//!
//! Typed settings for region matching and CPlan construction, built with bon
//! and optionally read from the environment.

use bon::bon;

/// Default output extent an outer-product multiply must exceed in both
/// dimensions before a region opens.
pub const DEFAULT_OUTER_PRODUCT_THRESHOLD: u64 = 256;

/// Configuration shared by all fusion templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Inline scalar literals into the kernel body instead of binding them
    /// as inputs.
    pub compile_literals: bool,
    /// Exclusive lower bound on both output extents of an opening
    /// outer-product multiply.
    pub outer_product_threshold: u64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self { compile_literals: true, outer_product_threshold: DEFAULT_OUTER_PRODUCT_THRESHOLD }
    }
}

#[bon]
impl TemplateConfig {
    /// Create a template configuration with builder pattern.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(default = true)] compile_literals: bool,
        #[builder(default = DEFAULT_OUTER_PRODUCT_THRESHOLD)] outer_product_threshold: u64,
    ) -> Self {
        Self { compile_literals, outer_product_threshold }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KERNFUSE_COMPILE_LITERALS=0` - Bind literals as inputs instead of inlining them
    /// * `KERNFUSE_OUTER_THRESHOLD` - Outer-product opening threshold (default: 256)
    pub fn from_env() -> Self {
        let compile_literals = std::env::var("KERNFUSE_COMPILE_LITERALS").map_or(true, |v| v != "0");
        let outer_product_threshold = std::env::var("KERNFUSE_OUTER_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_OUTER_PRODUCT_THRESHOLD);

        Self { compile_literals, outer_product_threshold }
    }
}
