//! Architecture of the model the animation depicts

use serde::{Deserialize, Serialize};

/// How many layers and heads the canvas actually draws; the logical model
/// is usually larger and only a subset is shown.
pub const MAX_VISIBLE_LAYERS: usize = 6;
/// Visible attention heads per layer, capped the same way as layers.
pub const MAX_VISIBLE_HEADS: usize = 6;

/// Dimensions of the transformer portrayed by the visualization.
///
/// None of these numbers drive any real computation; they size the drawn
/// architecture and feed the advanced-mode labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of transformer layers
    pub num_layers: usize,
    /// Attention heads per layer
    pub num_heads: usize,
    /// Hidden (embedding) dimension
    pub hidden_dim: usize,
    /// Feed-forward inner dimension
    pub ffn_dim: usize,
    /// Vocabulary size
    pub vocab_size: usize,
}

impl ModelConfig {
    /// Create a configuration with explicit dimensions
    pub fn new(
        num_layers: usize,
        num_heads: usize,
        hidden_dim: usize,
        ffn_dim: usize,
        vocab_size: usize,
    ) -> Self {
        Self {
            num_layers,
            num_heads,
            hidden_dim,
            ffn_dim,
            vocab_size,
        }
    }

    /// Layer count actually drawn on the canvas
    pub fn visible_layers(&self) -> usize {
        self.num_layers.min(MAX_VISIBLE_LAYERS)
    }

    /// Head count actually drawn per layer
    pub fn visible_heads(&self) -> usize {
        self.num_heads.min(MAX_VISIBLE_HEADS)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.num_layers == 0 {
            return Err("num_layers must be > 0".to_string());
        }

        if self.num_heads == 0 {
            return Err("num_heads must be > 0".to_string());
        }

        if self.hidden_dim == 0 {
            return Err("hidden_dim must be > 0".to_string());
        }

        if self.ffn_dim == 0 {
            return Err("ffn_dim must be > 0".to_string());
        }

        if self.vocab_size == 0 {
            return Err("vocab_size must be > 0".to_string());
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        // GPT-3 class figures, the architecture the animation narrates
        Self::new(24, 16, 4096, 16384, 50000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ModelConfig::default();
        assert_eq!(config.num_layers, 24);
        assert_eq!(config.num_heads, 16);
        assert_eq!(config.hidden_dim, 4096);
        assert_eq!(config.ffn_dim, 16384);
        assert_eq!(config.vocab_size, 50000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_visible_counts_capped() {
        let config = ModelConfig::default();
        assert_eq!(config.visible_layers(), 6);
        assert_eq!(config.visible_heads(), 6);
    }

    #[test]
    fn test_visible_counts_below_cap() {
        let config = ModelConfig::new(4, 2, 64, 256, 1000);
        assert_eq!(config.visible_layers(), 4);
        assert_eq!(config.visible_heads(), 2);
    }

    #[test]
    fn test_validate_rejects_zero_layers() {
        let config = ModelConfig {
            num_layers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_vocab() {
        let config = ModelConfig {
            vocab_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ModelConfig::default();
        let json = config.to_json().unwrap();
        let restored = ModelConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(ModelConfig::from_json("not json").is_err());
    }
}
