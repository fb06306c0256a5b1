//! Config validation: unknown-key detection with Levenshtein suggestions
//! and suspicious-value checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::ForecastConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for ForecastConfig.
///
/// Maintained by hand to match the structs in forecast_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [training]
        "training",
        "training.num_epochs",
        "training.epoch_freq",
        "training.plot_progress",
        "training.print_progress",
        "training.batch_size",
        "training.shuffle",
        "training.seed",
        "training.learning_rate",
        "training.max_grad_norm",
        // [scheduler]
        "scheduler",
        "scheduler.enabled",
        "scheduler.factor",
        "scheduler.patience",
        "scheduler.threshold",
        "scheduler.cooldown",
        "scheduler.min_lr",
        // [early_stopping]
        "early_stopping",
        "early_stopping.enabled",
        "early_stopping.patience",
        "early_stopping.min_delta",
        // [rollout]
        "rollout",
        "rollout.block_number",
        "rollout.mode",
        // [unscale]
        "unscale",
        "unscale.scale",
        "unscale.offset",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties go to the lexicographically smaller key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|&(dist, _)| dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Never fails: unparseable TOML yields no warnings and is reported by the
/// serde pass instead.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Suspicious Values
// ============================================================================

/// Values that are legal but probably not what the operator meant.
pub fn validate_ranges(config: &ForecastConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let t = &config.training;

    if t.epoch_freq > t.num_epochs {
        warnings.push(ValidationWarning {
            field: "training.epoch_freq".to_string(),
            message: format!(
                "epoch_freq = {} exceeds num_epochs = {}, progress will never be reported",
                t.epoch_freq, t.num_epochs
            ),
            suggestion: None,
        });
    }

    if t.learning_rate > 1.0 {
        warnings.push(ValidationWarning {
            field: "training.learning_rate".to_string(),
            message: format!("learning_rate = {} is unusually large", t.learning_rate),
            suggestion: None,
        });
    }

    if config.unscale.scale == 0.0 {
        warnings.push(ValidationWarning {
            field: "unscale.scale".to_string(),
            message: "unscale.scale = 0 maps every prediction to the offset".to_string(),
            suggestion: None,
        });
    }

    if config.scheduler.enabled
        && config.early_stopping.enabled
        && config.early_stopping.patience <= config.scheduler.patience
    {
        warnings.push(ValidationWarning {
            field: "early_stopping.patience".to_string(),
            message: format!(
                "early_stopping.patience = {} stops training before the scheduler (patience {}) can lower the learning rate",
                config.early_stopping.patience, config.scheduler.patience
            ),
            suggestion: None,
        });
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("epochs", "epochs"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("num_epoch", "num_epochs"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [training]
            num_epochs = 5
            [unscale]
            scale = 2.0
        "#
        .parse()
        .expect("toml");
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"training".to_string()));
        assert!(keys.contains(&"training.num_epochs".to_string()));
        assert!(keys.contains(&"unscale.scale".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
[training]
epoch_frq = 5
"#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "training.epoch_frq");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("training.epoch_freq"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let warnings = validate_unknown_keys(
            r#"
[training]
num_epochs = 10
learning_rate = 0.01

[scheduler]
factor = 0.5

[rollout]
block_number = 2
mode = "Test"
"#,
        );
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[plotting]\ndpi = 300\n");
        assert!(warnings.iter().any(|w| w.field == "plotting"));
        assert!(warnings.iter().any(|w| w.field == "plotting.dpi"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_have_no_range_warnings() {
        assert!(validate_ranges(&ForecastConfig::default()).is_empty());
    }

    #[test]
    fn test_epoch_freq_beyond_epochs_warns() {
        let mut config = ForecastConfig::default();
        config.training.num_epochs = 5;
        config.training.epoch_freq = 10;
        let warnings = validate_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "training.epoch_freq"));
    }
}
