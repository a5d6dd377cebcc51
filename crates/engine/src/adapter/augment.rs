//! Substitution of dashboard control values into metric expressions.

use agtable_types::Control;

/// Rewrites an expression template with the current control values.
pub trait ExpressionAugmenter: Send + Sync {
    fn augment(&self, expression: &str, controls: &[Control]) -> String;
}

/// Replaces every `$<control name>$` placeholder with the control's value.
///
/// Placeholders without a matching control are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlSubstitution;

impl ExpressionAugmenter for ControlSubstitution {
    fn augment(&self, expression: &str, controls: &[Control]) -> String {
        controls.iter().fold(expression.to_string(), |augmented, control| {
            augmented.replace(&format!("${}$", control.name), control.value.trim())
        })
    }
}
