//! Objective weights handed to the solver verbatim.

use serde::{Deserialize, Serialize};

use crate::error::{WorkspaceError, WorkspaceResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightageConfig {
    pub preference: f64,
    pub seniority: f64,
    pub elective_shortfall_penalty: f64,
    pub core_shortfall_penalty: f64,
}

impl Default for WeightageConfig {
    fn default() -> Self {
        Self {
            preference: 1.0,
            seniority: 1.0,
            elective_shortfall_penalty: 10.0,
            core_shortfall_penalty: 10.0,
        }
    }
}

impl WeightageConfig {
    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> WorkspaceResult<()> {
        let fields = [
            ("preference", self.preference),
            ("seniority", self.seniority),
            ("elective_shortfall_penalty", self.elective_shortfall_penalty),
            ("core_shortfall_penalty", self.core_shortfall_penalty),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(WorkspaceError::validation(format!(
                    "Weightage '{}' must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_serialize_in_field_order() {
        let json = serde_json::to_string(&WeightageConfig::default()).unwrap();
        assert_eq!(
            json,
            r#"{"preference":1.0,"seniority":1.0,"elective_shortfall_penalty":10.0,"core_shortfall_penalty":10.0}"#
        );
    }

    #[test]
    fn test_validate() {
        assert!(WeightageConfig::default().validate().is_ok());
        let negative = WeightageConfig {
            seniority: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
        let nan = WeightageConfig {
            preference: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }
}
