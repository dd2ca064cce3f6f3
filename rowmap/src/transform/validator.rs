//! Structural checks on a rule set, run before any record is touched.

use std::collections::HashMap;

use crate::error::{RuleError, RuleProblem};

use super::rule::Rule;

/// Check that a rule set is well-formed.
///
/// Reports, per rule index:
/// - an empty `to_key`
/// - a `to_key` already claimed by an earlier rule
/// - a rule with neither a generator nor a `from_key`
///
/// A rule can collect both a `to_key` problem and a source problem. An empty
/// result means the rule set is usable.
pub fn check_rules(rules: &[Rule]) -> Vec<RuleError> {
    let mut errors = Vec::new();
    let mut owners: HashMap<&str, usize> = HashMap::new();

    for (index, rule) in rules.iter().enumerate() {
        if rule.to_key.is_empty() {
            errors.push(RuleError::new(index, RuleProblem::MissingToKey));
        } else if let Some(&previous_index) = owners.get(rule.to_key.as_str()) {
            errors.push(RuleError::new(
                index,
                RuleProblem::DuplicateToKey {
                    to_key: rule.to_key.clone(),
                    previous_index,
                },
            ));
        } else {
            owners.insert(rule.to_key.as_str(), index);
        }

        if rule.generator.is_none() && rule.from_key.is_empty() {
            errors.push(RuleError::new(index, RuleProblem::NoSource));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::models::Record;
    use serde_json::json;

    #[test]
    fn test_valid_rules() {
        let rules = vec![
            Rule::new("name", "Name"),
            Rule::generated("Id", |_: &Record| Ok::<_, BoxError>(json!(1))),
        ];
        assert!(check_rules(&rules).is_empty());
    }

    #[test]
    fn test_duplicate_to_key_points_to_first_owner() {
        let rules = vec![
            Rule::new("a", "X"),
            Rule::new("b", "Y"),
            Rule::new("c", "X"),
            Rule::new("d", "X"),
        ];
        let errors = check_rules(&rules);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].index, 2);
        assert_eq!(
            errors[0].problem,
            RuleProblem::DuplicateToKey { to_key: "X".into(), previous_index: 0 }
        );
        assert_eq!(errors[1].index, 3);
        assert_eq!(
            errors[1].problem,
            RuleProblem::DuplicateToKey { to_key: "X".into(), previous_index: 0 }
        );
    }

    #[test]
    fn test_empty_to_key_is_not_registered() {
        let rules = vec![Rule::new("a", ""), Rule::new("b", "")];
        let errors = check_rules(&rules);

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.problem == RuleProblem::MissingToKey));
        assert_eq!(errors[0].index, 0);
        assert_eq!(errors[1].index, 1);
    }

    #[test]
    fn test_rule_collects_two_errors() {
        let rules = vec![Rule::default()];
        let errors = check_rules(&rules);

        assert_eq!(
            errors,
            vec![
                RuleError::new(0, RuleProblem::MissingToKey),
                RuleError::new(0, RuleProblem::NoSource),
            ]
        );
    }

    #[test]
    fn test_generator_without_from_key_is_fine() {
        let rule = Rule {
            to_key: "Total".into(),
            ..Rule::default()
        }
        .with_generator(|_: &Record| Ok::<_, BoxError>(json!(0)));
        assert!(check_rules(&[rule]).is_empty());
    }
}
