//! End-to-end conversion scenarios through the public API.

use rowmap::{
    check_rules, convert, BoxError, CellErrorKind, Diagnostics, Record, Rule, RuleProblem, RuleSet,
};
use serde_json::{json, Value};

fn records(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| v.as_object().cloned().expect("record must be an object"))
        .collect()
}

fn to_int(value: &Value) -> Result<Value, BoxError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => {
            let n: i64 = s.trim().parse()?;
            Ok(json!(n))
        }
        other => Err(format!("unsupported value {other}").into()),
    }
}

fn summary(diagnostics: &Diagnostics) -> (usize, Vec<usize>, Vec<Vec<CellErrorKind>>) {
    (
        diagnostics.blank_row_count,
        diagnostics.row_errors.iter().map(|r| r.index).collect(),
        diagnostics
            .row_errors
            .iter()
            .map(|r| r.cell_errors.iter().map(|c| c.kind).collect())
            .collect(),
    )
}

#[test]
fn name_and_age_scenario() {
    let rules = vec![
        Rule::new("name", "Name").required(),
        Rule::new("age", "Age")
            .with_default(|| json!(0))
            .with_converter(to_int),
    ];
    let input = records(vec![
        json!({"name": "Ann", "age": "30"}),
        json!({"name": "Bob"}),
    ]);

    let (output, diagnostics) = convert(&input, &rules);

    assert_eq!(
        output,
        records(vec![
            json!({"Name": "Ann", "Age": 30}),
            json!({"Name": "Bob", "Age": 0}),
        ])
    );
    assert_eq!(diagnostics.blank_row_count, 0);
    assert!(!diagnostics.has_row_errors());
    assert!(!diagnostics.has_rule_errors());
}

#[test]
fn duplicate_to_key_stops_everything() {
    let rules = vec![
        Rule::new("a", "A"),
        Rule::new("b", "Shared"),
        Rule::new("c", "C"),
        Rule::new("d", "Shared"),
    ];
    let input = records(vec![json!({"a": 1, "b": 2, "c": 3, "d": 4})]);

    let errors = check_rules(&rules);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].index, 3);
    assert_eq!(
        errors[0].problem,
        RuleProblem::DuplicateToKey { to_key: "Shared".into(), previous_index: 1 }
    );

    let (output, diagnostics) = convert(&input, &rules);
    assert!(output.is_empty());
    assert_eq!(diagnostics.rule_errors, errors);
    assert!(diagnostics.row_errors.is_empty());
    assert_eq!(diagnostics.blank_row_count, 0);
}

#[test]
fn empty_to_key_then_reuse() {
    let rules = vec![Rule::new("a", ""), Rule::new("b", "B"), Rule::new("c", "")];
    let errors = check_rules(&rules);

    assert_eq!(errors.len(), 2);
    assert_eq!((errors[0].index, &errors[0].problem), (0, &RuleProblem::MissingToKey));
    assert_eq!((errors[1].index, &errors[1].problem), (2, &RuleProblem::MissingToKey));
}

#[test]
fn pass_through_fast_paths() {
    let rules = vec![Rule::new("a", "A").required()];
    let (output, diagnostics) = convert(&[], &rules);
    assert!(output.is_empty());
    assert!(diagnostics.is_empty());

    let input = records(vec![json!({"x": 1}), json!({"y": null})]);
    let (output, diagnostics) = convert(&input, &[]);
    assert_eq!(output, input);
    assert!(diagnostics.is_empty());
}

#[test]
fn blank_row_with_default() {
    let rules = vec![Rule::new("count", "Count").with_default(|| json!(0))];
    let (output, diagnostics) = convert(&records(vec![json!({"other": "x"})]), &rules);

    assert_eq!(output, records(vec![json!({"Count": 0})]));
    assert_eq!(diagnostics.blank_row_count, 1);
    assert!(!diagnostics.is_empty());
}

#[test]
fn row_excluded_on_cell_error() {
    let rules = vec![
        Rule::new("name", "Name"),
        Rule::new("id", "Id").required(),
    ];
    let (output, diagnostics) = convert(&records(vec![json!({"name": "Ann"})]), &rules);

    assert!(output.is_empty());
    assert_eq!(
        summary(&diagnostics),
        (0, vec![0], vec![vec![CellErrorKind::NoSourceValue]])
    );
}

#[test]
fn mapping_miss() {
    let rules = vec![Rule::new("grade", "Grade").with_mapping([("A", json!(1))])];
    let (output, diagnostics) = convert(&records(vec![json!({"grade": "B"})]), &rules);

    assert!(output.is_empty());
    assert_eq!(
        summary(&diagnostics),
        (0, vec![0], vec![vec![CellErrorKind::MappingError]])
    );
}

#[test]
fn generator_ignores_from_key_presence() {
    let rules = vec![Rule::new("name", "Label")
        .required()
        .with_generator(|_: &Record| Ok::<_, BoxError>(json!("generated")))];
    let input = records(vec![json!({"name": "Ann"}), json!({})]);

    let (output, diagnostics) = convert(&input, &rules);

    assert_eq!(
        output,
        records(vec![json!({"Label": "generated"}), json!({"Label": "generated"})])
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn conversion_is_repeatable() {
    let rules = vec![
        Rule::new("name", "Name").required(),
        Rule::new("kind", "Kind").with_mapping([("a", json!("Alpha"))]),
        Rule::new("n", "N").with_converter(to_int).with_default_value(json!(-1)),
    ];
    let input = records(vec![
        json!({"name": "x", "kind": "a", "n": "4"}),
        json!({"kind": "b"}),
        json!({}),
        json!({"name": "y", "kind": "a"}),
    ]);

    let (first_output, first) = convert(&input, &rules);
    let (second_output, second) = convert(&input, &rules);

    assert_eq!(first_output, second_output);
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(first.to_string(), second.to_string());

    assert_eq!(first_output.len(), 2);
    assert_eq!(first.row_errors.iter().map(|r| r.index).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(first.blank_row_count, 1);
}

#[test]
fn rules_are_shareable_across_threads() {
    let rules = vec![Rule::new("v", "V").with_converter(to_int)];
    let chunks = vec![
        records(vec![json!({"v": "1"}), json!({"v": "x"})]),
        records(vec![json!({"v": 2})]),
    ];

    let results: Vec<(usize, usize)> = std::thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .iter()
            .map(|chunk| {
                let rules = &rules;
                scope.spawn(move || {
                    let (output, diagnostics) = convert(chunk, rules);
                    (output.len(), diagnostics.row_errors.len())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results, vec![(1, 1), (1, 0)]);
}

#[test]
fn declarative_rule_set_end_to_end() {
    let rule_set = RuleSet::from_json(
        r#"{
            "description": "people",
            "rules": [
                {"fromKey": "name", "toKey": "Name", "required": true,
                 "operations": [{"type": "trim"}, {"type": "not_empty"}]},
                {"fromKey": "age", "toKey": "Age", "default": 0,
                 "operations": [{"type": "to_number"}]},
                {"fromKey": "sex", "toKey": "Sex", "mapping": {"F": "female", "M": "male"}},
                {"toKey": "Display",
                 "generator": {"type": "concat", "sources": ["name", "age"], "separator": "/"}}
            ]
        }"#,
    )
    .unwrap();
    let rules = rule_set.compile().unwrap();
    let input = records(vec![
        json!({"name": " Ann ", "age": "30", "sex": "F"}),
        json!({"name": "Bob", "sex": "X"}),
        json!({"name": "  ", "age": "n/a", "sex": "M"}),
    ]);

    let (output, diagnostics) = convert(&input, &rules);

    assert_eq!(
        output,
        records(vec![json!({"Name": "Ann", "Age": 30, "Sex": "female", "Display": "Ann/30"})])
    );
    assert_eq!(
        summary(&diagnostics),
        (
            0,
            vec![1, 2],
            vec![
                vec![CellErrorKind::MappingError],
                vec![CellErrorKind::ConverterError, CellErrorKind::ConverterError],
            ]
        )
    );
    let cell = &diagnostics.row_errors[1].cell_errors[1];
    assert_eq!(cell.value, Some(json!("n/a")));
    assert!(cell.cause.to_string().contains("no digits"));
}
