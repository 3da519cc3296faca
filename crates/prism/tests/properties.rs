// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use prism::quality::detect_outliers;
use prism::text::similarity;
use prism::{
    ChartRanker, ChartSuggestionGenerator, DataQualityAssessor, DataQualityReport,
    IntentAnalyser, MetricClassifier, MetricDescriptor, MetricKind, ValueKind,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<i32>().prop_map(Value::from),
        (-1e6f64..1e6).prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
        "20[0-9]{2}-(0[1-9]|1[0-2])".prop_map(|date| json!({"date": date, "value": 1})),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{1,24}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

const PROMPT_WORDS: &[&str] = &[
    "show", "revenue", "trend", "compare", "sales", "by", "region", "not", "total", "breakdown",
    "share", "cash", "flow", "over", "time", "2025", "vs", "top", "executive", "impact",
];

fn arb_prompt() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(PROMPT_WORDS), 0..8).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn classification_is_deterministic(dataset in arb_json()) {
        let classifier = MetricClassifier::default();
        let first = classifier.classify(&dataset);
        let second = classifier.classify(&dataset);
        let shape = |ds: &[MetricDescriptor]| ds.iter().map(|d| (d.path.clone(), d.kind, d.value_kind)).collect::<Vec<_>>();
        prop_assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn embedded_sets_expand_to_container_plus_fields(fields in 1usize..6, items in 1usize..6) {
        let records = (0..items)
            .map(|i| {
                let mut record = Map::new();
                record.insert("label".into(), json!(format!("Item {i}")));
                for f in 0..fields {
                    record.insert(format!("field{f}"), json!(i * 10 + f));
                }
                Value::Object(record)
            })
            .collect::<Vec<_>>();
        let descriptors = MetricClassifier::default().classify(&json!({ "set": records }));
        prop_assert_eq!(descriptors.len(), 1 + fields);
        prop_assert_eq!(descriptors[0].kind, MetricKind::EmbeddedMetricSet);
    }

    #[test]
    fn fewer_than_four_samples_have_no_outliers(values in prop::collection::vec(-1e9f64..1e9, 0..4)) {
        prop_assert!(detect_outliers(&values, 1.5).is_empty());
    }

    #[test]
    fn suggestion_confidence_snaps_to_levels(prompt in arb_prompt(), groups in 0usize..14, points in 1usize..12) {
        let grouped = MetricDescriptor::new("salesByRegion.sales", MetricKind::GroupedSeries, ValueKind::Currency)
            .with_grouping((0..groups).map(|g| format!("Region {g}")).collect())
            .with_samples((0..groups).map(|g| json!(g * 3)).collect());
        let series = MetricDescriptor::new("revenue", MetricKind::TimeSeries, ValueKind::Currency)
            .with_dates((0..points).map(|p| format!("2025-{:02}", p % 12 + 1)).collect())
            .with_samples((0..points).map(|p| json!(p * 7)).collect());
        let metrics = vec![grouped, series];
        let quality = DataQualityAssessor::default().assess(&metrics);
        let intent = IntentAnalyser::default().analyse(&prompt);
        let candidates = ChartSuggestionGenerator::default().generate(&metrics, &quality, Some(&intent));
        for candidate in candidates {
            prop_assert!([0.9, 0.75, 0.6, 0.4, 0.2].contains(&candidate.confidence));
        }
    }

    #[test]
    fn ranker_returns_five_sorted_entries(prompt in "\\PC{0,60}", top_k in 0usize..8) {
        let metrics = vec![MetricDescriptor::new("revenue", MetricKind::TimeSeries, ValueKind::Currency)
            .with_dates(vec!["2025-01".into()])];
        let ranking = ChartRanker::default().rank(&prompt, &metrics, &DataQualityReport::default(), None, top_k);
        prop_assert_eq!(ranking.rankings.len(), 5);
        prop_assert!(ranking.rankings.windows(2).all(|w| w[0].score >= w[1].score));
        prop_assert_eq!(&ranking.recommended, &ranking.rankings[0]);
        prop_assert!(!ranking.top_k.is_empty() && ranking.top_k.len() <= 5);
    }

    #[test]
    fn similarity_is_total(a in "\\PC{0,20}", b in "\\PC{0,20}") {
        let score = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(similarity(&a, &a), 1.0);
    }
}

#[test]
fn test_outlier_detection_flags_extreme_value() {
    assert_eq!(detect_outliers(&[1.0, 2.0, 3.0, 4.0, 100.0], 1.5), vec![100.0]);
}

#[test]
fn test_empty_strings_are_identical() {
    assert_eq!(similarity("", ""), 1.0);
}
