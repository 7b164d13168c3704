use lesion_note_features::{
    build_features, build_features_with, explain_components, phrases_to_table, Direction, FeatureConfig,
    FeatureError, FittedPipeline, SublinearTFIDFEngine, Table, Value,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn notes_table(texts: &[&str]) -> Table {
    Table::from_columns(vec![
        ("midas_record_id", (0..texts.len()).map(|i| Value::from(100 + i as i64)).collect()),
        ("clinical_notes", texts.iter().map(|&t| Value::from(t)).collect()),
    ])
    .unwrap()
}

fn loose_config(k: usize) -> FeatureConfig {
    FeatureConfig {
        n_components: k,
        min_doc_freq: 1,
        max_doc_freq_ratio: 1.0,
        ..FeatureConfig::default()
    }
}

fn feature(table: &Table, column: &str) -> Vec<f32> {
    table
        .column(column)
        .unwrap()
        .iter()
        .map(|v| match v {
            Value::Float32(x) => *x,
            other => panic!("expected f32 cell, got {other:?}"),
        })
        .collect()
}

const NOTES: [&str; 8] = [
    "Pigmented lesion on left forearm, irregular border",
    "irregular border, dark pigmented papule",
    "scaly erythematous patch on scalp",
    "erythematous scaly plaque, itchy",
    "dark pigmented lesion, asymmetric, irregular border",
    "itchy scaly patch",
    "benign appearing nevus on back",
    "nevus on back, regular border",
];

#[test]
fn identical_notes_share_coordinates() {
    init_logger();
    let table = notes_table(&["itchy red rash", "itchy red rash", "clear skin"]);
    let config = FeatureConfig {
        n_components: 1,
        min_doc_freq: 1,
        ..FeatureConfig::default()
    };
    let (out, _) = build_features(&table, "clinical_notes", &config).unwrap();

    assert_eq!(out.n_rows(), 3);
    assert_eq!(
        out.column_names().collect::<Vec<_>>(),
        vec!["midas_record_id", "clinical_notes", "note_svd_000"]
    );
    let x = feature(&out, "note_svd_000");
    assert_eq!(x[0], x[1]);
    assert_ne!(x[0], x[2]);
}

#[test]
fn too_many_components_is_a_dimensionality_error() {
    let table = notes_table(&NOTES);
    let config = FeatureConfig {
        min_doc_freq: 2,
        ..loose_config(50)
    };
    match build_features(&table, "clinical_notes", &config) {
        Err(FeatureError::Dimensionality { requested, vocabulary }) => {
            assert_eq!(requested, 50);
            assert!(vocabulary < 50);
        }
        other => panic!("expected dimensionality error, got {other:?}"),
    }
}

#[test]
fn missing_text_column_is_reported() {
    let table = notes_table(&NOTES);
    let err = build_features(&table, "notes", &loose_config(2)).unwrap_err();
    assert_eq!(err, FeatureError::MissingColumn("notes".into()));
}

#[test]
fn rows_keep_count_and_order() {
    let table = notes_table(&NOTES);
    let (out, pipeline) = build_features(&table, "clinical_notes", &loose_config(4)).unwrap();
    assert_eq!(out.n_rows(), NOTES.len());
    assert_eq!(out.column("midas_record_id").unwrap(), table.column("midas_record_id").unwrap());
    assert_eq!(
        pipeline.output_columns(),
        vec!["note_svd_000", "note_svd_001", "note_svd_002", "note_svd_003"]
    );
    for name in pipeline.output_columns() {
        assert!(feature(&out, &name).iter().all(|v| v.is_finite()));
    }
    // the input table is untouched
    assert_eq!(table.n_cols(), 2);
}

#[test]
fn custom_prefix_names_columns() {
    let table = notes_table(&NOTES);
    let config = FeatureConfig {
        output_prefix: "hx".into(),
        ..loose_config(2)
    };
    let (out, _) = build_features(&table, "clinical_notes", &config).unwrap();
    assert!(out.contains_column("hx_000"));
    assert!(out.contains_column("hx_001"));
    assert!(!out.contains_column("note_svd_000"));
}

#[test]
fn repeated_single_note_gives_finite_features() {
    let table = notes_table(&["same note"; 6]);
    let (out, pipeline) = build_features(&table, "clinical_notes", &loose_config(2)).unwrap();
    let first = feature(&out, "note_svd_000");
    assert!(first.iter().all(|v| v.is_finite()));
    assert!(first.windows(2).all(|w| w[0] == w[1]));
    assert!(feature(&out, "note_svd_001").iter().all(|v| v.is_finite()));
    assert_eq!(pipeline.singular_values()[1], 0.0);
}

#[test]
fn same_seed_same_pipeline() {
    let table = notes_table(&NOTES);
    let (a_table, a) = build_features(&table, "clinical_notes", &loose_config(3)).unwrap();
    let (b_table, b) = build_features(&table, "clinical_notes", &loose_config(3)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a_table, b_table);
}

#[test]
fn transform_reproduces_emitted_columns() {
    let table = notes_table(&NOTES);
    let (out, pipeline) = build_features(&table, "clinical_notes", &loose_config(3)).unwrap();

    let features = pipeline.transform(&NOTES).unwrap();
    for (j, name) in pipeline.output_columns().iter().enumerate() {
        assert_eq!(features.column(j).to_vec(), feature(&out, name));
    }
    assert_eq!(pipeline.transform_table(&table, "clinical_notes").unwrap(), out);
}

#[test]
fn transform_new_notes() {
    let table = notes_table(&NOTES);
    let (_, pipeline) = build_features(&table, "clinical_notes", &loose_config(3)).unwrap();

    let features = pipeline
        .transform(&["irregular   border\u{a0}pigmented", "completely unrelated words"])
        .unwrap();
    assert_eq!(features.dim(), (2, 3));
    assert!(features.row(0).iter().any(|v| *v != 0.0));
    assert!(features.row(1).iter().all(|v| *v == 0.0));
}

#[test]
fn explained_variance_is_a_share() {
    let table = notes_table(&NOTES);
    let (_, pipeline) = build_features(&table, "clinical_notes", &loose_config(3)).unwrap();
    let ratio = pipeline.explained_variance_ratio();
    assert_eq!(ratio.len(), 3);
    assert!(ratio.iter().all(|r| *r >= 0.0));
    assert!(ratio.sum() <= 1.0 + 1e-9);
    let s = pipeline.singular_values();
    assert!(s[0] >= s[1] && s[1] >= s[2]);
}

#[test]
fn cbor_round_trip_keeps_behaviour() {
    let table = notes_table(&NOTES);
    let (_, pipeline) = build_features(&table, "clinical_notes", &loose_config(2)).unwrap();

    let bytes = serde_cbor::to_vec(&pipeline).unwrap();
    let restored: FittedPipeline = serde_cbor::from_slice(&bytes).unwrap();
    assert_eq!(restored, pipeline);
    assert_eq!(restored.transform(&NOTES).unwrap(), pipeline.transform(&NOTES).unwrap());
}

#[test]
fn sublinear_engine_differs_on_repeated_terms() {
    let table = notes_table(&["mole mole mole dark", "mole dark", "scaly patch", "scaly patch patch"]);
    let (raw, _) = build_features(&table, "clinical_notes", &loose_config(2)).unwrap();
    let (sub, pipeline) =
        build_features_with::<SublinearTFIDFEngine>(&table, "clinical_notes", &loose_config(2)).unwrap();
    assert_eq!(pipeline.n_components(), 2);
    assert_ne!(feature(&raw, "note_svd_000"), feature(&sub, "note_svd_000"));
}

#[test]
fn explanation_groups_are_clamped_and_sorted() {
    let table = notes_table(&["aa bb", "bb cc", "aa cc"]);
    let config = FeatureConfig {
        ngram_range: lesion_note_features::vectorizer::analyzer::NgramRange::new(1, 1).unwrap(),
        ..loose_config(2)
    };
    let (_, pipeline) = build_features(&table, "clinical_notes", &config).unwrap();
    assert_eq!(pipeline.vocab_size(), 3);

    let rows = explain_components(&pipeline, 5, None).unwrap();
    assert_eq!(rows.len(), 2 * 2 * 3);
    for c in 0..2 {
        let pos: Vec<_> = rows
            .iter()
            .filter(|r| r.component == c && r.direction == Direction::Positive)
            .collect();
        let neg: Vec<_> = rows
            .iter()
            .filter(|r| r.component == c && r.direction == Direction::Negative)
            .collect();
        assert_eq!(pos.len(), 3);
        assert_eq!(neg.len(), 3);
        assert!(pos.windows(2).all(|w| w[0].weight >= w[1].weight));
        assert!(neg.windows(2).all(|w| w[0].weight <= w[1].weight));
    }

    let table = phrases_to_table(&rows);
    assert_eq!(table.n_rows(), 12);
    assert_eq!(table.get(0, "component"), Some(&Value::from(0usize)));
}
