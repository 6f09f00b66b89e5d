use subsim_core::errors::{ErrorInfo, SubsimError};
use subsim_core::provenance::RunProvenance;
use subsim_core::Population;

#[test]
fn provenance_round_trip_json() {
    let provenance = RunProvenance {
        input_hash: "input".into(),
        seed: 99,
        created_at: "2023-10-31T00:00:00Z".into(),
        tool_versions: [("subsim-core".into(), "0.1.0".into())].into_iter().collect(),
    };

    let json = serde_json::to_string_pretty(&provenance).expect("serialize");
    let decoded: RunProvenance = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, provenance);
}

#[test]
fn error_round_trip_keeps_family() {
    let err = SubsimError::Numerical(ErrorInfo::new("N002", "zero density").with_hint("check x"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"Numerical\""));
    let decoded: SubsimError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn population_round_trip_json() {
    let population = Population::new(vec![vec![0.5, -1.0], vec![2.0, 0.25]], vec![-0.5, 2.25])
        .expect("population");
    let json = serde_json::to_string(&population).expect("serialize");
    let decoded: Population = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, population);
    assert_eq!(decoded.num_failed(), 1);
    assert_eq!(decoded.samples()[1], vec![2.0, 0.25]);
}

#[test]
fn population_rejects_mismatched_lengths() {
    assert!(Population::new(vec![vec![0.0]], vec![]).is_err());
    assert!(Population::new(vec![vec![0.0], vec![0.0, 1.0]], vec![0.0, 0.0]).is_err());
}
