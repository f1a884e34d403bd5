//! End-to-end acceptance: the eligibility rule through the full encrypted
//! pipeline, for representative ages crossed with every flag triple.

mod common;

use ceval_core::{ApplicantForm, Category};
use ceval_crypto::LocalKeyProvider;
use proptest::prelude::*;

use common::{reference, triples, Deployment};

#[tokio::test]
async fn matrix_through_workflow() {
    let d = Deployment::new();
    for age in [17i64, 18, 40, 64, 65] {
        for flags in triples() {
            let (wf, _) = d.requester();
            let got = wf
                .submit(&ApplicantForm::new(age, flags[0], flags[1], flags[2]))
                .await
                .unwrap();
            assert_eq!(
                got,
                reference(age as u64, flags),
                "age {age} flags {flags:?}"
            );
        }
    }
}

#[test]
fn band_edges() {
    let d = Deployment::new();
    let key = LocalKeyProvider::generate();
    assert_eq!(d.classify(&key, 18, [false; 3]), Category::Eligible);
    assert_eq!(d.classify(&key, 64, [false; 3]), Category::Eligible);
    assert_eq!(d.classify(&key, 17, [false; 3]), Category::NotEligible);
    assert_eq!(d.classify(&key, 65, [false; 3]), Category::NotEligible);
}

#[test]
fn in_band_any_risk_is_moderate() {
    let d = Deployment::new();
    let key = LocalKeyProvider::generate();
    for flags in triples().into_iter().filter(|t| t.iter().any(|f| *f)) {
        for age in [18, 30, 64] {
            assert_eq!(d.classify(&key, age, flags), Category::Moderate);
        }
    }
}

#[test]
fn out_of_band_ignores_flags() {
    let d = Deployment::new();
    let key = LocalKeyProvider::generate();
    for flags in triples() {
        for age in [1, 17, 65, 150] {
            assert_eq!(d.classify(&key, age, flags), Category::NotEligible);
        }
    }
}

#[test]
fn category_labels() {
    assert_eq!(Category::Eligible.label(), "Eligible");
    assert_eq!(Category::Moderate.label(), "Moderate");
    assert_eq!(Category::NotEligible.label(), "Not Eligible");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn whole_u8_domain_matches_reference(age in 0u64..=255, bits in 0u8..8) {
        let d = Deployment::new();
        let key = LocalKeyProvider::generate();
        let flags = [bits & 4 != 0, bits & 2 != 0, bits & 1 != 0];
        prop_assert_eq!(d.classify(&key, age, flags), reference(age, flags));
    }
}
