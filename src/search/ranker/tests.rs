use super::*;
use chrono::Utc;

fn resume(id: i64, skills: &[&str], summary: Option<&str>, embedding: StoredEmbedding) -> Resume {
    let now = Utc::now().naive_utc();
    Resume {
        id,
        name: format!("Candidate {id}"),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        experience: None,
        education: None,
        contact: BTreeMap::new(),
        summary: summary.map(str::to_string),
        embedding,
        created_at: now,
        updated_at: now,
    }
}

fn present(vector: &[f32]) -> StoredEmbedding {
    StoredEmbedding::Present(vector.to_vec())
}

/// A unit vector whose cosine similarity with [1, 0] is `similarity`
fn at_similarity(similarity: f32) -> StoredEmbedding {
    present(&[similarity, (1.0 - similarity * similarity).sqrt()])
}

#[test]
fn cosine_similarity_basics() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
    assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]).unwrap() + 1.0).abs() < 1e-9);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), None);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
    assert_eq!(cosine_similarity(&[], &[]), None);
}

#[test]
fn keywords_are_case_folded() {
    assert_eq!(
        query_keywords("  Python   Developer\tSQL "),
        vec!["python", "developer", "sql"]
    );
    assert!(query_keywords("   ").is_empty());
}

#[test]
fn keyword_boost_takes_only_three_values() {
    let keywords = query_keywords("python developer");

    let none = resume(1, &["java"], Some("Frontend designer"), StoredEmbedding::Missing);
    let skills_only = resume(2, &["Python", "sql"], Some("Designer"), StoredEmbedding::Missing);
    let summary_only = resume(3, &["java"], Some("Seasoned developer"), StoredEmbedding::Missing);
    let both = resume(4, &["python"], Some("Backend developer"), StoredEmbedding::Missing);

    assert_eq!(keyword_boost(&keywords, &none), 0.0);
    assert_eq!(keyword_boost(&keywords, &skills_only), SKILL_MATCH_BOOST);
    assert_eq!(keyword_boost(&keywords, &summary_only), SUMMARY_MATCH_BOOST);
    assert!((keyword_boost(&keywords, &both) - 0.2).abs() < 1e-12);
}

#[test]
fn keyword_matching_is_substring_based() {
    let keywords = query_keywords("py");
    let candidate = resume(1, &["numpy"], None, StoredEmbedding::Missing);
    assert_eq!(keyword_boost(&keywords, &candidate), SKILL_MATCH_BOOST);

    let empty_summary = resume(2, &[], Some(""), StoredEmbedding::Missing);
    assert_eq!(keyword_boost(&keywords, &empty_summary), 0.0);
}

#[test]
fn sole_candidate_gets_skill_boost() {
    let ana = Resume {
        name: "Ana".to_string(),
        ..resume(
            1,
            &["python", "sql"],
            Some("Senior backend engineer with 6 years experience"),
            at_similarity(0.42),
        )
    };

    let ranked = rank_resumes(
        "python developer",
        &[1.0, 0.0],
        &[ana],
        2,
        &SearchFilters::default(),
        5,
    );

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].name, "Ana");
    assert!((ranked[0].score - 0.52).abs() < 1e-6, "score was {}", ranked[0].score);
}

#[test]
fn results_are_sorted_descending_and_truncated() {
    let resumes = vec![
        resume(1, &[], None, at_similarity(0.1)),
        resume(2, &[], None, at_similarity(0.9)),
        resume(3, &[], None, at_similarity(0.5)),
        resume(4, &[], None, at_similarity(0.7)),
    ];

    let ranked = rank_resumes("query", &[1.0, 0.0], &resumes, 2, &SearchFilters::default(), 3);

    let ids: Vec<i64> = ranked.iter().map(|c| c.record_id).collect();
    assert_eq!(ids, vec![2, 4, 3]);
    assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn ties_keep_insertion_order() {
    let resumes = vec![
        resume(5, &[], None, present(&[1.0, 1.0])),
        resume(6, &[], None, present(&[1.0, 1.0])),
        resume(7, &[], None, present(&[1.0, 1.0])),
    ];

    let ranked = rank_resumes("query", &[1.0, 1.0], &resumes, 2, &SearchFilters::default(), 10);

    let ids: Vec<i64> = ranked.iter().map(|c| c.record_id).collect();
    assert_eq!(ids, vec![5, 6, 7]);
}

#[test]
fn boosted_scores_can_exceed_one_and_outrank_semantics() {
    let resumes = vec![
        resume(1, &["java"], None, at_similarity(0.95)),
        resume(2, &["python"], Some("python lead"), at_similarity(0.9)),
    ];

    let ranked = rank_resumes("python", &[1.0, 0.0], &resumes, 2, &SearchFilters::default(), 2);
    assert_eq!(ranked[0].record_id, 2);
    assert!((ranked[0].score - 1.1).abs() < 1e-6);

    let perfect = vec![resume(3, &["python"], Some("python"), present(&[1.0, 0.0]))];
    let ranked = rank_resumes("python", &[1.0, 0.0], &perfect, 2, &SearchFilters::default(), 1);
    assert!(ranked[0].score > 1.0);
}

#[test]
fn unusable_vectors_are_excluded() {
    let resumes = vec![
        resume(1, &["python"], Some("python expert"), StoredEmbedding::Missing),
        resume(2, &["python"], None, StoredEmbedding::Malformed("bad json".to_string())),
        resume(3, &["python"], None, present(&[1.0, 0.0, 0.0])),
        resume(4, &["python"], None, present(&[0.0, 0.0])),
        resume(5, &[], None, present(&[0.3, 0.4])),
    ];

    let ranked = rank_resumes("python", &[1.0, 0.0], &resumes, 2, &SearchFilters::default(), 10);

    let ids: Vec<i64> = ranked.iter().map(|c| c.record_id).collect();
    assert_eq!(ids, vec![5]);
}

#[test]
fn zero_query_vector_yields_nothing() {
    let resumes = vec![resume(1, &["python"], None, present(&[1.0, 0.0]))];
    let ranked = rank_resumes("python", &[0.0, 0.0], &resumes, 2, &SearchFilters::default(), 5);
    assert!(ranked.is_empty());
}

#[test]
fn empty_input_and_zero_top_k() {
    assert!(rank_resumes("python", &[1.0, 0.0], &[], 2, &SearchFilters::default(), 5).is_empty());

    let resumes = vec![resume(1, &[], None, present(&[1.0, 0.0]))];
    assert!(rank_resumes("python", &[1.0, 0.0], &resumes, 2, &SearchFilters::default(), 0).is_empty());
}

#[test]
fn filters_restrict_candidates() {
    let mut lisbon = resume(1, &[], None, present(&[1.0, 0.0]));
    lisbon.contact.insert("location".to_string(), "Lisbon, Portugal".to_string());
    lisbon.experience = Some("6 years".to_string());

    let mut porto = resume(2, &[], None, present(&[1.0, 0.0]));
    porto.contact.insert("location".to_string(), "Porto".to_string());
    porto.experience = Some("2 years".to_string());

    let nowhere = resume(3, &[], None, present(&[1.0, 0.0]));
    let resumes = vec![lisbon, porto, nowhere];

    let by_location = SearchFilters {
        location: Some("lisbon".to_string()),
        ..SearchFilters::default()
    };
    let ranked = rank_resumes("q", &[1.0, 0.0], &resumes, 2, &by_location, 10);
    assert_eq!(ranked.iter().map(|c| c.record_id).collect::<Vec<_>>(), vec![1]);

    let by_years = SearchFilters {
        min_experience_years: Some(3.0),
        ..SearchFilters::default()
    };
    let ranked = rank_resumes("q", &[1.0, 0.0], &resumes, 2, &by_years, 10);
    assert_eq!(ranked.iter().map(|c| c.record_id).collect::<Vec<_>>(), vec![1]);

    assert!(SearchFilters::default().is_empty());
    assert!(!by_years.is_empty());
}

#[test]
fn empty_query_is_rejected() {
    assert!(matches!(validate_query(""), Err(TalentError::EmptyQuery)));
    assert!(matches!(validate_query(" \n\t"), Err(TalentError::EmptyQuery)));
    assert_eq!(validate_query("  rust ").ok(), Some("rust"));
}
